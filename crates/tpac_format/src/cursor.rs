//! Typed sequential readers and writers over in-memory payload buffers.
//!
//! Decoded metadata blobs and decompressed segment payloads are always held
//! fully in memory before structural decoding, so the cursor works over a
//! byte slice. Every decoder is handed a [`Reader`] spanning exactly the
//! declared byte length and must end with [`Reader::expect_empty`]; a
//! mismatch is the earliest possible signal of a decoder bug or format
//! drift and fails fatally.

use byteorder::{ByteOrder, LittleEndian};
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use crate::error::{Error, Result};
use crate::guid::Guid;

/// Forward reader over a byte slice with typed little-endian primitives.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Offset of `buf[0]` inside the enclosing payload, for error context.
    base: u64,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0, base: 0 }
    }

    /// Position of the cursor relative to the start of this reader.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return Err(self.overrun(pos - self.buf.len()));
        }
        self.pos = pos;
        Ok(())
    }

    fn overrun(&self, short: usize) -> Error {
        Error::SizeMismatch {
            expected: (self.buf.len() + short) as u64,
            actual: self.buf.len() as u64,
            offset: self.base + self.pos as u64,
        }
    }

    /// Read `len` raw bytes.
    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(self.overrun(len - self.remaining()));
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Read everything up to the end of the buffer.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }

    /// Split off a sub-reader spanning exactly `len` bytes.
    pub fn take(&mut self, len: usize) -> Result<Reader<'a>> {
        let base = self.base + self.pos as u64;
        let bytes = self.bytes(len)?;
        Ok(Reader { buf: bytes, pos: 0, base })
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.bytes(2)?))
    }

    pub fn i16(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.bytes(2)?))
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.bytes(4)?))
    }

    pub fn i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.bytes(4)?))
    }

    pub fn u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.bytes(8)?))
    }

    pub fn i64(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.bytes(8)?))
    }

    pub fn f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.bytes(4)?))
    }

    pub fn f64(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.bytes(8)?))
    }

    pub fn guid(&mut self) -> Result<Guid> {
        let mut raw = [0u8; 16];
        raw.copy_from_slice(self.bytes(16)?);
        Ok(Guid(raw))
    }

    pub fn vec2(&mut self) -> Result<Vec2> {
        Ok(Vec2::new(self.f32()?, self.f32()?))
    }

    pub fn vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.f32()?, self.f32()?, self.f32()?))
    }

    pub fn vec4(&mut self) -> Result<Vec4> {
        Ok(Vec4::new(self.f32()?, self.f32()?, self.f32()?, self.f32()?))
    }

    pub fn quat(&mut self) -> Result<Quat> {
        Ok(Quat::from_xyzw(
            self.f32()?,
            self.f32()?,
            self.f32()?,
            self.f32()?,
        ))
    }

    /// Read a 4x4 matrix stored row-major on disk into glam's column-major
    /// representation.
    pub fn mat4(&mut self) -> Result<Mat4> {
        let mut m = [0f32; 16];
        for v in m.iter_mut() {
            *v = self.f32()?;
        }
        Ok(Mat4::from_cols_array(&m).transpose())
    }

    /// Read a length-prefixed UTF-8 string (4-byte byte count).
    pub fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        Ok(String::from_utf8(self.bytes(len)?.to_vec())?)
    }

    /// Read a 4-byte count of length-prefixed strings.
    pub fn string_list(&mut self) -> Result<Vec<String>> {
        let count = self.u32()? as usize;
        (0..count).map(|_| self.string()).collect()
    }

    /// Record the current position for a later [`Reader::assert_consumed`].
    pub fn mark(&self) -> usize {
        self.pos
    }

    /// Assert that exactly `expected` bytes were consumed since `mark`.
    pub fn assert_consumed(&self, mark: usize, expected: u64) -> Result<()> {
        let actual = (self.pos - mark) as u64;
        if actual != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual,
                offset: self.base + mark as u64,
            });
        }
        Ok(())
    }

    /// Assert that the reader was consumed to the last byte.
    pub fn expect_empty(&self) -> Result<()> {
        if !self.is_empty() {
            return Err(Error::SizeMismatch {
                expected: self.pos as u64,
                actual: self.buf.len() as u64,
                offset: self.base + self.pos as u64,
            });
        }
        Ok(())
    }
}

/// Growable little-endian writer mirroring [`Reader`].
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Writer::default()
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn guid(&mut self, v: &Guid) {
        self.buf.extend_from_slice(&v.0);
    }

    pub fn vec2(&mut self, v: Vec2) {
        self.f32(v.x);
        self.f32(v.y);
    }

    pub fn vec3(&mut self, v: Vec3) {
        self.f32(v.x);
        self.f32(v.y);
        self.f32(v.z);
    }

    pub fn vec4(&mut self, v: Vec4) {
        self.f32(v.x);
        self.f32(v.y);
        self.f32(v.z);
        self.f32(v.w);
    }

    pub fn quat(&mut self, v: Quat) {
        self.f32(v.x);
        self.f32(v.y);
        self.f32(v.z);
        self.f32(v.w);
    }

    /// Write a 4x4 matrix in the on-disk row-major order.
    pub fn mat4(&mut self, m: &Mat4) {
        for v in m.transpose().to_cols_array() {
            self.f32(v);
        }
    }

    pub fn string(&mut self, s: &str) {
        self.u32(s.len() as u32);
        self.bytes(s.as_bytes());
    }

    pub fn string_list(&mut self, strings: &[String]) {
        self.u32(strings.len() as u32);
        for s in strings {
            self.string(s);
        }
    }
}
