//! Bit-packed per-vertex encodings used by vertex stream segments.
//!
//! These formats shrink per-vertex size for GPU upload. The shift/mask
//! boundaries and the normalization formula are load-bearing: any deviation
//! produces precision-mismatched round trips against files written by the
//! original tool.

use glam::{Vec3, Vec4};
use half::f16;

/// Unpack one unsigned-normalized field of `bits` width to [-1, 1].
///
/// The raw value is clamped against the maximum code before normalizing,
/// matching the original decoder.
#[inline]
pub fn unpack_unorm(raw: u32, bits: u32) -> f32 {
    let max = (1u32 << bits) - 1;
    let half_range = max as f32 / 2.0;
    raw.min(max) as f32 / half_range - 1.0
}

/// Pack a [-1, 1] value into an unsigned-normalized field of `bits` width.
#[inline]
pub fn pack_unorm(value: f32, bits: u32) -> u32 {
    let max = (1u32 << bits) - 1;
    let half_range = max as f32 / 2.0;
    (((value.clamp(-1.0, 1.0) + 1.0) * half_range).round() as u32).min(max)
}

/// Unpack a compressed normal: X in bits 0..11, Y in 11..22, Z in 22..32.
pub fn unpack_normal(raw: u32) -> Vec3 {
    Vec3::new(
        unpack_unorm(raw & 0x7FF, 11),
        unpack_unorm((raw >> 11) & 0x7FF, 11),
        unpack_unorm((raw >> 22) & 0x3FF, 10),
    )
}

pub fn pack_normal(n: Vec3) -> u32 {
    pack_unorm(n.x, 11) | (pack_unorm(n.y, 11) << 11) | (pack_unorm(n.z, 10) << 22)
}

/// Unpack a compressed tangent: X in bits 0..10, Y in 10..21, Z in 21..31,
/// and a sign bit for the bitangent handedness in bit 31.
pub fn unpack_tangent(raw: u32) -> Vec4 {
    let sign = if raw >> 31 == 1 { 1.0 } else { -1.0 };
    Vec4::new(
        unpack_unorm(raw & 0x3FF, 10),
        unpack_unorm((raw >> 10) & 0x7FF, 11),
        unpack_unorm((raw >> 21) & 0x3FF, 10),
        sign,
    )
}

pub fn pack_tangent(t: Vec4) -> u32 {
    let sign = if t.w >= 0.0 { 1u32 << 31 } else { 0 };
    pack_unorm(t.x, 10) | (pack_unorm(t.y, 11) << 10) | (pack_unorm(t.z, 10) << 21) | sign
}

/// Expand a half-precision 4-tuple position.
pub fn unpack_position(raw: [f16; 4]) -> Vec4 {
    Vec4::new(
        raw[0].to_f32(),
        raw[1].to_f32(),
        raw[2].to_f32(),
        raw[3].to_f32(),
    )
}

/// Expand one signed-normalized 16-bit Q-tangent component.
///
/// -32768 and -32767 both map to -1.0; the lower bound is clamped rather
/// than divided through.
#[inline]
pub fn unpack_snorm16(raw: i16) -> f32 {
    (raw as f32 / 32767.0).max(-1.0)
}

/// Expand a packed tangent-space rotation to its four components.
pub fn unpack_qtangent(raw: [i16; 4]) -> Vec4 {
    Vec4::new(
        unpack_snorm16(raw[0]),
        unpack_snorm16(raw[1]),
        unpack_snorm16(raw[2]),
        unpack_snorm16(raw[3]),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boundary_values_hit_extreme_codes() {
        assert_eq!(pack_unorm(-1.0, 11), 0);
        assert_eq!(pack_unorm(1.0, 11), 2047);
        assert_eq!(pack_unorm(-1.0, 10), 0);
        assert_eq!(pack_unorm(1.0, 10), 1023);

        assert_eq!(unpack_unorm(0, 11), -1.0);
        assert_eq!(unpack_unorm(2047, 11), 1.0);
        assert_eq!(unpack_unorm(1023, 10), 1.0);
    }

    #[test]
    fn out_of_range_raw_clamps_instead_of_wrapping() {
        assert_eq!(unpack_unorm(4095, 11), 1.0);
    }

    #[test]
    fn unorm_error_stays_within_one_quantization_step() {
        for bits in [10u32, 11] {
            let max = (1u32 << bits) - 1;
            let step = 2.0 / max as f32;
            let mut f = -1.0f32;
            while f <= 1.0 {
                let back = unpack_unorm(pack_unorm(f, bits), bits);
                assert!(
                    (back - f).abs() <= step,
                    "bits={bits} f={f} back={back} step={step}"
                );
                f += 0.001;
            }
        }
    }

    #[test]
    fn raw_codes_survive_unpack_pack() {
        for raw in [0u32, 1, 0x3FF, 0x7FF, 0x1234_5678 & 0xFFFF_FFFF] {
            let n = unpack_normal(raw & 0xFFFF_FFFF);
            assert_eq!(pack_normal(n), raw & 0xFFFF_FFFF);
        }
    }

    #[test]
    fn tangent_sign_bit_selects_handedness() {
        assert_eq!(unpack_tangent(1 << 31).w, 1.0);
        assert_eq!(unpack_tangent(0).w, -1.0);

        let t = unpack_tangent(0x8012_3456);
        assert_eq!(pack_tangent(t), 0x8012_3456);
    }

    #[test]
    fn snorm16_lower_bound_clamps() {
        assert_eq!(unpack_snorm16(i16::MIN), -1.0);
        assert_eq!(unpack_snorm16(-32767), -1.0);
        assert_eq!(unpack_snorm16(32767), 1.0);
        assert_eq!(unpack_snorm16(0), 0.0);
    }
}
