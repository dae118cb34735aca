use divan::AllocProfiler;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

pub mod package {
    use divan::Bencher;
    use std::sync::Arc;

    use glam::{Vec2, Vec3};
    use tpac_format::asset::{kind, Asset, AssetMeta};
    use tpac_format::data::mesh::{MeshCollectionMeta, SubMesh, VertexStreamData};
    use tpac_format::data::mesh::VERTEX_STREAM_SEGMENT;
    use tpac_format::data::texture::{TextureFormat, TextureMeta, PIXEL_SEGMENT};
    use tpac_format::data::Payload;
    use tpac_format::segment::Segment;
    use tpac_format::{CodecRegistry, Guid, Package, PackageWriter};

    fn synthetic_package() -> Vec<u8> {
        let mut package = Package::new(Guid::from_u128(0x1));

        let texture_guid = Guid::from_u128(0x10);
        let mut texture = Asset::new(
            kind::TEXTURE,
            texture_guid,
            "bench_texture",
            AssetMeta::Texture(TextureMeta {
                width: 256,
                height: 256,
                array_count: 1,
                mip_count: 1,
                format: TextureFormat::Rgba8,
                flags: 0,
                pixel_segment: None,
            }),
        );
        texture.segments.push(Segment::new_inline(
            texture_guid,
            PIXEL_SEGMENT,
            Payload::Opaque((0..256u32 * 256 * 4).map(|i| i as u8).collect()),
        ));
        package.assets.push(texture);

        let mesh_guid = Guid::from_u128(0x20);
        let submesh_guid = Guid::from_u128(0x21);
        let vertex_count = 4096usize;
        let stream = VertexStreamData {
            indices: (0..vertex_count as u32 * 3).map(|i| i % vertex_count as u32).collect(),
            positions: [
                (0..vertex_count).map(|i| Vec3::splat(i as f32)).collect(),
                Vec::new(),
            ],
            uvs: [
                (0..vertex_count).map(|i| Vec2::splat(i as f32)).collect(),
                Vec::new(),
            ],
            ..Default::default()
        };
        let mut mesh = Asset::new(
            kind::MESH_COLLECTION,
            mesh_guid,
            "bench_mesh",
            AssetMeta::MeshCollection(MeshCollectionMeta {
                wide_indices: false,
                extended_tangents: false,
                submeshes: vec![SubMesh {
                    guid: submesh_guid,
                    name: "lod0".into(),
                    material: Guid::NIL,
                    vertex_count: vertex_count as u32,
                    index_count: vertex_count as u32 * 3,
                    lod: 0,
                    vertex_stream: None,
                    edit_data: None,
                }],
            }),
        );
        mesh.segments.push(Segment::new_inline(
            submesh_guid,
            VERTEX_STREAM_SEGMENT,
            Payload::VertexStream(stream),
        ));
        package.assets.push(mesh);

        PackageWriter::new().to_bytes(&package).unwrap()
    }

    #[divan::bench]
    fn parse(bencher: Bencher) {
        bencher.with_inputs(synthetic_package).bench_values(|data| {
            divan::black_box(
                Package::from_bytes(data, Arc::new(CodecRegistry::standard())).unwrap(),
            );
        });
    }

    #[divan::bench]
    fn decode_all_segments(bencher: Bencher) {
        bencher
            .with_inputs(|| {
                Package::from_bytes(synthetic_package(), Arc::new(CodecRegistry::standard()))
                    .unwrap()
            })
            .bench_refs(|package| {
                package.force_load().unwrap();
            });
    }

    #[divan::bench]
    fn serialize(bencher: Bencher) {
        bencher
            .with_inputs(|| {
                Package::from_bytes(synthetic_package(), Arc::new(CodecRegistry::standard()))
                    .unwrap()
            })
            .bench_refs(|package| {
                divan::black_box(PackageWriter::new().to_bytes(package).unwrap());
            });
    }
}
