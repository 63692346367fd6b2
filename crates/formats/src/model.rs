use foundation::bounds::Aabb3;
use foundation::math::{Mat4, Vec3};
use gltf::buffer::Source;
use gltf::mesh::Mode;

use crate::data_uri::{DataUriError, decode_data_uri, is_data_uri};

/// One drawable triangle list, already flattened into world (model) space.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub base_color: [f32; 4],
}

/// A parsed model: renderable meshes plus their combined bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAsset {
    pub meshes: Vec<MeshData>,
    pub bounds: Aabb3,
    /// Primitives that were not triangle lists or had no positions.
    pub skipped_primitives: usize,
}

impl ModelAsset {
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.positions.len()).sum()
    }
}

#[derive(Debug)]
pub enum ModelError {
    Parse(gltf::Error),
    DataUri { buffer: usize, source: DataUriError },
    MissingBuffer { buffer: usize },
    BufferTooShort { buffer: usize, expected: usize, got: usize },
    Empty,
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::Parse(e) => write!(f, "model parse error: {e}"),
            ModelError::DataUri { buffer, source } => {
                write!(f, "buffer {buffer} has an invalid data uri: {source}")
            }
            ModelError::MissingBuffer { buffer } => write!(f, "buffer {buffer} was not provided"),
            ModelError::BufferTooShort {
                buffer,
                expected,
                got,
            } => write!(
                f,
                "buffer {buffer} too short: expected={expected} bytes got={got}"
            ),
            ModelError::Empty => write!(f, "model contains no drawable geometry"),
        }
    }
}

impl std::error::Error for ModelError {}

/// A buffer the document references by relative URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalBuffer {
    pub index: usize,
    pub uri: String,
}

/// A parsed glTF document whose external buffers may still need fetching.
#[derive(Debug)]
pub struct ModelDocument {
    gltf: gltf::Gltf,
}

impl ModelDocument {
    /// Parse `.gltf` JSON or binary `.glb` bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, ModelError> {
        let gltf = gltf::Gltf::from_slice(bytes).map_err(ModelError::Parse)?;
        Ok(Self { gltf })
    }

    /// Buffers referenced by URI (not embedded, not the GLB blob), in index order.
    pub fn external_buffers(&self) -> Vec<ExternalBuffer> {
        self.gltf
            .buffers()
            .filter_map(|b| match b.source() {
                Source::Uri(uri) if !is_data_uri(uri) => Some(ExternalBuffer {
                    index: b.index(),
                    uri: uri.to_string(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Resolve every buffer and flatten the default scene into a `ModelAsset`.
    ///
    /// `external` pairs buffer indices from [`Self::external_buffers`] with their bytes.
    pub fn into_asset(self, external: Vec<(usize, Vec<u8>)>) -> Result<ModelAsset, ModelError> {
        let mut external: Vec<Option<Vec<u8>>> = {
            let mut slots: Vec<Option<Vec<u8>>> = Vec::new();
            for (index, bytes) in external {
                if slots.len() <= index {
                    slots.resize(index + 1, None);
                }
                slots[index] = Some(bytes);
            }
            slots
        };

        let gltf::Gltf { document, blob } = self.gltf;
        let mut blob = blob;

        let mut buffers: Vec<Vec<u8>> = Vec::new();
        for buffer in document.buffers() {
            let index = buffer.index();
            let data = match buffer.source() {
                Source::Bin => blob.take().ok_or(ModelError::MissingBuffer { buffer: index })?,
                Source::Uri(uri) if is_data_uri(uri) => decode_data_uri(uri)
                    .map_err(|source| ModelError::DataUri {
                        buffer: index,
                        source,
                    })?,
                Source::Uri(_) => external
                    .get_mut(index)
                    .and_then(Option::take)
                    .ok_or(ModelError::MissingBuffer { buffer: index })?,
            };
            if data.len() < buffer.length() {
                return Err(ModelError::BufferTooShort {
                    buffer: index,
                    expected: buffer.length(),
                    got: data.len(),
                });
            }
            buffers.push(data);
        }

        let mut asset = ModelAsset {
            meshes: Vec::new(),
            bounds: Aabb3::empty(),
            skipped_primitives: 0,
        };

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next());
        if let Some(scene) = scene {
            for node in scene.nodes() {
                collect_node(&node, Mat4::IDENTITY, &buffers, &mut asset);
            }
        }

        if asset.meshes.is_empty() || asset.bounds.is_empty() {
            return Err(ModelError::Empty);
        }
        Ok(asset)
    }
}

/// Parse a self-contained model (GLB or `.gltf` with embedded buffers).
pub fn parse_model(bytes: &[u8]) -> Result<ModelAsset, ModelError> {
    ModelDocument::parse(bytes)?.into_asset(Vec::new())
}

fn collect_node(node: &gltf::Node<'_>, parent: Mat4, buffers: &[Vec<u8>], out: &mut ModelAsset) {
    let world = parent * Mat4::from_cols_f32(node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != Mode::Triangles {
                out.skipped_primitives += 1;
                continue;
            }
            match read_primitive(&primitive, &world, buffers) {
                Some(data) => {
                    for p in &data.positions {
                        out.bounds.expand(Vec3::new(
                            f64::from(p[0]),
                            f64::from(p[1]),
                            f64::from(p[2]),
                        ));
                    }
                    out.meshes.push(data);
                }
                None => out.skipped_primitives += 1,
            }
        }
    }

    for child in node.children() {
        collect_node(&child, world, buffers, out);
    }
}

fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    world: &Mat4,
    buffers: &[Vec<u8>],
) -> Option<MeshData> {
    let reader = primitive.reader(|b| buffers.get(b.index()).map(Vec::as_slice));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()?
        .map(|p| {
            let v = world.transform_point3(Vec3::new(
                f64::from(p[0]),
                f64::from(p[1]),
                f64::from(p[2]),
            ));
            [v.x as f32, v.y as f32, v.z as f32]
        })
        .collect();
    if positions.is_empty() {
        return None;
    }

    let indices: Vec<u32> = match reader.read_indices() {
        Some(idx) => idx.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let normals = match reader.read_normals() {
        Some(n) => {
            let normal_m = normal_matrix(world);
            n.map(|v| {
                let t = normal_m
                    .transform_point3(Vec3::new(
                        f64::from(v[0]),
                        f64::from(v[1]),
                        f64::from(v[2]),
                    ))
                    .normalize();
                [t.x as f32, t.y as f32, t.z as f32]
            })
            .collect()
        }
        None => face_normals(&positions, &indices),
    };

    let base_color = primitive
        .material()
        .pbr_metallic_roughness()
        .base_color_factor();

    Some(MeshData {
        positions,
        normals,
        indices,
        base_color,
    })
}

/// Rotation/scale part of `m` with the translation dropped.
///
/// Exact for rotations and uniform scale, which covers exported building models.
fn normal_matrix(m: &Mat4) -> Mat4 {
    let mut n = *m;
    n.cols[3] = [0.0, 0.0, 0.0, 1.0];
    n
}

/// Area-weighted vertex normals for meshes exported without a NORMAL attribute.
fn face_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let to_v = |p: [f32; 3]| Vec3::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2]));
    let mut acc = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let pa = to_v(positions[a]);
        let n = (to_v(positions[b]) - pa).cross(to_v(positions[c]) - pa);
        for i in [a, b, c] {
            acc[i] = acc[i] + n;
        }
    }

    acc.into_iter()
        .map(|n| {
            let n = n.normalize();
            if n == Vec3::ZERO {
                [0.0, 1.0, 0.0]
            } else {
                [n.x as f32, n.y as f32, n.z as f32]
            }
        })
        .collect()
}
