use std::io::Write;

use anyhow::Result;
use byteorder::{WriteBytesExt, LE};
use glam::{Vec2, Vec3};

use super::{util, VERSION};

const MAGIC: &[u8; 4] = b"GSMD";

/// Represents a GSMD file: one welded, indexed skinned mesh. All source
/// objects are merged into a single vertex/index space; the container always
/// carries exactly one submesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Gsmdl {
    /// Name of the material applied to the mesh.
    pub material: String,
    pub vertices: Vec<SkinVertex>,
    /// Three indices per triangle, source winding preserved.
    pub indices: Vec<u32>,
}

/// A skinned vertex. Up to four bones influence it; weights sum to one.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub joints: [u32; 4],
    pub weights: [f32; 4],
}

impl Gsmdl {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();

        bytes.write_all(MAGIC)?;
        bytes.write_u32::<LE>(VERSION)?;
        // Submesh count, always one.
        bytes.write_u32::<LE>(1)?;
        util::write_string(&mut bytes, &self.material)?;

        bytes.write_u32::<LE>(self.vertices.len() as u32)?;
        for vertex in &self.vertices {
            util::write_vec3(&mut bytes, vertex.position)?;
            util::write_vec3(&mut bytes, vertex.normal)?;
            util::write_vec2(&mut bytes, vertex.uv)?;
            for &joint in &vertex.joints {
                bytes.write_u32::<LE>(joint)?;
            }
            for &weight in &vertex.weights {
                bytes.write_f32::<LE>(weight)?;
            }
        }

        bytes.write_u32::<LE>(self.indices.len() as u32)?;
        for &index in &self.indices {
            bytes.write_u32::<LE>(index)?;
        }

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn write() {
        let (gsmdl, expected) = data();
        let actual = gsmdl.to_bytes().unwrap();

        assert_eq!(expected, actual);
    }

    fn data() -> (Gsmdl, Vec<u8>) {
        let gsmdl = Gsmdl {
            material: String::from("default"),
            vertices: vec![SkinVertex {
                position: Vec3::new(1., 2., 3.),
                normal: Vec3::new(0., 1., 0.),
                uv: Vec2::new(0.25, 0.75),
                joints: [0, 2, 0, 0],
                weights: [0.5, 0.5, 0., 0.],
            }],
            indices: vec![0, 0, 0],
        };

        let mut expected = vec![
            b'G', b'S', b'M', b'D', //
            0x01, 0x00, 0x00, 0x00, // version
            0x01, 0x00, 0x00, 0x00, // submesh count
        ];
        expected.extend_from_slice(b"\x07\x00\x00\x00default");
        expected.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]); // vertex count
        for value in [1f32, 2., 3., 0., 1., 0., 0.25, 0.75] {
            expected.extend_from_slice(&value.to_le_bytes());
        }
        for joint in [0u32, 2, 0, 0] {
            expected.extend_from_slice(&joint.to_le_bytes());
        }
        for weight in [0.5f32, 0.5, 0., 0.] {
            expected.extend_from_slice(&weight.to_le_bytes());
        }
        expected.extend_from_slice(&[0x03, 0x00, 0x00, 0x00]); // index count
        expected.extend_from_slice(&[0; 12]);

        (gsmdl, expected)
    }
}
