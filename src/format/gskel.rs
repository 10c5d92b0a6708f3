use std::io::Write;

use anyhow::Result;
use byteorder::{WriteBytesExt, LE};
use glam::Mat4;

use super::{util, VERSION};

const MAGIC: &[u8; 4] = b"GSKL";

/// Parent index of bones without a parent.
pub const ROOT_PARENT: u16 = 0xffff;

/// Represents a GSKL file. It stores the engine-space bind pose of a
/// skeleton: one entry per bone, ordered so that parents always precede
/// their children.
#[derive(Debug, Clone, PartialEq)]
pub struct Gskel {
    pub bones: Vec<Bone>,
}

/// A single bone of the skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Index of the parent bone, or [`ROOT_PARENT`] for roots.
    pub parent: u16,
    /// Bind transform relative to the parent bone.
    pub local_bind: Mat4,
    /// Maps world-space bind geometry into this bone's local space.
    pub inverse_bind: Mat4,
}

impl Gskel {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();

        bytes.write_all(MAGIC)?;
        bytes.write_u32::<LE>(VERSION)?;
        bytes.write_u32::<LE>(self.bones.len() as u32)?;

        for bone in &self.bones {
            util::write_string(&mut bytes, &bone.name)?;
            bytes.write_u16::<LE>(bone.parent)?;
            util::write_mat4(&mut bytes, &bone.local_bind)?;
            util::write_mat4(&mut bytes, &bone.inverse_bind)?;
        }

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn write() {
        let (gskel, expected) = data();
        let actual = gskel.to_bytes().unwrap();

        assert_eq!(expected, actual);
    }

    fn data() -> (Gskel, Vec<u8>) {
        let gskel = Gskel {
            bones: vec![
                Bone {
                    name: String::from("Root"),
                    parent: ROOT_PARENT,
                    local_bind: Mat4::IDENTITY,
                    inverse_bind: Mat4::IDENTITY,
                },
                Bone {
                    name: String::from("Hip"),
                    parent: 0,
                    local_bind: Mat4::from_translation(Vec3::new(0., 1., 0.)),
                    inverse_bind: Mat4::from_translation(Vec3::new(0., -1., 0.)),
                },
            ],
        };

        let mut expected = vec![
            b'G', b'S', b'K', b'L', //
            0x01, 0x00, 0x00, 0x00, // version
            0x02, 0x00, 0x00, 0x00, // bone count
        ];
        expected.extend_from_slice(b"\x04\x00\x00\x00Root");
        expected.extend_from_slice(&[0xff, 0xff]);
        push_mat4(&mut expected, Mat4::IDENTITY);
        push_mat4(&mut expected, Mat4::IDENTITY);
        expected.extend_from_slice(b"\x03\x00\x00\x00Hip");
        expected.extend_from_slice(&[0x00, 0x00]);
        push_mat4(&mut expected, Mat4::from_translation(Vec3::new(0., 1., 0.)));
        push_mat4(&mut expected, Mat4::from_translation(Vec3::new(0., -1., 0.)));

        (gskel, expected)
    }

    fn push_mat4(bytes: &mut Vec<u8>, matrix: Mat4) {
        for value in matrix.transpose().to_cols_array() {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
}
