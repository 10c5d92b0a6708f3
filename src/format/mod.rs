pub use self::{
    gclip::{Gclip, Key, Track},
    gskel::{Bone, Gskel, ROOT_PARENT},
    gsmdl::{Gsmdl, SkinVertex},
};

mod gclip;
mod gskel;
mod gsmdl;

/// Container version shared by all three formats.
pub const VERSION: u32 = 1;

mod util {
    use std::io::{Result, Write};

    use byteorder::{WriteBytesExt, LE};
    use glam::{Mat4, Vec2, Vec3};

    /// Writes a length-prefixed UTF-8 string: `u32` byte length followed by
    /// the raw bytes, no terminator.
    pub fn write_string(bytes: &mut Vec<u8>, string: &str) -> Result<()> {
        bytes.write_u32::<LE>(string.len() as u32)?;
        bytes.write_all(string.as_bytes())?;

        Ok(())
    }

    /// Writes a 4x4 transform as 16 floats in row-major order. The engine
    /// keeps translation in the fourth column, so it lands in elements 3, 7,
    /// and 11 of the stream.
    pub fn write_mat4(bytes: &mut Vec<u8>, matrix: &Mat4) -> Result<()> {
        for value in matrix.transpose().to_cols_array() {
            bytes.write_f32::<LE>(value)?;
        }

        Ok(())
    }

    pub fn write_vec3(bytes: &mut Vec<u8>, v: Vec3) -> Result<()> {
        for coordinate in v.to_array() {
            bytes.write_f32::<LE>(coordinate)?;
        }

        Ok(())
    }

    pub fn write_vec2(bytes: &mut Vec<u8>, v: Vec2) -> Result<()> {
        for coordinate in v.to_array() {
            bytes.write_f32::<LE>(coordinate)?;
        }

        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use pretty_assertions::assert_eq;

        use super::*;

        #[test]
        fn string_is_length_prefixed() {
            let mut bytes = Vec::new();
            write_string(&mut bytes, "Root").unwrap();

            assert_eq!(b"\x04\x00\x00\x00Root".to_vec(), bytes);
        }

        #[test]
        fn empty_string_is_only_a_prefix() {
            let mut bytes = Vec::new();
            write_string(&mut bytes, "").unwrap();

            assert_eq!(vec![0; 4], bytes);
        }

        #[test]
        fn mat4_is_written_in_row_major_order() {
            let mut bytes = Vec::new();
            write_mat4(&mut bytes, &Mat4::from_translation(Vec3::new(2., 3., 4.))).unwrap();

            let expected: Vec<u8> = [
                1., 0., 0., 2., //
                0., 1., 0., 3., //
                0., 0., 1., 4., //
                0., 0., 0., 1., //
            ]
            .iter()
            .flat_map(|value: &f32| value.to_le_bytes())
            .collect();
            assert_eq!(expected, bytes);
        }
    }
}
