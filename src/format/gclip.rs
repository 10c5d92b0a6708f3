use std::io::Write;

use anyhow::Result;
use byteorder::{WriteBytesExt, LE};
use glam::Mat4;

use super::{util, VERSION};

const MAGIC: &[u8; 4] = b"GCLP";

/// Represents a GCLP file: one baked animation clip. Every track carries one
/// key per sampled frame; playback interpolates between them.
#[derive(Debug, Clone, PartialEq)]
pub struct Gclip {
    pub name: String,
    /// Length of the clip in seconds.
    pub duration: f32,
    pub tracks: Vec<Track>,
}

/// The key sequence of one joint.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Index of the joint in the skeleton the clip animates.
    pub joint: u16,
    /// Keys in strictly increasing time order, starting at zero.
    pub keys: Vec<Key>,
}

/// A single sampled key: the joint's parent-relative transform at one point
/// in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    pub time: f32,
    pub transform: Mat4,
}

impl Gclip {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();

        bytes.write_all(MAGIC)?;
        bytes.write_u32::<LE>(VERSION)?;
        util::write_string(&mut bytes, &self.name)?;
        bytes.write_f32::<LE>(self.duration)?;
        // Looping flag, reserved.
        bytes.write_u8(1)?;

        bytes.write_u32::<LE>(self.tracks.len() as u32)?;
        for track in &self.tracks {
            bytes.write_u16::<LE>(track.joint)?;
            bytes.write_u32::<LE>(track.keys.len() as u32)?;

            for key in &track.keys {
                bytes.write_f32::<LE>(key.time)?;
                util::write_mat4(&mut bytes, &key.transform)?;
            }
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
        let (gclip, expected) = data();
        let actual = gclip.to_bytes().unwrap();

        assert_eq!(expected, actual);
    }

    fn data() -> (Gclip, Vec<u8>) {
        let gclip = Gclip {
            name: String::from("idle"),
            duration: 0.5,
            tracks: vec![Track {
                joint: 3,
                keys: vec![
                    Key {
                        time: 0.,
                        transform: Mat4::IDENTITY,
                    },
                    Key {
                        time: 0.5,
                        transform: Mat4::IDENTITY,
                    },
                ],
            }],
        };

        let mut expected = vec![
            b'G', b'C', b'L', b'P', //
            0x01, 0x00, 0x00, 0x00, // version
        ];
        expected.extend_from_slice(b"\x04\x00\x00\x00idle");
        expected.extend_from_slice(&0.5f32.to_le_bytes());
        expected.push(0x01); // looping flag
        expected.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]); // track count
        expected.extend_from_slice(&[0x03, 0x00]); // joint index
        expected.extend_from_slice(&[0x02, 0x00, 0x00, 0x00]); // key count
        for time in [0f32, 0.5] {
            expected.extend_from_slice(&time.to_le_bytes());
            for value in Mat4::IDENTITY.to_cols_array() {
                expected.extend_from_slice(&value.to_le_bytes());
            }
        }

        (gclip, expected)
    }
}
