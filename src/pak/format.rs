#![forbid(unsafe_code)]

use crate::pak::error::{PakError, PakResult};
use crate::pak::io::{read_u32, read_u64, write_u32, write_u64};
use std::io::{Read, Write};

/// Size of [`FileHeader`] on disk.
pub const FILE_HEADER_SIZE: u64 = 4 * 8;

/// Size of one [`AssetRecord`] on disk, including the padding after `type`.
pub const RECORD_SIZE: u64 = 4 + 4 + 7 * 8;

/// Category tag stored in every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AssetType {
    None = 0,
    Texture = 1,
    String = 2,
    Model = 3,
    Shader = 4,
    Sound = 5,
    Skinned = 6,
    Skeleton = 7,
    Animation = 8,
}

impl AssetType {
    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => AssetType::None,
            1 => AssetType::Texture,
            2 => AssetType::String,
            3 => AssetType::Model,
            4 => AssetType::Shader,
            5 => AssetType::Sound,
            6 => AssetType::Skinned,
            7 => AssetType::Skeleton,
            8 => AssetType::Animation,
            _ => return None,
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            AssetType::None => "none",
            AssetType::Texture => "texture",
            AssetType::String => "string",
            AssetType::Model => "model",
            AssetType::Shader => "shader",
            AssetType::Sound => "sound",
            AssetType::Skinned => "skinned",
            AssetType::Skeleton => "skeleton",
            AssetType::Animation => "animation",
        }
    }
}

/// Leading bytes of every archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub asset_count: u64,
    pub record_table_offset: u64,
    pub name_table_offset: u64,
    pub data_offset: u64,
}

impl FileHeader {
    pub fn write_to(&self, w: &mut dyn Write) -> PakResult<()> {
        write_u64(w, self.asset_count)?;
        write_u64(w, self.record_table_offset)?;
        write_u64(w, self.name_table_offset)?;
        write_u64(w, self.data_offset)?;
        Ok(())
    }

    pub fn read_from(r: &mut dyn Read) -> PakResult<Self> {
        Ok(FileHeader {
            asset_count: read_u64(r)?,
            record_table_offset: read_u64(r)?,
            name_table_offset: read_u64(r)?,
            data_offset: read_u64(r)?,
        })
    }
}

/// One entry of the record table.
///
/// Field order matches the serialized layout; `name_pointer` is reserved for
/// the runtime and is always written as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub kind: AssetType,
    pub identifier_hash: u64,
    pub content_hash: u64,
    pub name_length: u64,
    pub name_offset: u64,
    pub data_length: u64,
    pub data_offset: u64,
    pub name_pointer: u64,
}

impl AssetRecord {
    pub fn write_to(&self, w: &mut dyn Write) -> PakResult<()> {
        write_u32(w, self.kind as u32)?;
        write_u32(w, 0)?;
        write_u64(w, self.identifier_hash)?;
        write_u64(w, self.content_hash)?;
        write_u64(w, self.name_length)?;
        write_u64(w, self.name_offset)?;
        write_u64(w, self.data_length)?;
        write_u64(w, self.data_offset)?;
        write_u64(w, 0)?;
        Ok(())
    }

    pub fn read_from(r: &mut dyn Read) -> PakResult<Self> {
        let raw_kind = read_u32(r)?;
        let kind = AssetType::from_u32(raw_kind)
            .ok_or_else(|| PakError::Invalid(format!("unknown asset type {raw_kind}")))?;
        let _pad = read_u32(r)?;
        Ok(AssetRecord {
            kind,
            identifier_hash: read_u64(r)?,
            content_hash: read_u64(r)?,
            name_length: read_u64(r)?,
            name_offset: read_u64(r)?,
            data_length: read_u64(r)?,
            data_offset: read_u64(r)?,
            name_pointer: read_u64(r)?,
        })
    }
}

/// Public view of a packed asset (for listing and tests).
#[derive(Debug, Clone)]
pub struct AssetInfo {
    pub kind: AssetType,
    pub name: String,
    pub identifier_hash: u64,
    pub content_hash: u64,
    pub data_offset: u64,
    pub data_length: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_to_fixed_size() {
        let rec = AssetRecord {
            kind: AssetType::Sound,
            identifier_hash: 1,
            content_hash: 2,
            name_length: 3,
            name_offset: 4,
            data_length: 5,
            data_offset: 6,
            name_pointer: 0xdead,
        };
        let mut buf = Vec::new();
        rec.write_to(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, RECORD_SIZE);
        assert_eq!(&buf[0..8], &[5, 0, 0, 0, 0, 0, 0, 0]);
        // pointer placeholder never reaches disk
        assert_eq!(&buf[56..64], &[0u8; 8]);

        let back = AssetRecord::read_from(&mut &buf[..]).unwrap();
        assert_eq!(back.kind, AssetType::Sound);
        assert_eq!(back.data_offset, 6);
        assert_eq!(back.name_pointer, 0);
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        let mut buf = vec![0u8; RECORD_SIZE as usize];
        buf[0] = 42;
        assert!(matches!(
            AssetRecord::read_from(&mut &buf[..]),
            Err(PakError::Invalid(_))
        ));
    }

    #[test]
    fn header_size() {
        let mut buf = Vec::new();
        FileHeader {
            asset_count: 0,
            record_table_offset: FILE_HEADER_SIZE,
            name_table_offset: FILE_HEADER_SIZE,
            data_offset: FILE_HEADER_SIZE,
        }
        .write_to(&mut buf)
        .unwrap();
        assert_eq!(buf.len() as u64, FILE_HEADER_SIZE);
    }
}
