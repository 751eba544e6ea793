#![forbid(unsafe_code)]

use std::path::Path;

use crate::pak::error::{PakError, PakResult};
use crate::pak::format::{AssetInfo, AssetRecord, FileHeader, FILE_HEADER_SIZE, RECORD_SIZE};
use crate::pak::hash::{hash_bytes, hash_name};

/// A whole archive loaded into memory, with its header and record table parsed.
#[derive(Debug, Clone)]
pub struct Archive {
    header: FileHeader,
    records: Vec<AssetRecord>,
    bytes: Vec<u8>,
}

impl Archive {
    pub fn open(path: &Path) -> PakResult<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    /// Parses the header and record table and checks the region offsets
    /// against the file size. Per-asset contents are checked by [`Archive::verify`].
    pub fn from_bytes(bytes: Vec<u8>) -> PakResult<Self> {
        let len = bytes.len() as u64;
        if len < FILE_HEADER_SIZE {
            return Err(PakError::Invalid("file too small".into()));
        }
        let mut cur = &bytes[..];
        let header = FileHeader::read_from(&mut cur)?;

        if header.record_table_offset != FILE_HEADER_SIZE {
            return Err(PakError::Invalid(format!(
                "record table at {}, expected {FILE_HEADER_SIZE}",
                header.record_table_offset
            )));
        }
        let table_end = header
            .asset_count
            .checked_mul(RECORD_SIZE)
            .and_then(|t| t.checked_add(header.record_table_offset))
            .ok_or_else(|| PakError::Invalid("asset count overflows".into()))?;
        if header.name_table_offset != table_end {
            return Err(PakError::Invalid(format!(
                "name table at {}, expected {table_end}",
                header.name_table_offset
            )));
        }
        if header.data_offset < header.name_table_offset || header.data_offset > len {
            return Err(PakError::Invalid("data region outside file".into()));
        }

        let mut records = Vec::with_capacity(header.asset_count as usize);
        for _ in 0..header.asset_count {
            records.push(AssetRecord::read_from(&mut cur)?);
        }

        Ok(Archive {
            header,
            records,
            bytes,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Records in table (identifier hash) order.
    pub fn records(&self) -> &[AssetRecord] {
        &self.records
    }

    /// `len` bytes at absolute file offset `offset`.
    pub fn region(&self, offset: u64, len: u64) -> PakResult<&[u8]> {
        let start =
            usize::try_from(offset).map_err(|_| PakError::Invalid("offset overflows".into()))?;
        let n = usize::try_from(len).map_err(|_| PakError::Invalid("length overflows".into()))?;
        start
            .checked_add(n)
            .and_then(|end| self.bytes.get(start..end))
            .ok_or_else(|| PakError::Invalid(format!("range {offset}+{len} outside file")))
    }

    /// Name of `rec` without its terminator.
    pub fn name(&self, rec: &AssetRecord) -> PakResult<&str> {
        let start = self.header.name_table_offset.saturating_add(rec.name_offset);
        let raw = self.region(start, rec.name_length)?;
        let (last, name) = raw
            .split_last()
            .ok_or_else(|| PakError::Invalid("empty name".into()))?;
        if *last != 0 {
            return Err(PakError::Invalid("name is not NUL terminated".into()));
        }
        std::str::from_utf8(name)
            .ok()
            .filter(|s| s.is_ascii())
            .ok_or_else(|| PakError::Invalid("name is not ASCII".into()))
    }

    /// Fixed header and variable payload of `rec`.
    pub fn payload(&self, rec: &AssetRecord) -> PakResult<&[u8]> {
        let start = self.header.data_offset.saturating_add(rec.data_offset);
        self.region(start, rec.data_length)
    }

    /// Binary search over the sorted table, as the runtime does.
    pub fn find(&self, name: &str) -> Option<&AssetRecord> {
        let h = hash_name(name);
        self.records
            .binary_search_by_key(&h, |r| r.identifier_hash)
            .ok()
            .map(|i| &self.records[i])
    }

    pub fn assets(&self) -> PakResult<Vec<AssetInfo>> {
        self.records
            .iter()
            .map(|r| {
                Ok(AssetInfo {
                    kind: r.kind,
                    name: self.name(r)?.to_string(),
                    identifier_hash: r.identifier_hash,
                    content_hash: r.content_hash,
                    data_offset: r.data_offset,
                    data_length: r.data_length,
                })
            })
            .collect()
    }

    /// Full consistency check: table order, name and content hashes, and
    /// that the name and data regions are exactly covered by the records.
    pub fn verify(&self) -> PakResult<()> {
        for w in self.records.windows(2) {
            if w[0].identifier_hash >= w[1].identifier_hash {
                return Err(PakError::Invalid("record table is not sorted".into()));
            }
        }

        let mut names_total = 0u64;
        let mut data_total = 0u64;
        for r in &self.records {
            let name = self.name(r)?;
            if hash_name(name) != r.identifier_hash {
                return Err(PakError::Invalid(format!("identifier hash mismatch: {name}")));
            }
            if hash_bytes(self.payload(r)?) != r.content_hash {
                return Err(PakError::Invalid(format!("content hash mismatch: {name}")));
            }
            names_total += r.name_length;
            data_total += r.data_length;
        }

        if self.header.name_table_offset + names_total != self.header.data_offset {
            return Err(PakError::Invalid("name region size mismatch".into()));
        }
        if self.header.data_offset + data_total != self.bytes.len() as u64 {
            return Err(PakError::Invalid("data region size mismatch".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pak::build::ArchiveBuilder;
    use crate::pak::encode::{EncodedEntry, EncoderRegistry};
    use crate::pak::format::AssetType;

    fn sample() -> Vec<u8> {
        let reg = EncoderRegistry::empty();
        let mut b = ArchiveBuilder::new(&reg);
        b.add_entry(
            Path::new("master_shader.glsl"),
            EncodedEntry::new(AssetType::Shader, b"void main(){}".to_vec()),
        )
        .unwrap();
        b.add_entry(
            Path::new("hero.edan"),
            EncodedEntry::new(AssetType::Skeleton, vec![1, 2, 3]).with_prefix("SKEL_"),
        )
        .unwrap();
        b.to_bytes().unwrap()
    }

    #[test]
    fn find_by_name() {
        let a = Archive::from_bytes(sample()).unwrap();
        a.verify().unwrap();

        let rec = a.find("SKEL_HERO").unwrap();
        assert_eq!(rec.kind, AssetType::Skeleton);
        assert_eq!(a.payload(rec).unwrap(), &[1, 2, 3]);
        assert_eq!(a.name(rec).unwrap(), "SKEL_HERO");
        assert!(a.find("HERO").is_none());
    }

    #[test]
    fn truncated_file_is_rejected() {
        let bytes = sample();
        assert!(Archive::from_bytes(bytes[..16].to_vec()).is_err());
        assert!(Archive::from_bytes(bytes[..40].to_vec()).is_err());
    }

    #[test]
    fn corrupted_payload_fails_verify() {
        let mut bytes = sample();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let a = Archive::from_bytes(bytes).unwrap();
        assert!(matches!(a.verify(), Err(PakError::Invalid(_))));
    }

    #[test]
    fn corrupted_name_fails_verify() {
        let bytes = sample();
        let names = Archive::from_bytes(bytes.clone()).unwrap().header().name_table_offset as usize;
        assert_eq!(&bytes[names..names + 14], b"MASTER_SHADER\0");

        let mut renamed = bytes.clone();
        renamed[names] = b'N';
        let a = Archive::from_bytes(renamed).unwrap();
        match a.verify() {
            Err(PakError::Invalid(msg)) => assert!(msg.contains("identifier hash"), "{msg}"),
            other => panic!("expected identifier hash mismatch, got {other:?}"),
        }

        let mut unterminated = bytes;
        unterminated[names + 13] = b'X';
        let a = Archive::from_bytes(unterminated).unwrap();
        match a.verify() {
            Err(PakError::Invalid(msg)) => assert!(msg.contains("NUL"), "{msg}"),
            other => panic!("expected missing terminator, got {other:?}"),
        }
    }

    #[test]
    fn trailing_garbage_fails_verify() {
        let mut bytes = sample();
        bytes.push(0);
        let a = Archive::from_bytes(bytes).unwrap();
        assert!(a.verify().is_err());
    }
}
