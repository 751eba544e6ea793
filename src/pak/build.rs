#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::pak::encode::{EncodedEntry, EncoderRegistry};
use crate::pak::error::{PakError, PakResult};
use crate::pak::format::{AssetRecord, AssetType, FileHeader, FILE_HEADER_SIZE, RECORD_SIZE};
use crate::pak::hash::{hash_bytes, hash_name};
use crate::pak::path::{extension, sanitize_name, stem};

#[derive(Debug, Clone)]
struct PendingAsset {
    kind: AssetType,
    name: String,
    identifier_hash: u64,
    content_hash: u64,
    payload: Vec<u8>,
}

/// What one archive build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub output: PathBuf,
    pub assets: usize,
    pub skipped: usize,
    pub bytes: u64,
}

/// Accumulates encoded assets for one archive and serializes them.
/// Nothing touches the output path until [`ArchiveBuilder::write`].
pub struct ArchiveBuilder<'r> {
    registry: &'r EncoderRegistry,
    assets: Vec<PendingAsset>,
    seen: HashSet<u64>,
    skipped: usize,
}

impl<'r> ArchiveBuilder<'r> {
    pub fn new(registry: &'r EncoderRegistry) -> Self {
        ArchiveBuilder {
            registry,
            assets: Vec::new(),
            seen: HashSet::new(),
            skipped: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Files or assets dropped so far (unknown extension or unsupported content).
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Encodes `path` and adds every entry it yields. Files without an
    /// encoder and assets the encoder cannot represent are logged and skipped.
    pub fn add_file(&mut self, path: &Path) -> PakResult<usize> {
        let Some(encoder) = self.registry.lookup(path) else {
            warn!(
                "{}: extension {} not supported, skipping",
                path.display(),
                extension(path).unwrap_or_default()
            );
            self.skipped += 1;
            return Ok(0);
        };

        let entries = match encoder.encode(path) {
            Ok(entries) => entries,
            Err(e) if e.is_recoverable() => {
                warn!("skipping asset: {e}");
                self.skipped += 1;
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let n = entries.len();
        for entry in entries {
            self.add_entry(path, entry)?;
        }
        Ok(n)
    }

    /// Names, hashes and records one encoded entry from `source`.
    pub fn add_entry(&mut self, source: &Path, entry: EncodedEntry) -> PakResult<()> {
        let name = sanitize_name(&entry.prefix, &stem(source));
        let identifier_hash = hash_name(&name);

        if !self.seen.insert(identifier_hash) {
            return Err(PakError::Collision {
                name,
                path: source.to_path_buf(),
            });
        }

        info!("{} -> {}", source.display(), name);
        debug!(
            "  {} {} bytes, identifier hash {:#018x}",
            entry.kind.label(),
            entry.payload.len(),
            identifier_hash
        );

        self.assets.push(PendingAsset {
            kind: entry.kind,
            identifier_hash,
            content_hash: hash_bytes(&entry.payload),
            name,
            payload: entry.payload,
        });
        Ok(())
    }

    /// File header plus records in encounter order, offsets filled in.
    fn layout(&self) -> (FileHeader, Vec<AssetRecord>) {
        let mut records = Vec::with_capacity(self.assets.len());
        let mut name_cursor = 0u64;
        let mut data_cursor = 0u64;

        for a in &self.assets {
            let name_length = a.name.len() as u64 + 1;
            let data_length = a.payload.len() as u64;
            records.push(AssetRecord {
                kind: a.kind,
                identifier_hash: a.identifier_hash,
                content_hash: a.content_hash,
                name_length,
                name_offset: name_cursor,
                data_length,
                data_offset: data_cursor,
                name_pointer: 0,
            });
            name_cursor += name_length;
            data_cursor += data_length;
        }

        let asset_count = records.len() as u64;
        let record_table_offset = FILE_HEADER_SIZE;
        let name_table_offset = record_table_offset + asset_count * RECORD_SIZE;
        let header = FileHeader {
            asset_count,
            record_table_offset,
            name_table_offset,
            data_offset: name_table_offset + name_cursor,
        };
        (header, records)
    }

    /// Serializes the whole archive into memory.
    ///
    /// Layout:
    /// - file header: `[asset_count][record_table_offset][name_table_offset][data_offset]`
    /// - record table, sorted by identifier hash
    /// - name table: NUL-terminated names, encounter order
    /// - data blob: payloads, encounter order
    ///
    /// Name and data offsets are relative to the start of their region and are
    /// running totals in encounter order, so the sorted table still points into
    /// regions laid out in the order assets were produced.
    pub fn to_bytes(&self) -> PakResult<Vec<u8>> {
        let (header, mut records) = self.layout();
        let total = header.data_offset as usize
            + self.assets.iter().map(|a| a.payload.len()).sum::<usize>();

        let mut out = Vec::with_capacity(total);
        header.write_to(&mut out)?;

        records.sort_by_key(|r| r.identifier_hash);
        for r in &records {
            r.write_to(&mut out)?;
        }
        for a in &self.assets {
            out.write_all(a.name.as_bytes())?;
            out.write_all(&[0])?;
        }
        for a in &self.assets {
            out.write_all(&a.payload)?;
        }

        debug_assert_eq!(out.len(), total);
        Ok(out)
    }

    /// Writes the archive to `output` in one step: the bytes go to a
    /// temporary file next to it which is renamed into place on success.
    pub fn write(&self, output: &Path) -> PakResult<BuildSummary> {
        let bytes = self.to_bytes()?;
        write_atomic(output, &bytes)?;
        Ok(BuildSummary {
            output: output.to_path_buf(),
            assets: self.assets.len(),
            skipped: self.skipped,
            bytes: bytes.len() as u64,
        })
    }
}

pub(crate) fn write_atomic(output: &Path, bytes: &[u8]) -> PakResult<()> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(output).map_err(|e| PakError::Io(e.error))?;
    Ok(())
}

/// Encodes `files` in order into a single archive held in memory.
pub fn build_archive<'r>(
    registry: &'r EncoderRegistry,
    files: &[PathBuf],
) -> PakResult<ArchiveBuilder<'r>> {
    let mut builder = ArchiveBuilder::new(registry);
    for f in files {
        builder.add_file(f)?;
    }
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pak::read::Archive;

    fn entry(kind: AssetType, payload: &[u8]) -> EncodedEntry {
        EncodedEntry::new(kind, payload.to_vec())
    }

    #[test]
    fn offsets_follow_encounter_order() {
        let reg = EncoderRegistry::empty();
        let mut b = ArchiveBuilder::new(&reg);
        b.add_entry(Path::new("zeta.txt"), entry(AssetType::String, b"zz")).unwrap();
        b.add_entry(Path::new("alpha.txt"), entry(AssetType::String, b"aaaa")).unwrap();
        b.add_entry(Path::new("mid.txt"), entry(AssetType::String, b"m")).unwrap();

        let (header, records) = b.layout();
        assert_eq!(header.record_table_offset, FILE_HEADER_SIZE);
        assert_eq!(header.name_table_offset, FILE_HEADER_SIZE + 3 * RECORD_SIZE);
        // ZETA\0 ALPHA\0 MID\0
        assert_eq!(header.data_offset, header.name_table_offset + 5 + 6 + 4);

        let name_offsets: Vec<u64> = records.iter().map(|r| r.name_offset).collect();
        let data_offsets: Vec<u64> = records.iter().map(|r| r.data_offset).collect();
        assert_eq!(name_offsets, vec![0, 5, 11]);
        assert_eq!(data_offsets, vec![0, 2, 6]);
    }

    #[test]
    fn table_is_sorted_but_regions_are_not() {
        let reg = EncoderRegistry::empty();
        let mut b = ArchiveBuilder::new(&reg);
        for (n, p) in [("c.txt", b"3"), ("a.txt", b"1"), ("b.txt", b"2")] {
            b.add_entry(Path::new(n), entry(AssetType::String, p)).unwrap();
        }
        let archive = Archive::from_bytes(b.to_bytes().unwrap()).unwrap();

        let hashes: Vec<u64> = archive.records().iter().map(|r| r.identifier_hash).collect();
        let mut sorted = hashes.clone();
        sorted.sort_unstable();
        assert_eq!(hashes, sorted);

        let names_region = archive.region(archive.header().name_table_offset, 6).unwrap();
        assert_eq!(names_region, b"C\0A\0B\0");
        let data_region = archive.region(archive.header().data_offset, 3).unwrap();
        assert_eq!(data_region, b"312");
    }

    #[test]
    fn collision_is_reported_with_name() {
        let reg = EncoderRegistry::empty();
        let mut b = ArchiveBuilder::new(&reg);
        b.add_entry(Path::new("res/a.txt"), entry(AssetType::String, b"x")).unwrap();
        let err = b
            .add_entry(Path::new("res/A.glsl"), entry(AssetType::Shader, b"y"))
            .unwrap_err();
        match err {
            PakError::Collision { name, path } => {
                assert_eq!(name, "A");
                assert_eq!(path, Path::new("res/A.glsl"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn content_hash_tracks_payload() {
        let reg = EncoderRegistry::empty();
        let mut b = ArchiveBuilder::new(&reg);
        b.add_entry(Path::new("one/x.txt"), entry(AssetType::String, b"same")).unwrap();
        b.add_entry(Path::new("y.txt"), entry(AssetType::String, b"same")).unwrap();
        b.add_entry(Path::new("z.txt"), entry(AssetType::String, b"diff")).unwrap();
        let (_, records) = b.layout();
        assert_eq!(records[0].content_hash, records[1].content_hash);
        assert_ne!(records[0].content_hash, records[2].content_hash);
    }

    #[test]
    fn empty_archive_is_just_a_header() {
        let reg = EncoderRegistry::empty();
        let b = ArchiveBuilder::new(&reg);
        assert!(b.is_empty());
        let bytes = b.to_bytes().unwrap();
        assert_eq!(bytes.len() as u64, FILE_HEADER_SIZE);
        let h = FileHeader::read_from(&mut &bytes[..]).unwrap();
        assert_eq!(h.asset_count, 0);
        assert_eq!(h.data_offset, FILE_HEADER_SIZE);
    }

    #[test]
    fn unknown_extension_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# hi").unwrap();

        let reg = EncoderRegistry::standard();
        let mut b = ArchiveBuilder::new(&reg);
        assert_eq!(b.add_file(&path).unwrap(), 0);
        assert!(b.is_empty());
    }

    #[test]
    fn write_replaces_output_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("bin").join("assets.bin");

        let reg = EncoderRegistry::empty();
        let mut b = ArchiveBuilder::new(&reg);
        b.add_entry(Path::new("a.txt"), entry(AssetType::String, b"abc")).unwrap();
        let summary = b.write(&out).unwrap();

        assert_eq!(summary.assets, 1);
        assert_eq!(std::fs::metadata(&out).unwrap().len(), summary.bytes);
        // only the archive is left behind
        let names: Vec<_> = std::fs::read_dir(out.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("assets.bin")]);
    }
}
