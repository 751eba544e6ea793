#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::pak::error::{PakError, PakResult};
use crate::pak::path::rel_segments;

/// One archive's worth of input files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// `None` for the global archive, else the subdirectory name.
    pub key: Option<String>,
    pub output: PathBuf,
    pub files: Vec<PathBuf>,
}

/// `<out>.bin` for the global group, `<out>-<key>.bin` otherwise.
pub fn group_output(out_base: &str, key: Option<&str>) -> PathBuf {
    match key {
        None => PathBuf::from(format!("{out_base}.bin")),
        Some(k) => PathBuf::from(format!("{out_base}-{k}.bin")),
    }
}

/// Every regular file under `root`, sorted by path bytes for a stable
/// encounter order.
pub fn collect_files(root: &Path) -> PakResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for ent in WalkDir::new(root).follow_links(false).into_iter() {
        let ent = ent.map_err(|e| {
            let msg = e.to_string();
            let io = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, msg));
            PakError::Io(io)
        })?;
        if ent.file_type().is_file() {
            files.push(ent.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Partitions `files` (all under `root`) into the global group, holding files
/// directly in `root`, and one group per immediate subdirectory. Files nested
/// deeper belong to the group of their top-level directory.
///
/// The global group is always first and always present.
pub fn group_files(root: &Path, files: &[PathBuf], out_base: &str) -> PakResult<Vec<Group>> {
    let mut global = Vec::new();
    let mut by_dir: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

    for f in files {
        let segs = rel_segments(root, f)?;
        if segs.len() == 1 {
            global.push(f.clone());
        } else {
            by_dir.entry(segs[0].clone()).or_default().push(f.clone());
        }
    }

    let mut groups = vec![Group {
        key: None,
        output: group_output(out_base, None),
        files: global,
    }];
    groups.extend(by_dir.into_iter().map(|(key, files)| Group {
        output: group_output(out_base, Some(&key)),
        key: Some(key),
        files,
    }));
    Ok(groups)
}

/// Walks `root` and groups what it finds.
pub fn group_tree(root: &Path, out_base: &str) -> PakResult<Vec<Group>> {
    let files = collect_files(root)?;
    group_files(root, &files, out_base)
}
