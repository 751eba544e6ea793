#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use tracing::info;

use crate::pak::build::{build_archive, write_atomic, BuildSummary};
use crate::pak::encode::EncoderRegistry;
use crate::pak::error::PakResult;
use crate::pak::format::AssetInfo;
use crate::pak::group::group_tree;
use crate::pak::read::Archive;

/// Packs exactly `files`, in the given order, into `output`.
pub fn pack_files(
    registry: &EncoderRegistry,
    files: &[PathBuf],
    output: &Path,
) -> PakResult<BuildSummary> {
    info!("=== packing into {} ===", output.display());
    let summary = build_archive(registry, files)?.write(output)?;
    info!("wrote {} assets ({} bytes)", summary.assets, summary.bytes);
    Ok(summary)
}

/// Packs the resource tree under `root`: one global archive plus one archive
/// per immediate subdirectory.
///
/// Every group is encoded before the first file is written, so a fatal error
/// in any group leaves no archive behind.
pub fn pack_tree(
    registry: &EncoderRegistry,
    root: &Path,
    out_base: &str,
) -> PakResult<Vec<BuildSummary>> {
    let groups = group_tree(root, out_base)?;

    let mut built = Vec::with_capacity(groups.len());
    for g in &groups {
        info!("=== packing into {} ===", g.output.display());
        let builder = build_archive(registry, &g.files)?;
        let bytes = builder.to_bytes()?;
        built.push((g, builder.len(), builder.skipped(), bytes));
    }

    let mut out = Vec::with_capacity(built.len());
    for (g, assets, skipped, bytes) in built {
        write_atomic(&g.output, &bytes)?;
        info!("wrote {} ({} assets, {} bytes)", g.output.display(), assets, bytes.len());
        out.push(BuildSummary {
            output: g.output.clone(),
            assets,
            skipped,
            bytes: bytes.len() as u64,
        });
    }
    Ok(out)
}

/// Read the record table of an archive.
pub fn entries(pak: &Path) -> PakResult<Vec<AssetInfo>> {
    Archive::open(pak)?.assets()
}

pub fn list(pak: &Path, verbose: bool) -> PakResult<()> {
    for e in entries(pak)? {
        if verbose {
            println!(
                "{:<9} {}  off={} len={} id={:#018x} content={:#018x}",
                e.kind.label(),
                e.name,
                e.data_offset,
                e.data_length,
                e.identifier_hash,
                e.content_hash
            );
        } else {
            println!("{:<9} {}  {} bytes", e.kind.label(), e.name, e.data_length);
        }
    }
    Ok(())
}

pub fn verify(pak: &Path) -> PakResult<()> {
    let archive = Archive::open(pak)?;
    archive.verify()?;
    println!("ok: {} assets", archive.records().len());
    Ok(())
}

/// Space-separated list of every extension `registry` accepts.
pub fn extensions_line(registry: &EncoderRegistry) -> String {
    registry.extensions().collect::<Vec<_>>().join(" ")
}
