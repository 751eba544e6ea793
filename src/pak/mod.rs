#![forbid(unsafe_code)]

mod build;
pub mod encode;
mod error;
mod format;
mod group;
mod hash;
mod io;
mod ops;
mod path;
mod read;

pub use build::{build_archive, ArchiveBuilder, BuildSummary};
pub use encode::{EncodedEntry, Encoder, EncoderRegistry};
pub use error::{PakError, PakResult};
pub use format::{AssetInfo, AssetRecord, AssetType, FileHeader, FILE_HEADER_SIZE, RECORD_SIZE};
pub use group::{group_files, group_tree, Group};
pub use hash::{hash_bytes, hash_name};
pub use path::sanitize_name;
pub use read::Archive;

pub use ops::{entries, extensions_line, list, pack_files, pack_tree, verify};
