#![forbid(unsafe_code)]

//! Per-category encoders. Each turns one input file into zero or more
//! `(type, payload, name prefix)` entries; the builder does the rest.

mod audio;
mod collada;
mod math;
mod mesh;
mod skinned;
mod text;
mod texture;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::pak::error::{PakError, PakResult};
use crate::pak::format::AssetType;
use crate::pak::path::extension;

pub use audio::{WavEncoder, SOUND_HEADER_SIZE};
pub use collada::ColladaEncoder;
pub use math::TRANSFORM_FLOATS;
pub use mesh::{ObjEncoder, FLOATS_PER_POINT, MODEL_HEADER_SIZE};
pub use skinned::{EdanEncoder, SKIN_FLOATS_PER_VERTEX};
pub use text::{TextEncoder, STRING_HEADER_SIZE};
pub use texture::{TextureEncoder, TEXTURE_HEADER_SIZE};

/// Fixed-header-plus-payload bytes for one asset, before hashing and layout.
#[derive(Clone, PartialEq)]
pub struct EncodedEntry {
    pub kind: AssetType,
    pub payload: Vec<u8>,
    /// Prepended to the file stem so sibling entries from one file get distinct names.
    pub prefix: String,
}

impl EncodedEntry {
    pub fn new(kind: AssetType, payload: Vec<u8>) -> Self {
        EncodedEntry {
            kind,
            payload,
            prefix: String::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

impl fmt::Debug for EncodedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedEntry")
            .field("kind", &self.kind)
            .field("payload_len", &self.payload.len())
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// Narrows an element count to its fixed-header field, failing instead of
/// truncating so the header always describes the payload that follows.
pub(crate) fn header_count<T: TryFrom<usize>>(path: &Path, n: usize, what: &str) -> PakResult<T> {
    T::try_from(n).map_err(|_| {
        PakError::malformed(path, format!("{n} {what} do not fit the header count field"))
    })
}

/// Converts one input file into archive entries.
///
/// Encoding is a pure function of the file contents, so calling `encode`
/// again restarts the sequence. `PakError::Unsupported` skips the asset;
/// any other error aborts the archive.
pub trait Encoder: Send + Sync {
    fn encode(&self, path: &Path) -> PakResult<Vec<EncodedEntry>>;
}

/// Immutable extension -> encoder table, built once and handed to the builder.
#[derive(Clone)]
pub struct EncoderRegistry {
    by_ext: BTreeMap<String, Arc<dyn Encoder>>,
}

impl EncoderRegistry {
    pub fn empty() -> Self {
        EncoderRegistry {
            by_ext: BTreeMap::new(),
        }
    }

    /// Every encoder this crate ships, keyed by the extensions it accepts.
    pub fn standard() -> Self {
        let texture: Arc<dyn Encoder> = Arc::new(TextureEncoder);
        Self::empty()
            .with("png", texture.clone())
            .with("jpg", texture.clone())
            .with("jpeg", texture.clone())
            .with("bmp", texture)
            .with("txt", Arc::new(TextEncoder::string()))
            .with("glsl", Arc::new(TextEncoder::shader()))
            .with("obj", Arc::new(ObjEncoder))
            .with("wav", Arc::new(WavEncoder))
            .with("edan", Arc::new(EdanEncoder))
            .with("dae", Arc::new(ColladaEncoder))
    }

    pub fn with(mut self, ext: &str, encoder: Arc<dyn Encoder>) -> Self {
        self.by_ext.insert(ext.to_ascii_lowercase(), encoder);
        self
    }

    pub fn lookup(&self, path: &Path) -> Option<&dyn Encoder> {
        let ext = extension(path)?;
        self.by_ext.get(&ext).map(|e| e.as_ref())
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.by_ext.keys().map(String::as_str)
    }
}

impl fmt::Debug for EncoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.extensions()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_counts_refuse_to_truncate() {
        let p = Path::new("big.wav");
        assert_eq!(header_count::<u32>(p, 6, "samples").unwrap(), 6);
        let err = header_count::<i32>(p, usize::MAX, "bones").unwrap_err();
        assert!(matches!(err, PakError::Malformed { .. }));
        #[cfg(target_pointer_width = "64")]
        assert!(header_count::<u32>(p, u32::MAX as usize + 1, "samples").is_err());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let reg = EncoderRegistry::standard();
        assert!(reg.lookup(Path::new("res/a.PNG")).is_some());
        assert!(reg.lookup(Path::new("res/a.glsl")).is_some());
        assert!(reg.lookup(Path::new("res/a.psd")).is_none());
        assert!(reg.lookup(Path::new("res/Makefile")).is_none());
    }

    #[test]
    fn extensions_are_listed() {
        let reg = EncoderRegistry::standard();
        let exts: Vec<&str> = reg.extensions().collect();
        for want in ["png", "jpg", "txt", "glsl", "obj", "wav", "edan", "dae"] {
            assert!(exts.contains(&want), "missing {want}");
        }
    }
}
