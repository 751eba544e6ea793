#![forbid(unsafe_code)]

use std::path::Path;

use crate::pak::encode::{EncodedEntry, Encoder};
use crate::pak::error::{PakError, PakResult};
use crate::pak::format::AssetType;
use crate::pak::io::PayloadBuf;

/// char count, data pointer.
pub const STRING_HEADER_SIZE: usize = 16;

/// ASCII text files. Shaders use the same layout under their own tag.
#[derive(Debug, Clone, Copy)]
pub struct TextEncoder {
    kind: AssetType,
}

impl TextEncoder {
    pub fn string() -> Self {
        TextEncoder {
            kind: AssetType::String,
        }
    }

    pub fn shader() -> Self {
        TextEncoder {
            kind: AssetType::Shader,
        }
    }
}

impl Encoder for TextEncoder {
    fn encode(&self, path: &Path) -> PakResult<Vec<EncodedEntry>> {
        let raw = std::fs::read(path)?;
        Ok(vec![encode_text(path, &raw, self.kind)?])
    }
}

pub(crate) fn encode_text(path: &Path, raw: &[u8], kind: AssetType) -> PakResult<EncodedEntry> {
    if !raw.is_ascii() {
        return Err(PakError::unsupported(path, "text is not ASCII"));
    }
    // ASCII is valid UTF-8
    let text = String::from_utf8_lossy(raw)
        .replace("\r\n", "\n")
        .replace('\r', "\n");
    let text = text.trim_end();

    let count = text.len() + 1;
    let mut p = PayloadBuf::with_capacity(STRING_HEADER_SIZE + count);
    p.u64(count as u64).pointer().bytes(text.as_bytes()).pad(1);
    Ok(EncodedEntry::new(kind, p.finish()))
}
