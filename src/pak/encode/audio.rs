#![forbid(unsafe_code)]

use std::path::Path;

use hound::{SampleFormat, WavReader};

use crate::pak::encode::{header_count, EncodedEntry, Encoder};
use crate::pak::error::{PakError, PakResult};
use crate::pak::format::AssetType;
use crate::pak::io::PayloadBuf;

/// channels, sample rate, sample count, pad, data pointer.
pub const SOUND_HEADER_SIZE: usize = 24;

/// PCM `.wav` files, converted to interleaved f32 samples centred on zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavEncoder;

impl Encoder for WavEncoder {
    fn encode(&self, path: &Path) -> PakResult<Vec<EncodedEntry>> {
        let reader = WavReader::open(path).map_err(|e| hound_error(path, e))?;
        let spec = reader.spec();

        if spec.channels != 1 && spec.channels != 2 {
            return Err(PakError::malformed(
                path,
                format!("unsupported number of channels ({})", spec.channels),
            ));
        }
        if spec.sample_format != SampleFormat::Int {
            return Err(PakError::malformed(path, "floating point samples are not supported"));
        }
        if !matches!(spec.bits_per_sample, 8 | 16 | 32) {
            return Err(PakError::malformed(
                path,
                format!("unsupported bit depth {}", spec.bits_per_sample),
            ));
        }

        let samples = reader
            .into_samples::<i32>()
            .collect::<Result<Vec<i32>, _>>()
            .map_err(|e| hound_error(path, e))?;

        let count = header_count::<u32>(path, samples.len(), "samples")?;
        let mut p = PayloadBuf::with_capacity(SOUND_HEADER_SIZE + samples.len() * 4);
        p.u32(u32::from(spec.channels))
            .u32(spec.sample_rate)
            .u32(count)
            .pad(4)
            .pointer();
        for s in samples {
            p.f32(normalize(s, spec.bits_per_sample));
        }
        Ok(vec![EncodedEntry::new(AssetType::Sound, p.finish())])
    }
}

fn hound_error(path: &Path, e: hound::Error) -> PakError {
    match e {
        hound::Error::IoError(io) => PakError::Io(io),
        other => PakError::malformed(path, other.to_string()),
    }
}

/// 8-bit WAV data is unsigned: scale by `2^8 - 1` and shift down by 0.5.
/// Wider samples are signed: scale by `2^(N-1) - 1`.
///
/// The 8-bit reader already re-centred the byte by -128, so it is undone
/// here to recover the stored unsigned value.
pub(crate) fn normalize(sample: i32, bits: u16) -> f32 {
    let v = f64::from(sample);
    let out = if bits == 8 {
        (v + 128.0) / 255.0 - 0.5
    } else {
        v / ((1u64 << (bits - 1)) - 1) as f64
    };
    out as f32
}
