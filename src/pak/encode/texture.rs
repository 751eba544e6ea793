#![forbid(unsafe_code)]

use std::path::Path;

use image::{DynamicImage, ImageError};

use crate::pak::encode::{EncodedEntry, Encoder};
use crate::pak::error::{PakError, PakResult};
use crate::pak::format::AssetType;
use crate::pak::io::PayloadBuf;

/// width, height, channels, pad, data pointer.
pub const TEXTURE_HEADER_SIZE: usize = 24;

/// Raster images as tightly packed 8-bit RGB or RGBA rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureEncoder;

impl Encoder for TextureEncoder {
    fn encode(&self, path: &Path) -> PakResult<Vec<EncodedEntry>> {
        let img = image::open(path).map_err(|e| match e {
            ImageError::IoError(io) => PakError::Io(io),
            other => PakError::unsupported(path, other.to_string()),
        })?;
        Ok(vec![encode_image(path, &img)?])
    }
}

pub(crate) fn encode_image(path: &Path, img: &DynamicImage) -> PakResult<EncodedEntry> {
    let (width, height, channels, pixels) = match img {
        DynamicImage::ImageRgb8(buf) => (buf.width(), buf.height(), 3u32, buf.as_raw()),
        DynamicImage::ImageRgba8(buf) => (buf.width(), buf.height(), 4u32, buf.as_raw()),
        other => {
            return Err(PakError::unsupported(
                path,
                format!("pixel format {:?} not supported", other.color()),
            ))
        }
    };

    let mut p = PayloadBuf::with_capacity(TEXTURE_HEADER_SIZE + pixels.len());
    p.u32(width).u32(height).u32(channels).pad(4).pointer().bytes(pixels);
    Ok(EncodedEntry::new(AssetType::Texture, p.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage, RgbaImage};

    #[test]
    fn rgb_pixels_are_row_major() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        img.put_pixel(1, 0, image::Rgb([0, 255, 0]));
        let entry = encode_image(Path::new("t.png"), &DynamicImage::ImageRgb8(img)).unwrap();

        assert_eq!(entry.kind, AssetType::Texture);
        let b = &entry.payload;
        assert_eq!(&b[0..4], &2u32.to_le_bytes());
        assert_eq!(&b[4..8], &1u32.to_le_bytes());
        assert_eq!(&b[8..12], &3u32.to_le_bytes());
        assert_eq!(&b[TEXTURE_HEADER_SIZE..], &[255, 0, 0, 0, 255, 0]);
    }

    #[test]
    fn rgba_length_is_derivable() {
        let img = RgbaImage::new(3, 5);
        let entry = encode_image(Path::new("t.png"), &DynamicImage::ImageRgba8(img)).unwrap();
        assert_eq!(entry.payload.len(), TEXTURE_HEADER_SIZE + 3 * 5 * 4);
    }

    #[test]
    fn grayscale_is_skipped() {
        let img = GrayImage::new(1, 1);
        let err = encode_image(Path::new("g.png"), &DynamicImage::ImageLuma8(img)).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn decodes_png_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("px.png");
        RgbaImage::from_pixel(1, 1, image::Rgba([1, 2, 3, 4])).save(&path).unwrap();

        let entries = TextureEncoder.encode(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(&entries[0].payload[TEXTURE_HEADER_SIZE..], &[1, 2, 3, 4]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = TextureEncoder.encode(Path::new("/nonexistent/px.png")).unwrap_err();
        assert!(matches!(err, PakError::Io(_)));
    }
}
