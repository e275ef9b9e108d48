//! Upload normalization: any decodable image → RGB JPEG → standard base64.
//!
//! Providers only accept `data:image/jpeg` payloads from this service, so
//! anything that is not already a `.jpg`/`.jpeg` is re-encoded next to the
//! original. The original file is left in place; removing it is the caller's
//! job (see [`crate::staging`]).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{io::Reader as ImageReader, ImageError, ImageFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::NormalizeError;

/// Where the converted JPEG would be written, or `None` when `path` already
/// carries a JPEG extension (case-insensitive).
pub fn jpeg_target(path: &Path) -> Option<PathBuf> {
    let is_jpeg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false);

    if is_jpeg {
        None
    } else {
        Some(path.with_extension("jpg"))
    }
}

/// Decode `src` and write it to `dst` as a 3-channel JPEG.
///
/// The format is sniffed from the file contents, so a PNG uploaded as
/// `photo.gif` still decodes. Alpha and extra channels are dropped.
pub fn convert_to_jpeg(src: &Path, dst: &Path) -> Result<(), ImageError> {
    let img = ImageReader::open(src)
        .map_err(ImageError::IoError)?
        .with_guessed_format()
        .map_err(ImageError::IoError)?
        .decode()?;

    img.to_rgb8().save_with_format(dst, ImageFormat::Jpeg)?;
    debug!(src = %src.display(), dst = %dst.display(), "converted image to JPEG");
    Ok(())
}

/// Standard base64 of the file's raw bytes.
pub fn encode_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(STANDARD.encode(bytes))
}

/// Convert `path` to JPEG when needed, then base64 the JPEG bytes.
///
/// The converted file, if any, is written to [`jpeg_target`]`(path)`.
pub fn normalize(path: &Path) -> Result<String, NormalizeError> {
    let jpeg_path = match jpeg_target(path) {
        Some(target) => {
            convert_to_jpeg(path, &target).map_err(NormalizeError::Convert)?;
            target
        }
        None => path.to_path_buf(),
    };

    let encoded = encode_file(&jpeg_path).map_err(NormalizeError::Encode)?;
    debug!(path = %jpeg_path.display(), len = encoded.len(), "encoded image as base64");

    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 6, Rgba([10, 200, 30, 128])));
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }

    #[test]
    fn jpeg_target_skips_jpeg_extensions() {
        assert_eq!(jpeg_target(Path::new("a/b.jpg")), None);
        assert_eq!(jpeg_target(Path::new("a/b.JPG")), None);
        assert_eq!(jpeg_target(Path::new("a/b.jpeg")), None);
        assert_eq!(
            jpeg_target(Path::new("a/b.png")),
            Some(PathBuf::from("a/b.jpg"))
        );
        assert_eq!(jpeg_target(Path::new("a/noext")), Some(PathBuf::from("a/noext.jpg")));
    }

    #[test]
    fn png_is_converted_to_rgb_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "pixel.png");

        let encoded = normalize(&png).unwrap();
        assert!(dir.path().join("pixel.jpg").exists());
        assert!(png.exists(), "original is left for the caller to remove");

        let bytes = STANDARD.decode(&encoded).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn mislabelled_extension_is_sniffed() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "actually-png.gif");

        normalize(&png).unwrap();
        assert!(dir.path().join("actually-png.jpg").exists());
    }

    #[test]
    fn jpeg_input_is_encoded_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.JPG");
        let raw = b"not really a jpeg, but the extension says so".to_vec();
        std::fs::write(&path, &raw).unwrap();

        let encoded = normalize(&path).unwrap();
        assert_eq!(encoded, STANDARD.encode(&raw));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn corrupt_image_is_a_convert_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG garbage").unwrap();

        let err = normalize(&path).unwrap_err();
        assert!(matches!(err, NormalizeError::Convert(_)));
        assert!(err.to_string().starts_with("Error converting image:"));
    }

    #[test]
    fn missing_jpeg_is_an_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = normalize(&dir.path().join("gone.jpg")).unwrap_err();
        assert!(matches!(err, NormalizeError::Encode(_)));
    }

    #[test]
    fn base64_round_trips_arbitrary_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bytes.jpeg");
        let raw: Vec<u8> = (0..=255u8).cycle().take(1031).collect();
        std::fs::write(&path, &raw).unwrap();

        let encoded = encode_file(&path).unwrap();
        assert_eq!(STANDARD.decode(encoded).unwrap(), raw);
    }
}
