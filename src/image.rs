//! Image boundary: load, validate, and encode container photos.
//!
//! The file is decoded once up front so an unreadable or truncated image
//! fails fast, before any model call is paid for. What goes over the wire is
//! the original bytes as a base64 data URL, not the decoded pixels.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use image::ImageFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("image file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unrecognized image format: {}", .0.display())]
    UnknownFormat(PathBuf),

    #[error("invalid image file: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read and decode-validate an image file, returning its raw bytes and
/// detected format.
pub fn load_image(path: &Path) -> Result<(Vec<u8>, ImageFormat), ImageError> {
    if !path.exists() {
        return Err(ImageError::NotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    let format = image::guess_format(&bytes)
        .map_err(|_| ImageError::UnknownFormat(path.to_path_buf()))?;
    image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| ImageError::Decode(e.to_string()))?;

    Ok((bytes, format))
}

/// Encode image bytes as a base64 data URL for the chat API.
pub fn to_data_url(bytes: &[u8], format: ImageFormat) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{};base64,{encoded}", format.to_mime_type())
}

/// Load, validate, and encode in one step.
pub fn load_as_data_url(path: &Path) -> Result<String, ImageError> {
    let (bytes, format) = load_image(path)?;
    Ok(to_data_url(&bytes, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Smallest well-formed 1x1 grayscale PNG.
    fn tiny_png() -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        let img = image::GrayImage::from_pixel(1, 1, image::Luma([128u8]));
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn loads_and_detects_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("container.png");
        std::fs::write(&path, tiny_png()).unwrap();

        let (bytes, format) = load_image(&path).unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert!(!bytes.is_empty());
    }

    #[test]
    fn missing_file_is_not_found() {
        let result = load_image(Path::new("/nonexistent/container.jpeg"));
        assert!(matches!(result, Err(ImageError::NotFound(_))));
    }

    #[test]
    fn non_image_bytes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_an_image.jpeg");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"definitely not an image").unwrap();

        let result = load_image(&path);
        assert!(matches!(result, Err(ImageError::UnknownFormat(_))));
    }

    #[test]
    fn truncated_image_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truncated.png");
        let mut bytes = tiny_png();
        bytes.truncate(20); // keep the magic, drop the data
        std::fs::write(&path, &bytes).unwrap();

        let result = load_image(&path);
        assert!(matches!(result, Err(ImageError::Decode(_))));
    }

    #[test]
    fn data_url_carries_mime_and_base64() {
        let url = to_data_url(b"abc", ImageFormat::Jpeg);
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert!(url.ends_with("YWJj"));
    }

    #[test]
    fn load_as_data_url_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.png");
        std::fs::write(&path, tiny_png()).unwrap();

        let url = load_as_data_url(&path).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }
}
