use std::path::Path;

use image::ImageReader;

use crate::capture::domain::capture_service::CaptureError;
use crate::shared::frame::Frame;

/// Decodes an image file into an RGB [`Frame`].
///
/// The format is sniffed from the file contents rather than trusted from the
/// extension, since capture utilities don't always honour the one requested.
pub fn decode_file(path: &Path) -> Result<Frame, CaptureError> {
    let decode_err = |source| CaptureError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let rgb = reader.decode().map_err(decode_err)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::new(rgb.into_raw(), width, height, 3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_test_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let mut img = image::RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([50, 100, 200]);
        }
        img.save_with_format(&path, image::ImageFormat::Png).unwrap();
        path
    }

    #[test]
    fn test_decode_returns_rgb_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "test.png", 100, 80);
        let frame = decode_file(&path).unwrap();
        assert_eq!(frame.width(), 100);
        assert_eq!(frame.height(), 80);
        assert_eq!(frame.channels(), 3);
        assert_eq!(&frame.data()[..3], &[50, 100, 200]);
    }

    #[test]
    fn test_decode_ignores_misleading_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "capture.jpg", 20, 10);
        let frame = decode_file(&path).unwrap();
        assert_eq!((frame.width(), frame.height()), (20, 10));
    }

    #[test]
    fn test_decode_missing_file_is_io_error() {
        let result = decode_file(Path::new("/nonexistent/capture.jpg"));
        assert!(matches!(result, Err(CaptureError::Io(_))));
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();
        assert!(matches!(
            decode_file(&path),
            Err(CaptureError::Decode { .. })
        ));
    }
}
