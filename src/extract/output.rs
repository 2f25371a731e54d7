//! Output file naming and PNG persistence.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use image::{ImageError, ImageFormat, RgbImage};

use crate::error::{Error, Result};

/// File name of the `ordinal`-th new image on `page` (both 1-indexed).
pub fn image_file_name(page: u32, ordinal: u32) -> String {
    format!("page_{}_image_{}.png", page, ordinal)
}

/// Create the output directory and any missing parents.
pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::filesystem(dir, e))
}

/// Write an RGB image as PNG, replacing any existing file.
pub fn save_png(image: &RgbImage, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::filesystem(path, e))?;
    let mut writer = BufWriter::new(file);

    image
        .write_to(&mut writer, ImageFormat::Png)
        .map_err(|e| match e {
            ImageError::IoError(io) => Error::filesystem(path, io),
            other => Error::ImageEncode {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })?;

    writer.flush().map_err(|e| Error::filesystem(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::TempDir;

    #[test]
    fn test_image_file_name() {
        assert_eq!(image_file_name(1, 1), "page_1_image_1.png");
        assert_eq!(image_file_name(12, 3), "page_12_image_3.png");
    }

    #[test]
    fn test_save_png_round_trips_pixels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(image_file_name(1, 1));
        let img = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));

        save_png(&img, &path).unwrap();

        let loaded = image::open(&path).unwrap();
        assert_eq!(loaded.color(), image::ColorType::Rgb8);
        assert_eq!(loaded.to_rgb8(), img);
    }

    #[test]
    fn test_save_png_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.png");
        fs::write(&path, b"stale").unwrap();
        save_png(&RgbImage::new(1, 1), &path).unwrap();
        assert!(image::open(&path).is_ok());
    }

    #[test]
    fn test_save_png_missing_dir_is_filesystem_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.png");
        let err = save_png(&RgbImage::new(1, 1), &path).unwrap_err();
        assert!(matches!(err, Error::Filesystem { .. }));
    }

    #[test]
    fn test_ensure_output_dir_nested() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_output_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_output_dir(&nested).unwrap();
    }
}
