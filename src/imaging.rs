//! Splitting a 2x2 contact sheet into its four images.

use crate::error::{Result, StudioError};
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

/// One quarter of a contact sheet, re-encoded as PNG.
#[derive(Debug, Clone)]
pub struct Quadrant {
    /// 1-based position: top-left, top-right, bottom-left, bottom-right.
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Cuts `bytes` into four equal quadrants in row-major order.
///
/// Each quadrant is `floor(W/2) x floor(H/2)`; with odd dimensions the last
/// row or column of pixels is dropped.
pub fn split_into_quadrants(bytes: &[u8]) -> Result<Vec<Quadrant>> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| StudioError::Partition(format!("unable to read image dimensions: {}", e)))?;

    let (width, height) = image.dimensions();
    let half_width = width / 2;
    let half_height = height / 2;
    if half_width == 0 || half_height == 0 {
        return Err(StudioError::Partition(format!(
            "image of {}x{} is too small to split",
            width, height
        )));
    }

    let origins = [
        (0, 0),
        (half_width, 0),
        (0, half_height),
        (half_width, half_height),
    ];

    origins
        .iter()
        .zip(1u32..)
        .map(|(&(x, y), index)| {
            let cropped = image.crop_imm(x, y, half_width, half_height);
            Ok(Quadrant {
                index,
                width: half_width,
                height: half_height,
                png: encode_png(&cropped)?,
            })
        })
        .collect()
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| StudioError::Partition(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    const COLORS: [[u8; 3]; 4] = [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 0]];

    /// A contact sheet whose quadrants are filled with distinct colors.
    fn contact_sheet(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let col = usize::from(x >= width / 2);
            let row = usize::from(y >= height / 2);
            Rgb(COLORS[row * 2 + col])
        });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn square_sheet_splits_into_equal_quadrants() {
        let quadrants = split_into_quadrants(&contact_sheet(100, 100)).unwrap();

        assert_eq!(quadrants.len(), 4);
        for (i, quadrant) in quadrants.iter().enumerate() {
            assert_eq!(quadrant.index, i as u32 + 1);
            let decoded = image::load_from_memory(&quadrant.png).unwrap();
            assert_eq!(decoded.dimensions(), (50, 50));
            assert_eq!((quadrant.width, quadrant.height), (50, 50));
        }
    }

    #[test]
    fn quadrants_are_row_major() {
        let quadrants = split_into_quadrants(&contact_sheet(64, 48)).unwrap();

        for (quadrant, expected) in quadrants.iter().zip(COLORS) {
            let decoded = image::load_from_memory(&quadrant.png).unwrap().to_rgb8();
            assert_eq!(decoded.get_pixel(0, 0).0, expected);
            assert_eq!(decoded.get_pixel(31, 23).0, expected);
        }
    }

    #[test]
    fn odd_dimensions_drop_the_last_row_and_column() {
        let quadrants = split_into_quadrants(&contact_sheet(101, 75)).unwrap();

        for quadrant in &quadrants {
            let decoded = image::load_from_memory(&quadrant.png).unwrap();
            assert_eq!(decoded.dimensions(), (50, 37));
        }
    }

    #[test]
    fn garbage_bytes_fail() {
        let err = split_into_quadrants(b"definitely not an image").unwrap_err();
        assert!(matches!(err, StudioError::Partition(_)));
    }

    #[test]
    fn single_pixel_fails() {
        let err = split_into_quadrants(&contact_sheet(1, 1)).unwrap_err();
        assert!(matches!(err, StudioError::Partition(_)));
    }
}
