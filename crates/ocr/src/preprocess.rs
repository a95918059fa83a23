use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to decode page image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Decode a page image (PNG / JPEG / TIFF / …), normalize it and return PNG
/// bytes ready for recognition.
pub fn prepare_page(data: &[u8], max_dimension: u32) -> Result<Vec<u8>, PreprocessError> {
    let img = image::load_from_memory(data)?;
    encode_as_png(normalize(img, max_dimension))
}

/// Down-scale past `max_dimension` (A4 at 300 DPI is 2480×3508), then
/// grayscale and contrast stretch.
fn normalize(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let img = if img.width() > max_dimension || img.height() > max_dimension {
        img.resize(max_dimension, max_dimension, image::imageops::FilterType::Lanczos3)
    } else {
        img
    };

    let gray: GrayImage = img.to_luma8();
    let (min_px, max_px) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(mn, mx), p| (mn.min(p[0]), mx.max(p[0])));

    if max_px <= min_px {
        return DynamicImage::ImageLuma8(gray);
    }

    let range = u32::from(max_px - min_px);
    let stretched: GrayImage = ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let p = gray.get_pixel(x, y)[0];
        Luma([(u32::from(p - min_px) * 255 / range) as u8])
    });

    DynamicImage::ImageLuma8(stretched)
}

fn encode_as_png(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}
