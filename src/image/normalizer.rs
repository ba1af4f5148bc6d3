use super::NormalizedImage;
use crate::models::{ImageEncoding, ImageInput, ImageSource};
use crate::{Error, Result};
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;

/// Widest image sent upstream; wider inputs are downsampled.
pub const MAX_IMAGE_WIDTH: u32 = 2048;

#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    max_width: u32,
}

impl ImageNormalizer {
    pub fn new() -> Self {
        Self {
            max_width: MAX_IMAGE_WIDTH,
        }
    }

    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width;
        self
    }

    /// Validate the declared format, downsample if needed and re-encode.
    pub fn normalize(&self, input: ImageInput) -> Result<NormalizedImage> {
        let encoding: ImageEncoding = input.format.parse()?;

        let image = match input.source {
            ImageSource::Encoded(bytes) => image::load_from_memory(&bytes)?,
            ImageSource::Pixels(image) => image,
        };

        let image = self.scale(image);
        let bytes = encode(&image, encoding)?;

        tracing::debug!(
            "Normalized image to {}x{} {} ({} bytes)",
            image.width(),
            image.height(),
            encoding,
            bytes.len()
        );

        Ok(NormalizedImage::new(
            bytes,
            image.width(),
            image.height(),
            encoding,
        ))
    }

    /// Same as [`normalize`](Self::normalize), run on the blocking pool.
    pub async fn normalize_blocking(&self, input: ImageInput) -> Result<NormalizedImage> {
        let normalizer = *self;
        tokio::task::spawn_blocking(move || normalizer.normalize(input))
            .await
            .map_err(|e| Error::Invariant(format!("Image normalization task join error: {}", e)))?
    }

    fn scale(&self, image: DynamicImage) -> DynamicImage {
        if image.width() <= self.max_width {
            return image;
        }

        let height = scaled_height(image.width(), image.height(), self.max_width);
        image.resize_exact(self.max_width, height, FilterType::Lanczos3)
    }
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Height that keeps the aspect ratio when `width` is scaled to `target_width`.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let ratio = target_width as f64 / width as f64;
    ((height as f64 * ratio).round() as u32).max(1)
}

fn encode(image: &DynamicImage, encoding: ImageEncoding) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);

    match encoding {
        // JPEG has no alpha channel
        ImageEncoding::Jpeg => {
            DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut cursor, encoding.image_format())?
        }
        ImageEncoding::Png => image.write_to(&mut cursor, encoding.image_format())?,
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

    fn create_test_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 90]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn test_small_image_keeps_dimensions() {
        let normalizer = ImageNormalizer::new();
        let input = ImageInput::encoded(create_test_image(640, 480, ImageFormat::Png), "PNG");

        let result = normalizer.normalize(input).unwrap();

        assert_eq!((result.width, result.height), (640, 480));
        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (640, 480));
    }

    #[test]
    fn test_image_at_threshold_is_untouched() {
        let normalizer = ImageNormalizer::new().with_max_width(100);
        let input = ImageInput::encoded(create_test_image(100, 37, ImageFormat::Png), "png");

        let result = normalizer.normalize(input).unwrap();
        assert_eq!((result.width, result.height), (100, 37));
    }

    #[test]
    fn test_wide_image_is_downsampled_preserving_aspect() {
        let normalizer = ImageNormalizer::new().with_max_width(200);
        let input = ImageInput::encoded(create_test_image(300, 150, ImageFormat::Jpeg), "jpeg");

        let result = normalizer.normalize(input).unwrap();

        assert_eq!((result.width, result.height), (200, 100));
        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 100));
    }

    #[test]
    fn test_default_threshold_is_2048() {
        let normalizer = ImageNormalizer::new();
        let input = ImageInput::pixels(
            DynamicImage::ImageRgb8(RgbImage::new(3000, 1500)),
            "JPEG",
        );

        let result = normalizer.normalize(input).unwrap();
        assert_eq!(result.width, MAX_IMAGE_WIDTH);
        assert_eq!(result.height, 1024);
    }

    #[test]
    fn test_scaled_height_rounds() {
        assert_eq!(scaled_height(3000, 1500, 2048), 1024);
        assert_eq!(scaled_height(3000, 1001, 2048), 683);
        assert_eq!(scaled_height(5000, 1, 2048), 1);
    }

    #[test]
    fn test_unsupported_format_is_rejected() {
        let normalizer = ImageNormalizer::new();
        let input = ImageInput::encoded(create_test_image(10, 10, ImageFormat::Png), "gif");

        let err = normalizer.normalize(input).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_undecodable_bytes_are_codec_errors() {
        let normalizer = ImageNormalizer::new();
        let input = ImageInput::encoded(b"definitely not an image".to_vec(), "png");

        let err = normalizer.normalize(input).unwrap_err();
        assert!(matches!(err, Error::ImageCodec(_)));
    }

    #[test]
    fn test_reencodes_to_declared_format() {
        let normalizer = ImageNormalizer::new();
        let input = ImageInput::encoded(create_test_image(8, 8, ImageFormat::Png), "JPEG");

        let result = normalizer.normalize(input).unwrap();

        assert_eq!(result.encoding, ImageEncoding::Jpeg);
        assert_eq!(
            image::guess_format(&result.bytes).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_rgba_pixels_encode_as_jpeg() {
        let normalizer = ImageNormalizer::new();
        let rgba = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 128]));
        let input = ImageInput::pixels(DynamicImage::ImageRgba8(rgba), "jpg");

        let result = normalizer.normalize(input).unwrap();
        assert_eq!(result.encoding, ImageEncoding::Jpeg);
    }

    #[test]
    fn test_base64_round_trip_matches_bytes() {
        let normalizer = ImageNormalizer::new();
        let input = ImageInput::encoded(create_test_image(16, 9, ImageFormat::Png), "png");

        let result = normalizer.normalize(input).unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&result.base64)
            .unwrap();

        assert_eq!(decoded, result.bytes);
        assert!(result.data_uri().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_normalize_blocking() {
        let normalizer = ImageNormalizer::new();
        let input = ImageInput::encoded(create_test_image(12, 6, ImageFormat::Png), "PNG");

        let result = normalizer.normalize_blocking(input).await.unwrap();
        assert_eq!((result.width, result.height), (12, 6));
    }
}
