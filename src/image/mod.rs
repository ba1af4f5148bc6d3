//! Image normalization for transport
//!
//! Decodes the caller's image, downsamples anything wider than the model
//! needs, and re-encodes it to JPEG or PNG ready for a data URI.

pub mod normalizer;

pub use normalizer::{ImageNormalizer, MAX_IMAGE_WIDTH};

use crate::models::ImageEncoding;
use base64::Engine as _;

/// A re-encoded image plus its base64 form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub base64: String,
    pub width: u32,
    pub height: u32,
    pub encoding: ImageEncoding,
}

impl NormalizedImage {
    pub fn new(bytes: Vec<u8>, width: u32, height: u32, encoding: ImageEncoding) -> Self {
        let base64 = base64::engine::general_purpose::STANDARD.encode(&bytes);
        Self {
            bytes,
            base64,
            width,
            height,
            encoding,
        }
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.encoding.mime(), self.base64)
    }
}
