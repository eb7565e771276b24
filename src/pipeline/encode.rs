//! Image encoding: `DynamicImage` → base64 JPEG wrapped in [`PageImage`].
//!
//! The generateContent API takes images as inline base64 parts. Pages are
//! JPEG-encoded: a ~1500 px wide resume page is a few hundred KB as JPEG and
//! several MB as PNG, and a multi-page resume travels in a single request.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

pub const JPEG_MIME: &str = "image/jpeg";

/// JPEG quality for rendered pages. Text stays legible to the model at this level.
pub const JPEG_QUALITY: u8 = 90;

/// One rendered page ready for transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub mime_type: String,
    /// Base64 (standard alphabet, padded) image bytes.
    pub data: String,
}

impl PageImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// `data:{mime};base64,{data}`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Encode a rasterised page as base64 JPEG.
///
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn encode_page(img: &DynamicImage) -> Result<PageImage, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(PageImage::new(JPEG_MIME, b64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let page = encode_page(&img).expect("encode should succeed");
        assert_eq!(page.mime_type, "image/jpeg");

        let decoded = STANDARD.decode(&page.data).expect("valid base64");
        // JPEG SOI marker
        assert_eq!(&decoded[..2], &[0xFF, 0xD8]);

        let back = image::load_from_memory(&decoded).expect("decodable jpeg");
        assert_eq!((back.width(), back.height()), (10, 10));
    }

    #[test]
    fn data_uri_format() {
        let page = PageImage::new("image/jpeg", "QUJD");
        assert_eq!(page.data_uri(), "data:image/jpeg;base64,QUJD");
    }
}
