use image::imageops::{self, FilterType};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Side length of the images the digit models are trained on.
pub const IMAGE_SIDE: u32 = 28;

/// One element of a request batch, as handed over by the serving host.
///
/// Hosts put the raw request bytes either under `data` or under `body`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestItem {
    pub data: Option<Vec<u8>>,
    pub body: Option<Vec<u8>>,
}

impl RequestItem {
    pub fn data(bytes: impl Into<Vec<u8>>) -> Self {
        RequestItem {
            data: Some(bytes.into()),
            body: None,
        }
    }

    pub fn body(bytes: impl Into<Vec<u8>>) -> Self {
        RequestItem {
            data: None,
            body: Some(bytes.into()),
        }
    }

    /// The request bytes: `data` when set, `body` otherwise.
    pub fn payload(&self) -> Option<&[u8]> {
        self.data.as_deref().or(self.body.as_deref())
    }
}

/// The JSON document carried by a request.
#[derive(Debug, Deserialize, Serialize)]
pub struct ImagePayload {
    /// Nested numeric array holding one greyscale image
    pub data: Value,
}

impl ImagePayload {
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw)?;
        Ok(serde_json::from_str(text)?)
    }
}

/// Turn a decoded picture into request bytes: greyscale, 28x28, pixels
/// scaled to `[0, 1]` and laid out as a single 784 wide row.
pub fn encode_image(image: &DynamicImage) -> Result<Vec<u8>> {
    let grey = image.to_luma8();
    let resized = imageops::resize(&grey, IMAGE_SIDE, IMAGE_SIDE, FilterType::Triangle);

    let row: Vec<f32> = resized
        .into_raw()
        .iter()
        .map(|x| *x as f32 / 255f32)
        .collect();

    let payload = ImagePayload {
        data: serde_json::json!([row]),
    };

    Ok(serde_json::to_vec(&payload)?)
}

/// Decode an image file held in memory and encode it as request bytes.
pub fn encode_image_bytes(raw: &[u8]) -> Result<Vec<u8>> {
    let image = image::load_from_memory(raw).map_err(Error::Image)?;
    encode_image(&image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn data_takes_precedence_over_body() {
        let item = RequestItem {
            data: Some(b"from data".to_vec()),
            body: Some(b"from body".to_vec()),
        };
        assert_eq!(item.payload(), Some(&b"from data"[..]));
    }

    #[test]
    fn body_is_the_fallback() {
        assert_eq!(RequestItem::body("x").payload(), Some(&b"x"[..]));
        assert_eq!(RequestItem::default().payload(), None);
    }

    #[test]
    fn payload_requires_data_key() {
        let err = ImagePayload::from_bytes(br#"{"pixels": [1, 2]}"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn payload_rejects_invalid_utf8() {
        let err = ImagePayload::from_bytes(&[0xff, 0xfe, 0x7b]).unwrap_err();
        assert!(matches!(err, Error::Utf8(_)));
    }

    #[test]
    fn encoded_image_is_one_scaled_row() {
        let mut img = GrayImage::new(56, 56);
        for pixel in img.pixels_mut() {
            *pixel = Luma([255]);
        }

        let raw = encode_image(&DynamicImage::ImageLuma8(img)).unwrap();
        let payload = ImagePayload::from_bytes(&raw).unwrap();
        let rows = payload.data.as_array().unwrap();

        assert_eq!(rows.len(), 1);
        let row = rows[0].as_array().unwrap();
        assert_eq!(row.len(), (IMAGE_SIDE * IMAGE_SIDE) as usize);
        assert!(row.iter().all(|v| (v.as_f64().unwrap() - 1.0).abs() < 1e-6));
    }

    #[test]
    fn undecodable_image_is_an_error() {
        assert!(matches!(
            encode_image_bytes(b"definitely not a png"),
            Err(Error::Image(_))
        ));
    }
}
