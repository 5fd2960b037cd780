use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageOutputFormat};
use serde::Serialize;

use crate::genai::provider::ProviderError;

/// Format images are re-encoded to before they are attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpeg" | "jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

/// Image bytes in the fixed wire format, tagged with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// One user turn, ready to be serialized for the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub prompt: String,
    pub image: Option<EncodedImage>,
}

/// Builds a request from a prompt and optional raw image bytes in any
/// decodable format. The prompt is passed through untouched.
pub fn build(
    prompt: &str,
    image: Option<&[u8]>,
    format: ImageFormat,
) -> Result<Request, ProviderError> {
    let image = image
        .map(|bytes| reencode_image(bytes, format))
        .transpose()?;
    Ok(Request {
        prompt: prompt.to_string(),
        image,
    })
}

/// Decodes arbitrary image bytes and re-encodes them to `format`.
pub fn reencode_image(bytes: &[u8], format: ImageFormat) -> Result<EncodedImage, ProviderError> {
    let decoded = image::load_from_memory(bytes).map_err(ProviderError::Encoding)?;
    let mut buffer = Vec::new();
    let written = match format {
        ImageFormat::Png => decoded.write_to(&mut Cursor::new(&mut buffer), ImageOutputFormat::Png),
        // JPEG has no alpha channel.
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(decoded.to_rgb8())
            .write_to(&mut Cursor::new(&mut buffer), ImageOutputFormat::Jpeg(90)),
    };
    written.map_err(ProviderError::Encoding)?;
    Ok(EncodedImage {
        mime_type: format.mime_type(),
        bytes: buffer,
    })
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

impl Request {
    pub(crate) fn to_payload(&self) -> GenerateContentRequest {
        let mut parts = vec![RequestPart::Text {
            text: self.prompt.clone(),
        }];
        if let Some(image) = &self.image {
            parts.push(RequestPart::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.to_string(),
                    data: STANDARD.encode(&image.bytes),
                },
            });
        }
        GenerateContentRequest {
            contents: vec![RequestContent { parts }],
        }
    }

    /// Provider JSON body for this request.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self.to_payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use serde_json::json;

    fn sample_png() -> (RgbImage, Vec<u8>) {
        let mut img = RgbImage::new(3, 2);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([x as u8 * 40, y as u8 * 90, 200]);
        }
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img.clone())
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .expect("png should encode");
        (img, bytes)
    }

    fn sample_bmp() -> Vec<u8> {
        let img = RgbImage::from_pixel(4, 4, Rgb([12, 34, 56]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Bmp)
            .expect("bmp should encode");
        bytes
    }

    #[test]
    fn text_only_request_has_a_single_text_part() {
        let request = build("What is Rust?", None, ImageFormat::Png).expect("build");
        assert_eq!(
            request.to_json().expect("request serializes"),
            json!({"contents": [{"parts": [{"text": "What is Rust?"}]}]})
        );
    }

    #[test]
    fn empty_prompt_is_passed_through() {
        let request = build("", None, ImageFormat::Png).expect("build");
        assert_eq!(request.prompt, "");
        let body = request.to_json().expect("request serializes");
        assert_eq!(body["contents"][0]["parts"][0]["text"], json!(""));
    }

    #[test]
    fn image_request_round_trips_pixels_through_inline_data() {
        let (original, bytes) = sample_png();
        let request = build("describe", Some(bytes.as_slice()), ImageFormat::Png).expect("build");
        let body = request.to_json().expect("request serializes");
        let parts = body["contents"][0]["parts"]
            .as_array()
            .expect("parts should be an array");

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], json!("describe"));
        assert_eq!(parts[1]["inline_data"]["mime_type"], json!("image/png"));

        let data = parts[1]["inline_data"]["data"].as_str().expect("data");
        let decoded = STANDARD.decode(data).expect("valid base64");
        let round_tripped = image::load_from_memory(&decoded).expect("decodable png");
        assert_eq!(round_tripped.to_rgb8(), original);
    }

    #[test]
    fn other_formats_are_reencoded_to_the_fixed_format() {
        let request = build("x", Some(sample_bmp().as_slice()), ImageFormat::Jpeg).expect("build");
        let image = request.image.expect("image attached");
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(
            image::guess_format(&image.bytes).expect("known format"),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn undecodable_image_is_an_encoding_error() {
        let err = build("x", Some(&b"not an image"[..]), ImageFormat::Png).unwrap_err();
        assert!(matches!(err, ProviderError::Encoding(_)));
    }

    #[test]
    fn image_format_parse_accepts_aliases() {
        assert_eq!(ImageFormat::parse("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::parse("jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::parse("gif"), None);
    }
}
