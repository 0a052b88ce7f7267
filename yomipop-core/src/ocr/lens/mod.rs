//! Remote OCR over the Lens protocol: a protobuf-encoded image upload,
//! answered with a paragraph/line/word layout tree in normalized
//! coordinates.

pub mod proto;

use std::io::Cursor;
use std::time::{Duration, Instant};

use image::imageops::FilterType;
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use prost::Message;
use tracing::{debug, info};

use super::{OcrError, OcrProvider, Paragraph, Word};
use crate::capture::Frame;
use crate::config::{ConfigHandle, QualityMode};
use crate::geometry::BoundingBox;
use crate::jp::contains_japanese;

pub const DEFAULT_ENDPOINT: &str = "https://lensfrontend-pa.googleapis.com/v1/crupload";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP-backed Lens OCR provider.
///
/// Reads the configured quality mode per scan, so a settings change
/// applies on the next trigger without rebuilding the provider.
pub struct LensOcr {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    config: ConfigHandle,
}

impl LensOcr {
    pub fn new(config: ConfigHandle, api_key: impl Into<String>) -> Result<Self, OcrError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            config,
        })
    }

    /// Point the provider at a different endpoint (tests, proxies).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn scan_inner(&self, frame: &Frame) -> Result<Vec<Paragraph>, OcrError> {
        let start = Instant::now();
        let quality = self.config.snapshot().scan.quality;
        let (image_bytes, width, height) = encode_frame(frame, quality)?;
        debug!(
            "request image encoded in {:.2}s ({} bytes)",
            start.elapsed().as_secs_f64(),
            image_bytes.len()
        );

        let request = proto::LensServerRequest {
            objects_request: Some(proto::ObjectsRequest {
                request_context: Some(proto::RequestContext {
                    request_id: Some(proto::RequestId {
                        uuid: rand::random(),
                    }),
                }),
                image_data: Some(proto::ImageData {
                    payload: Some(proto::ImagePayload { image_bytes }),
                    image_metadata: Some(proto::ImageMetadata {
                        width: width as i32,
                        height: height as i32,
                    }),
                }),
            }),
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/x-protobuf")
            .header("X-Goog-Api-Key", &self.api_key)
            .body(request.encode_to_vec())
            .send()?
            .error_for_status()?;
        let body = response.bytes()?;
        let network_secs = start.elapsed().as_secs_f64();

        let decoded = proto::LensServerResponse::decode(body.as_ref())?;
        let paragraphs = convert_response(decoded);

        if let Some(first) = paragraphs.first() {
            info!(
                "ocr complete in {:.2}s, {} paragraphs (e.g. \"{}...\")",
                network_secs,
                paragraphs.len(),
                first.full_text.chars().take(30).collect::<String>()
            );
        } else {
            info!("ocr complete in {:.2}s, no Japanese text found", network_secs);
        }

        Ok(paragraphs)
    }
}

impl OcrProvider for LensOcr {
    fn name(&self) -> &str {
        "lens"
    }

    fn scan(&self, frame: &Frame) -> Option<Vec<Paragraph>> {
        match self.scan_inner(frame) {
            Ok(paragraphs) => Some(paragraphs),
            Err(e) => {
                tracing::error!("ocr request failed: {e}");
                None
            }
        }
    }
}

/// Encode a frame for upload according to the quality mode:
/// `fast` halves the pixel count and drops color, `balanced` re-encodes
/// as JPEG, `quality` sends a lossless PNG. Returns the encoded bytes and
/// the dimensions actually sent.
pub(crate) fn encode_frame(
    frame: &Frame,
    quality: QualityMode,
) -> Result<(Vec<u8>, u32, u32), OcrError> {
    let rgb = RgbImage::from_raw(frame.width, frame.height, frame.pixels.clone())
        .ok_or_else(|| OcrError::Frame("pixel buffer does not match dimensions".to_string()))?;
    let img = DynamicImage::ImageRgb8(rgb);

    let mut buffer = Cursor::new(Vec::new());
    match quality {
        QualityMode::Fast => {
            let scale = 0.5f32.sqrt();
            let width = ((frame.width as f32 * scale) as u32).max(1);
            let height = ((frame.height as f32 * scale) as u32).max(1);
            let reduced = img.resize_exact(width, height, FilterType::Lanczos3).grayscale();
            reduced.write_to(&mut buffer, ImageOutputFormat::Png)?;
            Ok((buffer.into_inner(), width, height))
        }
        QualityMode::Balanced => {
            img.write_to(&mut buffer, ImageOutputFormat::Jpeg(90))?;
            Ok((buffer.into_inner(), frame.width, frame.height))
        }
        QualityMode::Quality => {
            img.write_to(&mut buffer, ImageOutputFormat::Png)?;
            Ok((buffer.into_inner(), frame.width, frame.height))
        }
    }
}

/// Flatten the response layout into paragraphs, dropping paragraphs with
/// no Japanese text at all.
pub(crate) fn convert_response(response: proto::LensServerResponse) -> Vec<Paragraph> {
    let Some(layout) = response
        .objects_response
        .and_then(|o| o.text)
        .and_then(|t| t.text_layout)
    else {
        return Vec::new();
    };

    let mut paragraphs = Vec::new();
    for para in layout.paragraphs {
        let has_japanese = para
            .lines
            .iter()
            .flat_map(|l| l.words.iter())
            .any(|w| contains_japanese(&w.plain_text));
        if !has_japanese {
            continue;
        }

        let mut words = Vec::new();
        for line in &para.lines {
            for word in &line.words {
                words.push(Word {
                    // stray ASCII spaces inside recognized words break
                    // character offsets
                    text: word.plain_text.chars().filter(|c| *c != ' ').collect(),
                    separator: word.text_separator.clone().unwrap_or_default(),
                    bounds: box_of(word.geometry.as_ref()),
                });
            }
        }

        let vertical = para.writing_direction == proto::WritingDirection::TopToBottom as i32;
        let paragraph = Paragraph::from_words(words, box_of(para.geometry.as_ref()), vertical);
        if paragraph.full_text.is_empty() {
            continue;
        }
        paragraphs.push(paragraph);
    }
    paragraphs
}

fn box_of(geometry: Option<&proto::Geometry>) -> BoundingBox {
    geometry
        .and_then(|g| g.bounding_box.as_ref())
        .map(|b| BoundingBox::new(b.center_x, b.center_y, b.width, b.height))
        .unwrap_or_default()
}
