//! Wire messages for the Lens OCR service.
//!
//! Hand-derived prost messages covering the subset of the protocol the
//! provider actually touches: image upload on the request side, the text
//! layout tree on the response side. Unknown fields are skipped by prost,
//! so the server may send far more than is modeled here.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LensServerRequest {
    #[prost(message, optional, tag = "1")]
    pub objects_request: Option<ObjectsRequest>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ObjectsRequest {
    #[prost(message, optional, tag = "1")]
    pub request_context: Option<RequestContext>,
    #[prost(message, optional, tag = "3")]
    pub image_data: Option<ImageData>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestContext {
    #[prost(message, optional, tag = "1")]
    pub request_id: Option<RequestId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestId {
    #[prost(uint64, tag = "1")]
    pub uuid: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImageData {
    #[prost(message, optional, tag = "1")]
    pub payload: Option<ImagePayload>,
    #[prost(message, optional, tag = "3")]
    pub image_metadata: Option<ImageMetadata>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImagePayload {
    #[prost(bytes = "vec", tag = "1")]
    pub image_bytes: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImageMetadata {
    #[prost(int32, tag = "1")]
    pub width: i32,
    #[prost(int32, tag = "2")]
    pub height: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LensServerResponse {
    #[prost(message, optional, tag = "2")]
    pub objects_response: Option<ObjectsResponse>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ObjectsResponse {
    #[prost(message, optional, tag = "2")]
    pub text: Option<Text>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Text {
    #[prost(message, optional, tag = "1")]
    pub text_layout: Option<TextLayout>,
    #[prost(string, tag = "2")]
    pub content_language: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TextLayout {
    #[prost(message, repeated, tag = "1")]
    pub paragraphs: Vec<TextParagraph>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TextParagraph {
    #[prost(message, repeated, tag = "1")]
    pub lines: Vec<TextLine>,
    #[prost(message, optional, tag = "2")]
    pub geometry: Option<Geometry>,
    #[prost(enumeration = "WritingDirection", tag = "3")]
    pub writing_direction: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TextLine {
    #[prost(message, repeated, tag = "1")]
    pub words: Vec<TextWord>,
    #[prost(message, optional, tag = "2")]
    pub geometry: Option<Geometry>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TextWord {
    #[prost(string, tag = "1")]
    pub plain_text: String,
    #[prost(string, optional, tag = "2")]
    pub text_separator: Option<String>,
    #[prost(message, optional, tag = "3")]
    pub geometry: Option<Geometry>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Geometry {
    #[prost(message, optional, tag = "1")]
    pub bounding_box: Option<CenterRotatedBox>,
}

/// Normalized, center-based box. `rotation_z` is reported by the service
/// but rotation is not modeled downstream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CenterRotatedBox {
    #[prost(float, tag = "1")]
    pub center_x: f32,
    #[prost(float, tag = "2")]
    pub center_y: f32,
    #[prost(float, tag = "3")]
    pub width: f32,
    #[prost(float, tag = "4")]
    pub height: f32,
    #[prost(float, tag = "5")]
    pub rotation_z: f32,
    #[prost(enumeration = "CoordinateType", tag = "6")]
    pub coordinate_type: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum WritingDirection {
    LeftToRight = 0,
    RightToLeft = 1,
    TopToBottom = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CoordinateType {
    Unspecified = 0,
    Normalized = 1,
    Image = 2,
}
