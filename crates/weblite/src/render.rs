//! Body renderers: turning a handler's result value into response bytes.
//!
//! Renderers are checked most-recently-registered first; the first one whose
//! [`BodyRenderer::accepts`] returns `true` for the result value produces the
//! response body and content type.

use bytes::Bytes;
use mime::Mime;
use serde_json::Value;

use crate::error::BoxError;

/// Encodes a handler result value into response body bytes.
pub trait BodyRenderer: Send + Sync {
    /// Whether this renderer handles the given result value.
    fn accepts(&self, value: &Value) -> bool;

    fn render(&self, value: &Value) -> Result<Bytes, BoxError>;

    fn content_type(&self) -> Mime;
}

/// Plain-text rendering for string results.
#[derive(Debug, Default)]
pub struct TextRenderer;

impl BodyRenderer for TextRenderer {
    fn accepts(&self, value: &Value) -> bool {
        value.is_string()
    }

    fn render(&self, value: &Value) -> Result<Bytes, BoxError> {
        match value {
            Value::String(text) => Ok(Bytes::from(text.clone())),
            other => Err(format!("text renderer cannot render {other:?}").into()),
        }
    }

    fn content_type(&self) -> Mime {
        mime::TEXT_PLAIN_UTF_8
    }
}

/// JSON rendering for any result value.
#[derive(Debug, Default)]
pub struct JsonRenderer;

impl BodyRenderer for JsonRenderer {
    fn accepts(&self, _value: &Value) -> bool {
        true
    }

    fn render(&self, value: &Value) -> Result<Bytes, BoxError> {
        let encoded = serde_json::to_vec(value)?;
        Ok(Bytes::from(encoded))
    }

    fn content_type(&self) -> Mime {
        mime::APPLICATION_JSON
    }
}
