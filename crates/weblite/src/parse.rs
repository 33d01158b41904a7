//! Body parsers: content-type-negotiated decoding of request bodies into
//! structured values.
//!
//! Parsers are checked most-recently-registered first, so installing a custom
//! parser overrides the defaults for the content types it accepts.

use bytes::Bytes;
use mime::Mime;
use serde_json::{Map, Value};

use crate::error::BoxError;

/// Decodes raw body bytes into a structured value.
pub trait BodyParser: Send + Sync {
    /// Whether this parser handles the request's content type.
    fn accepts(&self, content_type: &Mime) -> bool;

    fn parse(&self, bytes: &Bytes) -> Result<Value, BoxError>;
}

/// `application/json` (and `+json` suffixed types).
#[derive(Debug, Default)]
pub struct JsonParser;

impl BodyParser for JsonParser {
    fn accepts(&self, content_type: &Mime) -> bool {
        content_type.subtype() == mime::JSON || content_type.suffix() == Some(mime::JSON)
    }

    fn parse(&self, bytes: &Bytes) -> Result<Value, BoxError> {
        serde_json::from_slice(bytes).map_err(Into::into)
    }
}

/// `application/x-www-form-urlencoded`, decoded into a string-valued object.
/// A repeated key keeps its last occurrence.
#[derive(Debug, Default)]
pub struct FormParser;

impl BodyParser for FormParser {
    fn accepts(&self, content_type: &Mime) -> bool {
        content_type.type_() == mime::APPLICATION && content_type.subtype() == mime::WWW_FORM_URLENCODED
    }

    fn parse(&self, bytes: &Bytes) -> Result<Value, BoxError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes)?;
        let mut fields = Map::new();
        for (name, value) in pairs {
            fields.insert(name, Value::String(value));
        }
        Ok(Value::Object(fields))
    }
}

/// `text/*`, decoded as a UTF-8 string value.
#[derive(Debug, Default)]
pub struct TextParser;

impl BodyParser for TextParser {
    fn accepts(&self, content_type: &Mime) -> bool {
        content_type.type_() == mime::TEXT
    }

    fn parse(&self, bytes: &Bytes) -> Result<Value, BoxError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Value::String(text.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_parser_accepts_json_and_suffixed_types() {
        assert!(JsonParser.accepts(&mime::APPLICATION_JSON));
        assert!(JsonParser.accepts(&"application/problem+json".parse().unwrap()));
        assert!(!JsonParser.accepts(&mime::TEXT_PLAIN));
    }

    #[test]
    fn json_parser_decodes_objects() {
        let value = JsonParser.parse(&Bytes::from_static(br#"{"name":"hello","zip":"world"}"#)).unwrap();
        assert_eq!(value["name"], Value::from("hello"));
        assert_eq!(value["zip"], Value::from("world"));
    }

    #[test]
    fn form_parser_decodes_pairs_last_occurrence_wins() {
        assert!(FormParser.accepts(&mime::APPLICATION_WWW_FORM_URLENCODED));

        let value = FormParser.parse(&Bytes::from_static(b"name=hello&zip=w%C3%B6rld&name=bye")).unwrap();
        assert_eq!(value["name"], Value::from("bye"));
        assert_eq!(value["zip"], Value::from("wörld"));
    }

    #[test]
    fn text_parser_accepts_any_text_subtype() {
        assert!(TextParser.accepts(&mime::TEXT_PLAIN_UTF_8));
        assert!(TextParser.accepts(&"text/csv".parse().unwrap()));
        assert!(!TextParser.accepts(&mime::APPLICATION_JSON));

        let value = TextParser.parse(&Bytes::from_static(b"plain text")).unwrap();
        assert_eq!(value, Value::from("plain text"));
    }

    #[test]
    fn text_parser_rejects_invalid_utf8() {
        assert!(TextParser.parse(&Bytes::from_static(b"\xff\xfe")).is_err());
    }
}
