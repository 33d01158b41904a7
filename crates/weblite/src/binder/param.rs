//! Parameter descriptors declared once per handler at registration time.
//!
//! A [`ParamSpec`] stands in for what a reflective runtime would read off the
//! handler signature: the parameter name, where its raw value comes from and
//! what type it should be converted to. The binder walks the spec list in
//! declaration order and produces one argument value per spec.

use std::fmt;

use serde_json::Value;

/// Where a parameter's raw value is extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSource {
    /// The handler's owning receiver; never read from the request.
    Instance,
    /// The exchange itself; never read from the request.
    Exchange,
    /// A named capture of the route's path pattern. Always required.
    Path,
    /// A query-string value.
    Query,
    /// A named field of the parsed request body.
    BodyField,
    /// The whole parsed request body.
    BodyWhole,
    /// A request header value.
    Header,
    /// A request cookie value.
    Cookie,
    /// A value stored in the exchange by an earlier decorator. Never converted.
    Attribute,
}

impl fmt::Display for BindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Instance => "instance",
            Self::Exchange => "exchange",
            Self::Path => "path",
            Self::Query => "query",
            Self::BodyField => "body field",
            Self::BodyWhole => "body",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Attribute => "attribute",
        })
    }
}

/// The type a raw string value is converted into before it reaches the
/// handler. `String` targets bypass the converter entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TargetType {
    #[default]
    String,
    Bool,
    Int,
    Float,
    /// Pass-through for already-structured values (parsed bodies, attributes).
    Value,
}

/// One declared handler parameter: name, extraction source, target type,
/// plus optionality and an optional default.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    name: String,
    source: BindingSource,
    target: TargetType,
    required: bool,
    default: Option<Value>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, source: BindingSource, target: TargetType) -> Self {
        Self { name: name.into(), source, target, required: true, default: None }
    }

    /// A path capture. Path parameters are always required; the registration
    /// step checks the name against the route's pattern.
    pub fn path(name: impl Into<String>) -> Self {
        Self::new(name, BindingSource::Path, TargetType::String)
    }

    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name, BindingSource::Query, TargetType::String)
    }

    pub fn header(name: impl Into<String>) -> Self {
        Self::new(name, BindingSource::Header, TargetType::String)
    }

    pub fn cookie(name: impl Into<String>) -> Self {
        Self::new(name, BindingSource::Cookie, TargetType::String)
    }

    pub fn body_field(name: impl Into<String>) -> Self {
        Self::new(name, BindingSource::BodyField, TargetType::String)
    }

    /// The whole parsed body, as the configured parser produced it.
    pub fn body() -> Self {
        Self::new("body", BindingSource::BodyWhole, TargetType::Value)
    }

    pub fn attr(name: impl Into<String>) -> Self {
        Self::new(name, BindingSource::Attribute, TargetType::Value)
    }

    /// Positional placeholder for the owning receiver; binds `Null`, the
    /// receiver arrives through closure capture.
    pub fn instance() -> Self {
        Self::new("instance", BindingSource::Instance, TargetType::Value)
    }

    /// Positional placeholder for the exchange; binds `Null`, the exchange
    /// arrives as the handler's own argument.
    pub fn exchange() -> Self {
        Self::new("exchange", BindingSource::Exchange, TargetType::Value)
    }

    /// Sets the conversion target for the raw value.
    pub fn typed(mut self, target: TargetType) -> Self {
        self.target = target;
        self
    }

    /// Marks the parameter nullable: an absent value binds `Null` instead of
    /// failing.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Installs a default used when no value is present. The default is taken
    /// as-is, without invoking the converter.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> BindingSource {
        self.source
    }

    pub fn target(&self) -> TargetType {
        self.target
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthands_pick_source_and_target() {
        let spec = ParamSpec::query("page").typed(TargetType::Int);
        assert_eq!(spec.name(), "page");
        assert_eq!(spec.source(), BindingSource::Query);
        assert_eq!(spec.target(), TargetType::Int);
        assert!(spec.is_required());
        assert!(spec.default_value().is_none());
    }

    #[test]
    fn default_implies_not_required() {
        let spec = ParamSpec::query("optional").typed(TargetType::Bool).with_default(false);
        assert!(!spec.is_required());
        assert_eq!(spec.default_value(), Some(&Value::Bool(false)));
    }

    #[test]
    fn sources_display_as_request_sections() {
        assert_eq!(BindingSource::Query.to_string(), "query");
        assert_eq!(BindingSource::BodyField.to_string(), "body field");
        assert_eq!(BindingSource::Cookie.to_string(), "cookie");
    }
}
