//! Error taxonomy for registration, binding and dispatch, plus the final
//! error-to-response translation.
//!
//! Registration problems ([`PatternError`]) are fatal and surface as `Result`
//! from the registration calls. Everything per-request funnels into
//! [`DispatchError`]; the [`ErrorHandler`] installed on the router turns the
//! ones no decorator intercepted into a terminal response.

use bytes::Bytes;
use http::header::{self, HeaderValue};
use http::{Method, Response, StatusCode};
use thiserror::Error;

use crate::binder::BindingSource;

/// Boxed application error, the payload of handler failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Rejections raised while compiling a path template or registering a route.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("duplicate placeholder :{name} in template {template:?}")]
    DuplicatePlaceholder { name: String, template: String },

    #[error("empty placeholder name in template {template:?}")]
    EmptyPlaceholder { template: String },

    #[error("path parameter {name:?} matches no placeholder in template {template:?}")]
    UnknownPlaceholder { name: String, template: String },
}

impl PatternError {
    pub fn duplicate_placeholder<S: ToString>(name: S, template: S) -> Self {
        Self::DuplicatePlaceholder { name: name.to_string(), template: template.to_string() }
    }

    pub fn empty_placeholder<S: ToString>(template: S) -> Self {
        Self::EmptyPlaceholder { template: template.to_string() }
    }

    pub fn unknown_placeholder<S: ToString>(name: S, template: S) -> Self {
        Self::UnknownPlaceholder { name: name.to_string(), template: template.to_string() }
    }
}

/// Failures while binding request data into handler arguments.
///
/// Binding is all-or-nothing: the first failure aborts the bind and the
/// handler body is never invoked.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("missing path parameter: {name}")]
    MissingPathParam { name: String },

    // plain data, not a cause: a field named `source` would become Error::source()
    #[error("missing required {from} parameter: {name}")]
    MissingRequiredParam { name: String, from: BindingSource },

    #[error("cannot convert parameter {name} from {raw:?}: {source}")]
    TypeConversion {
        name: String,
        raw: String,
        #[source]
        source: BoxError,
    },

    #[error("no body parser accepts content type {content_type:?}")]
    UnsupportedMediaType { content_type: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },
}

impl BindingError {
    pub fn missing_path_param<S: ToString>(name: S) -> Self {
        Self::MissingPathParam { name: name.to_string() }
    }

    pub fn missing_required<S: ToString>(name: S, from: BindingSource) -> Self {
        Self::MissingRequiredParam { name: name.to_string(), from }
    }

    pub fn type_conversion<S: ToString, E: Into<BoxError>>(name: S, raw: S, source: E) -> Self {
        Self::TypeConversion { name: name.to_string(), raw: raw.to_string(), source: source.into() }
    }

    pub fn unsupported_media_type<S: ToString>(content_type: S) -> Self {
        Self::UnsupportedMediaType { content_type: content_type.to_string() }
    }

    pub fn invalid_body<S: ToString>(reason: S) -> Self {
        Self::InvalidBody { reason: reason.to_string() }
    }
}

/// Everything a dispatch can fail with, from route lookup to rendering.
///
/// Decorators see these first and may translate or swallow them; whatever
/// escapes the chain reaches the router's [`ErrorHandler`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no route for {method} {path}")]
    RouteNotFound { method: Method, path: String },

    #[error("binding error: {source}")]
    Binding {
        #[from]
        source: BindingError,
    },

    #[error("handler error: {source}")]
    Handler {
        #[from]
        source: BoxError,
    },

    /// Deliberate short-circuit with an explicit status, the way a guard
    /// decorator refuses a request.
    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("no body renderer accepts the handler result")]
    NoRenderer,

    #[error("render error: {source}")]
    Render {
        #[source]
        source: BoxError,
    },
}

impl DispatchError {
    pub fn route_not_found<S: ToString>(method: &Method, path: S) -> Self {
        Self::RouteNotFound { method: method.clone(), path: path.to_string() }
    }

    pub fn handler<E: Into<BoxError>>(e: E) -> Self {
        Self::Handler { source: e.into() }
    }

    pub fn status<S: ToString>(status: StatusCode, message: S) -> Self {
        Self::Status { status, message: message.to_string() }
    }

    pub fn bad_request<S: ToString>(message: S) -> Self {
        Self::status(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized<S: ToString>(message: S) -> Self {
        Self::status(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden<S: ToString>(message: S) -> Self {
        Self::status(StatusCode::FORBIDDEN, message)
    }

    pub fn render<E: Into<BoxError>>(e: E) -> Self {
        Self::Render { source: e.into() }
    }

    /// Status the default translation answers with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Binding { source: BindingError::UnsupportedMediaType { .. } } => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            Self::Binding { .. } => StatusCode::BAD_REQUEST,
            Self::Status { status, .. } => *status,
            Self::Handler { .. } | Self::NoRenderer | Self::Render { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Final error-to-response translation, swappable on the router.
pub trait ErrorHandler: Send + Sync {
    fn to_response(&self, error: &DispatchError) -> Response<Bytes>;
}

/// Plain-text translation using [`DispatchError::status_code`].
#[derive(Debug, Default)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn to_response(&self, error: &DispatchError) -> Response<Bytes> {
        let message = match error {
            DispatchError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        };
        let mut response = Response::new(Bytes::from(message));
        *response.status_mut() = error.status_code();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        response
    }
}
