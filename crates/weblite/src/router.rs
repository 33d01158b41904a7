//! The router: registration, decorator composition at add time, and the
//! dispatch pipeline from request to rendered response.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::HeaderValue;
use http::{Method, Request, Response, StatusCode, header};
use http_body::Body;
use mime::Mime;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::binder::{
    BindingHandler, BindingSource, BoundHandler, DefaultConverter, ParamSpec, TypeConverter,
};
use crate::body::BodyHandle;
use crate::decorator::{Decorator, compose};
use crate::error::{BoxError, DefaultErrorHandler, DispatchError, ErrorHandler, PatternError};
use crate::exchange::Exchange;
use crate::handler::Handler;
use crate::parse::{BodyParser, FormParser, JsonParser, TextParser};
use crate::pattern::PathPattern;
use crate::render::{BodyRenderer, JsonRenderer, TextRenderer};
use crate::route::{Route, RouteTable};

/// Routes requests to handlers.
///
/// Configuration is all mutation-before-serving: decorators, renderers,
/// parsers and the converter are captured into each route (or each dispatch)
/// at the moment of use, so decorators added after a route never retrofit
/// onto it. Dispatch itself takes `&self` and owns no per-request state, so
/// any number of requests can be in flight at once.
pub struct Router {
    prefix: String,
    table: RouteTable,
    decorators: Vec<Arc<dyn Decorator>>,
    renderers: Vec<Arc<dyn BodyRenderer>>,
    parsers: Vec<Arc<dyn BodyParser>>,
    converter: Arc<dyn TypeConverter>,
    error_handler: Box<dyn ErrorHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    /// A router answering only under `prefix`. The prefix is stripped before
    /// pattern matching; a request outside it is unroutable.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            table: RouteTable::new(),
            decorators: Vec::new(),
            renderers: vec![Arc::new(TextRenderer), Arc::new(JsonRenderer)],
            parsers: vec![Arc::new(JsonParser), Arc::new(FormParser), Arc::new(TextParser)],
            converter: Arc::new(DefaultConverter),
            error_handler: Box::new(DefaultErrorHandler),
        }
    }

    /// Adds a decorator applied to every route registered after this call.
    pub fn decorate(&mut self, decorator: impl Decorator + 'static) {
        self.decorators.push(Arc::new(decorator));
    }

    /// Registers a renderer. The most recently registered renderer is
    /// consulted first.
    pub fn renderer(&mut self, renderer: impl BodyRenderer + 'static) {
        self.renderers.insert(0, Arc::new(renderer));
    }

    /// Registers a body parser. The most recently registered parser is
    /// consulted first.
    pub fn parser(&mut self, parser: impl BodyParser + 'static) {
        self.parsers.insert(0, Arc::new(parser));
    }

    /// Replaces the string-to-type converter used by bound routes registered
    /// after this call.
    pub fn converter(&mut self, converter: impl TypeConverter + 'static) {
        self.converter = Arc::new(converter);
    }

    /// Replaces the translation of errors escaping the chain into responses.
    pub fn error_handler(&mut self, handler: impl ErrorHandler + 'static) {
        self.error_handler = Box::new(handler);
    }

    /// Registers `handler` under `template`, relative to the router prefix.
    pub fn add(
        &mut self,
        method: Method,
        template: &str,
        handler: impl Handler + 'static,
    ) -> Result<(), PatternError> {
        let pattern = PathPattern::compile(template)?;
        self.add_route(method, pattern, Arc::new(handler));
        Ok(())
    }

    pub fn get(&mut self, template: &str, handler: impl Handler + 'static) -> Result<(), PatternError> {
        self.add(Method::GET, template, handler)
    }

    pub fn post(&mut self, template: &str, handler: impl Handler + 'static) -> Result<(), PatternError> {
        self.add(Method::POST, template, handler)
    }

    pub fn put(&mut self, template: &str, handler: impl Handler + 'static) -> Result<(), PatternError> {
        self.add(Method::PUT, template, handler)
    }

    pub fn delete(&mut self, template: &str, handler: impl Handler + 'static) -> Result<(), PatternError> {
        self.add(Method::DELETE, template, handler)
    }

    pub fn options(&mut self, template: &str, handler: impl Handler + 'static) -> Result<(), PatternError> {
        self.add(Method::OPTIONS, template, handler)
    }

    pub fn head(&mut self, template: &str, handler: impl Handler + 'static) -> Result<(), PatternError> {
        self.add(Method::HEAD, template, handler)
    }

    /// Registers every entry of a [`RouteGroup`].
    ///
    /// The group base and each subpath are concatenated exactly as given,
    /// with no separator inserted. Declared path parameters are checked
    /// against the compiled pattern here, so a stale name fails registration
    /// instead of every request.
    pub fn mount(&mut self, group: RouteGroup) -> Result<(), PatternError> {
        for entry in group.entries {
            let template = format!("{}{}", group.base, entry.template);
            let pattern = PathPattern::compile(&template)?;
            for spec in &entry.specs {
                if spec.source() == BindingSource::Path && !pattern.has_param(spec.name()) {
                    return Err(PatternError::unknown_placeholder(spec.name(), template.as_str()));
                }
            }
            let handler =
                BindingHandler::new(entry.specs, Arc::clone(&self.converter), entry.handler);
            self.add_route(entry.method, pattern, Arc::new(handler));
        }
        Ok(())
    }

    fn add_route(&mut self, method: Method, pattern: PathPattern, handler: Arc<dyn Handler>) {
        let chain = compose(&self.decorators, handler);
        info!("{} {}{}", method, self.prefix, pattern.template());
        self.table.register(Route::new(method, pattern, chain));
    }

    /// Runs one request through lookup, the decorator chain and rendering.
    ///
    /// Always produces a response: whatever error escapes the chain goes
    /// through the installed [`ErrorHandler`]. Response headers recorded on
    /// the exchange are merged last, and an explicit `Content-Type` among
    /// them replaces the renderer's.
    pub async fn dispatch<B>(&self, request: Request<B>) -> Response<Bytes>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = request.into_parts();
        let mut exchange = Exchange::new(parts, BodyHandle::new(body), self.parsers.clone());
        let method = exchange.method().clone();
        let path = exchange.path().to_owned();

        let outcome = match self.run(&mut exchange).await {
            Ok(result) => self.render(&exchange, result),
            Err(error) => Err(error),
        };
        let mut response = match outcome {
            Ok(response) => response,
            Err(error) => {
                if error.status_code().is_server_error() {
                    error!(cause = %error, "{} {} failed", method, path);
                }
                self.error_handler.to_response(&error)
            }
        };
        for (name, value) in exchange.response_headers() {
            if *name == header::CONTENT_TYPE {
                response.headers_mut().insert(name, value.clone());
            } else {
                response.headers_mut().append(name, value.clone());
            }
        }
        debug!("{} {} {}", method, path, response.status());
        response
    }

    async fn run(&self, exchange: &mut Exchange) -> Result<Option<Value>, DispatchError> {
        let Some(suffix) = exchange.path().strip_prefix(self.prefix.as_str()) else {
            return Err(DispatchError::route_not_found(exchange.method(), exchange.path()));
        };
        let suffix = suffix.to_owned();
        let Some((route, captures)) = self.table.lookup(exchange.method(), &suffix) else {
            return Err(DispatchError::route_not_found(exchange.method(), exchange.path()));
        };
        exchange.set_path_params(captures);
        route.handler().invoke(exchange).await
    }

    fn render(
        &self,
        exchange: &Exchange,
        result: Option<Value>,
    ) -> Result<Response<Bytes>, DispatchError> {
        let Some(value) = result else {
            let status = exchange.status_override().unwrap_or(StatusCode::NO_CONTENT);
            return Ok(make_response(status, Bytes::new(), None));
        };
        let renderer = self
            .renderers
            .iter()
            .find(|renderer| renderer.accepts(&value))
            .ok_or(DispatchError::NoRenderer)?;
        let bytes = renderer.render(&value).map_err(DispatchError::render)?;
        let status = exchange.status_override().unwrap_or(StatusCode::OK);
        Ok(make_response(status, bytes, Some(renderer.content_type())))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("prefix", &self.prefix)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

fn make_response(status: StatusCode, body: Bytes, content_type: Option<Mime>) -> Response<Bytes> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        if let Ok(value) = HeaderValue::from_str(content_type.as_ref()) {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
    }
    response
}

/// A batch of bound routes sharing a base path, mounted in one go.
///
/// Subpaths are appended to the base verbatim: base `"/hello"` plus subpath
/// `"2"` registers `/hello2`, and a subpath wanting a separator spells the
/// slash itself.
pub struct RouteGroup {
    base: String,
    entries: Vec<GroupEntry>,
}

struct GroupEntry {
    method: Method,
    template: String,
    specs: Vec<ParamSpec>,
    handler: Arc<dyn BoundHandler>,
}

impl RouteGroup {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into(), entries: Vec::new() }
    }

    pub fn route(
        mut self,
        method: Method,
        template: impl Into<String>,
        specs: Vec<ParamSpec>,
        handler: impl BoundHandler + 'static,
    ) -> Self {
        self.entries.push(GroupEntry {
            method,
            template: template.into(),
            specs,
            handler: Arc::new(handler),
        });
        self
    }

    pub fn get(
        self,
        template: impl Into<String>,
        specs: Vec<ParamSpec>,
        handler: impl BoundHandler + 'static,
    ) -> Self {
        self.route(Method::GET, template, specs, handler)
    }

    pub fn post(
        self,
        template: impl Into<String>,
        specs: Vec<ParamSpec>,
        handler: impl BoundHandler + 'static,
    ) -> Self {
        self.route(Method::POST, template, specs, handler)
    }

    pub fn put(
        self,
        template: impl Into<String>,
        specs: Vec<ParamSpec>,
        handler: impl BoundHandler + 'static,
    ) -> Self {
        self.route(Method::PUT, template, specs, handler)
    }

    pub fn delete(
        self,
        template: impl Into<String>,
        specs: Vec<ParamSpec>,
        handler: impl BoundHandler + 'static,
    ) -> Self {
        self.route(Method::DELETE, template, specs, handler)
    }

    pub fn options(
        self,
        template: impl Into<String>,
        specs: Vec<ParamSpec>,
        handler: impl BoundHandler + 'static,
    ) -> Self {
        self.route(Method::OPTIONS, template, specs, handler)
    }

    pub fn head(
        self,
        template: impl Into<String>,
        specs: Vec<ParamSpec>,
        handler: impl BoundHandler + 'static,
    ) -> Self {
        self.route(Method::HEAD, template, specs, handler)
    }
}

impl fmt::Debug for RouteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteGroup")
            .field("base", &self.base)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
