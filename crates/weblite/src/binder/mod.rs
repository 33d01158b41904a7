//! Declarative argument binding.
//!
//! A route declares its parameters as [`ParamSpec`]s; at invocation time the
//! binder extracts each raw value from the exchange, applies defaults and
//! optionality, converts to the declared target type and hands the handler a
//! positional [`Args`] vector, one entry per spec, in declaration order.
//!
//! Binding is all-or-nothing and runs inside the decorator chain, so a
//! decorator can translate binding failures and attribute bindings see
//! attributes set by decorators further out.

mod convert;
mod param;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use self::convert::{DefaultConverter, TypeConverter};
pub use self::param::{BindingSource, ParamSpec, TargetType};
use crate::error::BindingError;
use crate::exchange::Exchange;
use crate::handler::{Handler, HandlerResult};

/// Binds every spec against the exchange, in declaration order.
///
/// The first failure aborts the whole bind.
pub async fn bind(
    exchange: &mut Exchange,
    specs: &[ParamSpec],
    converter: &dyn TypeConverter,
) -> Result<Args, BindingError> {
    let mut values = Vec::with_capacity(specs.len());
    for spec in specs {
        values.push(bind_one(exchange, spec, converter).await?);
    }
    Ok(Args::new(values))
}

async fn bind_one(
    exchange: &mut Exchange,
    spec: &ParamSpec,
    converter: &dyn TypeConverter,
) -> Result<Value, BindingError> {
    match spec.source() {
        // positional placeholders, satisfied outside the binder
        BindingSource::Instance | BindingSource::Exchange => Ok(Value::Null),
        BindingSource::Path => {
            let raw = exchange
                .path_param(spec.name())
                .ok_or_else(|| BindingError::missing_path_param(spec.name()))?;
            convert_raw(spec, raw, converter)
        }
        BindingSource::Query => from_raw(spec, exchange.query().get(spec.name()), converter),
        BindingSource::Header => from_raw(spec, exchange.header(spec.name()), converter),
        BindingSource::Cookie => from_raw(spec, exchange.cookie(spec.name()), converter),
        BindingSource::BodyWhole => Ok(exchange.body_value().await?.clone()),
        BindingSource::BodyField => {
            let body = exchange.body_value().await?;
            match body.get(spec.name()) {
                Some(field) => convert_field(spec, field, converter),
                None => absent_value(spec),
            }
        }
        BindingSource::Attribute => match exchange.attr(spec.name()) {
            Some(value) => Ok(value.clone()),
            None => absent_value(spec),
        },
    }
}

fn from_raw(
    spec: &ParamSpec,
    raw: Option<&str>,
    converter: &dyn TypeConverter,
) -> Result<Value, BindingError> {
    match raw {
        Some(raw) => convert_raw(spec, raw, converter),
        None => absent_value(spec),
    }
}

fn convert_raw(
    spec: &ParamSpec,
    raw: &str,
    converter: &dyn TypeConverter,
) -> Result<Value, BindingError> {
    if spec.target() == TargetType::String {
        return Ok(Value::String(raw.to_owned()));
    }
    converter
        .from_string(raw, spec.target())
        .map_err(|e| BindingError::type_conversion(spec.name(), raw, e))
}

/// Body fields arrive already structured; only string fields with a
/// non-string target go through the converter.
fn convert_field(
    spec: &ParamSpec,
    field: &Value,
    converter: &dyn TypeConverter,
) -> Result<Value, BindingError> {
    match field {
        Value::String(raw)
            if spec.target() != TargetType::String && spec.target() != TargetType::Value =>
        {
            converter
                .from_string(raw, spec.target())
                .map_err(|e| BindingError::type_conversion(spec.name(), raw.as_str(), e))
        }
        _ => Ok(field.clone()),
    }
}

/// Defaults are taken as-is, without invoking the converter.
fn absent_value(spec: &ParamSpec) -> Result<Value, BindingError> {
    if let Some(default) = spec.default_value() {
        return Ok(default.clone());
    }
    if spec.is_required() {
        return Err(BindingError::missing_required(spec.name(), spec.source()));
    }
    Ok(Value::Null)
}

/// The bound argument vector, positional, one value per declared spec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<Value>,
}

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn str(&self, index: usize) -> Option<&str> {
        self.get(index)?.as_str()
    }

    pub fn bool(&self, index: usize) -> Option<bool> {
        self.get(index)?.as_bool()
    }

    pub fn int(&self, index: usize) -> Option<i64> {
        self.get(index)?.as_i64()
    }

    pub fn float(&self, index: usize) -> Option<f64> {
        self.get(index)?.as_f64()
    }

    /// Deserializes one argument into a concrete type, typically a struct
    /// bound from the whole body. An absent index decodes from `Null`.
    pub fn decode<T: DeserializeOwned>(&self, index: usize) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.get(index).cloned().unwrap_or(Value::Null))
    }
}

/// A handler that receives its arguments already bound.
#[async_trait]
pub trait BoundHandler: Send + Sync {
    async fn invoke(&self, exchange: &mut Exchange, args: Args) -> HandlerResult;
}

/// An async callable taking the exchange and the bound arguments.
///
/// Like [`crate::handler::HandlerFn`], free `async fn` items satisfy this
/// for every lifetime.
pub trait BoundFn<'a>: Send + Sync {
    type Fut: Future<Output = HandlerResult> + Send + 'a;

    fn call(&self, exchange: &'a mut Exchange, args: Args) -> Self::Fut;
}

impl<'a, F, Fut> BoundFn<'a> for F
where
    F: Fn(&'a mut Exchange, Args) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'a,
{
    type Fut = Fut;

    fn call(&self, exchange: &'a mut Exchange, args: Args) -> Fut {
        self(exchange, args)
    }
}

/// Wraps an async function as a [`BoundHandler`].
pub fn bound_fn<F>(f: F) -> FnBoundHandler<F>
where
    F: for<'a> BoundFn<'a> + 'static,
{
    FnBoundHandler { f }
}

pub struct FnBoundHandler<F> {
    f: F,
}

#[async_trait]
impl<F> BoundHandler for FnBoundHandler<F>
where
    F: for<'a> BoundFn<'a> + 'static,
{
    async fn invoke(&self, exchange: &mut Exchange, args: Args) -> HandlerResult {
        self.f.call(exchange, args).await
    }
}

impl<F> fmt::Debug for FnBoundHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBoundHandler").finish_non_exhaustive()
    }
}

/// The innermost link of a bound route's chain: binds, then invokes.
///
/// Sitting inside the decorator chain means a binding failure surfaces to
/// decorators like any other error, before it reaches the error handler.
pub struct BindingHandler {
    specs: Vec<ParamSpec>,
    converter: Arc<dyn TypeConverter>,
    inner: Arc<dyn BoundHandler>,
}

impl BindingHandler {
    pub fn new(
        specs: Vec<ParamSpec>,
        converter: Arc<dyn TypeConverter>,
        inner: Arc<dyn BoundHandler>,
    ) -> Self {
        Self { specs, converter, inner }
    }
}

#[async_trait]
impl Handler for BindingHandler {
    async fn invoke(&self, exchange: &mut Exchange) -> HandlerResult {
        let args = bind(exchange, &self.specs, self.converter.as_ref()).await?;
        self.inner.invoke(exchange, args).await
    }
}

impl fmt::Debug for BindingHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingHandler").field("specs", &self.specs).finish_non_exhaustive()
    }
}
