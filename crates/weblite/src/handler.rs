//! The terminal handler abstraction and an adapter for plain async functions.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DispatchError;
use crate::exchange::Exchange;

/// What a handler produces: a value for the renderer pipeline, or nothing,
/// which terminates the response with `204 No Content` unless the exchange
/// carries a status override.
pub type HandlerResult = Result<Option<Value>, DispatchError>;

/// The innermost link of a route's chain.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn invoke(&self, exchange: &mut Exchange) -> HandlerResult;
}

/// An async callable borrowing the exchange for the duration of its future.
///
/// Free `async fn` items satisfy this for every lifetime; closures usually
/// cannot express the higher-ranked borrow, so name the function instead.
pub trait HandlerFn<'a>: Send + Sync {
    type Fut: Future<Output = HandlerResult> + Send + 'a;

    fn call(&self, exchange: &'a mut Exchange) -> Self::Fut;
}

impl<'a, F, Fut> HandlerFn<'a> for F
where
    F: Fn(&'a mut Exchange) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'a,
{
    type Fut = Fut;

    fn call(&self, exchange: &'a mut Exchange) -> Fut {
        self(exchange)
    }
}

/// Wraps an async function as a [`Handler`].
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a> HandlerFn<'a> + 'static,
{
    FnHandler { f }
}

pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: for<'a> HandlerFn<'a> + 'static,
{
    async fn invoke(&self, exchange: &mut Exchange) -> HandlerResult {
        self.f.call(exchange).await
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use http::Request;
    use http_body_util::Full;
    use serde_json::json;

    use super::*;
    use crate::body::BodyHandle;

    fn exchange(uri: &str) -> Exchange {
        let (parts, ()) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        Exchange::new(parts, BodyHandle::new(Full::new(Bytes::new())), Vec::new())
    }

    async fn greet(exchange: &mut Exchange) -> HandlerResult {
        Ok(Some(json!(format!("hello {}", exchange.query().get("name").unwrap_or("world")))))
    }

    async fn tag_and_finish(exchange: &mut Exchange) -> HandlerResult {
        exchange.set_attr("seen", true);
        Ok(None)
    }

    #[tokio::test]
    async fn adapted_function_reads_the_exchange() {
        let handler: Arc<dyn Handler> = Arc::new(handler_fn(greet));
        let mut exchange = exchange("/greet?name=rust");
        let result = handler.invoke(&mut exchange).await.unwrap();
        assert_eq!(result, Some(json!("hello rust")));
    }

    #[tokio::test]
    async fn adapted_function_may_mutate_and_return_nothing() {
        let handler = handler_fn(tag_and_finish);
        let mut exchange = exchange("/");
        let result = handler.invoke(&mut exchange).await.unwrap();
        assert_eq!(result, None);
        assert_eq!(exchange.attr("seen"), Some(&json!(true)));
    }
}
