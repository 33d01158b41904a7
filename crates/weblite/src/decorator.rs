//! Decorators wrap a route's handler at registration time.
//!
//! Composition folds from the right, so the first decorator registered ends
//! up outermost: its before-part runs first and its after-part runs last. A
//! decorator may short-circuit by not calling `next`, and it sees the
//! outcome of everything inside it, errors included, so error translation
//! is just matching on the returned result.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DispatchError;
use crate::exchange::Exchange;
use crate::handler::{Handler, HandlerResult};

#[async_trait]
pub trait Decorator: Send + Sync {
    async fn invoke(&self, exchange: &mut Exchange, next: &dyn Handler) -> HandlerResult;
}

/// Folds `decorators` around `innermost` into a single handler.
pub fn compose(decorators: &[Arc<dyn Decorator>], innermost: Arc<dyn Handler>) -> Arc<dyn Handler> {
    decorators.iter().rev().fold(innermost, |next, decorator| {
        Arc::new(Decorated { decorator: Arc::clone(decorator), next }) as Arc<dyn Handler>
    })
}

struct Decorated {
    decorator: Arc<dyn Decorator>,
    next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for Decorated {
    async fn invoke(&self, exchange: &mut Exchange) -> HandlerResult {
        self.decorator.invoke(exchange, self.next.as_ref()).await
    }
}

/// An async callable run before the rest of the chain; an error skips it.
pub trait BeforeFn<'a>: Send + Sync {
    type Fut: Future<Output = Result<(), DispatchError>> + Send + 'a;

    fn call(&self, exchange: &'a mut Exchange) -> Self::Fut;
}

impl<'a, F, Fut> BeforeFn<'a> for F
where
    F: Fn(&'a mut Exchange) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), DispatchError>> + Send + 'a,
{
    type Fut = Fut;

    fn call(&self, exchange: &'a mut Exchange) -> Fut {
        self(exchange)
    }
}

/// Wraps an async function as a [`Decorator`] that runs before the rest of
/// the chain. Returning an error stops dispatch with that error.
pub fn before_fn<F>(f: F) -> BeforeDecorator<F>
where
    F: for<'a> BeforeFn<'a> + 'static,
{
    BeforeDecorator { f }
}

pub struct BeforeDecorator<F> {
    f: F,
}

#[async_trait]
impl<F> Decorator for BeforeDecorator<F>
where
    F: for<'a> BeforeFn<'a> + 'static,
{
    async fn invoke(&self, exchange: &mut Exchange, next: &dyn Handler) -> HandlerResult {
        self.f.call(&mut *exchange).await?;
        next.invoke(exchange).await
    }
}

impl<F> fmt::Debug for BeforeDecorator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeforeDecorator").finish_non_exhaustive()
    }
}

/// An async callable run after the rest of the chain, observing its outcome.
pub trait AfterFn<'a>: Send + Sync {
    type Fut: Future<Output = HandlerResult> + Send + 'a;

    fn call(&self, exchange: &'a mut Exchange, outcome: HandlerResult) -> Self::Fut;
}

impl<'a, F, Fut> AfterFn<'a> for F
where
    F: Fn(&'a mut Exchange, HandlerResult) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'a,
{
    type Fut = Fut;

    fn call(&self, exchange: &'a mut Exchange, outcome: HandlerResult) -> Fut {
        self(exchange, outcome)
    }
}

/// Wraps an async function as a [`Decorator`] that observes the outcome of
/// the rest of the chain and may replace it.
pub fn after_fn<F>(f: F) -> AfterDecorator<F>
where
    F: for<'a> AfterFn<'a> + 'static,
{
    AfterDecorator { f }
}

pub struct AfterDecorator<F> {
    f: F,
}

#[async_trait]
impl<F> Decorator for AfterDecorator<F>
where
    F: for<'a> AfterFn<'a> + 'static,
{
    async fn invoke(&self, exchange: &mut Exchange, next: &dyn Handler) -> HandlerResult {
        let outcome = next.invoke(&mut *exchange).await;
        self.f.call(exchange, outcome).await
    }
}

impl<F> fmt::Debug for AfterDecorator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfterDecorator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use http::Request;
    use http_body_util::Full;
    use serde_json::json;

    use super::*;
    use crate::body::BodyHandle;

    fn exchange() -> Exchange {
        let (parts, ()) = Request::builder().uri("/").body(()).unwrap().into_parts();
        Exchange::new(parts, BodyHandle::new(Full::new(Bytes::new())), Vec::new())
    }

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Decorator for Recording {
        async fn invoke(&self, exchange: &mut Exchange, next: &dyn Handler) -> HandlerResult {
            self.log.lock().unwrap().push(format!("{}:before", self.name));
            let outcome = next.invoke(exchange).await;
            self.log.lock().unwrap().push(format!("{}:after", self.name));
            outcome
        }
    }

    struct Terminal {
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Handler for Terminal {
        async fn invoke(&self, _exchange: &mut Exchange) -> HandlerResult {
            self.log.lock().unwrap().push("handler".to_owned());
            Ok(Some(json!("done")))
        }
    }

    struct Reject;

    #[async_trait]
    impl Decorator for Reject {
        async fn invoke(&self, _exchange: &mut Exchange, _next: &dyn Handler) -> HandlerResult {
            Err(DispatchError::forbidden("no entry"))
        }
    }

    #[tokio::test]
    async fn first_registered_decorator_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let decorators: Vec<Arc<dyn Decorator>> = vec![
            Arc::new(Recording { name: "outer", log: Arc::clone(&log) }),
            Arc::new(Recording { name: "inner", log: Arc::clone(&log) }),
        ];
        let chain = compose(&decorators, Arc::new(Terminal { log: Arc::clone(&log) }));

        let outcome = chain.invoke(&mut exchange()).await.unwrap();

        assert_eq!(outcome, Some(json!("done")));
        assert_eq!(
            *log.lock().unwrap(),
            ["outer:before", "inner:before", "handler", "inner:after", "outer:after"]
        );
    }

    #[tokio::test]
    async fn short_circuit_skips_everything_inside() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let decorators: Vec<Arc<dyn Decorator>> = vec![
            Arc::new(Recording { name: "outer", log: Arc::clone(&log) }),
            Arc::new(Reject),
            Arc::new(Recording { name: "inner", log: Arc::clone(&log) }),
        ];
        let chain = compose(&decorators, Arc::new(Terminal { log: Arc::clone(&log) }));

        let err = chain.invoke(&mut exchange()).await.unwrap_err();

        assert_eq!(err.status_code(), http::StatusCode::FORBIDDEN);
        // the rejection still unwinds through the outer decorator
        assert_eq!(*log.lock().unwrap(), ["outer:before", "outer:after"]);
    }

    #[tokio::test]
    async fn after_decorator_translates_errors() {
        async fn recover(_exchange: &mut Exchange, outcome: HandlerResult) -> HandlerResult {
            match outcome {
                Err(_) => Ok(Some(json!("recovered"))),
                ok => ok,
            }
        }

        let decorators: Vec<Arc<dyn Decorator>> = vec![Arc::new(after_fn(recover)), Arc::new(Reject)];
        let chain = compose(&decorators, Arc::new(crate::handler::handler_fn(never)));

        let outcome = chain.invoke(&mut exchange()).await.unwrap();
        assert_eq!(outcome, Some(json!("recovered")));
    }

    #[tokio::test]
    async fn before_decorator_guards_the_chain() {
        async fn require_token(exchange: &mut Exchange) -> Result<(), DispatchError> {
            if exchange.header("x-token").is_some() {
                Ok(())
            } else {
                Err(DispatchError::unauthorized("missing token"))
            }
        }

        let decorators: Vec<Arc<dyn Decorator>> = vec![Arc::new(before_fn(require_token))];
        let chain = compose(&decorators, Arc::new(crate::handler::handler_fn(never)));

        let err = chain.invoke(&mut exchange()).await.unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::UNAUTHORIZED);
    }

    async fn never(_exchange: &mut Exchange) -> HandlerResult {
        panic!("handler must not run");
    }
}
