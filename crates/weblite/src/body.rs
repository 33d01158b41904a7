use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http_body::Body;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty};
use tokio::sync::Mutex;

use crate::error::{BindingError, BoxError};

type BoxedBody = UnsyncBoxBody<Bytes, BoxError>;

/// Consume-once handle over the transport's request body stream.
///
/// The body can be collected exactly once per request; later reads fail
/// instead of silently yielding nothing. Cloning shares the same underlying
/// body.
#[derive(Clone)]
pub struct BodyHandle {
    inner: Arc<Mutex<Option<BoxedBody>>>,
}

impl BodyHandle {
    /// Wraps any transport body stream.
    pub fn new<B>(body: B) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let boxed = body.map_err(Into::into).boxed_unsync();
        Self { inner: Arc::new(Mutex::new(Some(boxed))) }
    }

    /// A handle that yields no bytes.
    pub fn empty() -> Self {
        Self::new(Empty::new())
    }

    /// Collects the whole body into memory, consuming the handle.
    pub async fn bytes(&self) -> Result<Bytes, BindingError> {
        let mut guard = self.inner.lock().await;
        match guard.take() {
            Some(body) => {
                body.collect().await.map(http_body_util::Collected::to_bytes).map_err(BindingError::invalid_body)
            }
            None => Err(BindingError::invalid_body("body has been consumed")),
        }
    }

    pub async fn is_consumed(&self) -> bool {
        self.inner.lock().await.is_none()
    }
}

impl Default for BodyHandle {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::Full;

    use super::*;

    fn check_send<T: Send>() {}

    #[test]
    fn is_send() {
        check_send::<BodyHandle>();
    }

    #[tokio::test]
    async fn collects_the_whole_body_once() {
        let handle = BodyHandle::new(Full::new(Bytes::from_static(b"hello body")));
        assert!(!handle.is_consumed().await);

        let bytes = handle.bytes().await.unwrap();
        assert_eq!(bytes.as_ref(), b"hello body");
        assert!(handle.is_consumed().await);
    }

    #[tokio::test]
    async fn second_read_fails() {
        let handle = BodyHandle::new(Full::new(Bytes::from_static(b"x")));
        handle.bytes().await.unwrap();

        let err = handle.bytes().await.unwrap_err();
        assert!(err.to_string().contains("consumed"));
    }

    #[tokio::test]
    async fn clones_share_the_same_body() {
        let handle = BodyHandle::new(Full::new(Bytes::from_static(b"x")));
        let other = handle.clone();
        handle.bytes().await.unwrap();
        assert!(other.is_consumed().await);
        assert!(other.bytes().await.is_err());
    }

    #[tokio::test]
    async fn empty_handle_yields_no_bytes() {
        let handle = BodyHandle::empty();
        assert!(handle.bytes().await.unwrap().is_empty());
    }
}
