use std::future::Future;
use std::sync::Arc;

use crate::cache::StoredResponse;
use crate::proxy::error::FetchError;
use crate::proxy::request::InterceptedRequest;

/// Underlying network the proxy falls back to on a cache miss.
///
/// Any received status is `Ok`; only the absence of a response is an error.
pub trait Network: Send + Sync + 'static {
    fn fetch(
        &self,
        request: &InterceptedRequest,
    ) -> impl Future<Output = Result<StoredResponse, FetchError>> + Send;
}

impl<N: Network> Network for Arc<N> {
    fn fetch(
        &self,
        request: &InterceptedRequest,
    ) -> impl Future<Output = Result<StoredResponse, FetchError>> + Send {
        self.as_ref().fetch(request)
    }
}
