//! HTTP plumbing beneath the services.
//!
//! [`AsyncTransport`] is the seam: the client only needs something that can
//! send a [`TransportRequest`] and hand back status, headers and body.
//! Middlewares ([`CrumbAsync`]) wrap another transport.

use http::{HeaderMap, Method, StatusCode};
use std::time::Duration;
use url::Url;

pub mod async_transport;
pub mod crumb;
#[cfg(feature = "metrics")]
pub(crate) mod metrics;
pub mod request;

pub use async_transport::{AsyncTransport, DynAsyncTransport, ReqwestAsync};
pub use crumb::CrumbAsync;

/// A fully resolved request handed to a transport.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub timeout: Duration,
}

/// Bookkeeping the middlewares attach to a response.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseMeta {
    /// Set when the request was replayed after a rejected crumb.
    pub crumb_refreshed: bool,
}

#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub meta: ResponseMeta,
}
