//! High-level asynchronous Jenkins client.

use crate::{
    Auth, BodySnippetConfig, Error, api,
    transport::{
        AsyncTransport, CrumbAsync, DynAsyncTransport, TransportRequest,
        async_transport::{HttpSettings, ReqwestAsync},
        request::{Request, Response},
    },
    util::{
        diagnostics::{self, FailedResponse},
        url::{endpoint_url, normalize_base_url},
    },
};
use http::HeaderMap;
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};
use url::Url;

#[cfg(feature = "tracing")]
use tracing::field;

const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Configures and constructs [`Client`].
pub struct ClientBuilder {
    base_url: Url,
    auth: Option<Auth>,
    insecure: bool,
    user_agent: String,
    timeout: Duration,
    connect_timeout: Duration,
    no_proxy: bool,
    crumb: bool,
    default_depth: Option<u32>,
    default_headers: HeaderMap,
    body_snippet: BodySnippetConfig,
    transport: Option<DynAsyncTransport>,
}

impl ClientBuilder {
    fn try_new(base: impl AsRef<str>) -> Result<Self, Error> {
        let base_url = normalize_base_url(base.as_ref())?;
        Ok(Self {
            base_url,
            auth: None,
            insecure: false,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            no_proxy: false,
            crumb: true,
            default_depth: None,
            default_headers: HeaderMap::new(),
            body_snippet: BodySnippetConfig::default(),
            transport: None,
        })
    }

    /// Apply an authentication strategy.
    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Apply HTTP basic authentication (user + API token or password).
    pub fn auth_basic(mut self, user: impl Into<String>, token: impl Into<String>) -> Self {
        self.auth = Some(Auth::basic(user, token));
        self
    }

    /// Send `Authorization: Bearer <token>`.
    pub fn auth_bearer(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(Auth::bearer(token));
        self
    }

    /// Ignore system proxy environment variables.
    pub fn no_system_proxy(mut self) -> Self {
        self.no_proxy = true;
        self
    }

    /// Accept invalid TLS certificates (**dangerous**).
    pub fn danger_accept_invalid_certs(mut self, yes: bool) -> Self {
        self.insecure = yes;
        self
    }

    /// Override the default `User-Agent` header.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    /// Adjust the per-request timeout.
    pub fn timeout(mut self, value: Duration) -> Self {
        self.timeout = value;
        self
    }

    /// Adjust the connection establishment timeout.
    pub fn connect_timeout(mut self, value: Duration) -> Self {
        self.connect_timeout = value;
        self
    }

    /// Add a default header applied to every request.
    pub fn default_header(
        mut self,
        name: http::header::HeaderName,
        value: http::HeaderValue,
    ) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    /// Add a set of default headers applied to every request.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers.extend(headers);
        self
    }

    /// Enable/disable capturing `body_snippet` on errors and decode failures.
    pub fn capture_body_snippet(mut self, enabled: bool) -> Self {
        self.body_snippet.enabled = enabled;
        self
    }

    /// Set max bytes to keep for `body_snippet`.
    pub fn max_body_snippet_bytes(mut self, max_bytes: usize) -> Self {
        self.body_snippet.max_bytes = max_bytes;
        self
    }

    /// Enable/disable CSRF crumb handling (enabled by default).
    pub fn crumb(mut self, enabled: bool) -> Self {
        self.crumb = enabled;
        self
    }

    /// Add `depth=<n>` to every JSON read that does not set one itself.
    pub fn default_depth(mut self, depth: u32) -> Self {
        self.default_depth = Some(depth);
        self
    }

    /// Send requests through a custom transport instead of `reqwest`.
    ///
    /// Crumb handling still wraps it unless disabled with
    /// [`ClientBuilder::crumb`].
    pub fn transport(mut self, transport: impl AsyncTransport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Finalise configuration and build the client.
    pub fn build(self) -> Result<Client, Error> {
        let base = self.base_url;

        let mut transport: DynAsyncTransport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestAsync::try_new(HttpSettings {
                insecure: self.insecure,
                user_agent: &self.user_agent,
                timeout: self.timeout,
                connect_timeout: self.connect_timeout,
                no_proxy: self.no_proxy,
            })?),
        };

        if self.crumb {
            transport = Arc::new(CrumbAsync::new(
                transport,
                base.clone(),
                self.auth.clone(),
                self.default_headers.clone(),
                self.timeout,
                self.body_snippet,
            ));
        }

        Ok(Client {
            inner: Arc::new(Inner {
                base,
                auth: self.auth,
                timeout: self.timeout,
                default_depth: self.default_depth,
                default_headers: self.default_headers,
                body_snippet: self.body_snippet,
                transport,
            }),
        })
    }
}

/// Entry point of the SDK. Cheap to clone; clones share the connection
/// pool and the crumb cache.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    base: Url,
    auth: Option<Auth>,
    timeout: Duration,
    default_depth: Option<u32>,
    default_headers: HeaderMap,
    body_snippet: BodySnippetConfig,
    transport: DynAsyncTransport,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base", &self.inner.base.as_str())
            .field("auth", &self.inner.auth)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn builder(base: impl AsRef<str>) -> Result<ClientBuilder, Error> {
        ClientBuilder::try_new(base)
    }

    pub fn new(base: impl AsRef<str>) -> Result<Self, Error> {
        Self::builder(base)?.build()
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }

    #[must_use]
    pub fn jobs(&self) -> api::JobsService {
        api::JobsService::new(self.clone())
    }

    #[must_use]
    pub fn builds(&self) -> api::BuildsService {
        api::BuildsService::new(self.clone())
    }

    #[must_use]
    pub fn queue(&self) -> api::QueueService {
        api::QueueService::new(self.clone())
    }

    /// Controller version from the `X-Jenkins` header of `GET /api/json`.
    ///
    /// `None` when a proxy or the controller strips the header.
    pub async fn version(&self) -> Result<Option<String>, Error> {
        let req = Request::get(["api", "json"]).query_pair("tree", "mode");
        let resp = self.execute_request(&req).await?;
        Ok(resp.header_str("x-jenkins").map(str::to_owned))
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(&self, mut req: Request) -> Result<T, Error> {
        if let Some(depth) = self.inner.default_depth
            && req.method == http::Method::GET
            && !req.has_query("depth")
        {
            req = req.query_pair("depth", depth.to_string());
        }

        let resp = self.execute_request(&req).await?;
        resp.json().map_err(|source| self.decode_error(&req, &resp, source))
    }

    pub(crate) async fn send_unit(&self, req: Request) -> Result<(), Error> {
        let _ = self.execute_request(&req).await?;
        Ok(())
    }

    pub(crate) async fn send_response(&self, req: Request) -> Result<Response, Error> {
        self.execute_request(&req).await
    }

    /// Decode failure for a successful response that did not have the
    /// expected shape.
    pub(crate) fn decode_error(
        &self,
        req: &Request,
        resp: &Response,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Error {
        let path = endpoint_url(&self.inner.base, req.segments.iter().map(String::as_str))
            .map(|url| url.path().to_owned())
            .unwrap_or_else(|_| req.segments.join("/"));
        Error::Decode {
            status: resp.status,
            method: req.method.clone(),
            path: path.into_boxed_str(),
            request_id: diagnostics::request_id(&resp.headers),
            body_snippet: diagnostics::body_snippet(
                &resp.body,
                self.inner.body_snippet,
                self.inner.auth.as_ref(),
            ),
            source: Box::new(source),
        }
    }

    pub(crate) async fn execute_request(&self, req: &Request) -> Result<Response, Error> {
        #[cfg(feature = "metrics")]
        let _inflight = crate::transport::metrics::InFlightGuard::new();

        let url = endpoint_url(&self.inner.base, req.segments.iter().map(String::as_str))?;

        let mut headers = self.inner.default_headers.clone();
        if let Some(auth) = &self.inner.auth {
            auth.apply(&mut headers)?;
        }
        headers.extend(req.headers.clone());

        #[cfg(any(feature = "tracing", feature = "metrics"))]
        let start = std::time::Instant::now();
        #[cfg(feature = "tracing")]
        let span = tracing::info_span!(
            "jenkins.request",
            http.method = %req.method,
            http.host = %self.inner.base.host_str().unwrap_or_default(),
            http.path = %url.path(),
            http.status = field::Empty,
            request_id = field::Empty,
            crumb_refreshed = field::Empty,
            latency_ms = field::Empty,
            error_kind = field::Empty,
        );

        let send = self.inner.transport.send(TransportRequest {
            method: req.method.clone(),
            url: url.clone(),
            headers,
            query: req.query.clone(),
            form: req.form.clone(),
            timeout: self.inner.timeout,
        });
        // `Entered` is not `Send`; the request future must be.
        #[cfg(feature = "tracing")]
        let send = tracing::Instrument::instrument(send, span.clone());

        let resp = match send.await {
            Ok(resp) => resp,
            Err(err) => {
                #[cfg(feature = "metrics")]
                crate::transport::metrics::record_request(
                    &req.method,
                    err.status(),
                    start.elapsed(),
                    false,
                    Some(err.kind()),
                );
                #[cfg(feature = "tracing")]
                {
                    span.record("error_kind", field::debug(err.kind()));
                    span.record("latency_ms", start.elapsed().as_millis() as i64);
                }
                return Err(err);
            }
        };

        #[cfg(feature = "tracing")]
        {
            span.record("http.status", resp.status.as_u16() as i64);
            span.record("crumb_refreshed", resp.meta.crumb_refreshed);
            span.record("latency_ms", start.elapsed().as_millis() as i64);
            if let Some(rid) = diagnostics::request_id(&resp.headers).as_deref() {
                span.record("request_id", field::display(rid));
            }
        }

        if resp.status.is_client_error() || resp.status.is_server_error() {
            let err = diagnostics::http_failure(
                FailedResponse {
                    method: &req.method,
                    url: &url,
                    status: resp.status,
                    headers: &resp.headers,
                    body: &resp.body,
                },
                self.inner.body_snippet,
                self.inner.auth.as_ref(),
            );

            #[cfg(feature = "metrics")]
            crate::transport::metrics::record_request(
                &req.method,
                err.status(),
                start.elapsed(),
                resp.meta.crumb_refreshed,
                Some(err.kind()),
            );
            #[cfg(feature = "tracing")]
            span.record("error_kind", field::debug(err.kind()));

            return Err(err);
        }

        #[cfg(feature = "metrics")]
        crate::transport::metrics::record_request(
            &req.method,
            Some(resp.status),
            start.elapsed(),
            resp.meta.crumb_refreshed,
            None,
        );

        Ok(Response {
            status: resp.status,
            headers: resp.headers,
            body: resp.body,
        })
    }
}
