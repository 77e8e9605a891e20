//! CSRF crumb middleware.
//!
//! * Lazily fetches `/crumbIssuer/api/json` before the first non-GET request.
//! * Attaches the cached crumb header to every request once one is known.
//! * A `403` saying the crumb is invalid (expired session, restarted
//!   controller) triggers one refresh and one replay of the request.
//! * A controller with CSRF protection disabled answers the issuer with
//!   `404`; that is remembered and no crumb is sent.

use crate::{
    Auth, BodySnippetConfig, Error,
    transport::{TransportRequest, TransportResponse, async_transport::AsyncTransport},
    util::{
        diagnostics::{self, FailedResponse},
        url::endpoint_url,
    },
};
use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tokio::sync::RwLock;
use url::Url;

/// Body fragment Jenkins returns when the crumb is missing or stale.
pub const NO_VALID_CRUMB: &str = "No valid crumb was included in the request";

#[derive(Deserialize)]
struct CrumbResp {
    #[serde(rename = "crumbRequestField")]
    field: String,
    crumb: String,
}

#[derive(Clone, Debug)]
enum CrumbState {
    Unknown,
    Disabled,
    Issued { name: HeaderName, value: HeaderValue },
}

/// Transport wrapper that keeps a valid crumb on outgoing requests.
#[derive(Clone)]
pub struct CrumbAsync<T> {
    inner: T,
    base_url: Url,
    auth: Option<Auth>,
    default_headers: HeaderMap,
    fetch_timeout: Duration,
    body_snippet: BodySnippetConfig,
    state: Arc<RwLock<CrumbState>>,
}

impl<T: AsyncTransport> CrumbAsync<T> {
    pub fn new(
        inner: T,
        base_url: Url,
        auth: Option<Auth>,
        default_headers: HeaderMap,
        fetch_timeout: Duration,
        body_snippet: BodySnippetConfig,
    ) -> Self {
        Self {
            inner,
            base_url,
            auth,
            default_headers,
            fetch_timeout,
            body_snippet,
            state: Arc::new(RwLock::new(CrumbState::Unknown)),
        }
    }

    async fn fetch_crumb(&self) -> Result<CrumbState, Error> {
        let url = endpoint_url(&self.base_url, ["crumbIssuer", "api", "json"])?;

        let mut headers = self.default_headers.clone();
        if let Some(auth) = &self.auth {
            auth.apply(&mut headers)?;
        }

        let resp = self
            .inner
            .send(TransportRequest {
                method: Method::GET,
                url: url.clone(),
                headers,
                query: vec![],
                form: vec![],
                timeout: self.fetch_timeout,
            })
            .await?;

        if resp.status == StatusCode::NOT_FOUND {
            #[cfg(feature = "tracing")]
            tracing::debug!("crumb issuer not available, sending requests without crumb");
            return Ok(CrumbState::Disabled);
        }
        if !resp.status.is_success() {
            return Err(diagnostics::http_failure(
                FailedResponse {
                    method: &Method::GET,
                    url: &url,
                    status: resp.status,
                    headers: &resp.headers,
                    body: &resp.body,
                },
                self.body_snippet,
                self.auth.as_ref(),
            ));
        }

        let json: CrumbResp = serde_json::from_slice(&resp.body).map_err(|err| Error::Decode {
            status: resp.status,
            method: Method::GET,
            path: url.path().into(),
            request_id: diagnostics::request_id(&resp.headers),
            body_snippet: diagnostics::body_snippet(
                &resp.body,
                self.body_snippet,
                self.auth.as_ref(),
            ),
            source: Box::new(err),
        })?;

        let name = HeaderName::from_bytes(json.field.as_bytes()).map_err(|err| {
            Error::InvalidConfig {
                message: "invalid crumb header name".into(),
                source: Some(Box::new(err)),
            }
        })?;
        let value = HeaderValue::from_str(&json.crumb).map_err(|err| Error::InvalidConfig {
            message: "invalid crumb header value".into(),
            source: Some(Box::new(err)),
        })?;

        #[cfg(feature = "tracing")]
        tracing::debug!(field = %name, "fetched crumb");
        Ok(CrumbState::Issued { name, value })
    }

    async fn refresh(&self) -> Result<CrumbState, Error> {
        let mut guard = self.state.write().await;
        *guard = self.fetch_crumb().await?;
        Ok(guard.clone())
    }

    async fn current(&self, method: &Method) -> Result<CrumbState, Error> {
        let cached = self.state.read().await.clone();
        match cached {
            CrumbState::Unknown if method != Method::GET => {
                let mut guard = self.state.write().await;
                if matches!(*guard, CrumbState::Unknown) {
                    *guard = self.fetch_crumb().await?;
                }
                Ok(guard.clone())
            }
            other => Ok(other),
        }
    }
}

fn apply(state: &CrumbState, headers: &mut HeaderMap) {
    if let CrumbState::Issued { name, value } = state {
        headers.insert(name.clone(), value.clone());
    }
}

fn is_crumb_rejection(resp: &TransportResponse) -> bool {
    resp.status == StatusCode::FORBIDDEN
        && String::from_utf8_lossy(&resp.body).contains(NO_VALID_CRUMB)
}

#[async_trait]
impl<T: AsyncTransport> AsyncTransport for CrumbAsync<T> {
    async fn send(&self, mut req: TransportRequest) -> Result<TransportResponse, Error> {
        let state = self.current(&req.method).await?;
        apply(&state, &mut req.headers);

        let resp = self.inner.send(req.clone()).await?;
        if !is_crumb_rejection(&resp) {
            return Ok(resp);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(http.path = %req.url.path(), "crumb rejected, refreshing");

        let fresh = self.refresh().await?;
        apply(&fresh, &mut req.headers);
        let mut resp = self.inner.send(req).await?;
        resp.meta.crumb_refreshed = true;
        Ok(resp)
    }
}
