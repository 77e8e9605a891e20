use super::{ResponseMeta, TransportRequest, TransportResponse};
use crate::error::{Error, TransportErrorKind};
use async_trait::async_trait;
use reqwest::Client;
use std::{sync::Arc, time::Duration};

#[cfg(feature = "rustls")]
fn ensure_rustls_provider() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

#[cfg(not(feature = "rustls"))]
fn ensure_rustls_provider() {}

/// Trait implemented by any async HTTP layer.
///
/// Implementations must be safe to share between concurrently running
/// pollers and log streams.
#[async_trait]
pub trait AsyncTransport: Send + Sync + 'static {
    async fn send(&self, req: TransportRequest) -> Result<TransportResponse, Error>;
}

pub type DynAsyncTransport = Arc<dyn AsyncTransport>;

#[async_trait]
impl<T: AsyncTransport + ?Sized> AsyncTransport for Arc<T> {
    async fn send(&self, req: TransportRequest) -> Result<TransportResponse, Error> {
        (**self).send(req).await
    }
}

/// Default transport built on `reqwest`.
///
/// The cookie store is enabled so the session cookie that a crumb is bound
/// to survives between requests.
#[derive(Clone)]
pub struct ReqwestAsync {
    client: Client,
}

/// Knobs for [`ReqwestAsync::try_new`].
#[derive(Clone, Debug)]
pub(crate) struct HttpSettings<'a> {
    pub insecure: bool,
    pub user_agent: &'a str,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub no_proxy: bool,
}

impl ReqwestAsync {
    pub(crate) fn try_new(settings: HttpSettings<'_>) -> Result<Self, Error> {
        ensure_rustls_provider();

        let mut builder = Client::builder()
            .danger_accept_invalid_certs(settings.insecure)
            .user_agent(settings.user_agent)
            .cookie_store(true)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.timeout);

        if settings.no_proxy {
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(|err| Error::InvalidConfig {
            message: "failed to build HTTP client".into(),
            source: Some(Box::new(err)),
        })?;

        Ok(Self { client })
    }
}

fn transport_error(method: &http::Method, url: &url::Url, err: reqwest::Error) -> Error {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else {
        TransportErrorKind::Other
    };
    Error::Transport {
        method: method.clone(),
        path: url.path().into(),
        kind,
        source: Box::new(err),
    }
}

#[async_trait]
impl AsyncTransport for ReqwestAsync {
    async fn send(&self, req: TransportRequest) -> Result<TransportResponse, Error> {
        let TransportRequest {
            method,
            url,
            headers,
            query,
            form,
            timeout,
        } = req;

        let mut builder = self
            .client
            .request(method.clone(), url.clone())
            .headers(headers)
            .timeout(timeout);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if !form.is_empty() {
            builder = builder.form(&form);
        }

        let resp = builder
            .send()
            .await
            .map_err(|err| transport_error(&method, &url, err))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|err| transport_error(&method, &url, err))?;

        Ok(TransportResponse {
            status,
            headers,
            body: body.to_vec(),
            meta: ResponseMeta::default(),
        })
    }
}
