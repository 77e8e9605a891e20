//! Turning failed responses into [`Error`] values without leaking secrets.

use super::url::sanitize_url_for_error;
use crate::{Auth, BodySnippetConfig, Error, HttpError};
use http::{HeaderMap, Method, StatusCode};
use std::time::{Duration, SystemTime};
use url::Url;

pub(crate) fn request_id(headers: &HeaderMap) -> Option<Box<str>> {
    for name in ["x-request-id", "x-correlation-id", "x-jenkins-session"] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.into());
            }
        }
    }
    None
}

/// Jenkins reports errors either as a JSON `message` or in an `X-Error` header.
pub(crate) fn extract_message(headers: &HeaderMap, body: &[u8]) -> Option<Box<str>> {
    let from_body = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error", "Message", "Error"]
                .into_iter()
                .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_owned))
        });

    from_body
        .or_else(|| {
            headers
                .get("x-error")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        })
        .map(|msg| msg.trim().to_owned())
        .filter(|msg| !msg.is_empty())
        .map(String::into_boxed_str)
}

pub(crate) fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

pub(crate) fn redact_text(text: String, auth: Option<&Auth>) -> String {
    match auth.map(Auth::secret) {
        Some(secret) if !secret.is_empty() => text.replace(secret, "<redacted>"),
        _ => text,
    }
}

pub(crate) fn body_snippet(
    body: &[u8],
    config: BodySnippetConfig,
    auth: Option<&Auth>,
) -> Option<Box<str>> {
    if !config.enabled {
        return None;
    }
    let body = String::from_utf8_lossy(body);
    let snippet = truncate_utf8(&body, config.max_bytes).to_owned();
    Some(redact_text(snippet, auth).into_boxed_str())
}

pub(crate) fn parse_retry_after(headers: &HeaderMap, now: SystemTime) -> Option<Duration> {
    let text = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = text.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = httpdate::parse_http_date(text).ok()?;
    Some(at.duration_since(now).unwrap_or(Duration::ZERO))
}

/// Everything needed to describe a non-2xx response.
pub(crate) struct FailedResponse<'a> {
    pub method: &'a Method,
    pub url: &'a Url,
    pub status: StatusCode,
    pub headers: &'a HeaderMap,
    pub body: &'a [u8],
}

pub(crate) fn http_failure(
    resp: FailedResponse<'_>,
    snippet: BodySnippetConfig,
    auth: Option<&Auth>,
) -> Error {
    let message = extract_message(resp.headers, resp.body)
        .map(|msg| redact_text(msg.into(), auth).into_boxed_str());
    let error = HttpError {
        status: resp.status,
        method: resp.method.clone(),
        url: Box::new(sanitize_url_for_error(resp.url)),
        message,
        request_id: request_id(resp.headers),
        body_snippet: body_snippet(resp.body, snippet, auth),
    };
    Error::from_http(error, parse_retry_after(resp.headers, SystemTime::now()))
}
