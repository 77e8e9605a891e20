use crate::ErrorKind;
use http::{Method, StatusCode};
use std::time::Duration;

pub(crate) struct InFlightGuard {
    gauge: metrics::Gauge,
}

impl InFlightGuard {
    pub(crate) fn new() -> Self {
        let gauge = metrics::gauge!("jenkins_client_inflight");
        gauge.increment(1.0);
        Self { gauge }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.decrement(1.0);
    }
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

fn error_kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Auth => "auth",
        ErrorKind::NotFound => "not_found",
        ErrorKind::Conflict => "conflict",
        ErrorKind::RateLimited => "rate_limited",
        ErrorKind::Api => "api",
        ErrorKind::Transport => "transport",
        ErrorKind::Decode => "decode",
        ErrorKind::InvalidConfig => "invalid_config",
        ErrorKind::Timeout => "timeout",
    }
}

pub(crate) fn record_request(
    method: &Method,
    status: Option<StatusCode>,
    latency: Duration,
    crumb_refreshed: bool,
    error_kind: Option<ErrorKind>,
) {
    let method = metrics::SharedString::from(method.to_string());
    let status_class = status.map(status_class).unwrap_or("transport");

    metrics::counter!(
        "jenkins_client_requests_total",
        "method" => method.clone(),
        "status_class" => status_class
    )
    .increment(1);
    metrics::histogram!(
        "jenkins_client_request_duration_seconds",
        "method" => method.clone(),
        "status_class" => status_class
    )
    .record(latency);

    if crumb_refreshed {
        metrics::counter!("jenkins_client_crumb_refreshes_total").increment(1);
    }

    if let Some(kind) = error_kind {
        metrics::counter!(
            "jenkins_client_errors_total",
            "method" => method,
            "kind" => error_kind_label(kind)
        )
        .increment(1);
    }
}

pub(crate) fn record_poll_attempt(satisfied: bool) {
    metrics::counter!(
        "jenkins_client_poll_attempts_total",
        "satisfied" => if satisfied { "true" } else { "false" }
    )
    .increment(1);
}

pub(crate) fn record_poll_timeout() {
    metrics::counter!("jenkins_client_poll_timeouts_total").increment(1);
}

pub(crate) fn record_log_chunk(bytes: usize) {
    metrics::counter!("jenkins_client_log_bytes_total").increment(bytes as u64);
}
