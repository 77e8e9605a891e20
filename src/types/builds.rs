//! Payloads of the job, build and queue endpoints.
//!
//! Jenkins answers with loosely structured JSON whose keys depend on the
//! installed plugins. Only the fields the client inspects are typed; every
//! other key is kept verbatim in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of a finished build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
    #[serde(other)]
    Unknown,
}

/// `GET <job>/<build>/api/json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Build {
    pub number: u64,
    #[serde(default)]
    pub building: bool,
    #[serde(default)]
    pub result: Option<BuildResult>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where a queue item ended up once an executor picked it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Executable {
    pub number: u64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET /queue/item/<id>/api/json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct QueueItem {
    pub id: u64,
    #[serde(default)]
    pub why: Option<String>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub executable: Option<Executable>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET <job>/api/json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Job {
    #[serde(rename = "_class", default)]
    pub class: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// How hard to interrupt a running build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AbortKind {
    /// Ask the build to stop.
    #[default]
    Stop,
    /// Terminate a pipeline that ignored `Stop`.
    Term,
    /// Hard-kill a pipeline that ignored `Term`.
    Kill,
}

impl AbortKind {
    pub(crate) fn endpoint(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Term => "term",
            Self::Kill => "kill",
        }
    }
}

/// One response of `.../logText/progressiveText`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct ProgressiveText {
    /// Console output from the requested offset up to `size`.
    pub text: String,
    /// Total bytes available (`X-Text-Size`); the next request's `start`.
    pub size: u64,
    /// Whether the log may still grow (`X-More-Data: true`).
    pub more: bool,
}

impl ProgressiveText {
    #[must_use]
    pub fn new(text: impl Into<String>, size: u64, more: bool) -> Self {
        Self {
            text: text.into(),
            size,
            more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn queue_item_keeps_unknown_fields() {
        let item: QueueItem = serde_json::from_value(json!({
            "_class": "hudson.model.Queue$LeftItem",
            "id": 1790,
            "cancelled": false,
            "executable": {
                "_class": "org.jenkinsci.plugins.workflow.job.WorkflowRun",
                "number": 3,
                "url": "http://ci:8080/job/a/3/"
            }
        }))
        .unwrap();
        assert_eq!(item.executable.as_ref().map(|e| e.number), Some(3));
        assert_eq!(
            item.extra.get("_class").and_then(Value::as_str),
            Some("hudson.model.Queue$LeftItem")
        );
    }

    #[test]
    fn build_result_tolerates_new_values() {
        let build: Build = serde_json::from_value(json!({
            "number": 1,
            "building": false,
            "result": "SOMETHING_NEW"
        }))
        .unwrap();
        assert_eq!(build.result, Some(BuildResult::Unknown));

        let running: Build =
            serde_json::from_value(json!({ "number": 2, "building": true, "result": null }))
                .unwrap();
        assert!(running.building);
        assert_eq!(running.result, None);
    }
}
