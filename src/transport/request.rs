use crate::JobPath;
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::borrow::Cow;

/// Endpoint-relative request built by the services.
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    /// Unencoded path segments below the base URL.
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub headers: HeaderMap,
}

impl Request {
    #[must_use]
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            form: Vec::new(),
            headers: HeaderMap::new(),
        }
    }

    #[must_use]
    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::GET, segments)
    }

    #[must_use]
    pub fn post<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::POST, segments)
    }

    /// Request below a job: `<job path>/<tail...>`.
    #[must_use]
    pub fn job(method: Method, job: &JobPath, tail: &[&str]) -> Self {
        Self::new(method, job.url_segments().chain(tail.iter().copied()))
    }

    #[must_use]
    pub fn query_pair(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.query_pair(key, value),
            None => self,
        }
    }

    #[must_use]
    pub fn has_query(&self, key: &str) -> bool {
        self.query.iter().any(|(k, _)| k == key)
    }

    #[must_use]
    pub fn form_pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.form
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

#[derive(Clone, Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    #[must_use]
    pub fn text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_request_prefixes_delimited_segments() {
        let job = JobPath::parse("folder/my-job");
        let req = Request::job(Method::GET, &job, &["42", "api", "json"]);
        assert_eq!(
            req.segments,
            ["job", "folder", "job", "my-job", "42", "api", "json"]
        );
        assert_eq!(req.method, Method::GET);
    }

    #[test]
    fn optional_query_pairs_are_skipped() {
        let req = Request::get(["api", "json"])
            .query_opt("tree", Some("jobs[name]"))
            .query_opt("depth", None::<String>);
        assert!(req.has_query("tree"));
        assert!(!req.has_query("depth"));
    }
}
