//! Normalisation of user supplied job references.
//!
//! Jenkins addresses a job nested in folders as
//! `/job/<folder>/job/<sub-folder>/job/<job>/`. Users tend to pass anything
//! from a bare name (`my-job`), a slash path (`folder/my-job`), the wire
//! form itself, or a URL copied from the browser. [`JobPath`] accepts all of
//! them and never fails: input it cannot make sense of resolves to the root.
//!
//! A job or folder literally named `job` is only reachable through the
//! delimited form (`/job/job/`), because a bare `job` token is read as the
//! delimiter.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{borrow::Cow, fmt};
use url::Url;

const DELIMITER: &str = "job";

/// Parsed reference to a job or folder.
///
/// ```
/// use jenkins_client::JobPath;
///
/// assert_eq!(JobPath::parse("/my-folder/my-job").path(), "/job/my-folder/job/my-job/");
/// assert_eq!(JobPath::parse("http://ci:8080/job/a/job/b/12/").pretty_path(), "a/b");
/// assert_eq!(JobPath::parse("job").path(), "");
/// assert_eq!(JobPath::parse("/job/job/").name(), "job");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobPath {
    segments: Vec<String>,
}

impl JobPath {
    /// Parse any supported job reference. Never fails.
    #[must_use]
    pub fn parse(input: impl AsRef<str>) -> Self {
        let (has_host, raw) = path_component(input.as_ref());
        let tokens: Vec<Cow<'_, str>> = raw
            .split('/')
            .filter(|token| !token.is_empty())
            // Jenkins rejects `%` in job names, so every token can be decoded.
            .map(|token| urlencoding::decode(token).unwrap_or(Cow::Borrowed(token)))
            .collect();

        let segments = if tokens.iter().any(|token| token == DELIMITER) {
            scan_delimited(&tokens)
        } else if has_host {
            // A URL without any `/job/` marker points at the controller itself.
            Vec::new()
        } else {
            tokens.into_iter().map(Cow::into_owned).collect()
        };

        Self { segments }
    }

    /// The top-level folder of the controller.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a reference from already separated names, root first.
    ///
    /// Empty names are skipped; names are taken literally, so `job` is a
    /// valid name here.
    #[must_use]
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments
                .into_iter()
                .map(Into::into)
                .filter(|segment: &String| !segment.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Canonical wire path: `""` for the root, else `/job/a/job/b/`.
    #[must_use]
    pub fn path(&self) -> String {
        if self.segments.is_empty() {
            return String::new();
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            out.push_str(DELIMITER);
            out.push('/');
            out.push_str(segment);
        }
        out.push('/');
        out
    }

    /// Human readable path: `a/b`.
    #[must_use]
    pub fn pretty_path(&self) -> String {
        self.segments.join("/")
    }

    /// Leaf name, `""` for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Enclosing folder. The root is its own parent.
    #[must_use]
    pub fn parent(&self) -> Self {
        let keep = self.segments.len().saturating_sub(1);
        Self {
            segments: self.segments[..keep].to_vec(),
        }
    }

    /// Reference to `name` inside this folder.
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        let name = name.into();
        if !name.is_empty() {
            segments.push(name);
        }
        Self { segments }
    }

    /// Unencoded URL segments: `["job", "a", "job", "b"]`.
    pub(crate) fn url_segments(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .flat_map(|segment| [DELIMITER, segment.as_str()])
    }
}

/// Extract the path part of `input` and whether it carried an authority.
fn path_component(input: &str) -> (bool, Cow<'_, str>) {
    match Url::parse(input) {
        Ok(url) => (url.has_host(), Cow::Owned(url.path().to_owned())),
        Err(_) => {
            let end = input.find(['?', '#']).unwrap_or(input.len());
            (false, Cow::Borrowed(&input[..end]))
        }
    }
}

/// Collect names that follow a `job` delimiter, stopping at the first
/// trailing token that is neither (build numbers, `api/json`, ...).
fn scan_delimited(tokens: &[Cow<'_, str>]) -> Vec<String> {
    let mut segments = Vec::new();
    let mut expect_name = false;
    for token in tokens {
        if expect_name {
            segments.push(token.to_string());
            expect_name = false;
        } else if token == DELIMITER {
            expect_name = true;
        } else if !segments.is_empty() {
            break;
        }
    }
    segments
}

impl fmt::Display for JobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty_path())
    }
}

impl Serialize for JobPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.path())
    }
}

impl<'de> Deserialize<'de> for JobPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Cow::<'de, str>::deserialize(deserializer)?;
        Ok(Self::parse(raw))
    }
}

impl From<&str> for JobPath {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for JobPath {
    fn from(value: String) -> Self {
        Self::parse(value)
    }
}

impl From<&String> for JobPath {
    fn from(value: &String) -> Self {
        Self::parse(value)
    }
}

impl From<&JobPath> for JobPath {
    fn from(value: &JobPath) -> Self {
        value.clone()
    }
}

macro_rules! job_path_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for JobPath {
                fn from(value: $ty) -> Self {
                    Self::parse(value.to_string())
                }
            }
        )*
    };
}

job_path_from_int!(u16, u32, u64, usize, i32, i64);
