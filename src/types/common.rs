//! Identifiers shared by the job, build and queue services.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A build selector: a number (`42`) or a permalink (`lastBuild`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildNumber(String);

impl BuildNumber {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn last_build() -> Self {
        Self::new("lastBuild")
    }
}

impl fmt::Display for BuildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BuildNumber {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BuildNumber {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

macro_rules! build_number_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for BuildNumber {
                fn from(value: $ty) -> Self {
                    Self(value.to_string())
                }
            }
        )*
    };
}

build_number_from_int!(u16, u32, u64, usize, i32, i64);

/// Id of an item in the build queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueItemId(u64);

impl QueueItemId {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Parse the id out of a `Location: .../queue/item/<id>/` header.
    #[must_use]
    pub fn from_location(location: &str) -> Option<Self> {
        let mut segments = location.split('/').filter(|s| !s.is_empty());
        segments.find(|s| *s == "item")?;
        segments.next()?.parse().ok().map(Self)
    }
}

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for QueueItemId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
