//! Shared request/response types.

pub mod builds;
pub mod common;
pub mod job_path;

pub use builds::*;
pub use common::*;
pub use job_path::*;
