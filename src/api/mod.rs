//! Jenkins REST services.
//!
//! Reached through accessors on [`Client`](crate::Client):
//! - `Client::jobs()`: read jobs, trigger builds
//! - `Client::builds()`: build state, abort/delete, console logs, waits
//! - `Client::queue()`: queue items and waiting for an executor

pub mod builds;
pub mod jobs;
pub mod queue;

pub use builds::*;
pub use jobs::*;
pub use queue::*;
