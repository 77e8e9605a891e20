//! Async Jenkins REST client.
//!
//! - [`JobPath`] turns any way of naming a job (`a/b`, `/job/a/job/b/`,
//!   `https://ci/job/a/job/b`) into one canonical form.
//! - [`poll::wait_while`] and [`poll::wait_for`] drive bounded waits: queue
//!   item to build, build start, build completion.
//! - [`LogStream`] follows a console log as it grows, chunk by chunk.
//!
//! ```no_run
//! use jenkins_client::{BuildRequest, Client, LogStreamOptions, PollOptions};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), jenkins_client::Error> {
//! let client = Client::builder("https://ci.example.com")?
//!     .auth_basic("alice", "api-token")
//!     .build()?;
//!
//! let poll = PollOptions::default().timeout(Duration::from_secs(300));
//! let id = client.jobs().build("folder/app", BuildRequest::new()).await?;
//! let item = client.queue().wait_for_executable(id, poll).await?;
//!
//! if let Some(executable) = item.executable {
//!     client
//!         .builds()
//!         .log_stream("folder/app", executable.number, LogStreamOptions::default())
//!         .finish(|chunk| print!("{chunk}"))
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod log_stream;
pub mod poll;
pub mod transport;
pub mod types;
mod util;

pub use api::{BuildLog, BuildRequest, BuildsService, JobsService, LogOptions, QueueService};
pub use auth::{Auth, SecretString};
pub use client::{Client, ClientBuilder};
pub use error::{BodySnippetConfig, Error, ErrorKind, HttpError, Result, TransportErrorKind};
pub use log_stream::{LogSource, LogStream, LogStreamOptions};
pub use poll::{PollOptions, PollOutcome};
pub use types::*;
