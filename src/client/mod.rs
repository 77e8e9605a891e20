//! Client construction and request execution.

pub mod async_client;

pub use async_client::{Client, ClientBuilder};
