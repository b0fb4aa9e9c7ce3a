//! HTTP client for the FileShare store.
//!
//! Speaks the upload, chunked-upload, group and lookup endpoints over
//! `reqwest`. Retries and per-call deadlines belong to the caller.

pub mod client;
pub mod error;

pub use client::{ByteProgress, Client, ClientConfig, Lookup};
pub use error::Error;
