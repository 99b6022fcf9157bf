//! HTTP client for the extraction/chat/evaluation backend

pub mod client;
#[cfg(test)]
pub(crate) mod testing;

pub use client::{Backend, BackendClient, DeleteOutcome, DeleteStatus};
