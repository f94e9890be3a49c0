//! Services layer.
//!
//! Services sit between callers and the provider adapters:
//!
//! ```text
//! Caller (CLI, embedding application)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//! Providers (Gmail, Graph, EWS adapters)
//! ```
//!
//! - [`RetrievalService`]: Routes batch and delete calls to registered adapters

mod retrieval_service;

pub use retrieval_service::RetrievalService;
