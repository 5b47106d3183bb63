//! docgen: Batch Document Generation
//!
//! Drives a content generator over an ordered list of requested documents, persists one
//! artifact per attempted document (falling back to a placeholder when generation fails),
//! streams ordered progress events to the caller, and tracks the whole batch as a single
//! request with its own lifecycle.

pub mod adapter;
pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod progress;
pub mod provider;
pub mod request;
pub mod store;
pub mod template;
pub mod types;
