//! Lookout Common Library
//!
//! Query model, normalization, aggregation compiler, time windows,
//! pagination and the credential-scoped backend client for the Lookout
//! telemetry tools.

pub mod aggregate;
pub mod args;
pub mod client;
pub mod client_cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod pagination;
pub mod query;
pub mod timerange;
pub mod types;

#[cfg(test)]
mod aggregate_test;
#[cfg(test)]
mod filter_test;

pub use client::BackendClient;
pub use client_cache::BackendClientCache;
pub use config::Config;
pub use error::{Error, Result};
pub use types::{QuerySpec, RequestType, Signal, StructuredQuery};
