//! # Solidrock REST Source
//!
//! HTTP implementation of [`RemoteSource`](solidrock_connector::traits::RemoteSource)
//! for the Solidrock API.
//!
//! Every call is a form-encoded `POST` carrying the API key, authenticated
//! with HTTP Basic credentials. Detail calls add the record `id`.
//!
//! ## Example
//!
//! ```ignore
//! use solidrock_connector::prelude::*;
//! use solidrock_connector_rest::{RestConfig, RestRemoteSource};
//!
//! let config = RestConfig::new("https://api.solidrock.example/", "api-key")
//!     .with_basic_auth("sync", "secret");
//!
//! let source = RestRemoteSource::new(config)?;
//! let gatherings = source.list_all(Collection::Churches).await?;
//! ```

pub mod config;
pub mod connector;

// Re-exports
pub use config::{RestConfig, RetryConfig};
pub use connector::RestRemoteSource;
