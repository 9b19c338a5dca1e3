//! DataJud search client: validated configuration, a transport seam and the
//! search-after pagination loop.

mod error;

pub mod backend;
pub mod config;
pub mod fetch;

#[cfg(feature = "http")]
pub mod http;

pub use backend::SearchBackend;
pub use config::{ApiKey, ClientConfig, ConfigError};
pub use error::SearchError;
pub use fetch::{FetchOutcome, Fetcher, StopReason};

#[cfg(feature = "http")]
pub use http::SearchClient;
