//! Outbound HTTP call tracking
//!
//! [`TrackedTransport`] decorates any [`HttpTransport`] so every outbound call
//! is recorded into a [`DevtoolsStore`](devtools_store::DevtoolsStore) and,
//! optionally, forwarded to the devtools ingest endpoint. The decorator hands
//! back exactly what the wrapped transport produced, errors included.
//!
//! ```ignore
//! use devtools_client::{ClientConfig, HyperTransport, TrackedTransport};
//! use devtools_store::DevtoolsStore;
//!
//! let config = ClientConfig::builder()
//!     .ingest_url("http://127.0.0.1:3000/api/__agent/requests")
//!     .build()?;
//! let transport = TrackedTransport::new(HyperTransport::new(), config, DevtoolsStore::new());
//! let response = transport.send(request).await?;
//! ```

pub mod config;
pub mod forwarder;
pub mod tracker;
pub mod transport;

pub use config::{ClientConfig, ClientConfigBuilder, ConfigError};
pub use forwarder::Forwarder;
pub use tracker::TrackedTransport;
pub use transport::{HttpTransport, HyperTransport, TransportError};
