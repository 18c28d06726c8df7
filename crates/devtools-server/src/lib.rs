//! Server side of agent devtools
//!
//! - [`RequestTrackingLayer`]: tower middleware recording inbound API requests
//!   once their response has been fully produced
//! - [`debug_router`]: the debug endpoints over a [`DevtoolsStore`](devtools_store::DevtoolsStore)
//! - [`install`]: mounts both on a host router, only in development
//!
//! # Example
//!
//! ```ignore
//! use devtools_server::{install, DevtoolsConfig};
//! use devtools_store::DevtoolsStore;
//!
//! let config = DevtoolsConfig::builder().dev(true).build()?;
//! let app = install(app, &config, DevtoolsStore::new());
//! ```

pub mod api;
pub mod config;
mod install;
pub mod middleware;

pub use api::{debug_router, ApiDoc, ApiError, MarkdownExport};
pub use config::{ConfigError, DevtoolsConfig, DevtoolsConfigBuilder, TrackingConfig};
pub use install::install;
pub use middleware::{CompletionBody, RequestTracking, RequestTrackingLayer};
