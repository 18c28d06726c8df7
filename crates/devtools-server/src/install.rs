//! Wiring devtools into a host application

use axum::Router;
use devtools_store::DevtoolsStore;
use tracing::info;

use crate::api::debug_router;
use crate::config::DevtoolsConfig;
use crate::middleware::RequestTrackingLayer;

/// Mount the debug endpoints and the tracking layer on `app`
///
/// Outside development (or when disabled) `app` is returned untouched: no
/// debug route exists and no request is observed.
pub fn install(app: Router, config: &DevtoolsConfig, store: DevtoolsStore) -> Router {
    if !config.is_active() {
        info!(
            "Agent devtools inactive (enabled: {}, dev: {})",
            config.enabled, config.dev
        );
        return app;
    }

    info!("Agent devtools mounted at {}", config.debug_prefix);

    app.nest(&config.debug_prefix, debug_router(store.clone()))
        .layer(RequestTrackingLayer::new(store, config.tracking.clone()))
}
