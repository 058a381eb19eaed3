//! Axum server for the credit-application webhook API
//!
//! Exposes the signing-provider callback endpoint over an engine
//! [`WebhookIngestor`]. Signature verification needs the raw request body,
//! so the handler extracts bytes rather than a typed JSON body.

#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use creditkit::webhook::WebhookIngestor;
use router_handlers::*;
use tower_http::trace::TraceLayer;

mod router_handlers;

/// Shared state for the webhook API
#[derive(Debug, Clone)]
pub struct ApiState {
    ingestor: Arc<WebhookIngestor>,
}

/// Create the webhook [`Router`]
pub fn create_webhook_router(ingestor: Arc<WebhookIngestor>) -> Router {
    let state = ApiState { ingestor };

    Router::new()
        .route("/api/firmas/webhook", post(post_firma_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
