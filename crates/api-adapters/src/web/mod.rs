//! # Axum router
//!
//! Wires the services into an axum `Router`. Handlers stay thin: extract,
//! call one service operation, count the outcome, serialize.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use services::{Ports, ProfileService, ThoughtService};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::dto::FeedLimits;
use crate::metrics::Metrics;

pub mod extract;
pub mod handlers;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub thoughts: Arc<ThoughtService>,
    pub profiles: Arc<ProfileService>,
    pub metrics: Arc<Metrics>,
    pub feed: FeedLimits,
}

impl AppState {
    pub fn new(ports: Ports, metrics: Arc<Metrics>, feed: FeedLimits) -> Self {
        Self {
            thoughts: Arc::new(ThoughtService::new(ports.clone())),
            profiles: Arc::new(ProfileService::new(ports)),
            metrics,
            feed,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/api/feed", get(handlers::fetch_feed))
        .route("/api/thoughts", post(handlers::create_thought))
        .route(
            "/api/thoughts/{id}",
            get(handlers::fetch_thought).delete(handlers::delete_thought),
        )
        .route("/api/thoughts/{id}/comments", post(handlers::add_comment))
        .route("/api/users/{id}/thoughts", get(handlers::user_thoughts))
        .route(
            "/api/communities/{id}/thoughts",
            get(handlers::community_thoughts),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}
