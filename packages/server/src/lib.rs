//! Stimmap HTTP API
//!
//! This crate exposes the core services as a REST API. Endpoints are
//! organized into modular route modules merged into one router:
//!
//! - `state_endpoints`: versioned state reads and writes
//! - `project_endpoints`: project lifecycle and listings
//! - `permission_endpoints`: grant administration
//!
//! # Authentication
//!
//! Every request except the health check carries a bearer token. The
//! pluggable [`auth::IdentityResolver`] maps the token to a user uid; role
//! checks happen in the core services against the database, so the resolver
//! never decides authorization, only identity.

use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use std::sync::Arc;

use stimmap_core::{DatabaseService, PermissionService, ProjectService, StateService};

mod permission_endpoints;
mod project_endpoints;
mod state_endpoints;

pub mod auth;
mod http_error;

pub use auth::{AuthUser, IdentityResolver, StaticTokenResolver};
pub use http_error::HttpError;

/// Application state shared across all endpoints
///
/// Every service is internally `Arc`-backed, so cloning the state per
/// request is cheap. All handlers must go through `state_service` for
/// document writes; it owns the lock that serializes them.
#[derive(Clone)]
pub struct AppState {
    pub state_service: StateService,
    pub permission_service: PermissionService,
    pub project_service: ProjectService,
    pub identity: Arc<dyn IdentityResolver>,
}

impl AppState {
    /// Wire the full service stack over one database
    pub fn new(db: DatabaseService, identity: Arc<dyn IdentityResolver>) -> Self {
        let permission_service = PermissionService::new(db.clone());
        Self {
            state_service: StateService::new(db.clone(), permission_service.clone()),
            project_service: ProjectService::new(db, permission_service.clone()),
            permission_service,
            identity,
        }
    }
}

/// Health check response body
#[derive(serde::Serialize)]
struct HealthStatus {
    status: String,
    version: String,
}

async fn health_check() -> axum::Json<HealthStatus> {
    axum::Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Create the main application router with all endpoint modules
///
/// Uses axum's modular routing pattern; each endpoint module owns its
/// routes and gets merged here.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .merge(state_endpoints::routes(state.clone()))
        .merge(project_endpoints::routes(state.clone()))
        .merge(permission_endpoints::routes(state))
        .layer(cors_layer())
}

/// Create the CORS layer
///
/// Browser clients run on a separate origin in development. The allowed
/// origin is configurable via `CORS_ALLOW_ORIGIN`; default is the local
/// web client.
fn cors_layer() -> tower_http::cors::CorsLayer {
    let origin = std::env::var("CORS_ALLOW_ORIGIN")
        .unwrap_or_else(|_| "http://localhost:5173".to_string());

    let origin = origin
        .parse::<header::HeaderValue>()
        .unwrap_or(header::HeaderValue::from_static("http://localhost:5173"));

    tower_http::cors::CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(false)
}

/// Start the HTTP server
///
/// # Errors
///
/// Returns an error if the listener fails to bind or the server exits
/// abnormally.
pub async fn start_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("127.0.0.1:{}", port);
    tracing::info!("Stimmap API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
