use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::http::header::CONTENT_TYPE;
use axum::routing::{get, post};
use axum::{Router, middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use cellar_vault::VaultService;

use crate::auth::{AuthState, auth_middleware};
use crate::handlers;

pub struct ApiServer {
    app: Router,
    listener: TcpListener,
    state: Arc<AppState>,
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Mutex<VaultService>>,
    pub auth: AuthState,
}

impl ApiServer {
    /// # Errors
    ///
    /// Returns an error if the TCP binding to `bind_address` fails.
    pub async fn new(service: VaultService, bind_address: &str) -> std::io::Result<Self> {
        let state = Arc::new(AppState {
            service: Arc::new(Mutex::new(service)),
            auth: AuthState::new(),
        });

        let app = build_router(Arc::clone(&state));
        let listener = TcpListener::bind(bind_address).await?;
        info!(%bind_address, "API server will bind");

        Ok(Self { app, listener, state })
    }

    /// # Errors
    ///
    /// Returns an error if axum fails to serve the application.
    pub async fn serve(self) -> std::io::Result<()> {
        let addr = self.listener.local_addr()?;
        info!(%addr, "API server listening");
        warn!("API server does not terminate TLS itself; run it behind a reverse proxy in production");
        axum::serve(self.listener, self.app).await
    }

    /// # Errors
    ///
    /// Returns an error if retrieving the local socket address fails.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Exposes the shared `VaultService` handle so the caller can drive the
    /// rotation scheduler tick on its own interval alongside `serve`.
    #[must_use]
    pub fn service_handle(&self) -> Arc<Mutex<VaultService>> {
        Arc::clone(&self.state.service)
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/auth/login", post(handlers::login))
        .route(
            "/api/v1/cells",
            get(handlers::list_cells).post(handlers::create_cell),
        )
        .route(
            "/api/v1/cells/{id}",
            get(handlers::get_cell)
                .patch(handlers::update_cell)
                .delete(handlers::delete_cell),
        )
        .route("/api/v1/cells/{id}/rotate", post(handlers::rotate_cell_key))
        .route(
            "/api/v1/cells/{id}/rotation-schedule",
            post(handlers::schedule_rotation),
        )
        .route("/api/v1/cells/{id}/audit", get(handlers::list_audit))
        .route(
            "/api/v1/cells/{id}/permissions",
            post(handlers::grant_permission),
        )
        .route(
            "/api/v1/cells/{id}/permissions/{user_id}",
            axum::routing::delete(handlers::revoke_permission),
        )
        .route(
            "/api/v1/cells/{id}/secrets/{key}",
            get(handlers::read_secret)
                .post(handlers::create_secret)
                .put(handlers::update_secret)
                .delete(handlers::delete_secret),
        )
        .layer(middleware::from_fn_with_state(Arc::clone(&state), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .with_state(state)
}
