pub mod auth;
pub mod error;
pub mod handlers;
pub mod models;
pub mod server;

pub use auth::{AuthState, TokenClaims};
pub use error::{ApiError, ApiResult};
pub use server::{ApiServer, AppState, build_router};

use cellar_vault::VaultService;

/// Initializes the API server, binding a `VaultService` (already wired to a
/// `Db` and `KeyCustody`) to `bind_address`.
///
/// # Errors
///
/// Returns an error if the server fails to bind to `bind_address`.
pub async fn init_api_server(service: VaultService, bind_address: &str) -> std::io::Result<ApiServer> {
    ApiServer::new(service, bind_address).await
}
