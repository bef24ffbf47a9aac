use std::sync::Arc;

use axum_test::TestServer;
use cellar_vault::{Db, InMemoryKeyCustody, VaultConfig, VaultService};
use tokio::sync::Mutex;

use cellar_api::{AppState, AuthState, build_router};

/// An in-memory vault wired up behind the real router, for exercising the
/// HTTP surface without touching disk.
pub struct TestContext {
    pub server: TestServer,
    pub auth: AuthState,
}

impl TestContext {
    pub fn new() -> Self {
        let db = Db::open_in_memory().expect("open in-memory db");
        let custody = InMemoryKeyCustody::generate().expect("generate master key");
        let service = VaultService::new(db, Box::new(custody), VaultConfig::default());

        let auth = AuthState::new();
        let state = Arc::new(AppState {
            service: Arc::new(Mutex::new(service)),
            auth: auth.clone(),
        });

        let app = build_router(state);
        let server = TestServer::new(app).expect("build test server");

        Self { server, auth }
    }

    pub fn superuser_token(&self) -> String {
        self.auth.generate_token("root", true).unwrap()
    }

    pub fn user_token(&self, user_id: &str) -> String {
        self.auth.generate_token(user_id, false).unwrap()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
