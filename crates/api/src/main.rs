use std::time::Duration;

use cellar_vault::{Db, InMemoryKeyCustody, VaultConfig, VaultService};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let db_path = std::env::var("VAULT_DB_PATH").unwrap_or_else(|_| "cellar.sqlite3".to_string());
    let bind_address = std::env::var("VAULT_BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let db = Db::open(&db_path).expect("failed to open vault database");
    let custody = InMemoryKeyCustody::generate().expect("failed to generate master key");
    let config = VaultConfig::from_env();
    let service = VaultService::new(db, Box::new(custody), config);

    let server = cellar_api::init_api_server(service, &bind_address)
        .await
        .expect("failed to bind API server");

    let scheduler_service = server.service_handle();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            let now = time::OffsetDateTime::now_utc();
            let mut service = scheduler_service.lock().await;
            if let Err(err) = service.run_scheduler_tick(now) {
                tracing::warn!(error = %err, "scheduled rotation tick failed");
            }
        }
    });

    server.serve().await.expect("API server terminated unexpectedly");
}
