//! CUSTOS Server — Application entry point.
//!
//! Boots logging, connects to SurrealDB, applies migrations, and runs
//! the periodic audit retention sweep until shutdown. The HTTP surface
//! is wired separately; this binary owns the background lifecycle.

use std::env;
use std::time::Duration;

use custos_audit::{AuditService, SweepConfig};
use custos_db::repository::SurrealAuditRecordRepository;
use custos_db::{DbConfig, DbManager};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Server configuration, read from the environment.
#[derive(Debug, Clone)]
struct ServerConfig {
    db: DbConfig,
    /// Seconds between audit retention sweeps.
    sweep_interval_secs: u64,
    /// Tenants to sweep, comma-separated UUIDs in `CUSTOS_TENANTS`.
    tenants: Vec<Uuid>,
}

impl ServerConfig {
    fn from_env() -> Self {
        let defaults = DbConfig::default();
        let db = DbConfig {
            url: env::var("CUSTOS_DB_URL").unwrap_or(defaults.url),
            namespace: env::var("CUSTOS_DB_NAMESPACE").unwrap_or(defaults.namespace),
            database: env::var("CUSTOS_DB_DATABASE").unwrap_or(defaults.database),
            username: env::var("CUSTOS_DB_USERNAME").unwrap_or(defaults.username),
            password: env::var("CUSTOS_DB_PASSWORD").unwrap_or(defaults.password),
        };

        let sweep_interval_secs = env::var("CUSTOS_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        let tenants = env::var("CUSTOS_TENANTS")
            .map(|raw| {
                raw.split(',')
                    .filter_map(|s| Uuid::parse_str(s.trim()).ok())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            db,
            sweep_interval_secs,
            tenants,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("custos=info".parse().unwrap()))
        .json()
        .init();

    tracing::info!("Starting CUSTOS server...");

    let config = ServerConfig::from_env();

    let manager = match DbManager::connect(&config.db).await {
        Ok(m) => m,
        Err(err) => {
            tracing::error!(error = %err, "failed to connect to SurrealDB");
            return;
        }
    };

    if let Err(err) = custos_db::run_migrations(manager.client()).await {
        tracing::error!(error = %err, "migrations failed");
        return;
    }

    let audit_service = AuditService::new(
        SurrealAuditRecordRepository::new(manager.client().clone()),
        SweepConfig::default(),
    );

    let mut sweep_timer = tokio::time::interval(Duration::from_secs(config.sweep_interval_secs));
    // The first tick fires immediately; skip it.
    sweep_timer.tick().await;

    tracing::info!(
        interval_secs = config.sweep_interval_secs,
        tenants = config.tenants.len(),
        "CUSTOS server running"
    );

    loop {
        tokio::select! {
            _ = sweep_timer.tick() => {
                for tenant_id in &config.tenants {
                    let deleted = audit_service.run_retention_sweep(*tenant_id).await;
                    tracing::info!(%tenant_id, deleted, "audit retention sweep complete");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    tracing::info!("CUSTOS server stopped.");
}
