//! Startup wiring: stores, seeding, token service and the audit worker.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use schoolmart_admin::{BootstrapReport, ServiceContext, bootstrap};
use schoolmart_auth::Hs256TokenService;
use schoolmart_infra::{AuditConfig, AuditLog, AuditWorkerHandle, InMemoryStore, PgStore, Stores};

use crate::config::AppConfig;

/// Everything `main` (or a test server) owns for the life of the process.
#[derive(Debug)]
pub struct AppServices {
    pub ctx: ServiceContext,
    pub audit_worker: AuditWorkerHandle,
    pub bootstrap: BootstrapReport,
}

/// Connect storage, seed it, and start the audit worker.
///
/// Fails if the database is unreachable or seeding does not complete; the
/// process must not serve requests in either case.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let stores = match &config.database_url {
        Some(url) => {
            let pg = PgStore::connect(url, config.database_max_connections)
                .await
                .context("connecting to postgres")?;
            pg.migrate().await.context("applying schema")?;
            info!(max_connections = config.database_max_connections, "using postgres stores");
            Stores::from_backend(Arc::new(pg))
        }
        None => {
            info!("DATABASE_URL not set; using in-memory stores");
            Stores::from_backend(Arc::new(InMemoryStore::new()))
        }
    };

    let report = bootstrap(&stores, &config.bootstrap_config())
        .await
        .context("bootstrapping roles and root account")?;

    let (audit, audit_worker) = AuditLog::spawn(
        stores.op_logs.clone(),
        AuditConfig::default().with_capacity(config.audit_queue_capacity),
    );
    let tokens = Arc::new(Hs256TokenService::new(config.token_config()));

    Ok(AppServices {
        ctx: ServiceContext::new(stores, tokens, audit),
        audit_worker,
        bootstrap: report,
    })
}
