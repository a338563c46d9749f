use anyhow::Context;
use std::sync::Arc;

use store_server::collaborators::{
    FlagMaintenanceGate, FsEvidenceStore, InMemoryCatalog, LogNotificationSink, ProductInfo,
    StaticSessionGate,
};
use store_server::core::{Config, Server, ServerState};
use store_server::storage::RedbStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment: dotenv, working directory, logging
    dotenv::dotenv().ok();
    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("Failed to create work dir {}", config.work_dir))?;
    store_server::init_logger_with_file(
        std::env::var("LOG_LEVEL").ok().as_deref(),
        config.log_dir.as_deref(),
    );

    tracing::info!("Store server starting");

    // 2. Storage
    let kv = Arc::new(RedbStore::open(config.db_path()).context("Failed to open database")?);

    // 3. Collaborators. Session and catalog data come from seed files; a
    //    deployment with real upstream services swaps these out.
    let sessions = Arc::new(StaticSessionGate::new());
    load_sessions(&sessions)?;
    let catalog = Arc::new(InMemoryCatalog::new());
    load_catalog(&catalog)?;
    let evidence_dir = std::path::Path::new(&config.work_dir).join("evidence");

    let state = ServerState::new(
        config,
        kv,
        sessions,
        catalog,
        Arc::new(LogNotificationSink::new()),
        Arc::new(FsEvidenceStore::new(evidence_dir)),
        Arc::new(FlagMaintenanceGate::new()),
    );

    // 4. Serve until ctrl-c
    Server::new(state).run().await
}

/// Seed sessions from SESSIONS_PATH: a JSON map of token to identity
fn load_sessions(gate: &StaticSessionGate) -> anyhow::Result<()> {
    let Ok(path) = std::env::var("SESSIONS_PATH") else {
        tracing::warn!("SESSIONS_PATH not set; no sessions loaded");
        return Ok(());
    };
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read sessions file {path}"))?;
    let sessions: std::collections::HashMap<String, shared::models::Identity> =
        serde_json::from_str(&raw).context("Malformed sessions file")?;
    let count = sessions.len();
    for (token, identity) in sessions {
        gate.insert(token, identity);
    }
    tracing::info!(count, "Sessions loaded");
    Ok(())
}

/// Seed the catalog from CATALOG_PATH: a JSON array of products
fn load_catalog(catalog: &InMemoryCatalog) -> anyhow::Result<()> {
    let Ok(path) = std::env::var("CATALOG_PATH") else {
        tracing::warn!("CATALOG_PATH not set; catalog is empty");
        return Ok(());
    };
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read catalog file {path}"))?;
    let products: Vec<ProductInfo> = serde_json::from_str(&raw).context("Malformed catalog file")?;
    let count = products.len();
    for product in products {
        catalog.insert(product);
    }
    tracing::info!(count, "Catalog loaded");
    Ok(())
}
