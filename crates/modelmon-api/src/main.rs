mod args;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use modelmon_api::seed::SeedData;
use modelmon_api::{build_router, AppState, StoreConfig};
use modelmon_common::telemetry::{init_tracing, OtlpConfig};
use modelmon_store::{
    HttpStoreConnector, HttpStoreOptions, MemoryStoreConnector, RetryPolicy, StoreConnector,
};

use crate::args::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let telemetry = init_tracing(
        "modelmon-api",
        &OtlpConfig {
            endpoint: args.otlp_endpoint.clone(),
            token: args.otlp_token.clone(),
        },
    );

    let (connector, config): (Arc<dyn StoreConnector>, StoreConfig) = if args.in_memory {
        tracing::warn!("serving from in-memory stores; data is not persisted");
        let memory = MemoryStoreConnector::default();
        if let Some(path) = &args.seed_file {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading seed file {}", path.display()))?;
            SeedData::from_json(&raw)?
                .load(&args.container, &memory.kv, &memory.tsdb)
                .await?;
        }
        (Arc::new(memory), StoreConfig::in_memory(&args.container))
    } else {
        let config = StoreConfig::resolve(
            args.kv_api.as_deref(),
            args.tsdb_api.as_deref(),
            &args.container,
        )?;
        let connector = HttpStoreConnector::new(HttpStoreOptions {
            request_timeout: Duration::from_secs(args.store_timeout_secs),
            retry: RetryPolicy {
                max_attempts: args.store_attempts.max(1),
                ..RetryPolicy::default()
            },
            ..HttpStoreOptions::default()
        })?;
        (Arc::new(connector), config)
    };

    tracing::info!(
        listen_addr = %args.listen_addr,
        kv_api = %config.kv_api,
        tsdb_api = %config.tsdb_api,
        container = %config.container,
        otlp = telemetry.otlp_enabled(),
        "model monitoring api starting"
    );

    let app = build_router(AppState::new(connector, config));

    let listener = tokio::net::TcpListener::bind(&args.listen_addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await;

    telemetry.shutdown();
    served?;
    Ok(())
}
