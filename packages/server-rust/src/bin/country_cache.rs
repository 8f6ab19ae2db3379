//! country-cache: HTTP server caching country and exchange-rate data.
//!
//! Every flag also reads an environment variable (see `--help`); a `.env`
//! file in the working directory is loaded first.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use country_cache_core::UniformMultiplier;
use country_cache_server::config::LogFormat;
use country_cache_server::gateway::HttpGateway;
use country_cache_server::{open_store, NetworkModule, RefreshService, ServerArgs, SummaryRenderer};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = ServerArgs::parse();
    args.validate()?;
    init_tracing(args.log_format);

    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install Prometheus exporter")?;
        info!(%addr, "metrics exporter listening");
    }

    let mut network = NetworkModule::new(args.network());
    let port = network.start().await?;

    let store = open_store(&args.storage())
        .await
        .context("failed to open country store")?;
    let gateway =
        HttpGateway::new(args.upstream()).context("failed to build upstream HTTP client")?;
    let summary = Arc::new(SummaryRenderer::new(args.summary().image_path()));
    let refresh = RefreshService::new(
        Arc::clone(&store),
        Arc::new(gateway),
        Arc::new(UniformMultiplier),
        Arc::clone(&summary),
    );

    let state = network.app_state(
        store,
        Arc::new(refresh),
        summary.image_path().to_path_buf(),
    );
    let router = network.build_router(state);

    info!(port, "country cache server starting");
    network.serve(router, wait_for_shutdown()).await
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,country_cache_server=debug".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
