//! Demo service.
//!
//! Serves a couple of routes on the primary listener and exposes their
//! request metrics on the exposition listener.
//!
//! ```text
//! :3000  GET /hello, GET /canals/{id}   (instrumented)
//! :3001  GET /armory-observability/metrics
//! ```

use std::path::PathBuf;

use axum::{extract::Path, routing::get, Router};
use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use svc_observability::{ApplicationContext, Shutdown};

#[derive(Parser)]
#[command(name = "svc-observability")]
#[command(about = "Demo service with metrics exposition and leveled logging")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "svc_observability=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let shutdown = Shutdown::new();
    let ctx = ApplicationContext::from_path(&cli.config, shutdown.clone())?;

    let logger = ctx.logger().with_field("service", json!(ctx.config().service_name));
    logger.info("starting");

    let router = Router::new()
        .route("/hello", get(|| async { "hello" }))
        .route(
            "/canals/{id}",
            get(|Path(id): Path<String>| async move { format!("canal {id}") }),
        );

    // Either server stopping on its own takes the other one down with it.
    let metrics = async {
        let result = ctx.collect_metrics().await;
        shutdown.trigger();
        result
    };
    let http = async {
        let result = ctx.start(router).await;
        shutdown.trigger();
        result
    };
    let (metrics_result, http_result) = tokio::join!(metrics, http);

    if let Err(e) = metrics_result.and(http_result) {
        logger.fatal_fmt(format_args!("server failed: {e}"));
    }

    logger.info("shutdown complete");
    Ok(())
}
