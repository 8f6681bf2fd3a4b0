use std::sync::Arc;

mod acquire;
mod config;
mod errors;
mod health;
mod logging;
mod mcp;
mod pipeline;
mod stats;
mod summarize;

use crate::acquire::UrlFetcher;
use crate::config::AppConfig;
use crate::mcp::{HealthTarget, StdioMcpServer, SummaryService};
use crate::pipeline::Pipeline;
use crate::stats::SummaryStats;
use crate::summarize::build_summarizer;

// Blocking HTTP clients are built and dropped outside the runtime, so main is sync.
fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cfg = AppConfig::from_env_and_args();
    if let Err(e) = cfg.validate() {
        tracing::warn!(config_error=%e, "invalid config");
    }

    let summarizer = build_summarizer(&cfg.summary_backend, &cfg.backend_options());
    let pipeline = Pipeline::new(summarizer, cfg.min_input_chars);
    let fetcher = UrlFetcher::new(cfg.fetch_timeout(), cfg.max_upload_bytes)?;

    // Startup health checks (best-effort, logged only)
    let backend_health = health::check_backend(
        &cfg.summary_backend,
        &cfg.ollama_host,
        cfg.hosted_endpoint.as_deref(),
    );
    tracing::info!(
        summary_backend=%cfg.summary_backend,
        active_backend=%pipeline.backend_name(),
        backend_ok=backend_health.ok,
        default_preset=%cfg.default_preset().name(),
        max_upload_bytes=cfg.max_upload_bytes,
        "MCP server startup complete"
    );

    let service = Arc::new(SummaryService {
        pipeline,
        fetcher,
        stats: Arc::new(SummaryStats::new()),
        max_upload_bytes: cfg.max_upload_bytes,
        default_preset: cfg.default_preset(),
    });
    let server = StdioMcpServer::new(
        service,
        HealthTarget {
            backend: cfg.summary_backend.clone(),
            ollama_host: cfg.ollama_host.clone(),
            hosted_endpoint: cfg.hosted_endpoint.clone(),
        },
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        // Graceful shutdown without spawning (run future is not Send due to stdio locks)
        tokio::select! {
            res = server.run() => {
                if let Err(e) = res { tracing::error!(error=?e, "server terminated with error") }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal, stopping");
            }
        }
    });
    // stdin reads are blocking; do not wait on them at shutdown
    runtime.shutdown_background();
    Ok(())
}
