use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use titlecheck_common::observability::{init_logging, LogConfig, LogFormat};
use titlecheck_config::{TitlecheckConfig, TitlecheckConfigLoader};
use titlecheck_web::{run_server, state::AppState};

/// Clickbait headline checker web UI.
#[derive(Debug, Parser)]
#[command(name = "titlecheck", version)]
struct Args {
    /// YAML config file; missing is fine, `TITLECHECK_*` env vars still apply.
    #[arg(long, default_value = "titlecheck.yaml")]
    config: PathBuf,

    /// Address to listen on (overrides `server.bind`).
    #[arg(long, env = "TITLECHECK_BIND")]
    bind: Option<String>,

    /// `text` or `json` (overrides `logging.format`).
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1) Load config (env wins)
    let cfg: TitlecheckConfig = TitlecheckConfigLoader::new()
        .with_optional_file(&args.config)
        .load()
        .with_context(|| format!("loading {}", args.config.display()))?;

    // 2) Logging
    let log_path = init_logging(LogConfig {
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.emit_stderr,
        format: args.log_format.unwrap_or(cfg.logging.format),
        ..LogConfig::default()
    })?;
    tracing::info!(log = %log_path.display(), config = %args.config.display(), "titlecheck.start");

    // Requests may still pick another provider, so this only warns.
    match cfg.llm.resolve() {
        Ok(llm) => tracing::info!(
            provider = cfg.llm.provider.as_str(),
            model = llm.model().unwrap_or_default(),
            "llm.default_ready"
        ),
        Err(e) => tracing::warn!(
            provider = cfg.llm.provider.as_str(),
            error = %e,
            "llm.default_unconfigured"
        ),
    }

    let bind = args.bind.unwrap_or(cfg.server.bind);
    run_server(AppState::new(cfg.llm), &bind).await
}
