use anyhow::{anyhow, Context, Result};
use clap::Parser;
use linkchecker::{setup_logging, validate_config, Cli, CliRunner, Config, PrometheusExporter};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let args = Cli::parse();

    let config = load_config(&args).await?;

    let _log_guard = setup_logging(
        &config.logging.level,
        args.verbose,
        config.logging.file_path.as_deref(),
    )?;

    info!("Starting linkchecker v{}", env!("CARGO_PKG_VERSION"));
    info!(
        workers = config.worker_count,
        probe_timeout = ?config.probe.timeout,
        storage = %config.storage.file_path.display(),
        "Configuration loaded successfully"
    );

    // The recorder must be installed before any metric handle is registered
    if let Some(port) = config.metrics_port {
        PrometheusExporter::new(port)
            .start()
            .map_err(|e| anyhow!("failed to start metrics exporter: {e}"))?;
    }

    let shutdown = CancellationToken::new();
    let _shutdown_handler = setup_shutdown_handler(shutdown.clone());

    let cli_runner = CliRunner::new(config, shutdown)?;

    if let Err(e) = cli_runner.run(args.command).await {
        error!("Application error: {:#}", e);
        std::process::exit(1);
    }

    info!("linkchecker stopped");
    Ok(())
}

async fn load_config(args: &Cli) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            Config::from_json(&content)?
        }
        None => Config::default(),
    };

    config.apply_env()?;
    args.apply_overrides(&mut config);
    validate_config(&config)?;

    Ok(config)
}

fn setup_shutdown_handler(shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for SIGINT: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("Failed to create SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT");
            }
            _ = terminate => {
                info!("Received SIGTERM");
            }
        }

        shutdown.cancel();
    })
}
