use crate::{parse_url_list, serve, validate_config, CheckContext, Config, LinkService};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "linkchecker")]
#[command(about = "Concurrent URL availability checker with numbered result groups")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, help = "Configuration file path (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Number of concurrent probe workers")]
    pub workers: Option<usize>,

    #[arg(long, help = "Probe timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Snapshot file path")]
    pub storage: Option<PathBuf>,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, help = "Expose Prometheus metrics on this port")]
    pub metrics_port: Option<u16>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check URLs and store them as a new group
    Check {
        #[arg(help = "URLs to check")]
        urls: Vec<String>,

        #[arg(short, long, help = "Input file containing URLs (one per line)")]
        input: Option<PathBuf>,

        #[arg(long, help = "Give up on the whole batch after this many seconds")]
        deadline: Option<u64>,
    },

    /// List every stored group
    List,

    /// Render a report for stored groups
    Report {
        #[arg(short, long, value_delimiter = ',', required = true, help = "Group numbers, e.g. 1,2")]
        groups: Vec<u64>,

        #[arg(short, long, help = "Output file path (stdout when omitted)")]
        output: Option<PathBuf>,
    },

    /// Start the HTTP API
    Serve {
        #[arg(long, help = "Bind host")]
        host: Option<String>,

        #[arg(short, long, help = "Server port")]
        port: Option<u16>,
    },

    /// Validate configuration
    Validate {
        #[arg(short, long, help = "Configuration file to validate")]
        config: PathBuf,
    },
}

impl Cli {
    /// Applies command-line overrides, the last configuration layer.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(workers) = self.workers {
            config.worker_count = workers;
        }
        if let Some(timeout) = self.timeout {
            config.probe.timeout = Duration::from_secs(timeout);
        }
        if let Some(storage) = &self.storage {
            config.storage.file_path = storage.clone();
        }
        if let Some(port) = self.metrics_port {
            config.metrics_port = Some(port);
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
        if let Commands::Serve { host, port } = &self.command {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }
    }
}

pub struct CliRunner {
    pub config: Config,
    pub service: LinkService,
    shutdown: CancellationToken,
}

impl CliRunner {
    pub fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        let service = LinkService::from_config(config.clone()).context("failed to build link service")?;
        Ok(Self {
            config,
            service,
            shutdown,
        })
    }

    /// Restores the store from the snapshot file; a missing snapshot means an empty store.
    pub async fn restore_snapshot(&self) -> Result<()> {
        self.service
            .load_snapshot()
            .await
            .with_context(|| format!("failed to load snapshot {}", self.config.storage.file_path.display()))
    }

    /// Runs `command`. Every command except `validate` works on the restored store.
    pub async fn run(&self, command: Commands) -> Result<()> {
        if !matches!(command, Commands::Validate { .. }) {
            self.restore_snapshot().await?;
        }

        match command {
            Commands::Check { urls, input, deadline } => self.run_check(urls, input, deadline).await,
            Commands::List => self.run_list().await,
            Commands::Report { groups, output } => self.run_report(groups, output).await,
            Commands::Serve { .. } => self.run_server().await,
            Commands::Validate { config } => self.validate_config(config).await,
        }
    }

    pub async fn run_check(&self, mut urls: Vec<String>, input: Option<PathBuf>, deadline: Option<u64>) -> Result<()> {
        if let Some(path) = input {
            let from_file = self.read_urls_from_file(&path).await?;
            info!(count = from_file.len(), path = %path.display(), "loaded URLs from file");
            urls.extend(from_file);
        }

        if urls.is_empty() {
            bail!("no URLs given; pass them as arguments or with --input");
        }

        let ctx = match deadline {
            Some(secs) => CheckContext::with_timeout(Duration::from_secs(secs)),
            None => CheckContext::new(),
        };
        let watcher = self.cancel_on_shutdown(&ctx);
        let result = self.service.check_many(&ctx, &urls).await;
        watcher.abort();

        let summary = result.context("link check failed")?;
        let available = summary.links.values().filter(|s| s.is_available()).count();
        info!(
            links_num = summary.links_num,
            available,
            not_available = summary.links.len() - available,
            "check completed"
        );

        println!("{}", serde_json::to_string_pretty(&summary)?);

        self.service.save_snapshot().await.context("failed to save snapshot")?;
        Ok(())
    }

    pub async fn run_list(&self) -> Result<()> {
        let groups = self.service.get_all(&CheckContext::new()).await?;
        println!("{}", serde_json::to_string_pretty(&groups)?);
        Ok(())
    }

    pub async fn run_report(&self, groups: Vec<u64>, output: Option<PathBuf>) -> Result<()> {
        let report = self.service.generate_report(&CheckContext::new(), &groups).await?;

        match output {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).await?;
                }
                fs::write(&path, &report)
                    .await
                    .with_context(|| format!("failed to write report to {}", path.display()))?;
                info!(path = %path.display(), size_bytes = report.len(), "report saved");
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&report)?;
                stdout.flush()?;
            }
        }

        Ok(())
    }

    pub async fn run_server(&self) -> Result<()> {
        info!(addr = %self.config.server.bind_addr(), "starting server");

        let shutdown = self.shutdown.clone();
        serve(self.service.clone(), async move { shutdown.cancelled().await }).await?;
        Ok(())
    }

    pub async fn validate_config(&self, config_path: PathBuf) -> Result<()> {
        println!("Validating configuration: {}", config_path.display());

        let content = fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config = Config::from_json(&content)?;
        validate_config(&config)?;

        println!("Configuration is valid:");
        println!("  Workers: {}", config.worker_count);
        println!("  Probe timeout: {:?}", config.probe.timeout);
        println!("  Server: {}", config.server.bind_addr());
        println!("  Request timeout: {:?}", config.server.request_timeout);
        println!("  Storage: {}", config.storage.file_path.display());
        println!("  Log level: {}", config.logging.level);

        Ok(())
    }

    pub async fn read_urls_from_file(&self, path: &Path) -> Result<Vec<String>> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read URL list {}", path.display()))?;
        Ok(parse_url_list(&content))
    }

    fn cancel_on_shutdown(&self, ctx: &CheckContext) -> tokio::task::JoinHandle<()> {
        let ctx = ctx.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            warn!("shutdown requested, cancelling check");
            ctx.cancel();
        })
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `level` when set.
///
/// When `file_path` is given, output is mirrored into that file; keep the returned
/// guard alive until exit so buffered lines are flushed.
pub fn setup_logging(level: &str, verbose: bool, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match file_path {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow!("log path has no file name: {}", path.display()))?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;

            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
