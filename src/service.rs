//! Link checking service shared by the CLI and the HTTP server
//!
//! `LinkService` wires the dispatcher, the group store and the report renderer
//! together behind one handle.

use crate::{
    CheckContext, CheckSummary, Config, Dispatcher, GroupRepository, GroupStore, HttpProbe, LinkCheckError,
    LinkGroup, MarkdownReportRenderer, Metrics, Probe, ReportRenderer,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Facade over the check pipeline and the group store.
///
/// # Examples
///
/// ```rust,no_run
/// use linkchecker::{CheckContext, Config, LinkService};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = LinkService::from_config(Config::default())?;
///
///     let ctx = CheckContext::new();
///     let summary = service
///         .check_many(&ctx, &["https://example.com".to_string()])
///         .await?;
///     println!("stored as group {}", summary.links_num);
///
///     let report = service.generate_report(&ctx, &[summary.links_num]).await?;
///     println!("report is {} bytes", report.len());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct LinkService {
    config: Config,
    store: Arc<GroupStore>,
    dispatcher: Arc<Dispatcher>,
    renderer: Arc<dyn ReportRenderer>,
    metrics: Metrics,
}

impl LinkService {
    pub fn new(
        config: Config,
        store: Arc<GroupStore>,
        probe: Arc<dyn Probe>,
        renderer: Arc<dyn ReportRenderer>,
    ) -> Self {
        let metrics = Metrics::new();
        let repository: Arc<dyn GroupRepository> = store.clone();
        let dispatcher = Arc::new(Dispatcher::new(config.worker_count, probe, repository, metrics.clone()));

        Self {
            config,
            store,
            dispatcher,
            renderer,
            metrics,
        }
    }

    /// Builds the production service: HTTP probe, Markdown renderer, empty store.
    pub fn from_config(config: Config) -> Result<Self, LinkCheckError> {
        let probe = Arc::new(HttpProbe::new(&config.probe)?);
        let renderer = Arc::new(MarkdownReportRenderer::new());
        Ok(Self::new(config, Arc::new(GroupStore::new()), probe, renderer))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<GroupStore> {
        &self.store
    }

    pub fn renderer(&self) -> &dyn ReportRenderer {
        self.renderer.as_ref()
    }

    pub async fn check_many(&self, ctx: &CheckContext, urls: &[String]) -> Result<CheckSummary, LinkCheckError> {
        self.dispatcher.check_many(ctx, urls).await
    }

    /// Renders the requested groups, in request order, into one document.
    pub async fn generate_report(&self, ctx: &CheckContext, numbers: &[u64]) -> Result<Vec<u8>, LinkCheckError> {
        info!(groups = numbers.len(), "generating report for links groups");

        if let Some(reason) = ctx.err() {
            return Err(reason);
        }

        let groups = self.store.get_by_numbers(numbers).await.map_err(|e| {
            error!(error = %e, "failed to get links by nums");
            e
        })?;

        let report = self.renderer.render(&groups).map_err(|e| {
            error!(error = %e, "failed to render report");
            e
        })?;
        self.metrics.record_report();

        debug!(groups = numbers.len(), size_bytes = report.len(), "report generated successfully");
        Ok(report)
    }

    pub async fn get_all(&self, ctx: &CheckContext) -> Result<Vec<LinkGroup>, LinkCheckError> {
        info!("fetching all links groups");

        if let Some(reason) = ctx.err() {
            return Err(reason);
        }

        let mut groups = self.store.get_all().await?;
        groups.sort_by_key(|group| group.links_num);

        debug!(groups_count = groups.len(), "fetched all links groups");
        Ok(groups)
    }

    pub async fn load_snapshot(&self) -> Result<(), LinkCheckError> {
        let path = &self.config.storage.file_path;
        self.store.load_from_file(path).await?;
        info!(path = %path.display(), groups = self.store.len().await, "snapshot loaded");
        Ok(())
    }

    pub async fn save_snapshot(&self) -> Result<(), LinkCheckError> {
        let path = &self.config.storage.file_path;
        self.store.save_to_file(path).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to save snapshot");
            e
        })?;
        info!(path = %path.display(), "snapshot saved");
        Ok(())
    }
}
