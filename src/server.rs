//! HTTP API over the link service
//!
//! Routes:
//! - `POST /links` checks a batch and stores it as a new group
//! - `GET /links` lists every stored group
//! - `POST /report` renders the requested groups

use crate::{
    CheckContext, CheckLinksRequest, CheckSummary, GenerateReportRequest, GenerateReportResponse, LinkCheckError,
    LinkGroup, LinkService,
};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use std::future::{Future, IntoFuture};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const MAX_REQUEST_BODY_SIZE: usize = 1 << 20;
pub const REPORT_FILE_STEM: &str = "link_report";
pub const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct AppState {
    pub service: LinkService,
    pub request_timeout: Duration,
    root: CheckContext,
}

impl AppState {
    pub fn new(service: LinkService) -> Self {
        Self::with_root(service, CheckContext::new())
    }

    /// Request contexts are children of `root`, so cancelling it cancels every request
    /// in flight.
    pub fn with_root(service: LinkService, root: CheckContext) -> Self {
        let request_timeout = service.config().server.request_timeout;
        Self {
            service,
            request_timeout,
            root,
        }
    }

    fn request_context(&self) -> CheckContext {
        self.root.child_with_timeout(self.request_timeout)
    }
}

/// Maps service errors onto status codes with a `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError(pub LinkCheckError);

impl From<LinkCheckError> for ApiError {
    fn from(err: LinkCheckError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LinkCheckError::Cancelled | LinkCheckError::DeadlineExceeded => StatusCode::REQUEST_TIMEOUT,
            LinkCheckError::GroupNotFound(_) => StatusCode::NOT_FOUND,
            LinkCheckError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        } else {
            warn!(error = %self.0, status = status.as_u16(), "request rejected");
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/links", post(check_links).get(list_links))
        .route("/report", post(generate_report))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn check_links(
    State(state): State<AppState>,
    Json(request): Json<CheckLinksRequest>,
) -> Result<Json<CheckSummary>, ApiError> {
    let request_id = Uuid::new_v4();
    info!(%request_id, links = request.links.len(), "check links request");

    if request.links.is_empty() {
        return Err(LinkCheckError::InvalidInput("links array cannot be empty".to_string()).into());
    }

    let ctx = state.request_context();
    let summary = state.service.check_many(&ctx, &request.links).await?;

    debug!(
        %request_id,
        links_num = summary.links_num,
        links_count = summary.links.len(),
        "links checked successfully"
    );
    Ok(Json(summary))
}

async fn list_links(State(state): State<AppState>) -> Result<Json<Vec<LinkGroup>>, ApiError> {
    let ctx = state.request_context();
    let groups = state.service.get_all(&ctx).await?;
    Ok(Json(groups))
}

async fn generate_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerateReportRequest>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    info!(%request_id, groups = request.links_num.len(), "generate report request");

    if request.links_num.is_empty() {
        return Err(LinkCheckError::InvalidInput("links_num array cannot be empty".to_string()).into());
    }

    let ctx = state.request_context();
    let report = state.service.generate_report(&ctx, &request.links_num).await?;

    let wants_json = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .map(|accept| accept.contains("application/json"))
        .unwrap_or(false);

    if wants_json {
        debug!(%request_id, size_bytes = report.len(), "returning report metadata");
        return Ok(Json(GenerateReportResponse {
            message: "report generated successfully".to_string(),
            size_bytes: report.len(),
        })
        .into_response());
    }

    let renderer = state.service.renderer();
    let disposition = format!("attachment; filename={}.{}", REPORT_FILE_STEM, renderer.extension());
    Ok((
        [
            (header::CONTENT_TYPE, renderer.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report,
    )
        .into_response())
}

/// Serves the API until `shutdown` resolves, then saves the store snapshot.
pub async fn serve<F>(service: LinkService, shutdown: F) -> Result<(), LinkCheckError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = service.config().server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| LinkCheckError::Io(format!("failed to bind {addr}: {e}")))?;
    serve_on(listener, service, shutdown).await
}

/// Like [`serve`] on an already bound listener.
///
/// When `shutdown` resolves, in-flight checks are cancelled and the server gets
/// [`SHUTDOWN_DRAIN_TIMEOUT`] to finish open connections before the snapshot is saved.
pub async fn serve_on<F>(listener: TcpListener, service: LinkService, shutdown: F) -> Result<(), LinkCheckError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP server listening");
    }

    let root = CheckContext::new();
    let stop = root.clone();
    let app = create_router(AppState::with_root(service.clone(), root.clone()));
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("shutdown requested, cancelling in-flight requests");
            stop.cancel();
        })
        .into_future();

    tokio::select! {
        result = server => result.map_err(|e| LinkCheckError::Io(format!("server error: {e}")))?,
        _ = async {
            root.done().await;
            tokio::time::sleep(SHUTDOWN_DRAIN_TIMEOUT).await;
        } => {
            warn!(timeout_secs = SHUTDOWN_DRAIN_TIMEOUT.as_secs(), "HTTP server drain timed out");
        }
    }

    info!("HTTP server stopped, saving snapshot");
    service.save_snapshot().await
}
