//! Single-URL availability probe
//!
//! The dispatcher only sees the [`Probe`] trait. [`HttpProbe`] is the production
//! implementation: one HEAD request per URL, 2xx/3xx counts as available.

use crate::{normalize_url, CheckContext, CheckedLink, LinkCheckError, LinkStatus, ProbeConfig};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, warn};

/// Determines the availability of one URL.
///
/// Never fails: unreachable or malformed URLs come back as
/// [`LinkStatus::NotAvailable`] with best-effort timing.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, ctx: &CheckContext, url: &str) -> CheckedLink;
}

pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(config: &ProbeConfig) -> Result<Self, LinkCheckError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| LinkCheckError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self, ctx: &CheckContext, raw_url: &str) -> CheckedLink {
        let checked_at = Utc::now();
        let start = Instant::now();

        let target = match normalize_url(raw_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(raw_url, error = %e, "failed to normalize URL");
                return CheckedLink::new(raw_url, LinkStatus::NotAvailable, checked_at, start.elapsed());
            }
        };

        let request = self.client.head(target.clone()).header(ACCEPT, "*/*").send();

        let status = tokio::select! {
            reason = ctx.done() => {
                debug!(url = %target, %reason, "probe interrupted");
                LinkStatus::NotAvailable
            }
            response = request => match response {
                Ok(response) => {
                    let code = response.status();
                    let status = if code.as_u16() < 400 {
                        LinkStatus::Available
                    } else {
                        LinkStatus::NotAvailable
                    };
                    debug!(url = raw_url, status_code = code.as_u16(), %status, "checked URL");
                    status
                }
                Err(e) => {
                    debug!(url = %target, error = %e, "HTTP request failed");
                    LinkStatus::NotAvailable
                }
            },
        };

        CheckedLink::new(raw_url, status, checked_at, start.elapsed())
    }
}
