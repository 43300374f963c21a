use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Availability verdict for one checked URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkStatus {
    #[serde(rename = "available")]
    Available,
    #[serde(rename = "not available")]
    NotAvailable,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Available => "available",
            LinkStatus::NotAvailable => "not available",
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, LinkStatus::Available)
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single probe. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckedLink {
    pub url: String,
    pub status: LinkStatus,
    pub duration: Duration,
    pub checked_at: DateTime<Utc>,
}

impl CheckedLink {
    pub fn new(url: impl Into<String>, status: LinkStatus, checked_at: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            url: url.into(),
            status,
            duration,
            checked_at,
        }
    }
}

/// One persisted batch of checked links, also the snapshot record layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkGroup {
    pub links_num: u64,
    pub links: Vec<CheckedLink>,
}

/// What `check_many` hands back to its caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub links: HashMap<String, LinkStatus>,
    pub links_num: u64,
}

impl CheckSummary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_links(links: &[CheckedLink], links_num: u64) -> Self {
        Self {
            links: links.iter().map(|l| (l.url.clone(), l.status)).collect(),
            links_num,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckLinksRequest {
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateReportRequest {
    pub links_num: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateReportResponse {
    pub message: String,
    pub size_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&LinkStatus::Available).unwrap(), "\"available\"");
        assert_eq!(
            serde_json::to_string(&LinkStatus::NotAvailable).unwrap(),
            "\"not available\""
        );
        let parsed: LinkStatus = serde_json::from_str("\"not available\"").unwrap();
        assert_eq!(parsed, LinkStatus::NotAvailable);
    }

    #[test]
    fn test_group_field_names() {
        let group = LinkGroup {
            links_num: 7,
            links: vec![CheckedLink::new(
                "a.com",
                LinkStatus::Available,
                Utc::now(),
                Duration::from_millis(12),
            )],
        };
        let value = serde_json::to_value(&group).unwrap();
        assert_eq!(value["links_num"], 7);
        let link = &value["links"][0];
        assert_eq!(link["url"], "a.com");
        assert_eq!(link["status"], "available");
        assert!(link.get("duration").is_some());
        assert!(link.get("checked_at").is_some());
    }

    #[test]
    fn test_summary_from_links() {
        let now = Utc::now();
        let links = vec![
            CheckedLink::new("x.com", LinkStatus::Available, now, Duration::ZERO),
            CheckedLink::new("y.com", LinkStatus::NotAvailable, now, Duration::ZERO),
        ];
        let summary = CheckSummary::from_links(&links, 3);
        assert_eq!(summary.links_num, 3);
        assert_eq!(summary.links["x.com"], LinkStatus::Available);
        assert_eq!(summary.links["y.com"], LinkStatus::NotAvailable);
    }
}
