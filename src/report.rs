//! Report rendering for stored link groups
//!
//! Rendering is a pure function from already-fetched groups to bytes. The service
//! fetches, the renderer never does.

use crate::{format_duration, truncate_str, LinkCheckError, LinkGroup, LinkStatus};
use std::fmt::Write;
use std::time::Duration;
use tabled::settings::object::Segment;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};
use tracing::{debug, info};

pub const REPORT_TITLE: &str = "LINK STATUS REPORT - GROUP";
pub const MAX_URL_WIDTH: usize = 50;
const CHECKED_AT_FORMAT: &str = "%H:%M:%S %d.%m.%Y";

pub trait ReportRenderer: Send + Sync {
    fn render(&self, groups: &[LinkGroup]) -> Result<Vec<u8>, LinkCheckError>;

    /// MIME type of the rendered document.
    fn content_type(&self) -> &'static str;

    /// Default file extension, without the dot.
    fn extension(&self) -> &'static str;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupStatistics {
    pub available: usize,
    pub not_available: usize,
    pub average_available: Duration,
    pub average_not_available: Duration,
    pub total: usize,
}

impl GroupStatistics {
    pub fn from_group(group: &LinkGroup) -> Self {
        let mut stats = Self {
            total: group.links.len(),
            ..Default::default()
        };
        let mut available_sum = Duration::ZERO;
        let mut not_available_sum = Duration::ZERO;

        for link in &group.links {
            match link.status {
                LinkStatus::Available => {
                    stats.available += 1;
                    available_sum += link.duration;
                }
                LinkStatus::NotAvailable => {
                    stats.not_available += 1;
                    not_available_sum += link.duration;
                }
            }
        }

        stats.average_available = average(available_sum, stats.available);
        stats.average_not_available = average(not_available_sum, stats.not_available);
        stats
    }
}

fn average(sum: Duration, count: usize) -> Duration {
    match u32::try_from(count) {
        Ok(0) => Duration::ZERO,
        Ok(n) => sum / n,
        Err(_) => Duration::from_secs_f64(sum.as_secs_f64() / count as f64),
    }
}

fn round_to_millis(duration: Duration) -> Duration {
    let micros = duration.as_micros();
    let millis = (micros + 500) / 1000;
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

#[derive(Tabled)]
struct StatisticsRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "Average Time")]
    average: String,
}

#[derive(Tabled)]
struct DetailRow {
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "Status")]
    status: LinkStatus,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Checked At")]
    checked_at: String,
}

fn markdown_table<I, T>(rows: I) -> String
where
    I: IntoIterator<Item = T>,
    T: Tabled,
{
    Table::new(rows)
        .with(Modify::new(Segment::all()).with(Alignment::left()))
        .with(Style::markdown())
        .to_string()
}

/// Renders groups as a Markdown document, one section per group.
#[derive(Debug, Clone, Default)]
pub struct MarkdownReportRenderer;

impl MarkdownReportRenderer {
    pub fn new() -> Self {
        Self
    }

    fn write_group(&self, out: &mut String, group: &LinkGroup) -> std::fmt::Result {
        writeln!(out, "# {REPORT_TITLE} {}", group.links_num)?;
        writeln!(out)?;

        let stats = GroupStatistics::from_group(group);
        let summary = [
            StatisticsRow {
                metric: "Available Links",
                count: stats.available,
                average: format_duration(round_to_millis(stats.average_available)),
            },
            StatisticsRow {
                metric: "Not Available Links",
                count: stats.not_available,
                average: format_duration(round_to_millis(stats.average_not_available)),
            },
            StatisticsRow {
                metric: "**TOTAL**",
                count: stats.total,
                average: "-".to_string(),
            },
        ];
        writeln!(out, "## STATISTICS SUMMARY")?;
        writeln!(out)?;
        writeln!(out, "{}", markdown_table(summary))?;
        writeln!(out)?;

        let details = group.links.iter().map(|link| DetailRow {
            url: escape_cell(&truncate_str(&link.url, MAX_URL_WIDTH)),
            status: link.status,
            duration: format_duration(round_to_millis(link.duration)),
            checked_at: link.checked_at.format(CHECKED_AT_FORMAT).to_string(),
        });
        writeln!(out, "## DETAILED LINK REPORT")?;
        writeln!(out)?;
        writeln!(out, "{}", markdown_table(details))?;
        writeln!(out)
    }
}

impl ReportRenderer for MarkdownReportRenderer {
    fn render(&self, groups: &[LinkGroup]) -> Result<Vec<u8>, LinkCheckError> {
        info!(groups = groups.len(), "rendering link report");

        let mut out = String::new();
        for (index, group) in groups.iter().enumerate() {
            if index > 0 {
                out.push_str("---\n\n");
            }
            self.write_group(&mut out, group)
                .map_err(|e| LinkCheckError::Render(format!("failed to render group {}: {e}", group.links_num)))?;
        }

        debug!(groups = groups.len(), size_bytes = out.len(), "link report rendered");
        Ok(out.into_bytes())
    }

    fn content_type(&self) -> &'static str {
        "text/markdown; charset=utf-8"
    }

    fn extension(&self) -> &'static str {
        "md"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CheckedLink;
    use chrono::{TimeZone, Utc};

    fn link(url: &str, status: LinkStatus, millis: u64) -> CheckedLink {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        CheckedLink::new(url, status, at, Duration::from_millis(millis))
    }

    fn render(groups: &[LinkGroup]) -> String {
        String::from_utf8(MarkdownReportRenderer::new().render(groups).unwrap()).unwrap()
    }

    /// Trimmed cells of the first table row whose leading cell is `first`.
    fn row<'a>(report: &'a str, first: &str) -> Vec<&'a str> {
        report
            .lines()
            .map(|line| {
                line.trim_matches('|')
                    .split(" | ")
                    .map(str::trim)
                    .collect::<Vec<_>>()
            })
            .find(|cells| cells.first() == Some(&first))
            .unwrap_or_else(|| panic!("no row starting with {first:?} in:\n{report}"))
    }

    #[test]
    fn test_statistics() {
        let group = LinkGroup {
            links_num: 1,
            links: vec![
                link("a.com", LinkStatus::Available, 100),
                link("b.com", LinkStatus::Available, 300),
                link("c.com", LinkStatus::NotAvailable, 50),
            ],
        };

        let stats = GroupStatistics::from_group(&group);
        assert_eq!(stats.available, 2);
        assert_eq!(stats.not_available, 1);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.average_available, Duration::from_millis(200));
        assert_eq!(stats.average_not_available, Duration::from_millis(50));
    }

    #[test]
    fn test_statistics_empty_group() {
        let stats = GroupStatistics::from_group(&LinkGroup {
            links_num: 4,
            links: vec![],
        });
        assert_eq!(stats, GroupStatistics::default());
    }

    #[test]
    fn test_render_single_group() {
        let report = render(&[LinkGroup {
            links_num: 3,
            links: vec![
                link("a.com", LinkStatus::Available, 120),
                link("b.com", LinkStatus::NotAvailable, 2500),
            ],
        }]);

        assert!(report.starts_with("# LINK STATUS REPORT - GROUP 3\n"));
        assert_eq!(row(&report, "Metric"), ["Metric", "Count", "Average Time"]);
        assert_eq!(row(&report, "Available Links"), ["Available Links", "1", "120ms"]);
        assert_eq!(row(&report, "Not Available Links"), ["Not Available Links", "1", "2.500s"]);
        assert_eq!(row(&report, "**TOTAL**"), ["**TOTAL**", "2", "-"]);
        assert_eq!(row(&report, "URL"), ["URL", "Status", "Duration", "Checked At"]);
        assert_eq!(row(&report, "a.com"), ["a.com", "available", "120ms", "14:07:09 05.03.2024"]);
        assert_eq!(
            row(&report, "b.com"),
            ["b.com", "not available", "2.500s", "14:07:09 05.03.2024"]
        );
    }

    #[test]
    fn test_groups_rendered_in_given_order() {
        let report = render(&[
            LinkGroup {
                links_num: 2,
                links: vec![link("b.com", LinkStatus::Available, 1)],
            },
            LinkGroup {
                links_num: 1,
                links: vec![link("a.com", LinkStatus::Available, 1)],
            },
        ]);

        let second = report.find("GROUP 2").unwrap();
        let first = report.find("GROUP 1").unwrap();
        assert!(second < first);
        assert!(report.contains("---\n"));
    }

    #[test]
    fn test_long_urls_are_truncated() {
        let long = format!("https://example.com/{}", "a".repeat(80));
        let report = render(&[LinkGroup {
            links_num: 1,
            links: vec![link(&long, LinkStatus::Available, 10)],
        }]);

        let expected = truncate_str(&long, MAX_URL_WIDTH);
        assert_eq!(expected.chars().count(), MAX_URL_WIDTH);
        assert_eq!(row(&report, &expected)[0], expected);
        assert!(!report.contains(&long));
    }

    #[test]
    fn test_pipes_in_urls_are_escaped() {
        let report = render(&[LinkGroup {
            links_num: 1,
            links: vec![link("a.com/?q=a|b", LinkStatus::Available, 10)],
        }]);
        assert!(report.contains("a.com/?q=a\\|b"));
        assert!(!report.contains("a.com/?q=a|b"));
    }

    #[test]
    fn test_render_nothing() {
        assert!(render(&[]).is_empty());
    }

    #[test]
    fn test_round_to_millis() {
        assert_eq!(round_to_millis(Duration::from_micros(1499)), Duration::from_millis(1));
        assert_eq!(round_to_millis(Duration::from_micros(1500)), Duration::from_millis(2));
    }
}
