//! # Link Checker
//!
//! Checks the availability of many URLs at once, stores every checked batch as a
//! numbered group, and renders stored groups into reports.
//!
//! ## Pipeline
//!
//! | Stage | Type | Notes |
//! |-------|------|-------|
//! | Deduplication | [`dedup_urls`] | Exact string match, first occurrence wins |
//! | Fan-out | [`Dispatcher`] | Bounded work queue shared by `min(workers, unique)` tasks |
//! | Probe | [`HttpProbe`] | One HEAD request; status below 400 is available |
//! | Fan-in | [`Dispatcher`] | Result channel closes once every worker has exited |
//! | Persistence | [`GroupStore`] | Sequential, gap-free group numbers; JSON snapshots |
//! | Reporting | [`MarkdownReportRenderer`] | One section per group |
//!
//! Every blocking wait races a [`CheckContext`]. A cancelled or expired batch
//! returns the context's error and stores nothing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use linkchecker::{CheckContext, Config, LinkService};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = LinkService::from_config(Config::default())?;
//!
//!     let ctx = CheckContext::with_timeout(Duration::from_secs(30));
//!     let urls = vec!["example.com".to_string(), "https://www.rust-lang.org".to_string()];
//!     let summary = service.check_many(&ctx, &urls).await?;
//!
//!     for (url, status) in &summary.links {
//!         println!("{url}: {status}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! linkchecker check https://example.com rust-lang.org
//! linkchecker --workers 16 check --input urls.txt
//! linkchecker report --groups 1,2 --output report.md
//! linkchecker serve --port 8080
//! ```

/// Configuration and settings for the link checker
pub mod config;

/// Error types and error handling utilities
pub mod error;

/// Cancellation and deadline propagation
pub mod context;

/// Checked links, groups and transport types
pub mod models;

/// Single-URL availability probe
pub mod probe;

/// Numbered group storage with snapshot persistence
pub mod store;

/// Concurrent check dispatch over a bounded worker pool
pub mod dispatcher;

/// Report rendering
pub mod report;

/// Service facade used by the CLI and the HTTP API
pub mod service;

/// HTTP API
pub mod server;

/// Command-line interface implementation
pub mod cli;

/// Performance metrics collection and monitoring
pub mod metrics;

/// Utility functions and helpers
pub mod utils;


pub use self::metrics::*;
pub use cli::*;
pub use config::*;
pub use context::*;
pub use dispatcher::*;
pub use error::*;
pub use models::*;
pub use probe::*;
pub use report::*;
pub use server::*;
pub use service::*;
pub use store::*;
pub use utils::*;
