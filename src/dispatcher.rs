//! Concurrent fan-out/fan-in of probe work for one batch of URLs
//!
//! A producer feeds unique URLs into a bounded work queue, `W` workers pull from the
//! shared receiver and probe, and the calling task collects results. The result
//! channel closes only once every worker has dropped its sender, i.e. exited. Every
//! blocking wait races the batch's [`CheckContext`].

use crate::{
    dedup_urls, CheckContext, CheckSummary, CheckedLink, GroupRepository, LinkCheckError, Metrics,
    Probe, DEFAULT_WORKER_COUNT,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub struct ProbeWorker {
    id: usize,
    probe: Arc<dyn Probe>,
    metrics: Metrics,
    processed_count: Arc<AtomicUsize>,
    unavailable_count: Arc<AtomicUsize>,
}

impl ProbeWorker {
    pub fn new(id: usize, probe: Arc<dyn Probe>, metrics: Metrics) -> Self {
        Self {
            id,
            probe,
            metrics,
            processed_count: Arc::new(AtomicUsize::new(0)),
            unavailable_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn run_with_shared_receiver(
        &self,
        ctx: CheckContext,
        jobs: Arc<Mutex<mpsc::Receiver<String>>>,
        results: mpsc::Sender<CheckedLink>,
    ) {
        loop {
            let next = tokio::select! {
                biased;
                reason = ctx.done() => {
                    warn!(worker_id = self.id, %reason, "worker exiting due to context done");
                    break;
                }
                next = async { jobs.lock().await.recv().await } => next,
            };

            let Some(url) = next else {
                break;
            };

            let link = self.probe.check(&ctx, &url).await;
            self.record(&link);

            tokio::select! {
                biased;
                reason = ctx.done() => {
                    warn!(worker_id = self.id, %reason, "worker canceled while sending result");
                    break;
                }
                sent = results.send(link) => {
                    if sent.is_err() {
                        error!(worker_id = self.id, "result channel closed, stopping worker");
                        break;
                    }
                }
            }
        }

        debug!(
            worker_id = self.id,
            processed = self.processed_count(),
            unavailable = self.unavailable_count(),
            "probe worker stopped"
        );
    }

    fn record(&self, link: &CheckedLink) {
        self.processed_count.fetch_add(1, Ordering::Relaxed);
        if !link.status.is_available() {
            self.unavailable_count.fetch_add(1, Ordering::Relaxed);
        }
        self.metrics.record_probe(link.duration, link.status.is_available());
        debug!(worker_id = self.id, url = %link.url, status = %link.status, "link probed");
    }

    pub fn get_stats(&self) -> WorkerStats {
        WorkerStats {
            id: self.id,
            processed_count: self.processed_count(),
            unavailable_count: self.unavailable_count(),
        }
    }

    pub fn processed_count(&self) -> usize {
        self.processed_count.load(Ordering::Relaxed)
    }

    pub fn unavailable_count(&self) -> usize {
        self.unavailable_count.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerStats {
    pub id: usize,
    pub processed_count: usize,
    pub unavailable_count: usize,
}

/// Checks batches of URLs with a bounded pool and stores each batch as one group.
pub struct Dispatcher {
    worker_count: usize,
    probe: Arc<dyn Probe>,
    repository: Arc<dyn GroupRepository>,
    metrics: Metrics,
}

impl Dispatcher {
    pub fn new(
        worker_count: usize,
        probe: Arc<dyn Probe>,
        repository: Arc<dyn GroupRepository>,
        metrics: Metrics,
    ) -> Self {
        let worker_count = if worker_count == 0 {
            DEFAULT_WORKER_COUNT
        } else {
            worker_count
        };

        Self {
            worker_count,
            probe,
            repository,
            metrics,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Probes every distinct URL in `urls` and persists the batch as a new group.
    ///
    /// An empty or all-duplicate batch returns an empty summary without touching the
    /// store. Cancellation before the batch completes returns the context's error and
    /// discards whatever was already probed.
    pub async fn check_many(&self, ctx: &CheckContext, urls: &[String]) -> Result<CheckSummary, LinkCheckError> {
        let unique = dedup_urls(urls);
        info!(count = urls.len(), unique = unique.len(), "checking links with worker pool");

        if unique.is_empty() {
            return Ok(CheckSummary::empty());
        }

        if let Some(reason) = ctx.err() {
            warn!(%reason, "check many canceled before dispatch");
            self.metrics.record_cancellation();
            return Err(reason);
        }

        let worker_count = self.worker_count.min(unique.len());
        let total = unique.len();

        let (job_tx, job_rx) = mpsc::channel::<String>(worker_count);
        let (result_tx, mut result_rx) = mpsc::channel::<CheckedLink>(worker_count);
        let shared_jobs = Arc::new(Mutex::new(job_rx));

        let mut tasks = JoinSet::new();

        for id in 0..worker_count {
            let worker = ProbeWorker::new(id, self.probe.clone(), self.metrics.clone());
            let ctx = ctx.clone();
            let jobs = shared_jobs.clone();
            let results = result_tx.clone();
            tasks.spawn(async move {
                worker.run_with_shared_receiver(ctx, jobs, results).await;
            });
        }
        // Workers hold the only senders and the only queue handles now. The result
        // channel closes when the last worker exits, even by panicking, and the producer
        // then sees a closed queue instead of blocking on a full one.
        drop(result_tx);
        drop(shared_jobs);

        let producer_ctx = ctx.clone();
        tasks.spawn(async move {
            for url in unique {
                tokio::select! {
                    biased;
                    _ = producer_ctx.done() => {
                        warn!("producer stopped due to context done");
                        return;
                    }
                    sent = job_tx.send(url) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        let mut checked = Vec::with_capacity(total);
        loop {
            tokio::select! {
                biased;
                reason = ctx.done() => {
                    warn!(%reason, collected = checked.len(), total, "check many canceled by context");
                    self.metrics.record_cancellation();
                    // Dropping the join set aborts any task still running.
                    return Err(reason);
                }
                link = result_rx.recv() => match link {
                    Some(link) => checked.push(link),
                    None => break,
                },
            }
        }

        while let Some(joined) = tasks.join_next().await {
            joined?;
        }

        if checked.len() != total {
            return Err(LinkCheckError::Internal(format!(
                "collected {} results for {} links",
                checked.len(),
                total
            )));
        }

        let links_num = match self.repository.insert(checked.clone()).await {
            Ok(number) => number,
            Err(e) => {
                error!(error = %e, "failed to insert checked links");
                return Err(e);
            }
        };
        self.metrics.record_group();

        let summary = CheckSummary::from_links(&checked, links_num);
        debug!(
            links_num,
            links_count = checked.len(),
            workers = worker_count,
            "links checked and stored with worker pool"
        );

        Ok(summary)
    }
}
