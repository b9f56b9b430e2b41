//! Two-level scheduler: periodic ticks claim due sources and fan out
//! scrape work; each committed run fans out one notification dispatch
//! per newly discovered posting.
//!
//! Work items carry their retry count. Only infrastructure errors are
//! retried here; scrape failures are the health machine's business and
//! surface again on the next due cycle.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};

use crate::config::Settings;
use crate::repository::DbContext;

use super::notify::NotificationService;
use super::scrape::{ScrapeOutcome, ScrapeService};

const QUEUE_DEPTH: usize = 256;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick_interval: Duration,
    pub workers: usize,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl SchedulerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            tick_interval: settings.tick_interval(),
            workers: settings.workers.max(1),
            max_retries: settings.max_retries,
            retry_backoff: settings.retry_backoff(),
        }
    }
}

/// One unit of queued work.
#[derive(Debug, Clone)]
pub enum WorkItem {
    Scrape { source_id: String, attempt: u32 },
    Notify { posting_id: String, attempt: u32 },
}

/// What one synchronous tick accomplished.
#[derive(Debug, Clone, Default)]
pub struct TickSummary {
    pub sources_claimed: usize,
    pub sources_succeeded: usize,
    pub sources_failed: usize,
    pub new_postings: usize,
    pub notifications_sent: usize,
}

#[derive(Clone)]
pub struct Scheduler {
    ctx: DbContext,
    scrape: Arc<ScrapeService>,
    notify: Arc<NotificationService>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        ctx: DbContext,
        scrape: Arc<ScrapeService>,
        notify: Arc<NotificationService>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            ctx,
            scrape,
            notify,
            config,
        }
    }

    /// Run forever: spawn the worker pool, then enqueue due sources on
    /// every tick.
    pub async fn run(&self) -> anyhow::Result<()> {
        let (tx, rx) = mpsc::channel::<WorkItem>(QUEUE_DEPTH);
        let rx = Arc::new(Mutex::new(rx));

        for worker_id in 0..self.config.workers {
            let scheduler = self.clone();
            let rx = rx.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                loop {
                    let item = { rx.lock().await.recv().await };
                    match item {
                        Some(item) => scheduler.process(item, &tx).await,
                        None => break,
                    }
                }
                tracing::debug!(worker_id, "scheduler worker stopped");
            });
        }

        tracing::info!(
            workers = self.config.workers,
            tick_secs = self.config.tick_interval.as_secs(),
            "scheduler started"
        );

        let mut interval = tokio::time::interval(self.config.tick_interval);
        loop {
            interval.tick().await;
            match self.dispatch_due(&tx).await {
                Ok(0) => tracing::debug!("tick: no sources due"),
                Ok(n) => tracing::info!(claimed = n, "tick: sources dispatched"),
                Err(e) => tracing::error!(error = %e, "tick failed"),
            }
        }
    }

    /// Claim due sources and enqueue one scrape item per source.
    async fn dispatch_due(&self, tx: &mpsc::Sender<WorkItem>) -> anyhow::Result<usize> {
        let due = self.ctx.sources().claim_due(Utc::now()).await?;
        let count = due.len();

        for source in due {
            let item = WorkItem::Scrape {
                source_id: source.id,
                attempt: 0,
            };
            if tx.send(item).await.is_err() {
                anyhow::bail!("scheduler queue closed");
            }
        }
        Ok(count)
    }

    /// Process one item, fanning out follow-up work through `tx`.
    async fn process(&self, item: WorkItem, tx: &mpsc::Sender<WorkItem>) {
        match item {
            WorkItem::Scrape { source_id, attempt } => {
                match self.scrape.run_once(&source_id).await {
                    Ok(ScrapeOutcome::Completed(summary)) => {
                        // Workers drain this queue, so they never await
                        // `send` themselves: a batch larger than the
                        // queue goes through a spawned sender, like
                        // retries do.
                        if !summary.new_posting_ids.is_empty() {
                            let tx = tx.clone();
                            tokio::spawn(async move {
                                for posting_id in summary.new_posting_ids {
                                    let item = WorkItem::Notify {
                                        posting_id,
                                        attempt: 0,
                                    };
                                    if tx.send(item).await.is_err() {
                                        break;
                                    }
                                }
                            });
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.maybe_retry(
                            WorkItem::Scrape {
                                source_id: source_id.clone(),
                                attempt: attempt + 1,
                            },
                            attempt,
                            tx,
                        );
                        tracing::warn!(source_id, attempt, error = %e, "scrape item errored");
                    }
                }
            }
            WorkItem::Notify {
                posting_id,
                attempt,
            } => match self.notify.dispatch_for_posting(&posting_id).await {
                Ok(_) => {}
                Err(e) => {
                    // Dispatch is idempotent: claimed pairs are never
                    // re-sent on the retry.
                    self.maybe_retry(
                        WorkItem::Notify {
                            posting_id: posting_id.clone(),
                            attempt: attempt + 1,
                        },
                        attempt,
                        tx,
                    );
                    tracing::warn!(posting_id, attempt, error = %e, "notify item errored");
                }
            },
        }
    }

    /// Re-enqueue after a backoff, up to the retry budget.
    fn maybe_retry(&self, next: WorkItem, attempt: u32, tx: &mpsc::Sender<WorkItem>) {
        if attempt >= self.config.max_retries {
            tracing::error!(?next, "retry budget exhausted, dropping work item");
            return;
        }
        let tx = tx.clone();
        let backoff = self.config.retry_backoff;
        tokio::spawn(async move {
            tokio::time::sleep(backoff).await;
            let _ = tx.send(next).await;
        });
    }

    /// One synchronous pass: claim everything due, scrape inline, then
    /// dispatch notifications for the new postings. Used by the CLI and
    /// by tests; the long-running loop uses the worker pool instead.
    pub async fn tick_once(&self) -> anyhow::Result<TickSummary> {
        let due = self.ctx.sources().claim_due(Utc::now()).await?;
        let mut summary = TickSummary {
            sources_claimed: due.len(),
            ..TickSummary::default()
        };

        for source in due {
            match self.scrape.run_once(&source.id).await? {
                ScrapeOutcome::Completed(run) => {
                    if run.error.is_none() {
                        summary.sources_succeeded += 1;
                    } else {
                        summary.sources_failed += 1;
                    }
                    summary.new_postings += run.new_posting_ids.len();

                    for posting_id in &run.new_posting_ids {
                        let dispatched = self.notify.dispatch_for_posting(posting_id).await?;
                        summary.notifications_sent += dispatched.sent;
                    }
                }
                ScrapeOutcome::NotFound | ScrapeOutcome::Inactive => {}
            }
        }

        Ok(summary)
    }
}
