//! End-to-end pipeline tests against a real SQLite database: scrape
//! commits, health transitions, and at-most-once notification delivery.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use jobscout::error::{DeliveryError, ScrapeError};
use jobscout::models::{
    AttemptStatus, Company, HealthStatus, LocationType, Source, User, UserPreferences,
};
use jobscout::repository::DbContext;
use jobscout::scrapers::{
    FetchStrategy, HttpClient, NormalizedPosting, ScraperRegistry, SourceConfig,
};
use jobscout::services::{
    NotificationService, PushMessage, PushSender, Scheduler, SchedulerConfig, ScrapeOutcome,
    ScrapeService,
};

/// Scripted fetch strategy. Each call pops the next response; an empty
/// script yields an empty batch.
struct StubStrategy {
    script: Mutex<VecDeque<Result<Vec<NormalizedPosting>, String>>>,
    delay: Option<Duration>,
}

impl StubStrategy {
    fn new(script: Vec<Result<Vec<NormalizedPosting>, String>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            delay: None,
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            delay: Some(delay),
        }
    }
}

#[async_trait]
impl FetchStrategy for StubStrategy {
    fn key(&self) -> &'static str {
        "stub"
    }

    // Host-less URL keeps the robots check offline.
    fn source_url(&self, _config: &SourceConfig) -> Result<String, ScrapeError> {
        Ok("data:,stub".to_string())
    }

    async fn fetch(
        &self,
        _client: &HttpClient,
        _config: &SourceConfig,
    ) -> Result<Vec<NormalizedPosting>, ScrapeError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(batch)) => Ok(batch),
            Some(Err(message)) => Err(ScrapeError::Fetch(message)),
            None => Ok(Vec::new()),
        }
    }
}

/// Push backend that records deliveries and can fail the first N sends.
struct RecordingSender {
    sent: Mutex<Vec<PushMessage>>,
    failures_remaining: AtomicUsize,
}

impl RecordingSender {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failures_remaining: AtomicUsize::new(0),
        }
    }

    fn failing_first(n: usize) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failures_remaining: AtomicUsize::new(n),
        }
    }

    fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl PushSender for RecordingSender {
    async fn send(&self, message: &PushMessage) -> Result<(), DeliveryError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(DeliveryError("gateway unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

async fn setup_ctx() -> (DbContext, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = DbContext::from_path(&dir.path().join("test.db"));
    ctx.run_migrations().await.unwrap();
    (ctx, dir)
}

/// Company plus one stub source, persisted.
async fn seed_source(ctx: &DbContext) -> (Company, Source) {
    let company = Company::new("Acme Corp".to_string(), "acme".to_string());
    ctx.companies().save(&company).await.unwrap();

    let source = Source::new(
        company.id.clone(),
        "stub".to_string(),
        "https://jobs.acme.test".to_string(),
    );
    ctx.sources().save(&source).await.unwrap();
    (company, source)
}

async fn seed_user(ctx: &DbContext, id: &str, prefs: UserPreferences) -> User {
    let user = User {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        is_active: true,
        push_token: Some(format!("token-{id}")),
        preferences: prefs,
        created_at: Utc::now(),
    };
    ctx.users().save(&user).await.unwrap();
    user
}

fn scrape_service(ctx: &DbContext, strategy: StubStrategy) -> ScrapeService {
    let mut registry = ScraperRegistry::with_builtins();
    registry.register(Arc::new(strategy));
    ScrapeService::new(
        ctx.clone(),
        Arc::new(registry),
        Duration::from_secs(5),
        None,
    )
}

fn posting(external_id: &str, title: &str) -> NormalizedPosting {
    NormalizedPosting {
        location: Some("Remote".to_string()),
        location_type: Some(LocationType::Remote),
        ..NormalizedPosting::new(
            external_id.to_string(),
            title.to_string(),
            format!("https://jobs.acme.test/{external_id}"),
        )
    }
}

#[tokio::test]
async fn test_scrape_commits_postings_and_attempt() {
    let (ctx, _dir) = setup_ctx().await;
    let (_company, source) = seed_source(&ctx).await;

    let service = scrape_service(
        &ctx,
        StubStrategy::new(vec![Ok(vec![
            posting("e1", "Backend Engineer"),
            posting("e2", "Product Designer"),
        ])]),
    );

    let outcome = service.run_once(&source.id).await.unwrap();
    let ScrapeOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(summary.status, AttemptStatus::Success);
    assert_eq!(summary.found, 2);
    assert_eq!(summary.new_posting_ids.len(), 2);
    assert_eq!(summary.updated, 0);

    assert_eq!(ctx.postings().count_for_source(&source.id).await.unwrap(), 2);

    let attempts = ctx.attempts().recent(Some(&source.id), 10).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, AttemptStatus::Success);
    assert_eq!(attempts[0].postings_found, 2);
    assert_eq!(attempts[0].new_postings, 2);

    let reloaded = ctx.sources().get(&source.id).await.unwrap().unwrap();
    assert_eq!(reloaded.health_status, HealthStatus::Healthy);
    assert!(reloaded.last_success_at.is_some());
}

#[tokio::test]
async fn test_rerun_dedup_and_description_update() {
    let (ctx, _dir) = setup_ctx().await;
    let (_company, source) = seed_source(&ctx).await;

    let first = vec![posting("e1", "Backend Engineer"), posting("e2", "SRE")];
    let mut changed = posting("e1", "Backend Engineer");
    changed.description = Some("Now with a description".to_string());
    let second = vec![changed, posting("e2", "SRE"), posting("e3", "Data Engineer")];

    let service = scrape_service(&ctx, StubStrategy::new(vec![Ok(first), Ok(second)]));

    service.run_once(&source.id).await.unwrap();
    let outcome = service.run_once(&source.id).await.unwrap();
    let ScrapeOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };

    // e1 changed description, e2 unchanged, e3 new.
    assert_eq!(summary.found, 3);
    assert_eq!(summary.new_posting_ids.len(), 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(ctx.postings().count_for_source(&source.id).await.unwrap(), 3);

    let e1 = ctx
        .postings()
        .find_by_external(&source.id, "e1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(e1.description.as_deref(), Some("Now with a description"));
}

#[tokio::test]
async fn test_repeated_failures_degrade_then_disable() {
    let (ctx, _dir) = setup_ctx().await;
    let (_company, source) = seed_source(&ctx).await;

    let service = scrape_service(
        &ctx,
        StubStrategy::new(vec![
            Err("HTTP 503".to_string()),
            Err("HTTP 503".to_string()),
            Err("HTTP 503".to_string()),
        ]),
    );

    for expected_failures in 1..=2 {
        service.run_once(&source.id).await.unwrap();
        let s = ctx.sources().get(&source.id).await.unwrap().unwrap();
        assert_eq!(s.health_status, HealthStatus::Degraded);
        assert_eq!(s.consecutive_failures, expected_failures);
        assert!(s.is_active);
    }

    service.run_once(&source.id).await.unwrap();
    let s = ctx.sources().get(&source.id).await.unwrap().unwrap();
    assert_eq!(s.health_status, HealthStatus::Failing);
    assert_eq!(s.consecutive_failures, 3);
    assert!(!s.is_active);

    // Disabled sources are skipped without recording anything.
    let outcome = service.run_once(&source.id).await.unwrap();
    assert!(matches!(outcome, ScrapeOutcome::Inactive));
    let attempts = ctx.attempts().recent(Some(&source.id), 10).await.unwrap();
    assert_eq!(attempts.len(), 3);
    assert_eq!(
        attempts[0].error_message.as_deref(),
        Some("fetch failed: HTTP 503")
    );
}

#[tokio::test]
async fn test_fetch_timeout_is_committed_as_failure() {
    let (ctx, _dir) = setup_ctx().await;
    let (_company, source) = seed_source(&ctx).await;

    let mut registry = ScraperRegistry::with_builtins();
    registry.register(Arc::new(StubStrategy::slow(Duration::from_millis(500))));
    let service = ScrapeService::new(
        ctx.clone(),
        Arc::new(registry),
        Duration::from_millis(50),
        None,
    );

    let outcome = service.run_once(&source.id).await.unwrap();
    let ScrapeOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(summary.status, AttemptStatus::Failed);
    assert!(summary.error.unwrap().contains("timed out"));

    let s = ctx.sources().get(&source.id).await.unwrap().unwrap();
    assert_eq!(s.health_status, HealthStatus::Degraded);
}

#[tokio::test]
async fn test_notification_dispatch_at_most_once() {
    let (ctx, _dir) = setup_ctx().await;
    let (_company, source) = seed_source(&ctx).await;
    seed_user(
        &ctx,
        "u1",
        UserPreferences {
            roles: vec!["engineer".to_string()],
            ..UserPreferences::default()
        },
    )
    .await;

    let service = scrape_service(
        &ctx,
        StubStrategy::new(vec![Ok(vec![posting("e1", "Backend Engineer")])]),
    );
    let ScrapeOutcome::Completed(summary) = service.run_once(&source.id).await.unwrap() else {
        panic!("expected a completed run");
    };
    let posting_id = &summary.new_posting_ids[0];

    let sender = Arc::new(RecordingSender::new());
    let notify = NotificationService::new(ctx.clone(), sender.clone());

    let first = notify.dispatch_for_posting(posting_id).await.unwrap();
    assert_eq!(first.matched, 1);
    assert_eq!(first.sent, 1);

    // Same posting again: the pair is claimed, nothing is re-sent.
    let second = notify.dispatch_for_posting(posting_id).await.unwrap();
    assert_eq!(second.matched, 1);
    assert_eq!(second.sent, 0);
    assert_eq!(sender.sent_count(), 1);

    let records = ctx.notifications().list_for_user("u1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].delivered);
}

#[tokio::test]
async fn test_concurrent_dispatch_single_delivery() {
    let (ctx, _dir) = setup_ctx().await;
    let (_company, source) = seed_source(&ctx).await;
    seed_user(&ctx, "u1", UserPreferences::default()).await;

    let service = scrape_service(
        &ctx,
        StubStrategy::new(vec![Ok(vec![posting("e1", "Backend Engineer")])]),
    );
    let ScrapeOutcome::Completed(summary) = service.run_once(&source.id).await.unwrap() else {
        panic!("expected a completed run");
    };
    let posting_id = summary.new_posting_ids[0].clone();

    let sender = Arc::new(RecordingSender::new());
    let notify = Arc::new(NotificationService::new(ctx.clone(), sender.clone()));

    let a = notify.clone();
    let b = notify.clone();
    let (ra, rb) = tokio::join!(
        a.dispatch_for_posting(&posting_id),
        b.dispatch_for_posting(&posting_id)
    );
    let total_sent = ra.unwrap().sent + rb.unwrap().sent;

    assert_eq!(total_sent, 1);
    assert_eq!(sender.sent_count(), 1);
}

#[tokio::test]
async fn test_delivery_failure_does_not_release_claim() {
    let (ctx, _dir) = setup_ctx().await;
    let (_company, source) = seed_source(&ctx).await;
    seed_user(&ctx, "u1", UserPreferences::default()).await;

    let service = scrape_service(
        &ctx,
        StubStrategy::new(vec![Ok(vec![posting("e1", "Backend Engineer")])]),
    );
    let ScrapeOutcome::Completed(summary) = service.run_once(&source.id).await.unwrap() else {
        panic!("expected a completed run");
    };
    let posting_id = &summary.new_posting_ids[0];

    let sender = Arc::new(RecordingSender::failing_first(1));
    let notify = NotificationService::new(ctx.clone(), sender.clone());

    let first = notify.dispatch_for_posting(posting_id).await.unwrap();
    assert_eq!(first.matched, 1);
    assert_eq!(first.sent, 0);

    // The claim survives the failed send; re-dispatch never double-sends.
    let second = notify.dispatch_for_posting(posting_id).await.unwrap();
    assert_eq!(second.sent, 0);
    assert_eq!(sender.sent_count(), 0);

    let records = ctx.notifications().list_for_user("u1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(!records[0].delivered);
}

#[tokio::test]
async fn test_tick_claims_once_and_notifies() {
    let (ctx, _dir) = setup_ctx().await;
    let (_company, _source) = seed_source(&ctx).await;
    seed_user(&ctx, "u1", UserPreferences::default()).await;

    let mut registry = ScraperRegistry::with_builtins();
    registry.register(Arc::new(StubStrategy::new(vec![Ok(vec![posting(
        "e1",
        "Backend Engineer",
    )])])));
    let scrape = Arc::new(ScrapeService::new(
        ctx.clone(),
        Arc::new(registry),
        Duration::from_secs(5),
        None,
    ));
    let sender = Arc::new(RecordingSender::new());
    let notify = Arc::new(NotificationService::new(ctx.clone(), sender.clone()));

    let scheduler = Scheduler::new(
        ctx.clone(),
        scrape,
        notify,
        SchedulerConfig {
            tick_interval: Duration::from_secs(60),
            workers: 1,
            max_retries: 0,
            retry_backoff: Duration::from_millis(10),
        },
    );

    let first = scheduler.tick_once().await.unwrap();
    assert_eq!(first.sources_claimed, 1);
    assert_eq!(first.sources_succeeded, 1);
    assert_eq!(first.new_postings, 1);
    assert_eq!(first.notifications_sent, 1);
    assert_eq!(sender.sent_count(), 1);

    // The claim stamped last_scraped_at; nothing is due again yet.
    let second = scheduler.tick_once().await.unwrap();
    assert_eq!(second.sources_claimed, 0);
}

#[tokio::test]
async fn test_fanout_larger_than_queue_drains() {
    let (ctx, _dir) = setup_ctx().await;
    let (_company, _source) = seed_source(&ctx).await;
    seed_user(&ctx, "u1", UserPreferences::default()).await;

    // More new postings than the scheduler queue holds, one worker.
    let batch: Vec<NormalizedPosting> = (0..300)
        .map(|i| posting(&format!("e{i}"), "Backend Engineer"))
        .collect();
    let mut registry = ScraperRegistry::with_builtins();
    registry.register(Arc::new(StubStrategy::new(vec![Ok(batch)])));
    let scrape = Arc::new(ScrapeService::new(
        ctx.clone(),
        Arc::new(registry),
        Duration::from_secs(5),
        None,
    ));
    let sender = Arc::new(RecordingSender::new());
    let notify = Arc::new(NotificationService::new(ctx.clone(), sender.clone()));

    let scheduler = Scheduler::new(
        ctx.clone(),
        scrape,
        notify,
        SchedulerConfig {
            tick_interval: Duration::from_millis(50),
            workers: 1,
            max_retries: 0,
            retry_backoff: Duration::from_millis(10),
        },
    );

    let runner = scheduler.clone();
    tokio::spawn(async move { runner.run().await });

    let deadline = tokio::time::Instant::now() + Duration::from_secs(60);
    while sender.sent_count() < 300 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "notification fan-out stalled at {} of 300",
            sender.sent_count()
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(sender.sent_count(), 300);
}

#[tokio::test]
async fn test_non_matching_users_not_notified() {
    let (ctx, _dir) = setup_ctx().await;
    let (_company, source) = seed_source(&ctx).await;
    seed_user(
        &ctx,
        "designer",
        UserPreferences {
            roles: vec!["designer".to_string()],
            ..UserPreferences::default()
        },
    )
    .await;
    seed_user(
        &ctx,
        "engineer",
        UserPreferences {
            roles: vec!["engineer".to_string()],
            ..UserPreferences::default()
        },
    )
    .await;

    let service = scrape_service(
        &ctx,
        StubStrategy::new(vec![Ok(vec![posting("e1", "Backend Engineer")])]),
    );
    let ScrapeOutcome::Completed(summary) = service.run_once(&source.id).await.unwrap() else {
        panic!("expected a completed run");
    };

    let sender = Arc::new(RecordingSender::new());
    let notify = NotificationService::new(ctx.clone(), sender.clone());
    let result = notify
        .dispatch_for_posting(&summary.new_posting_ids[0])
        .await
        .unwrap();

    assert_eq!(result.matched, 1);
    assert_eq!(result.sent, 1);
    assert_eq!(sender.sent_count(), 1);
    assert_eq!(sender.sent.lock().unwrap()[0].token, "token-engineer");
}
