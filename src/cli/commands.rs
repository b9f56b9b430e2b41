//! CLI commands implementation.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{load_settings, LoadOptions, Settings};
use crate::models::{Company, HealthStatus, Source, User, UserPreferences};
use crate::repository::DbContext;
use crate::scrapers::ScraperRegistry;
use crate::services::{
    NotificationService, NullPushSender, PushSender, Scheduler, SchedulerConfig, ScrapeOutcome,
    ScrapeService, WebhookPushSender,
};

#[derive(Parser)]
#[command(name = "jobscout")]
#[command(about = "Job posting scraper and notification pipeline")]
#[command(version)]
pub struct Cli {
    /// Data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Manage companies
    Company {
        #[command(subcommand)]
        command: CompanyCommands,
    },

    /// Manage scrape sources
    Source {
        #[command(subcommand)]
        command: SourceCommands,
    },

    /// Scrape one or more sources now (bypasses the schedule)
    Scrape {
        /// Source IDs to scrape (or use --all)
        source_ids: Vec<String>,
        /// Scrape every active source, due or not
        #[arg(short, long)]
        all: bool,
        /// Skip notification dispatch for new postings
        #[arg(long)]
        no_notify: bool,
    },

    /// Run the scheduler loop (periodic scraping and notifications)
    Run,

    /// Show system status and source health
    Status,

    /// Show recently discovered postings
    Postings {
        /// Limit number of results
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Show recent scrape attempts
    Logs {
        /// Source ID to filter by
        #[arg(short, long)]
        source: Option<String>,
        /// Limit number of results
        #[arg(short, long, default_value = "20")]
        limit: i64,
        #[command(subcommand)]
        command: Option<LogsCommands>,
    },

    /// Seed demo companies, sources, and a user for local development
    Seed,
}

#[derive(Subcommand)]
enum CompanyCommands {
    /// Add a company
    Add {
        /// Display name
        name: String,
        /// URL-safe slug (derived from the name if omitted)
        #[arg(long)]
        slug: Option<String>,
        /// Company website
        #[arg(long)]
        website: Option<String>,
    },
    /// List companies
    List,
}

#[derive(Subcommand)]
enum SourceCommands {
    /// Add a source for a company
    Add {
        /// Company slug
        company: String,
        /// Source type (see 'source types')
        source_type: String,
        /// Source URL (careers page or board URL)
        url: String,
        /// Strategy config as JSON (e.g. '{"board_slug": "acme"}')
        #[arg(long, default_value = "{}")]
        config: String,
        /// Scrape interval in minutes
        #[arg(long, default_value = "30")]
        interval: i32,
    },
    /// List configured sources
    List,
    /// Enable a source (also resets its health)
    Enable { source_id: String },
    /// Disable a source
    Disable { source_id: String },
    /// List available source types
    Types,
}

#[derive(Subcommand)]
enum LogsCommands {
    /// Delete scrape attempts older than the retention window
    Cleanup {
        /// Retention in days (defaults to the configured value)
        #[arg(long)]
        days: Option<i64>,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(LoadOptions {
        config_path: cli.config,
        data_dir: cli.data_dir,
    });

    match cli.command {
        Commands::Init => cmd_init(&settings).await,
        Commands::Company { command } => match command {
            CompanyCommands::Add {
                name,
                slug,
                website,
            } => cmd_company_add(&settings, &name, slug.as_deref(), website).await,
            CompanyCommands::List => cmd_company_list(&settings).await,
        },
        Commands::Source { command } => match command {
            SourceCommands::Add {
                company,
                source_type,
                url,
                config,
                interval,
            } => cmd_source_add(&settings, &company, &source_type, &url, &config, interval).await,
            SourceCommands::List => cmd_source_list(&settings).await,
            SourceCommands::Enable { source_id } => {
                cmd_source_set_enabled(&settings, &source_id, true).await
            }
            SourceCommands::Disable { source_id } => {
                cmd_source_set_enabled(&settings, &source_id, false).await
            }
            SourceCommands::Types => cmd_source_types(),
        },
        Commands::Scrape {
            source_ids,
            all,
            no_notify,
        } => cmd_scrape(&settings, &source_ids, all, no_notify).await,
        Commands::Run => cmd_run(&settings).await,
        Commands::Status => cmd_status(&settings).await,
        Commands::Postings { limit } => cmd_postings(&settings, limit).await,
        Commands::Logs {
            source,
            limit,
            command,
        } => match command {
            Some(LogsCommands::Cleanup { days }) => cmd_logs_cleanup(&settings, days).await,
            None => cmd_logs(&settings, source.as_deref(), limit).await,
        },
        Commands::Seed => cmd_seed(&settings).await,
    }
}

/// Open the database, refusing politely when it was never initialized.
async fn open_ctx(settings: &Settings) -> anyhow::Result<DbContext> {
    if !settings.database_exists() {
        anyhow::bail!("database not initialized. Run 'jobscout init' first.");
    }
    Ok(settings.create_db_context())
}

fn build_push_sender(settings: &Settings) -> anyhow::Result<Arc<dyn PushSender>> {
    match &settings.push_endpoint {
        Some(endpoint) => Ok(Arc::new(WebhookPushSender::new(
            endpoint.clone(),
            settings.request_timeout(),
        )?)),
        None => Ok(Arc::new(NullPushSender)),
    }
}

fn build_services(
    settings: &Settings,
    ctx: &DbContext,
) -> anyhow::Result<(Arc<ScrapeService>, Arc<NotificationService>)> {
    let registry = Arc::new(ScraperRegistry::with_builtins());
    let scrape = Arc::new(ScrapeService::new(
        ctx.clone(),
        registry,
        settings.request_timeout(),
        settings.user_agent.clone(),
    ));
    let notify = Arc::new(NotificationService::new(
        ctx.clone(),
        build_push_sender(settings)?,
    ));
    Ok((scrape, notify))
}

async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let ctx = settings.create_db_context();
    ctx.run_migrations().await?;

    println!(
        "{} Initialized JobScout in {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    println!(
        "  {} Database: {}",
        style("→").dim(),
        settings.database_url()
    );

    Ok(())
}

async fn cmd_company_add(
    settings: &Settings,
    name: &str,
    slug: Option<&str>,
    website: Option<String>,
) -> anyhow::Result<()> {
    let ctx = open_ctx(settings).await?;
    let companies = ctx.companies();

    let slug = slug.map(String::from).unwrap_or_else(|| slugify(name));
    if companies.get_by_slug(&slug).await?.is_some() {
        println!("{} Company '{}' already exists", style("✗").red(), slug);
        return Ok(());
    }

    let mut company = Company::new(name.to_string(), slug.clone());
    company.website = website;
    companies.save(&company).await?;

    println!(
        "{} Added company: {} ({})",
        style("✓").green(),
        company.name,
        slug
    );
    Ok(())
}

async fn cmd_company_list(settings: &Settings) -> anyhow::Result<()> {
    let ctx = open_ctx(settings).await?;
    let companies = ctx.companies().get_all().await?;

    if companies.is_empty() {
        println!(
            "{} No companies. Add one with 'jobscout company add'.",
            style("!").yellow()
        );
        return Ok(());
    }

    println!("\n{}", style("Companies").bold());
    println!("{}", "-".repeat(60));
    for company in companies {
        println!(
            "{:<20} {:<30} {}",
            company.slug,
            truncate(&company.name, 29),
            company.website.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn cmd_source_add(
    settings: &Settings,
    company_slug: &str,
    source_type: &str,
    url: &str,
    config_json: &str,
    interval: i32,
) -> anyhow::Result<()> {
    let ctx = open_ctx(settings).await?;

    let registry = ScraperRegistry::with_builtins();
    if registry.resolve(source_type).is_err() {
        println!(
            "{} Unknown source type '{}'. Available: {}",
            style("✗").red(),
            source_type,
            registry.keys().join(", ")
        );
        return Ok(());
    }

    let Some(company) = ctx.companies().get_by_slug(company_slug).await? else {
        println!(
            "{} Company '{}' not found. Add it first.",
            style("✗").red(),
            company_slug
        );
        return Ok(());
    };

    let config: serde_json::Map<String, serde_json::Value> = serde_json::from_str(config_json)
        .map_err(|e| anyhow::anyhow!("--config must be a JSON object: {e}"))?;

    let mut source = Source::new(company.id, source_type.to_string(), url.to_string());
    source.config = config;
    source.scrape_interval_minutes = interval.max(1);
    ctx.sources().save(&source).await?;

    println!(
        "{} Added {} source for {}: {}",
        style("✓").green(),
        source_type,
        company.slug,
        source.id
    );
    Ok(())
}

async fn cmd_source_list(settings: &Settings) -> anyhow::Result<()> {
    let ctx = open_ctx(settings).await?;
    let sources = ctx.sources().get_all().await?;

    if sources.is_empty() {
        println!(
            "{} No sources configured. Run 'jobscout source add' first.",
            style("!").yellow()
        );
        return Ok(());
    }

    println!("\n{}", style("Sources").bold());
    println!("{}", "-".repeat(100));
    println!(
        "{:<38} {:<14} {:<10} {:<8} {:<6} Last Success",
        "ID", "Type", "Health", "Active", "Fails"
    );
    println!("{}", "-".repeat(100));

    for source in sources {
        let last_success = source
            .last_success_at
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "Never".to_string());

        println!(
            "{:<38} {:<14} {:<10} {:<8} {:<6} {}",
            source.id,
            source.source_type,
            styled_health(source.health_status),
            if source.is_active { "yes" } else { "no" },
            source.consecutive_failures,
            last_success
        );
    }
    Ok(())
}

async fn cmd_source_set_enabled(
    settings: &Settings,
    source_id: &str,
    enabled: bool,
) -> anyhow::Result<()> {
    let ctx = open_ctx(settings).await?;

    if ctx.sources().set_enabled(source_id, enabled).await? {
        let verb = if enabled { "Enabled" } else { "Disabled" };
        println!("{} {} source '{}'", style("✓").green(), verb, source_id);
        if enabled {
            println!("  {} Health reset to unknown", style("→").dim());
        }
    } else {
        println!("{} Source '{}' not found", style("✗").red(), source_id);
    }
    Ok(())
}

fn cmd_source_types() -> anyhow::Result<()> {
    let registry = ScraperRegistry::with_builtins();
    println!("\n{}", style("Source Types").bold());
    println!("{}", "-".repeat(40));
    for key in registry.keys() {
        println!("  {key}");
    }
    Ok(())
}

async fn cmd_scrape(
    settings: &Settings,
    source_ids: &[String],
    all: bool,
    no_notify: bool,
) -> anyhow::Result<()> {
    let ctx = open_ctx(settings).await?;
    let (scrape, notify) = build_services(settings, &ctx)?;

    let targets: Vec<String> = if all {
        ctx.sources()
            .get_all()
            .await?
            .into_iter()
            .filter(|s| s.is_active)
            .map(|s| s.id)
            .collect()
    } else if source_ids.is_empty() {
        println!(
            "{} No sources specified. Use --all or provide source IDs.",
            style("✗").red()
        );
        return Ok(());
    } else {
        source_ids.to_vec()
    };

    if targets.is_empty() {
        println!("{} No active sources to scrape", style("!").yellow());
        return Ok(());
    }

    let pb = ProgressBar::new(targets.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap(),
    );

    let mut total_new = 0usize;
    let mut total_sent = 0usize;
    let mut failures = Vec::new();

    for source_id in &targets {
        pb.set_message(source_id.clone());

        match scrape.run_once(source_id).await? {
            ScrapeOutcome::Completed(summary) => {
                total_new += summary.new_posting_ids.len();
                if let Some(error) = &summary.error {
                    failures.push(format!("{source_id}: {error}"));
                }
                if !no_notify {
                    for posting_id in &summary.new_posting_ids {
                        let dispatched = notify.dispatch_for_posting(posting_id).await?;
                        total_sent += dispatched.sent;
                    }
                }
            }
            ScrapeOutcome::NotFound => failures.push(format!("{source_id}: not found")),
            ScrapeOutcome::Inactive => failures.push(format!("{source_id}: inactive")),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!(
        "{} Scraped {} source{}: {} new posting{}, {} notification{} sent",
        style("✓").green(),
        targets.len(),
        plural(targets.len()),
        total_new,
        plural(total_new),
        total_sent,
        plural(total_sent)
    );

    if !failures.is_empty() {
        println!("{} Some sources failed:", style("!").yellow());
        for failure in &failures {
            println!("  - {failure}");
        }
    }
    Ok(())
}

async fn cmd_run(settings: &Settings) -> anyhow::Result<()> {
    let ctx = open_ctx(settings).await?;
    ctx.run_migrations().await?;
    let (scrape, notify) = build_services(settings, &ctx)?;

    println!(
        "{} Scheduler running (tick every {}s, {} workers). Ctrl-C to stop.",
        style("→").cyan(),
        settings.tick_interval_secs,
        settings.workers
    );

    let scheduler = Scheduler::new(
        ctx,
        scrape,
        notify,
        SchedulerConfig::from_settings(settings),
    );
    scheduler.run().await
}

async fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    let ctx = open_ctx(settings).await?;

    let sources = ctx.sources().get_all().await?;
    let companies = ctx.companies().get_all().await?;
    let posting_count = ctx.postings().count().await?;

    println!("\n{}", style("JobScout Status").bold());
    println!("{}", "-".repeat(40));
    println!("{:<20} {}", "Data Directory:", settings.data_dir.display());
    println!("{:<20} {}", "Companies:", companies.len());
    println!("{:<20} {}", "Sources:", sources.len());
    println!("{:<20} {}", "Postings:", posting_count);

    let mut by_health = [0usize; 4];
    for source in &sources {
        let idx = match source.health_status {
            HealthStatus::Unknown => 0,
            HealthStatus::Healthy => 1,
            HealthStatus::Degraded => 2,
            HealthStatus::Failing => 3,
        };
        by_health[idx] += 1;
    }
    println!("\n{}", style("Source Health").bold());
    println!("{:<20} {}", "  healthy:", by_health[1]);
    println!("{:<20} {}", "  degraded:", by_health[2]);
    println!("{:<20} {}", "  failing:", by_health[3]);
    println!("{:<20} {}", "  unknown:", by_health[0]);

    let failing: Vec<&Source> = sources
        .iter()
        .filter(|s| s.health_status == HealthStatus::Failing)
        .collect();
    if !failing.is_empty() {
        println!(
            "\n{} {} source{} failing and disabled:",
            style("!").yellow(),
            failing.len(),
            plural(failing.len())
        );
        for source in failing {
            println!(
                "  - {} ({}) after {} consecutive failures",
                source.id, source.source_type, source.consecutive_failures
            );
        }
        println!(
            "  {} Re-enable with 'jobscout source enable <id>'",
            style("→").dim()
        );
    }
    Ok(())
}

async fn cmd_postings(settings: &Settings, limit: i64) -> anyhow::Result<()> {
    let ctx = open_ctx(settings).await?;
    let postings = ctx.postings().recent(limit.max(1)).await?;

    if postings.is_empty() {
        println!("{} No postings discovered yet", style("!").yellow());
        return Ok(());
    }

    println!("\n{}", style("Recent Postings").bold());
    println!("{}", "-".repeat(100));
    println!(
        "{:<17} {:<40} {:<25} Apply",
        "Discovered", "Title", "Location"
    );
    println!("{}", "-".repeat(100));

    for posting in postings {
        println!(
            "{:<17} {:<40} {:<25} {}",
            posting.discovered_at.format("%Y-%m-%d %H:%M"),
            truncate(&posting.title, 39),
            truncate(posting.location.as_deref().unwrap_or("-"), 24),
            posting.apply_url
        );
    }
    Ok(())
}

async fn cmd_logs(settings: &Settings, source: Option<&str>, limit: i64) -> anyhow::Result<()> {
    let ctx = open_ctx(settings).await?;
    let attempts = ctx.attempts().recent(source, limit.max(1)).await?;

    if attempts.is_empty() {
        println!("{} No scrape attempts recorded", style("!").yellow());
        return Ok(());
    }

    println!("\n{}", style("Scrape Attempts").bold());
    println!("{}", "-".repeat(100));
    println!(
        "{:<17} {:<38} {:<8} {:>5} {:>4} {:>4} {:>7}  Error",
        "Time", "Source", "Status", "Found", "New", "Upd", "ms"
    );
    println!("{}", "-".repeat(100));

    for attempt in attempts {
        println!(
            "{:<17} {:<38} {:<8} {:>5} {:>4} {:>4} {:>7}  {}",
            attempt.created_at.format("%Y-%m-%d %H:%M"),
            attempt.source_id,
            attempt.status.as_str(),
            attempt.postings_found,
            attempt.new_postings,
            attempt.updated_postings,
            attempt
                .duration_ms
                .map(|ms| ms.to_string())
                .unwrap_or_else(|| "-".to_string()),
            attempt.error_message.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn cmd_logs_cleanup(settings: &Settings, days: Option<i64>) -> anyhow::Result<()> {
    let ctx = open_ctx(settings).await?;
    let days = days.unwrap_or(settings.retention_days).max(1);

    let cutoff = Utc::now() - Duration::days(days);
    let removed = ctx.attempts().cleanup_older_than(cutoff).await?;

    println!(
        "{} Removed {} scrape attempt{} older than {} days",
        style("✓").green(),
        removed,
        plural(removed),
        days
    );
    Ok(())
}

async fn cmd_seed(settings: &Settings) -> anyhow::Result<()> {
    let ctx = open_ctx(settings).await?;

    let companies = ctx.companies();
    let mut acme = match companies.get_by_slug("acme").await? {
        Some(existing) => existing,
        None => {
            let company = Company::new("Acme Corp".to_string(), "acme".to_string());
            companies.save(&company).await?;
            println!("  {} Added company: acme", style("✓").green());
            company
        }
    };
    acme.website = Some("https://acme.example.com".to_string());
    companies.save(&acme).await?;

    let sources = ctx.sources();
    if sources.get_by_company(&acme.id).await?.is_empty() {
        let mut source = Source::new(
            acme.id.clone(),
            "remotive".to_string(),
            "https://remotive.com/api/remote-jobs".to_string(),
        );
        source.config.insert(
            "category".to_string(),
            serde_json::Value::String("software-dev".to_string()),
        );
        sources.save(&source).await?;
        println!(
            "  {} Added remotive source: {}",
            style("✓").green(),
            source.id
        );
    }

    let users = ctx.users();
    let demo_user_id = "demo-user";
    if users.get(demo_user_id).await?.is_none() {
        let user = User {
            id: demo_user_id.to_string(),
            email: "demo@example.com".to_string(),
            is_active: true,
            push_token: Some("demo-push-token".to_string()),
            preferences: UserPreferences {
                push_enabled: true,
                companies: Vec::new(),
                roles: vec!["engineer".to_string()],
                locations: vec!["remote".to_string()],
            },
            created_at: Utc::now(),
        };
        users.save(&user).await?;
        println!("  {} Added user: demo@example.com", style("✓").green());
    }

    println!("{} Seed data ready", style("✓").green());
    Ok(())
}

fn styled_health(health: HealthStatus) -> String {
    match health {
        HealthStatus::Healthy => style("healthy").green().to_string(),
        HealthStatus::Degraded => style("degraded").yellow().to_string(),
        HealthStatus::Failing => style("failing").red().to_string(),
        HealthStatus::Unknown => style("unknown").dim().to_string(),
    }
}

/// Shorten to `max` characters for table display. Counts chars, not
/// bytes, so multi-byte titles never split mid-character.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{keep}...")
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// URL-safe slug from a company name.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash && !slug.is_empty() {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Acme Corp"), "acme-corp");
        assert_eq!(slugify("  Stripe, Inc.  "), "stripe-inc");
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        // 15 chars but 43 bytes; fits within 39 chars untouched.
        let title = format!("a{}", "€".repeat(14));
        assert_eq!(truncate(&title, 39), title);

        let long = "é".repeat(40);
        let cut = truncate(&long, 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with("..."));

        assert_eq!(truncate("short", 10), "short");
    }
}
