use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use posting_quota::config::AppConfig;
use posting_quota::entitlements::{
    PostType, PostingAssessment, PostingDecision, PostingEligibilityService, QuotaOverview,
    QuotaReport, SnapshotSource, UserId,
};
use posting_quota::error::AppError;
use posting_quota::telemetry;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

type SnapshotService = PostingEligibilityService<SnapshotSource, SnapshotSource>;

#[derive(Parser, Debug)]
#[command(
    name = "posting-quota",
    about = "Check job-posting entitlements and remaining quota from a subscription snapshot",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decide whether a recruiter may publish a job of the given post type
    Check(CheckArgs),
    /// Show the governing subscription and remaining quota per post type
    Quota(SnapshotArgs),
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    /// JSON export with `subscriptions` and per-user `usage`
    #[arg(long)]
    snapshot: PathBuf,
    /// Recruiter account to evaluate
    #[arg(long)]
    user: String,
    /// Evaluation instant (RFC 3339, defaults to now)
    #[arg(long, value_parser = parse_timestamp)]
    now: Option<DateTime<Utc>>,
    /// Print machine-readable JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    snapshot: SnapshotArgs,
    /// Requested post type (standard, urgent, premium, proposal)
    #[arg(long, value_parser = parse_post_type)]
    post_type: PostType,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run_cli().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("application error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run_cli() -> Result<ExitCode, AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let snapshot = match &cli.command {
        Command::Check(args) => &args.snapshot,
        Command::Quota(args) => args,
    };
    let source = Arc::new(SnapshotSource::from_path(&snapshot.snapshot)?);
    info!(
        ?config.environment,
        snapshot = %snapshot.snapshot.display(),
        policy = config.engine.aggregate_usage.label(),
        "loaded subscription snapshot"
    );
    let service = PostingEligibilityService::new(source.clone(), source, config.engine);

    match cli.command {
        Command::Check(args) => run_check(&service, args).await,
        Command::Quota(args) => run_quota(&service, args).await,
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}

fn parse_post_type(raw: &str) -> Result<PostType, String> {
    raw.parse::<PostType>().map_err(|err| err.to_string())
}

/// 0 when allowed, 2 when denied, 3 when the decision is unknown and worth retrying.
fn decision_status(decision: &PostingDecision) -> u8 {
    match decision {
        PostingDecision::Allowed { .. } => 0,
        PostingDecision::Denied { .. } => 2,
        PostingDecision::Unknown { .. } => 3,
    }
}

async fn run_check(service: &SnapshotService, args: CheckArgs) -> Result<ExitCode, AppError> {
    let CheckArgs {
        snapshot,
        post_type,
    } = args;
    let now = snapshot.now.unwrap_or_else(Utc::now);
    let user_id = UserId(snapshot.user);

    let assessment = service.assess(&user_id, post_type, now).await;

    if snapshot.json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
    } else {
        render_assessment(&assessment);
    }

    Ok(ExitCode::from(decision_status(&assessment.decision)))
}

async fn run_quota(service: &SnapshotService, args: SnapshotArgs) -> Result<ExitCode, AppError> {
    let now = args.now.unwrap_or_else(Utc::now);
    let user_id = UserId(args.user);

    let overview = service.quota_overview(&user_id, now).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
    } else {
        render_overview(&user_id, overview.as_ref(), now);
    }

    Ok(ExitCode::SUCCESS)
}

fn render_assessment(assessment: &PostingAssessment) {
    println!("Posting check");
    println!(
        "Recruiter {} requesting a {} job (evaluated {})",
        assessment.user_id, assessment.post_type, assessment.evaluated_at
    );

    match &assessment.subscription {
        Some(subscription) => println!(
            "Governing subscription: #{} {} (expires {})",
            subscription.id.0, subscription.service_package.name, subscription.expiration_date
        ),
        None => println!("Governing subscription: none"),
    }

    println!("\nDecision: {}", assessment.decision.summary());

    if let Some(report) = &assessment.quota {
        render_quota_table(report);
    }
}

fn render_overview(user_id: &UserId, overview: Option<&QuotaOverview>, now: DateTime<Utc>) {
    println!("Quota overview for {user_id} (evaluated {now})");

    let Some(overview) = overview else {
        println!("No active subscription governs job posting.");
        return;
    };

    let subscription = &overview.subscription;
    println!(
        "Subscription #{} {}: {} day(s) remaining, expires {}",
        subscription.id.0,
        subscription.service_package.name,
        subscription.days_remaining(now),
        subscription.expiration_date
    );

    if !overview.overlapping.is_empty() {
        let ids: Vec<String> = overview
            .overlapping
            .iter()
            .map(|id| format!("#{}", id.0))
            .collect();
        println!("Also active (not governing): {}", ids.join(", "));
    }

    render_quota_table(&overview.report);
}

fn render_quota_table(report: &QuotaReport) {
    println!("\nRemaining postings");
    if report.entries.is_empty() {
        println!("- none: package grants no job postings");
    }
    for entry in report.sorted_entries() {
        let marker = if entry.is_available { "" } else { " (exhausted)" };
        println!(
            "- {}: {} of {} remaining, {} used{}",
            entry.post_type.label(),
            entry.remaining,
            entry.limit,
            entry.used,
            marker
        );
    }

    println!(
        "Total: {} of {} remaining, {} used",
        report.total_remaining, report.total_limit, report.total_used
    );
    if !report.usage_consistent {
        println!(
            "Note: reported usage total disagrees with the per-type breakdown; totals use the {}",
            report.aggregate_source.label()
        );
    }
}
