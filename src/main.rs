//! LLM Vendor Daily — Binary Entrypoint
//! Fetches the configured vendor feeds, builds the digest for the target
//! date, and writes the markdown report plus the aggregated feed file.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::{Duration, Local, NaiveDate};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use llm_vendor_daily::config;
use llm_vendor_daily::ingest::Digester;
use llm_vendor_daily::report::{self, feed::ChannelMeta};
use llm_vendor_daily::summarize::{strategy_chain, SummarizeConfig};

#[derive(Parser, Debug)]
#[command(name = "llm-vendor-daily", about = "LLM vendor daily digest generator")]
struct Args {
    /// Path to sources.toml
    #[arg(long, default_value = "config/sources.toml")]
    config: PathBuf,

    /// Directory for daily markdown reports
    #[arg(long, default_value = "data/daily")]
    output_dir: PathBuf,

    /// Report date (YYYY-MM-DD). Defaults to yesterday in local time.
    #[arg(long)]
    date: Option<String>,

    /// A source is stale when its latest item age exceeds this many days.
    /// Defaults to $SOURCE_STALE_DAYS or 21.
    #[arg(long)]
    stale_days: Option<i64>,

    /// Maximum number of daily digest entries included in feed.xml.
    /// Defaults to $DAILY_FEED_LIMIT or 60.
    #[arg(long)]
    feed_limit: Option<usize>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn env_number<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the vars come from CI secrets.
    let _ = dotenvy::dotenv();
    init_tracing();
    let args = Args::parse();

    let report_date = match &args.date {
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                tracing::error!(date = %raw, "invalid --date format, expected YYYY-MM-DD");
                return ExitCode::from(2);
            }
        },
        None => (Local::now() - Duration::days(1)).date_naive(),
    };

    match run(&args, report_date).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = ?err, "digest run failed");
            ExitCode::from(1)
        }
    }
}

async fn run(args: &Args, report_date: NaiveDate) -> anyhow::Result<()> {
    let sources = config::load_sources(&args.config)?;
    if sources.is_empty() {
        anyhow::bail!("no sources configured, update {}", args.config.display());
    }

    // Reporting timezone = the process-local offset, captured once.
    let offset = *Local::now().offset();
    let summarize_cfg = SummarizeConfig::from_env();
    let digester =
        Digester::new(offset).with_summarizers(strategy_chain(&summarize_cfg, offset));

    let digest = digester.produce_digest(report_date, &sources).await?;

    let stale_days = args
        .stale_days
        .unwrap_or_else(|| env_number("SOURCE_STALE_DAYS", 21));
    report::log_source_health(&digest.health, report_date, stale_days);
    tracing::info!(
        attempted = digest.sources_attempted,
        succeeded = digest.sources_succeeded,
        items = digest.items.len(),
        "digest produced"
    );

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    let report_path = args.output_dir.join(format!("{report_date}.md"));
    std::fs::write(&report_path, report::render_markdown(&digest))
        .with_context(|| format!("writing {}", report_path.display()))?;
    tracing::info!(path = %report_path.display(), "wrote daily report");

    let repo_slug = std::env::var("GITHUB_REPOSITORY").unwrap_or_default();
    let channel_link = if repo_slug.is_empty() {
        "https://github.com/".to_string()
    } else {
        format!("https://github.com/{repo_slug}")
    };
    let feed_self = (!repo_slug.is_empty())
        .then(|| format!("https://raw.githubusercontent.com/{repo_slug}/master/feed.xml"));

    let feed_limit = args
        .feed_limit
        .unwrap_or_else(|| env_number("DAILY_FEED_LIMIT", 60));
    let entries =
        report::feed::collect_daily_entries(&args.output_dir, &repo_slug, offset, feed_limit)?;
    let feed_xml = report::feed::build_feed(
        &entries,
        &ChannelMeta {
            title: "LLM Vendor Daily Digest",
            link: &channel_link,
            description: "Bilingual daily digests generated from vendor sources.",
            self_link: feed_self.as_deref(),
        },
    )?;
    std::fs::write("feed.xml", feed_xml).context("writing feed.xml")?;
    tracing::info!(entries = entries.len(), "wrote feed.xml");

    Ok(())
}
