use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use learn_core::{Calculator, CalculatorSettings, Catalog};
use serde::Serialize;
use services::{
    Clock, ProgressOverview, ProgressService, TopicReport, UpdateProgressRequest,
};
use storage::repository::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "learn-progress", about = "Record and inspect chapter progress")]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// SQLite database URL or path; the file is created if missing.
    #[arg(long = "db", env = "LEARN_DB_URL", default_value = "sqlite://progress.sqlite3")]
    db_url: String,
    /// TOML topic catalog; the built-in catalog is used when omitted.
    #[arg(long, env = "LEARN_CATALOG")]
    catalog: Option<PathBuf>,
    /// Share of the estimated reading time required for completion.
    #[arg(long, default_value_t = 0.8)]
    completion_fraction: f64,
    /// Scroll percentage required for completion.
    #[arg(long, default_value_t = 90)]
    scroll_threshold: u8,
    /// Reading estimate for chapters the catalog does not list, in seconds.
    #[arg(long, default_value_t = 600)]
    default_estimate: u64,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Merge one progress update into a chapter.
    Record {
        #[arg(short, long)]
        user: u64,
        #[arg(short, long)]
        topic: String,
        #[arg(short, long)]
        chapter: String,
        /// Seconds read since the previous update.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        read: i64,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        scroll: i32,
        #[arg(long, default_value = "")]
        position: String,
        #[arg(long, default_value_t = 0)]
        quiz_score: u32,
        #[arg(long)]
        quiz_passed: bool,
        /// Override the catalog reading estimate, in seconds.
        #[arg(long)]
        estimate: Option<u64>,
        #[arg(long)]
        force_sync: bool,
    },
    /// Overall progress with per-topic summaries.
    Overview {
        #[arg(short, long)]
        user: u64,
    },
    /// One topic with its chapters.
    Topic {
        #[arg(short, long)]
        user: u64,
        #[arg(short, long)]
        topic: String,
    },
    /// Every stored chapter record, most recent first.
    History {
        #[arg(short, long)]
        user: u64,
    },
    /// The recommended chapter to continue with.
    Next {
        #[arg(short, long)]
        user: u64,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid --db value: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

fn load_catalog(path: Option<&Path>) -> anyhow::Result<Catalog> {
    let Some(path) = path else {
        return Ok(Catalog::builtin());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading catalog {}", path.display()))?;
    let catalog: Catalog =
        toml::from_str(&text).with_context(|| format!("parsing catalog {}", path.display()))?;
    Ok(catalog)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let catalog = load_catalog(args.catalog.as_deref())?;
    let settings = CalculatorSettings::new(
        args.completion_fraction,
        args.scroll_threshold,
        args.default_estimate,
    )?;
    let calculator = Calculator::new(Arc::new(catalog), settings);

    let db_url = normalize_sqlite_url(&args.db_url);
    prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url)
        .await
        .with_context(|| format!("opening {db_url}"))?;
    info!(db = %db_url, "storage ready");

    let service = ProgressService::new(Clock::default_clock(), calculator, storage.progress);

    match args.command {
        Command::Record {
            user,
            topic,
            chapter,
            read,
            scroll,
            position,
            quiz_score,
            quiz_passed,
            estimate,
            force_sync,
        } => {
            let request = UpdateProgressRequest {
                user_id: user,
                topic,
                chapter,
                read_duration: read,
                scroll_progress: scroll,
                last_position: position,
                quiz_score,
                quiz_passed,
                estimated_seconds: estimate,
                force_sync,
            };
            print_json(&service.create_or_update_progress(request).await?)
        }
        Command::Overview { user } => {
            let (overall, topics) = service.get_overall_progress(user).await?;
            print_json(&ProgressOverview { overall, topics })
        }
        Command::Topic { user, topic } => {
            let (topic, chapters) = service.get_topic_chapters(user, &topic).await?;
            print_json(&TopicReport { topic, chapters })
        }
        Command::History { user } => print_json(&service.list_by_user(user).await?),
        Command::Next { user } => print_json(&service.get_next_unfinished_chapter(user).await?),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    run(Args::parse()).await
}
