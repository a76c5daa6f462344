use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use subreddit_tracker::config::{Config, ConfigOverrides};
use subreddit_tracker::cycle::CycleSettings;
use subreddit_tracker::discovery::{extract_mentions, unique_mentions};
use subreddit_tracker::reddit::{Collaborators, RedditClient, SystemClock};
use subreddit_tracker::report::csv::entities_to_csv;
use subreddit_tracker::report::json::render_json;
use subreddit_tracker::report::table::render_entities_table;
use subreddit_tracker::report::{entity_rows, EntityRow};
use subreddit_tracker::store::{normalize_name, EntityStore};
use subreddit_tracker::supervisor::{run_loop, LoopOptions, Shutdown};
use subreddit_tracker::tracking::{classify, Classification, RefreshPolicy};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info,subreddit_tracker=debug";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "subreddit-tracker",
    about = "Keeps a wiki list of large subreddits in sync with subscriber counts"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    db: Option<String>,
    #[arg(short, long)]
    threshold: Option<i64>,
    #[arg(long = "user-agent")]
    user_agent: Option<String>,
    #[arg(long)]
    token: Option<String>,
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Run {
        #[arg(long)]
        once: bool,
        #[arg(long = "dry-run")]
        dry_run: bool,
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    Check {
        name: String,
    },
    Entities {
        #[arg(long)]
        stale: bool,
    },
    Extract {
        file: PathBuf,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[derive(Debug, Serialize)]
struct CheckOutcome {
    name: String,
    subscribers: i64,
    classification: Classification,
    near_threshold: bool,
    stored_subscribers: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ExtractOutcome {
    mentions: Vec<String>,
    unique: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        db_path: cli.db.clone(),
        threshold: cli.threshold,
        user_agent: cli.user_agent.clone(),
        access_token: cli.token.clone(),
    });

    match &cli.command {
        Commands::Config { init, show } => {
            return handle_config_command(*init, *show, &config, &config_path);
        }
        Commands::Extract { file } => return print_mentions(file, cli.output),
        _ => {}
    }

    config.validate().context("invalid configuration")?;

    match &cli.command {
        Commands::Run {
            once,
            dry_run,
            interval_secs,
        } => run(&config, *once, *dry_run, *interval_secs).await?,
        Commands::Check { name } => check(&config, name, cli.output).await?,
        Commands::Entities { stale } => print_entities(&config, *stale, cli.output)?,
        Commands::Config { .. } | Commands::Extract { .. } => {}
    }

    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed creating log directory: {}", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed opening log file: {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn handle_config_command(init: bool, show: bool, config: &Config, config_path: &Path) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

async fn run(config: &Config, once: bool, dry_run: bool, interval_secs: Option<u64>) -> Result<()> {
    let client = RedditClient::new(config)?;
    if client.is_authenticated() {
        let me = client
            .identity()
            .await
            .context("failed verifying reddit identity")?;
        info!("logged into reddit as /u/{me}");
    } else if dry_run {
        info!("no access token, reading anonymously from {}", client.base_url());
    } else {
        bail!("publishing wiki pages needs an access token; pass --token or use --dry-run");
    }

    let store = EntityStore::open(&config.resolved_db_path())?;
    info!("tracking {} subreddits", store.count()?);
    let shutdown = Arc::new(Shutdown::new());
    let signal = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("handling interrupt");
            signal.trigger();
        }
    });

    let clock = SystemClock;
    let sources = Collaborators::from_client(&client, &clock);
    let settings = CycleSettings::from_config(config, dry_run);
    let options = LoopOptions {
        interval: Duration::from_secs(interval_secs.unwrap_or(config.run.loop_secs).max(1)),
        once,
    };
    let report = run_loop(&store, &sources, &settings, &options, &shutdown).await;
    info!(
        "stopped after {} runs ({} failed)",
        report.cycles, report.failures
    );
    store.close()
}

async fn check(config: &Config, name: &str, format: OutputFormat) -> Result<()> {
    let name = normalize_name(name.trim_start_matches("/r/").trim_start_matches("r/"));
    let client = RedditClient::new(config)?;
    let subscribers = client
        .fetch_subscriber_count(&name)
        .await
        .with_context(|| format!("failed fetching /r/{name}"))?;
    let policy = RefreshPolicy::from_config(&config.tracking);
    let db_path = config.resolved_db_path();
    let stored_subscribers = if db_path.exists() {
        EntityStore::open(&db_path)?
            .get(&name)?
            .map(|entity| entity.subscribers)
    } else {
        None
    };
    let outcome = CheckOutcome {
        classification: classify(subscribers, policy.threshold),
        near_threshold: policy.is_near_threshold(subscribers),
        name,
        subscribers,
        stored_subscribers,
    };
    match format {
        OutputFormat::Table => {
            println!(
                "/r/{}: {} subscribers ({} threshold of {})",
                outcome.name,
                outcome.subscribers,
                outcome.classification.as_str(),
                policy.threshold
            );
            if let Some(stored) = outcome.stored_subscribers {
                println!("stored count: {stored}");
            }
        }
        OutputFormat::Json => println!("{}", render_json(&outcome)?),
        OutputFormat::Csv => {
            warn!("CSV output for check not implemented, using JSON");
            println!("{}", render_json(&outcome)?);
        }
    }
    Ok(())
}

fn print_entities(config: &Config, stale_only: bool, format: OutputFormat) -> Result<()> {
    let store = EntityStore::open(&config.resolved_db_path())?;
    let policy = RefreshPolicy::from_config(&config.tracking);
    let mut rows: Vec<EntityRow> = entity_rows(&store.list_all()?, &policy, Utc::now());
    if stale_only {
        rows.retain(|row| row.stale.is_some());
    }
    match format {
        OutputFormat::Table => println!("{}", render_entities_table(&rows)),
        OutputFormat::Json => println!("{}", render_json(&rows)?),
        OutputFormat::Csv => print!("{}", entities_to_csv(&rows)?),
    }
    store.close()
}

fn print_mentions(file: &Path, format: OutputFormat) -> Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed reading document: {}", file.display()))?;
    let mut mentions = extract_mentions(&text);
    mentions.sort();
    let outcome = ExtractOutcome {
        unique: unique_mentions(&mentions).len(),
        mentions,
    };
    match format {
        OutputFormat::Table => {
            for name in &outcome.mentions {
                println!("/r/{name}");
            }
            println!(
                "{} mentions, {} unique",
                outcome.mentions.len(),
                outcome.unique
            );
        }
        OutputFormat::Json => println!("{}", render_json(&outcome)?),
        OutputFormat::Csv => {
            warn!("CSV output for extract not implemented, using JSON");
            println!("{}", render_json(&outcome)?);
        }
    }
    Ok(())
}
