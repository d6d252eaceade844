mod render;

use analytics::{run_all, run_report, ReportContext, ReportKind, ReportOutput};
use clap::{Parser, Subcommand};
use database::Database;
use redditstats_core::{
    load_snapshot, AppConfig, CoreError, ErrorExt, ErrorReporter, OutputFormat, Snapshot,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "redditstats")]
#[command(about = "Read-only reports over the Reddit ETL database")]
#[command(version)]
struct Cli {
    /// TOML config file (defaults to ./redditstats.toml when present)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Database URL, e.g. sqlite://reddit_data.db
    #[arg(long, short = 'd', global = true)]
    database: Option<String>,

    /// Output format: table or json
    #[arg(long, short = 'f', global = true)]
    format: Option<OutputFormat>,

    /// Only report on posts from this subreddit
    #[arg(long, short = 's', global = true)]
    subreddit: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available reports
    List,
    /// Run a single report by name
    Run {
        /// Report name, e.g. subreddit_overview
        report: String,
    },
    /// Run every report
    All,
}

impl Cli {
    fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(database) = &self.database {
            config.database_url = database.clone();
        }
        if let Some(format) = self.format {
            config.output = format;
        }
        if let Some(subreddit) = &self.subreddit {
            config.subreddit = Some(subreddit.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let (log_filter, loaded) = load_config(&cli);
    init_logging(&log_filter);
    let config = loaded.map_err(|e| report_failure(&e))?;

    let failed = execute(&cli.command, &config)
        .await
        .map_err(|e| report_failure(&e))?;
    if !failed.is_empty() {
        anyhow::bail!(
            "{} of {} reports failed: {}",
            failed.len(),
            ReportKind::ALL.len(),
            failed.join(", ")
        );
    }
    Ok(())
}

/// Resolves the configuration and the log filter to start with. The filter
/// falls back to the default when the configuration cannot be loaded, so the
/// failure itself still gets logged.
fn load_config(cli: &Cli) -> (String, Result<AppConfig, CoreError>) {
    match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => {
            let config = cli.apply(config);
            (config.log_filter.clone(), Ok(config))
        }
        Err(e) => (AppConfig::default().log_filter, Err(e)),
    }
}

fn init_logging(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn report_failure(error: &CoreError) -> anyhow::Error {
    ErrorReporter::new().report_error(error);
    anyhow::anyhow!("{}", error.user_friendly_message())
}

/// Runs the command and returns the names of reports that failed.
async fn execute(
    command: &Commands,
    config: &AppConfig,
) -> Result<Vec<&'static str>, CoreError> {
    match command {
        Commands::List => {
            print!("{}", render::catalogue());
            Ok(Vec::new())
        }
        Commands::Run { report } => {
            // Parse before connecting so a typo fails fast.
            let kind: ReportKind = report.parse()?;
            let (snapshot, ctx) = prepare(config).await?;
            let output = run_report(kind, &snapshot, &ctx)?;
            println!("{}", render::render(&output, config.output)?);
            Ok(Vec::new())
        }
        Commands::All => {
            let (snapshot, ctx) = prepare(config).await?;
            let reporter = ErrorReporter::new();
            let mut outputs: Vec<ReportOutput> = Vec::new();
            let mut failed = Vec::new();

            for (kind, result) in run_all(&snapshot, &ctx) {
                match result {
                    Ok(output) => outputs.push(output),
                    Err(e) => {
                        reporter.report_warning(&e);
                        eprintln!("{}: {}", kind, e.user_friendly_message());
                        failed.push(kind.name());
                    }
                }
            }
            println!("{}", render::render_many(&outputs, config.output)?);
            Ok(failed)
        }
    }
}

/// Loads the snapshot once and builds the evaluation context.
async fn prepare(config: &AppConfig) -> Result<(Snapshot, ReportContext), CoreError> {
    info!("Opening {}", config.database_url);
    let mut db = Database::new(config.database_url.clone());
    db.connect().await?;
    let snapshot = load_snapshot(&db).await;
    db.close().await;
    let snapshot = snapshot?;

    if snapshot.posts.is_empty() {
        warn!("The posts table is empty; every report will be empty");
    }

    let mut ctx = ReportContext::current();
    if let Some(subreddit) = &config.subreddit {
        ctx = ctx.restrict_to(subreddit.as_str());
    }
    Ok((snapshot, ctx))
}
