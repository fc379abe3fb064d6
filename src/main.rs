use anyhow::Context;
use chrono::{Duration, Utc};
use clap::Parser;
use commit_hours::config::parse_date;
use commit_hours::estimator::discover_repositories;
use commit_hours::report::render;
use commit_hours::{
    CollectOptions, DisplaySettings, FileConfig, GitRepository, ReportFormat, Settings,
    StrategyKind, TimeEstimator, TimeWindow,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    version,
    about = "Estimates time spent per day and per commit from Git history",
    long_about = None
)]
struct Cli {
    /// Repositories, or directories to scan for repositories (default: current directory)
    #[arg(short, long = "repo")]
    repos: Vec<PathBuf>,

    /// How deep to look for repositories below a directory that is not one itself
    #[arg(long, default_value_t = 2)]
    scan_depth: usize,

    /// Start of the window, exclusive (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    since: Option<String>,

    /// End of the window, exclusive (YYYY-MM-DD or RFC 3339, default: now)
    #[arg(long)]
    until: Option<String>,

    /// Window length in days when --since is not given
    #[arg(short, long, default_value_t = 7)]
    days: i64,

    /// Only count commits whose author name or email contains this text
    #[arg(short, long)]
    author: Option<String>,

    /// How the daily budget is split between commits
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyKind>,

    /// Hours of work assumed per day
    #[arg(long = "max-hours")]
    max_hours_per_day: Option<f64>,

    /// Minimum hours credited to a single commit
    #[arg(long)]
    min_commit_time: Option<f64>,

    /// Rounding step in hours for the standard strategy
    #[arg(long)]
    graduation: Option<f64>,

    /// Decimal digits kept by the equal strategy
    #[arg(long = "precision")]
    equal_round_precision: Option<u32>,

    /// Locale for dates in text output (e.g. en_US, de_DE)
    #[arg(long)]
    locale: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Print per-day totals after the commit list (text format)
    #[arg(long)]
    summary: bool,

    /// Include merge commits in the estimate
    #[arg(long, default_value_t = false)]
    include_merges: bool,

    /// Config file (default: ./commit-hours.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn settings(&self, file: &FileConfig) -> Settings {
        let base = file.settings();
        Settings {
            max_hours_per_day: self.max_hours_per_day.unwrap_or(base.max_hours_per_day),
            min_commit_time: self.min_commit_time.unwrap_or(base.min_commit_time),
            graduation: self.graduation.unwrap_or(base.graduation),
            equal_round_precision: self
                .equal_round_precision
                .unwrap_or(base.equal_round_precision),
            locale: self.locale.clone().unwrap_or(base.locale),
        }
    }

    fn window(&self) -> anyhow::Result<TimeWindow> {
        let until = match self.until.as_deref() {
            Some(until) => parse_date(until)?,
            None => Utc::now(),
        };
        let since = match self.since.as_deref() {
            Some(since) => parse_date(since)?,
            None => Duration::try_days(self.days)
                .and_then(|days| until.checked_sub_signed(days))
                .with_context(|| format!("--days {} is out of range", self.days))?,
        };
        Ok(TimeWindow::new(since, until)?)
    }

    fn roots(&self, file: &FileConfig) -> Vec<PathBuf> {
        if !self.repos.is_empty() {
            return self.repos.clone();
        }
        file.repositories
            .clone()
            .filter(|repos| !repos.is_empty())
            .unwrap_or_else(|| vec![PathBuf::from(".")])
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let file = FileConfig::load(cli.config.as_deref(), &cwd).context("Failed to load config")?;

    let settings = cli.settings(&file);
    let kind = cli.strategy.or(file.strategy).unwrap_or_default();
    let window = cli.window().context("Invalid time window")?;
    let display =
        DisplaySettings::new(&settings.locale, cli.summary).context("Invalid display settings")?;
    let estimator =
        TimeEstimator::new(settings, kind).context("Failed to initialize estimator")?;

    let options = CollectOptions {
        author: cli.author.clone().or_else(|| file.author.clone()),
        include_merges: cli.include_merges,
    };

    let repositories = discover_repositories(&cli.roots(&file), cli.scan_depth);
    info!(
        "Scanning {} repositories from {} to {}",
        repositories.len(),
        window.start(),
        window.end()
    );

    let mut logs = Vec::with_capacity(repositories.len());
    for path in &repositories {
        let repo = match GitRepository::open(path) {
            Ok(repo) => repo,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        logs.push(
            repo.collect(&window, &options)
                .with_context(|| format!("Failed to read history of {}", path.display()))?,
        );
    }

    let calculation = estimator.calculate(&logs, &window)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    render(&calculation, cli.format, &display, &mut out).context("Failed to write report")?;

    Ok(())
}
