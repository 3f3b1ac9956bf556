//! SolarCost Analyzer - Main entry point
//!
//! Command-line front end: loads a utility interval export, prints the
//! time-of-use cost summary, and writes the JSON report.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use solarcost_analyzer_lib::analysis::AnalysisSession;
use solarcost_analyzer_lib::core::{Config, DateRange};
use solarcost_analyzer_lib::db::Database;
use solarcost_analyzer_lib::ingest::{find_usage_export, load_activities, load_green_button, load_production};
use solarcost_analyzer_lib::report::{render_text, Report};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "solarcost-analyzer")]
#[command(author, version, about = "Time-of-use cost analysis for solar households")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a Green Button usage export
    #[command(
        long_about = "Classify every interval into its TOU period, price it, and summarize.\n\
        \nExamples:\n  \
        solarcost-analyzer analyze --usage sdge_usage.csv\n  \
        solarcost-analyzer analyze --usage sdge_usage.csv --production sunrun.csv --daily\n  \
        solarcost-analyzer analyze --usage sdge_usage.csv --from 2026-01-01 --to 2026-01-31 --save-db"
    )]
    Analyze(AnalyzeArgs),

    /// Show daily usage stored in the database
    History(RangeArgs),

    /// Write the default configuration file
    InitConfig,
}

#[derive(Parser)]
struct RangeArgs {
    /// First date to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last date to include (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl RangeArgs {
    fn range(&self) -> DateRange {
        DateRange::new(self.from, self.to)
    }
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// Green Button interval CSV from the utility (defaults to the first
    /// `*sdge*.csv` in general.data_dir)
    #[arg(long)]
    usage: Option<PathBuf>,

    /// Daily production CSV from the solar installer
    #[arg(long)]
    production: Option<PathBuf>,

    /// Household activity log CSV
    #[arg(long)]
    activities: Option<PathBuf>,

    #[command(flatten)]
    range: RangeArgs,

    /// Report path (defaults to general.report_path)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Replace the stored daily totals with this run's days, and store
    /// production and activities
    #[arg(long)]
    save_db: bool,

    /// Fail on the first malformed row
    #[arg(long)]
    strict: bool,

    /// Include the per-day breakdown in the report
    #[arg(long)]
    daily: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Analyze(args) => analyze(&load_config(cli.config.as_deref())?, args),
        Commands::History(args) => history(args),
        Commands::InitConfig => init_config(cli.config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path).with_context(|| format!("loading {}", path.display())),
        None => Config::load().context("loading default configuration"),
    }
}

fn analyze(config: &Config, args: &AnalyzeArgs) -> Result<()> {
    let mut ingest = config.ingest.clone();
    ingest.strict |= args.strict;
    let range = args.range.range();

    let usage = match &args.usage {
        Some(path) => path.clone(),
        None => {
            let dir = Path::new(&config.general.data_dir);
            find_usage_export(dir)
                .with_context(|| format!("searching {} for usage exports", dir.display()))?
                .with_context(|| {
                    format!(
                        "no SDGE usage export found in {}; export your usage from sdge.com or pass --usage",
                        dir.display()
                    )
                })?
        }
    };
    log::info!("Loading {}", usage.display());

    let (readings, stats) = load_green_button(&usage, ingest.strict)
        .with_context(|| format!("reading usage export {}", usage.display()))?;
    log::info!("Usage rows: {} accepted, {} skipped", stats.accepted, stats.skipped);

    let session = AnalysisSession::new(config, &readings)?;
    let summary = session
        .summary(range)
        .context("no usage data in the selected date range")?;
    let daily = session.daily(range);

    let mut report = Report::new(&session, summary);
    if args.daily {
        report = report.with_daily(daily.clone());
    }

    let mut production = Vec::new();
    if let Some(path) = &args.production {
        let (days, _) = load_production(path, &ingest)
            .with_context(|| format!("reading production export {}", path.display()))?;
        production = days.into_iter().filter(|d| range.contains(d.date)).collect();
        report = report.with_production(&production);
    }

    let mut activities = Vec::new();
    if let Some(path) = &args.activities {
        let (entries, _) = load_activities(path, &ingest)
            .with_context(|| format!("reading activity log {}", path.display()))?;
        activities = entries.into_iter().filter(|a| range.contains(a.date)).collect();
        report = report.with_activities(&activities);
    }

    println!("{}", render_text(&report));

    let report_path = args
        .report
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.general.report_path));
    report.write_json(&report_path)?;
    println!("Report saved to {}", report_path.display());

    if args.save_db {
        let mut db = Database::new()?;
        db.replace_daily_usage(&daily)?;
        for day in &production {
            db.upsert_production(day)?;
        }
        for activity in &activities {
            db.add_activity(activity)?;
        }
        println!(
            "Stored {} days, {} production days and {} activities in {}",
            daily.len(),
            production.len(),
            activities.len(),
            Database::db_path()?.display()
        );
    }

    Ok(())
}

fn history(args: &RangeArgs) -> Result<()> {
    let db = Database::new()?;
    let days = db.get_daily_usage(args.range())?;

    if days.is_empty() {
        println!("No stored usage. Run `analyze --save-db` first.");
        return Ok(());
    }

    println!("    Date    | Consumption | Net kWh | Super Off | Off Peak | On Peak |   Cost");
    println!("------------+-------------+---------+-----------+----------+---------+--------");
    for day in &days {
        println!(
            " {} | {:>11.1} | {:>7.1} | {:>9.1} | {:>8.1} | {:>7.1} | {:>6.2}",
            day.date,
            day.consumption_kwh,
            day.net_kwh,
            day.import_kwh.super_off_peak,
            day.import_kwh.off_peak,
            day.import_kwh.on_peak,
            day.cost
        );
    }

    let total: f64 = days.iter().map(|d| d.cost).sum();
    println!("\n{} days, total cost {:.2}", days.len(), total);

    let production = db.get_production(args.range())?;
    if !production.is_empty() {
        let kwh: f64 = production.iter().map(|p| p.production_kwh).sum();
        println!("Solar production: {:.1} kWh over {} days", kwh, production.len());
    }

    let activities = db.get_activities(args.range())?;
    if !activities.is_empty() {
        let kwh: f64 = activities.iter().map(|a| a.est_kwh).sum();
        println!("Activities: {} logged, ~{:.1} kWh estimated", activities.len(), kwh);
    }

    Ok(())
}

fn init_config(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::config_path()?,
    };
    Config::default().save_to(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
