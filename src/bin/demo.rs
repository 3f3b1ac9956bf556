//! SolarCost Analyzer - Demo CLI
//!
//! Walks a synthetic two-week dataset through every stage: ingestion,
//! classification, aggregation, recommendations, reporting, and storage.
//! No input files are needed.

use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use std::fmt::Write as _;

use solarcost_analyzer_lib::analysis::AnalysisSession;
use solarcost_analyzer_lib::core::{Config, DateRange, TouPeriod};
use solarcost_analyzer_lib::db::Database;
use solarcost_analyzer_lib::ingest::{parse_activities, parse_green_button, parse_production};
use solarcost_analyzer_lib::report::{render_text, Report};

const DAYS: i64 = 14;
const INTERVAL_MINUTES: i64 = 15;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("==============================================");
    println!("   SolarCost Analyzer - Demo CLI");
    println!("==============================================\n");

    let start = NaiveDate::from_ymd_opt(2026, 3, 2)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| anyhow::anyhow!("invalid demo start date"))?;
    let config = Config::default();

    // 1. Ingest synthetic exports
    println!("[1/5] Parsing synthetic exports...");
    let (readings, stats) = parse_green_button(&green_button_csv(start), false)?;
    println!("      Usage intervals: {} ({} skipped)", stats.accepted, stats.skipped);
    let (production, _) = parse_production(&production_csv(start), &config.ingest)?;
    println!("      Production days: {}", production.len());
    let (activities, _) = parse_activities(&activity_csv(start), &config.ingest)?;
    println!("      Activities:      {}\n", activities.len());

    // 2. Classify and price
    println!("[2/5] Classifying intervals ({})...", config.site.rate_plan);
    let session = AnalysisSession::new(&config, &readings)?;
    for period in TouPeriod::ALL {
        let count = session.intervals().iter().filter(|i| i.period == period).count();
        println!(
            "      {:15} {:4} intervals @ ${:.3}/kWh",
            period.label(),
            count,
            session.schedule().total_rate(period)
        );
    }
    println!();

    // 3. Summarize
    println!("[3/5] Aggregating...");
    let range = DateRange::default();
    let summary = session.summary(range)?;
    let daily = session.daily(range);
    println!("      Days: {}  Net cost: ${:.2}\n", summary.day_count, summary.net_cost);

    // 4. Report
    println!("[4/5] Building report...\n");
    let report = Report::new(&session, summary)
        .with_daily(daily.clone())
        .with_production(&production)
        .with_activities(&activities);
    println!("{}", render_text(&report));

    // 5. Persist
    println!("[5/5] Storing daily totals (in-memory SQLite)...");
    let mut db = Database::open_in_memory()?;
    db.replace_daily_usage(&daily)?;
    for day in &production {
        db.upsert_production(day)?;
    }
    for activity in &activities {
        db.add_activity(activity)?;
    }
    let stored = db.get_daily_usage(range)?;
    println!(
        "      Stored {} days ({} to {}), {} activities",
        stored.len(),
        stored.first().map(|d| d.date.to_string()).unwrap_or_default(),
        stored.last().map(|d| d.date.to_string()).unwrap_or_default(),
        db.get_activities(range)?.len()
    );

    println!("\n==============================================");
    println!("   Demo complete");
    println!("==============================================");

    Ok(())
}

/// Household load in kWh for a 15-minute interval
fn consumption_at(ts: NaiveDateTime, day: i64) -> f64 {
    let hour = ts.hour();
    let base = 0.12;
    match hour {
        // EV charging on alternate nights
        1..=3 if day % 2 == 0 => base + 1.75,
        6..=8 => base + 0.25,
        16..=20 => base + 0.45,
        _ => base,
    }
}

/// Solar output in kWh for a 15-minute interval, a half sine between 7am and 5pm
fn generation_at(ts: NaiveDateTime, day: i64) -> f64 {
    let hours = ts.hour() as f64 + ts.minute() as f64 / 60.0;
    if !(7.0..17.0).contains(&hours) {
        return 0.0;
    }
    let cloud = if day % 5 == 3 { 0.4 } else { 1.0 };
    let peak_kw = 4.6 * cloud;
    peak_kw * ((hours - 7.0) / 10.0 * std::f64::consts::PI).sin() * 0.25
}

fn green_button_csv(start: NaiveDateTime) -> String {
    let mut csv = String::from(
        "Name,DEMO HOUSEHOLD\n\
         Account Number,0000000000\n\
         \n\
         Meter Number,Date,Start Time,Duration,Consumption,Generation,Net\n",
    );

    let per_day = 24 * 60 / INTERVAL_MINUTES;
    for i in 0..DAYS * per_day {
        let ts = start + Duration::minutes(i * INTERVAL_MINUTES);
        let day = i / per_day;
        let consumption = consumption_at(ts, day);
        let generation = generation_at(ts, day);
        let _ = writeln!(
            csv,
            "\"0001\",\"{}\",\"{}\",\"15\",\"{:.3}\",\"{:.3}\",\"{:.3}\"",
            ts.format("%m/%d/%Y"),
            ts.format("%I:%M %p"),
            consumption,
            generation,
            consumption - generation
        );
    }
    csv
}

fn production_csv(start: NaiveDateTime) -> String {
    let mut csv = String::from("Date,Production (kWh),Notes\n");
    for day in 0..DAYS {
        let date = start.date() + Duration::days(day);
        let kwh = if day % 5 == 3 { 9.8 } else { 24.4 };
        let notes = if day % 5 == 3 { "overcast" } else { "" };
        let _ = writeln!(csv, "{},{:.1},{}", date, kwh, notes);
    }
    csv
}

fn activity_csv(start: NaiveDateTime) -> String {
    let mut csv = String::from("Date,Start,End,Activity,Location,Notes,Est kW\n");
    for day in 0..DAYS {
        let date = start.date() + Duration::days(day);
        if day % 2 == 0 {
            let _ = writeln!(csv, "{},01:00,04:00,EV Charging,Garage,,", date);
        }
        let _ = writeln!(csv, "{},17:30,18:30,Oven/Stove,Kitchen,dinner,", date);
        if day % 3 == 0 {
            let _ = writeln!(csv, "{},19:00,20:30,Dishwasher,Kitchen,,", date);
        }
    }
    csv
}
