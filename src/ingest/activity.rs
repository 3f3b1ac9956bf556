//! Household activity log
//!
//! Columns are positional: date, start time, end time, activity, location,
//! notes, estimated kW. The first row is a header.

use super::{clean, parse_optional_f64, IngestStats};
use crate::core::{Activity, IngestConfig, Result};
use chrono::{NaiveDate, NaiveTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
const TIME_FORMATS: [&str; 3] = ["%H:%M", "%H:%M:%S", "%I:%M %p"];

/// Duration assumed when start or end time is missing
const DEFAULT_DURATION_HOURS: f64 = 1.0;

/// Load an activity log CSV file
pub fn load_activities(path: &Path, settings: &IngestConfig) -> Result<(Vec<Activity>, IngestStats)> {
    let text = fs::read_to_string(path)?;
    let (activities, stats) = parse_activities(&text, settings)?;
    log::info!("Loaded {} activity records from {}", activities.len(), path.display());
    Ok((activities, stats))
}

/// Parse activity log CSV text
pub fn parse_activities(text: &str, settings: &IngestConfig) -> Result<(Vec<Activity>, IngestStats)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut activities = Vec::new();
    let mut stats = IngestStats::default();

    for result in rdr.records() {
        let record = result?;
        stats.rows += 1;
        let line = record.position().map_or(0, |p| p.line());

        let date = field(&record, 0);
        let name = field(&record, 3);
        if date.is_none() || name.is_none() {
            log::debug!("Ignoring activity row at line {} without date or activity", line);
            stats.skipped += 1;
            continue;
        }

        match parse_row(&record, settings) {
            Ok(activity) => {
                activities.push(activity);
                stats.accepted += 1;
            }
            Err(reason) => stats.reject("activity", line, reason, settings.strict)?,
        }
    }

    Ok((activities, stats))
}

/// Estimated kWh per activity name
pub fn activity_totals(activities: &[Activity]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for activity in activities {
        *totals.entry(activity.activity.clone()).or_insert(0.0) += activity.est_kwh;
    }
    totals
}

fn field(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(clean).filter(|s| !s.is_empty())
}

fn parse_row(record: &StringRecord, settings: &IngestConfig) -> std::result::Result<Activity, String> {
    let raw_date = field(record, 0).unwrap_or("");
    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw_date, fmt).ok())
        .ok_or_else(|| format!("invalid date '{}'", raw_date))?;

    let activity = field(record, 3).unwrap_or("").to_string();
    // Unreadable times count as missing
    let start_time = field(record, 1).and_then(parse_time);
    let end_time = field(record, 2).and_then(parse_time);
    let est_kw = parse_optional_f64(record.get(6))?;

    let duration_hours = duration_hours(start_time, end_time);
    let kw = match est_kw {
        Some(kw) if kw > 0.0 => kw,
        _ => settings
            .appliance_power
            .get(&activity)
            .copied()
            .unwrap_or(settings.default_appliance_kw),
    };

    Ok(Activity {
        date,
        start_time,
        end_time,
        location: field(record, 4).map(str::to_string),
        notes: field(record, 5).map(str::to_string),
        activity,
        est_kw,
        duration_hours,
        est_kwh: kw * duration_hours,
    })
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

/// Hours between start and end; an end before the start runs past midnight
fn duration_hours(start: Option<NaiveTime>, end: Option<NaiveTime>) -> f64 {
    match (start, end) {
        (Some(start), Some(end)) => {
            let mut seconds = (end - start).num_seconds();
            if seconds < 0 {
                seconds += 24 * 3600;
            }
            seconds as f64 / 3600.0
        }
        _ => DEFAULT_DURATION_HOURS,
    }
}
