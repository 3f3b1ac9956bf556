//! Daily solar production export from the installer portal
//!
//! Column names differ between portals, so the date and energy columns are
//! located through the configured synonym lists.

use super::{clean, parse_optional_f64, IngestStats};
use crate::core::{Error, IngestConfig, Result, SolarProduction};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
];

/// Load a production CSV file
pub fn load_production(path: &Path, settings: &IngestConfig) -> Result<(Vec<SolarProduction>, IngestStats)> {
    let text = fs::read_to_string(path)?;
    let (days, stats) = parse_production(&text, settings)?;
    log::info!("Loaded {} days of solar production from {}", days.len(), path.display());
    Ok((days, stats))
}

/// Parse production CSV text into one entry per date, sorted by date
///
/// Several rows for the same date (hourly exports) are summed.
pub fn parse_production(text: &str, settings: &IngestConfig) -> Result<(Vec<SolarProduction>, IngestStats)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| clean(h).to_lowercase()).collect();
    let find = |names: &[String]| headers.iter().position(|h| names.iter().any(|n| n == h));

    let date_idx = find(&settings.date_columns).ok_or_else(|| Error::MalformedReading {
        line: 1,
        reason: format!("no date column (tried {})", settings.date_columns.join(", ")),
    })?;
    let production_idx = find(&settings.production_columns).ok_or_else(|| Error::MalformedReading {
        line: 1,
        reason: format!("no production column (tried {})", settings.production_columns.join(", ")),
    })?;
    let notes_idx = headers.iter().position(|h| h == "notes");

    let mut by_date: BTreeMap<NaiveDate, SolarProduction> = BTreeMap::new();
    let mut stats = IngestStats::default();

    for result in rdr.records() {
        let record = result?;
        stats.rows += 1;
        let line = record.position().map_or(0, |p| p.line());

        match parse_row(&record, date_idx, production_idx, notes_idx) {
            Ok(row) => {
                stats.accepted += 1;
                let entry = by_date.entry(row.date).or_insert_with(|| SolarProduction {
                    date: row.date,
                    production_kwh: 0.0,
                    notes: None,
                });
                entry.production_kwh += row.production_kwh;
                if row.notes.is_some() && entry.notes.is_none() {
                    entry.notes = row.notes;
                }
            }
            Err(reason) => stats.reject("production", line, reason, settings.strict)?,
        }
    }

    Ok((by_date.into_values().collect(), stats))
}

/// Total, daily average, and day count of a production series
pub fn production_totals(days: &[SolarProduction]) -> (f64, f64, usize) {
    let total: f64 = days.iter().map(|d| d.production_kwh).sum();
    let avg = if days.is_empty() { 0.0 } else { total / days.len() as f64 };
    (total, avg, days.len())
}

fn parse_row(
    record: &StringRecord,
    date_idx: usize,
    production_idx: usize,
    notes_idx: Option<usize>,
) -> std::result::Result<SolarProduction, String> {
    let raw_date = record.get(date_idx).map(clean).unwrap_or("");
    let date = parse_date(raw_date).ok_or_else(|| format!("invalid date '{}'", raw_date))?;

    let production_kwh = parse_optional_f64(record.get(production_idx))?
        .ok_or_else(|| "missing production value".to_string())?;
    if !production_kwh.is_finite() || production_kwh < 0.0 {
        return Err(format!("production must be a non-negative number, got {}", production_kwh));
    }

    let notes = notes_idx
        .and_then(|i| record.get(i))
        .map(clean)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(SolarProduction { date, production_kwh, notes })
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    #[test]
    fn test_synonym_headers_and_formats() {
        let text = "Date,Production (kWh),Notes\n\
                    2026-01-13,18.4,cloudy\n\
                    01/14/2026,\"22.0\",\n\
                    2026-01-15 00:00:00,25.1,\n";
        let (days, stats) = parse_production(text, &IngestConfig::default()).unwrap();

        assert_eq!(stats.accepted, 3);
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].date, date(1, 13));
        assert_eq!(days[0].notes.as_deref(), Some("cloudy"));
        assert_eq!(days[1].production_kwh, 22.0);
        assert_eq!(days[1].notes, None);
        assert_eq!(days[2].date, date(1, 15));
    }

    #[test]
    fn test_rows_for_same_date_are_summed() {
        let text = "timestamp,energy\n\
                    2026-01-13 10:00:00,1.5\n\
                    2026-01-13 11:00:00,2.5\n\
                    2026-01-12 12:00:00,3.0\n";
        let (days, _) = parse_production(text, &IngestConfig::default()).unwrap();

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, date(1, 12));
        assert!((days[1].production_kwh - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_production_column() {
        let err = parse_production("date,weather\n2026-01-13,sunny\n", &IngestConfig::default()).unwrap_err();
        assert!(matches!(err, Error::MalformedReading { line: 1, .. }));
    }

    #[test]
    fn test_bad_rows_skipped_or_rejected() {
        let text = "date,kwh\n2026-01-13,12\nyesterday,5\n2026-01-14,-3\n";
        let (days, stats) = parse_production(text, &IngestConfig::default()).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(stats.skipped, 2);

        let strict = IngestConfig { strict: true, ..Default::default() };
        let err = parse_production(text, &strict).unwrap_err();
        assert!(matches!(err, Error::MalformedReading { line: 3, .. }));
    }

    #[test]
    fn test_production_totals() {
        let days = vec![
            SolarProduction { date: date(1, 1), production_kwh: 10.0, notes: None },
            SolarProduction { date: date(1, 2), production_kwh: 20.0, notes: None },
        ];
        assert_eq!(production_totals(&days), (30.0, 15.0, 2));
        assert_eq!(production_totals(&[]), (0.0, 0.0, 0));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("production.csv");
        std::fs::write(&path, "date,production\n2026-01-13,18.4\n").unwrap();

        let (days, _) = load_production(&path, &IngestConfig::default()).unwrap();
        assert_eq!(days.len(), 1);
    }
}
