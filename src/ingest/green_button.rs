//! Utility Green Button interval export
//!
//! The export starts with a free-form preamble (account, meter, address)
//! followed by a header row containing `Date` and `Start Time`. Interval rows
//! carry `Consumption`, `Generation`, and `Net` in kWh.

use super::{clean, parse_optional_f64, IngestStats};
use crate::core::{Error, IntervalReading, Result};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M %p";

struct Columns {
    date: usize,
    start_time: usize,
    consumption: Option<usize>,
    generation: Option<usize>,
    net: Option<usize>,
}

/// Load a Green Button CSV file
pub fn load_green_button(path: &Path, strict: bool) -> Result<(Vec<IntervalReading>, IngestStats)> {
    let text = fs::read_to_string(path)?;
    let (readings, stats) = parse_green_button(&text, strict)?;

    if let (Some(first), Some(last)) = (readings.first(), readings.last()) {
        log::info!(
            "Loaded {} usage records from {} ({} to {})",
            readings.len(),
            path.display(),
            first.timestamp,
            last.timestamp
        );
    }
    if stats.skipped > 0 {
        log::warn!("{} malformed usage rows skipped", stats.skipped);
    }

    Ok((readings, stats))
}

/// First `*sdge*.csv` export in `dir` (case-insensitive, sorted by name)
pub fn find_usage_export(dir: &Path) -> Result<Option<PathBuf>> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.to_lowercase())
                .map_or(false, |n| n.contains("sdge") && n.ends_with(".csv"))
        })
        .collect();
    candidates.sort();

    Ok(candidates.into_iter().next())
}

/// Parse Green Button CSV text
pub fn parse_green_button(text: &str, strict: bool) -> Result<(Vec<IntervalReading>, IngestStats)> {
    let (preamble_lines, offset) = find_header(text).ok_or_else(|| Error::MalformedReading {
        line: 1,
        reason: "no header row with 'Date' and 'Start Time'".to_string(),
    })?;

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text[offset..].as_bytes());

    let headers = rdr.headers()?.clone();
    let columns = resolve_columns(&headers).ok_or_else(|| Error::MalformedReading {
        line: preamble_lines + 1,
        reason: "header needs 'Date', 'Start Time' and a 'Net' or 'Consumption' column".to_string(),
    })?;

    let mut readings = Vec::new();
    let mut stats = IngestStats::default();

    for result in rdr.records() {
        let record = result?;
        stats.rows += 1;
        let line = preamble_lines + record.position().map_or(0, |p| p.line());

        match parse_row(&record, &columns) {
            Ok(reading) => {
                readings.push(reading);
                stats.accepted += 1;
            }
            Err(reason) => stats.reject("usage", line, reason, strict)?,
        }
    }

    Ok((readings, stats))
}

/// Index and byte offset of the header row
fn find_header(text: &str) -> Option<(u64, usize)> {
    let mut offset = 0;
    for (index, line) in text.split_inclusive('\n').enumerate() {
        if line.contains("Date") && line.contains("Start Time") {
            return Some((index as u64, offset));
        }
        offset += line.len();
    }
    None
}

fn resolve_columns(headers: &StringRecord) -> Option<Columns> {
    let names: Vec<&str> = headers.iter().map(clean).collect();
    let find = |name: &str| names.iter().position(|h| h.eq_ignore_ascii_case(name));

    let columns = Columns {
        date: find("Date")?,
        start_time: find("Start Time")?,
        consumption: find("Consumption"),
        generation: find("Generation"),
        net: find("Net"),
    };

    if columns.net.is_none() && columns.consumption.is_none() {
        return None;
    }
    Some(columns)
}

fn parse_row(record: &StringRecord, columns: &Columns) -> std::result::Result<IntervalReading, String> {
    let date = record.get(columns.date).map(clean).unwrap_or("");
    let time = record.get(columns.start_time).map(clean).unwrap_or("");
    let raw = format!("{} {}", date, time);
    let timestamp = NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))?;

    let field = |idx: Option<usize>| idx.and_then(|i| record.get(i));
    let consumption = parse_optional_f64(field(columns.consumption))?;
    let generation = parse_optional_f64(field(columns.generation))?;
    let net = parse_optional_f64(field(columns.net))?;

    let net = match (net, consumption) {
        (Some(n), _) => n,
        (None, Some(c)) => c - generation.unwrap_or(0.0),
        (None, None) => return Err("no net or consumption value".to_string()),
    };

    if !net.is_finite() {
        return Err(format!("net energy is not finite ({})", net));
    }

    Ok(IntervalReading::new(timestamp, net).with_flows(consumption, generation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    const SAMPLE: &str = "\
Name,JANE DOE
Address,\"123 EXAMPLE ST, ENCINITAS CA\"
Account Number,0000000000

Meter Number,Date,Start Time,Duration,Consumption,Generation,Net
\"0001\",\"1/13/2026\",\"12:00 AM\",\"15\",\"0.512\",\"0\",\"0.512\"
\"0001\",\"1/13/2026\",\"12:15 PM\",\"15\",\"0.100\",\"0.900\",\"-0.800\"
\"0001\",\"1/13/2026\",\"not a time\",\"15\",\"0.1\",\"0\",\"0.1\"
\"0001\",\"1/13/2026\",\"6:45 PM\",\"15\",\"1.250\",\"0\",\"1.250\"
";

    #[test]
    fn test_parse_skips_preamble_and_bad_rows() {
        let (readings, stats) = parse_green_button(SAMPLE, false).unwrap();

        assert_eq!(stats, IngestStats { rows: 4, accepted: 3, skipped: 1 });
        assert_eq!(readings.len(), 3);

        let first = &readings[0];
        assert_eq!(first.date(), NaiveDate::from_ymd_opt(2026, 1, 13).unwrap());
        assert_eq!(first.timestamp.hour(), 0);
        assert_eq!(first.consumption_kwh, Some(0.512));

        assert_eq!(readings[1].timestamp.hour(), 12);
        assert!((readings[1].net_energy_kwh + 0.8).abs() < 1e-9);
        assert_eq!(readings[2].timestamp.hour(), 18);
        assert_eq!(readings[2].timestamp.minute(), 45);
    }

    #[test]
    fn test_strict_mode_reports_line() {
        let err = parse_green_button(SAMPLE, true).unwrap_err();
        match err {
            Error::MalformedReading { line, .. } => assert_eq!(line, 8),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_header() {
        let err = parse_green_button("a,b,c\n1,2,3\n", false).unwrap_err();
        assert!(matches!(err, Error::MalformedReading { line: 1, .. }));
    }

    #[test]
    fn test_net_derived_from_consumption_and_generation() {
        let text = "Date,Start Time,Consumption,Generation\n1/14/2026,3:00 PM,0.4,1.0\n";
        let (readings, _) = parse_green_button(text, true).unwrap();
        assert!((readings[0].net_energy_kwh + 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_find_usage_export() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_usage_export(dir.path()).unwrap(), None);

        std::fs::write(dir.path().join("notes.csv"), "").unwrap();
        std::fs::write(dir.path().join("sdge_usage.txt"), "").unwrap();
        std::fs::write(dir.path().join("SDGE_2026_02.csv"), "").unwrap();
        std::fs::write(dir.path().join("my_sdge_2026_01.CSV"), "").unwrap();

        let found = find_usage_export(dir.path()).unwrap().unwrap();
        assert_eq!(found.file_name().unwrap(), "SDGE_2026_02.csv");
        assert!(find_usage_export(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let (readings, stats) = load_green_button(&path, false).unwrap();
        assert_eq!(readings.len(), 3);
        assert_eq!(stats.skipped, 1);
    }
}
