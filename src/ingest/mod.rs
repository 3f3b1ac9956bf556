//! Ingestion adapters for utility and installer exports
//!
//! Adapters turn vendor CSV layouts into core types. Rows that cannot be
//! parsed are skipped and counted, or rejected outright in strict mode; they
//! never reach the core with an undefined sign convention.

pub mod activity;
pub mod green_button;
pub mod production;

pub use activity::{activity_totals, load_activities, parse_activities};
pub use green_button::{find_usage_export, load_green_button, parse_green_button};
pub use production::{load_production, parse_production, production_totals};

use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Row counts from one ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub rows: usize,
    pub accepted: usize,
    pub skipped: usize,
}

impl IngestStats {
    /// Record a malformed row: an error in strict mode, a logged skip otherwise
    fn reject(&mut self, source: &str, line: u64, reason: String, strict: bool) -> Result<()> {
        if strict {
            return Err(Error::MalformedReading { line, reason });
        }
        log::warn!("Skipping {} row at line {}: {}", source, line, reason);
        self.skipped += 1;
        Ok(())
    }
}

/// Strip surrounding quotes and whitespace left by spreadsheet exports
fn clean(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}

fn parse_optional_f64(field: Option<&str>) -> std::result::Result<Option<f64>, String> {
    match field.map(clean) {
        None | Some("") => Ok(None),
        Some(s) => s
            .replace(',', "")
            .parse::<f64>()
            .map(Some)
            .map_err(|e| format!("invalid number '{}': {}", s, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean() {
        assert_eq!(clean(" \"1.25\" "), "1.25");
        assert_eq!(clean("plain"), "plain");
    }

    #[test]
    fn test_parse_optional_f64() {
        assert_eq!(parse_optional_f64(Some("\"1,024.5\"")), Ok(Some(1024.5)));
        assert_eq!(parse_optional_f64(Some("  ")), Ok(None));
        assert_eq!(parse_optional_f64(None), Ok(None));
        assert!(parse_optional_f64(Some("n/a")).is_err());
    }

    #[test]
    fn test_reject_strict_and_lenient() {
        let mut stats = IngestStats::default();
        assert!(stats.reject("test", 3, "bad".to_string(), false).is_ok());
        assert_eq!(stats.skipped, 1);

        let err = stats.reject("test", 4, "bad".to_string(), true).unwrap_err();
        assert!(matches!(err, Error::MalformedReading { line: 4, .. }));
    }
}
