//! Time-of-use period classification
//!
//! Super off-peak:
//! - midnight to 6am, every day
//! - 10am to 2pm on weekdays in the spring months
//! - midnight to 2pm on weekends and holidays
//!
//! On-peak: 4pm to 9pm, every day. Everything else is off-peak.

use crate::core::{CalendarConfig, TouPeriod};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};

/// Classifier bound to a calendar configuration
#[derive(Debug, Clone, Default)]
pub struct TouClassifier {
    calendar: CalendarConfig,
}

impl TouClassifier {
    pub fn new(calendar: &CalendarConfig) -> Self {
        Self {
            calendar: calendar.clone(),
        }
    }

    /// Saturday, Sunday, or a configured holiday
    pub fn is_weekend_or_holiday(&self, date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun) || self.calendar.holidays.contains(&date)
    }

    /// Classify with the weekend/holiday flag derived from the timestamp
    pub fn classify_timestamp(&self, timestamp: NaiveDateTime) -> TouPeriod {
        self.classify(timestamp, self.is_weekend_or_holiday(timestamp.date()))
    }

    /// Map a timestamp to its billing period. Rule order matters: first match wins.
    pub fn classify(&self, timestamp: NaiveDateTime, is_weekend_or_holiday: bool) -> TouPeriod {
        let hour = timestamp.hour();
        let is_spring = self.calendar.spring_months.contains(&timestamp.month());

        if hour < 6 {
            return TouPeriod::SuperOffPeak;
        }

        if is_spring
            && !is_weekend_or_holiday
            && hour >= self.calendar.spring_start_hour
            && hour < self.calendar.spring_end_hour
        {
            return TouPeriod::SuperOffPeak;
        }

        if is_weekend_or_holiday && hour < 14 {
            return TouPeriod::SuperOffPeak;
        }

        if (16..21).contains(&hour) {
            return TouPeriod::OnPeak;
        }

        TouPeriod::OffPeak
    }
}

/// Classify against the default calendar (March/April spring window, no holidays)
pub fn classify(timestamp: NaiveDateTime, is_weekend_or_holiday: bool) -> TouPeriod {
    TouClassifier::default().classify(timestamp, is_weekend_or_holiday)
}
