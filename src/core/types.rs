//! Common types used across the analyzer

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Time-of-use billing period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouPeriod {
    SuperOffPeak,
    OffPeak,
    OnPeak,
}

impl TouPeriod {
    /// All periods, cheapest first
    pub const ALL: [TouPeriod; 3] = [TouPeriod::SuperOffPeak, TouPeriod::OffPeak, TouPeriod::OnPeak];

    /// Identifier used in reports and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TouPeriod::SuperOffPeak => "super_off_peak",
            TouPeriod::OffPeak => "off_peak",
            TouPeriod::OnPeak => "on_peak",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            TouPeriod::SuperOffPeak => "Super Off Peak",
            TouPeriod::OffPeak => "Off Peak",
            TouPeriod::OnPeak => "On Peak",
        }
    }
}

impl fmt::Display for TouPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per TOU period
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodMap<T> {
    pub super_off_peak: T,
    pub off_peak: T,
    pub on_peak: T,
}

impl<T> PeriodMap<T> {
    pub fn from_fn(mut f: impl FnMut(TouPeriod) -> T) -> Self {
        Self {
            super_off_peak: f(TouPeriod::SuperOffPeak),
            off_peak: f(TouPeriod::OffPeak),
            on_peak: f(TouPeriod::OnPeak),
        }
    }

    /// Iterate `(period, value)` pairs, cheapest period first
    pub fn iter(&self) -> impl Iterator<Item = (TouPeriod, &T)> {
        TouPeriod::ALL.into_iter().map(move |p| (p, &self[p]))
    }
}

impl PeriodMap<f64> {
    pub fn total(&self) -> f64 {
        self.super_off_peak + self.off_peak + self.on_peak
    }
}

impl<T> Index<TouPeriod> for PeriodMap<T> {
    type Output = T;

    fn index(&self, period: TouPeriod) -> &T {
        match period {
            TouPeriod::SuperOffPeak => &self.super_off_peak,
            TouPeriod::OffPeak => &self.off_peak,
            TouPeriod::OnPeak => &self.on_peak,
        }
    }
}

impl<T> IndexMut<TouPeriod> for PeriodMap<T> {
    fn index_mut(&mut self, period: TouPeriod) -> &mut T {
        match period {
            TouPeriod::SuperOffPeak => &mut self.super_off_peak,
            TouPeriod::OffPeak => &mut self.off_peak,
            TouPeriod::OnPeak => &mut self.on_peak,
        }
    }
}

/// A single metering interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalReading {
    /// Interval start, utility local time
    pub timestamp: NaiveDateTime,
    /// Positive = imported from the grid, negative = exported
    pub net_energy_kwh: f64,
    /// Household consumption, when the meter reports it
    pub consumption_kwh: Option<f64>,
    /// Solar generation seen by the meter, when reported
    pub generation_kwh: Option<f64>,
}

impl IntervalReading {
    pub fn new(timestamp: NaiveDateTime, net_energy_kwh: f64) -> Self {
        Self {
            timestamp,
            net_energy_kwh,
            consumption_kwh: None,
            generation_kwh: None,
        }
    }

    pub fn with_flows(mut self, consumption_kwh: Option<f64>, generation_kwh: Option<f64>) -> Self {
        self.consumption_kwh = consumption_kwh;
        self.generation_kwh = generation_kwh;
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn is_import(&self) -> bool {
        self.net_energy_kwh > 0.0
    }

    pub fn is_export(&self) -> bool {
        self.net_energy_kwh < 0.0
    }
}

/// A reading after TOU classification and pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedInterval {
    pub reading: IntervalReading,
    pub period: TouPeriod,
    /// Negative when the interval is a net export (credit)
    pub cost: f64,
}

impl ClassifiedInterval {
    pub fn date(&self) -> NaiveDate {
        self.reading.date()
    }
}

/// Inclusive date range; a missing bound is open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// Aggregate usage and cost over a set of intervals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Distinct calendar dates present in the data
    pub day_count: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub total_consumption_kwh: f64,
    pub total_generation_kwh: f64,
    pub total_import_kwh: f64,
    pub total_export_kwh: f64,
    pub daily_avg_consumption: f64,
    pub daily_avg_import: f64,
    pub daily_avg_export: f64,
    pub tou_import_kwh: PeriodMap<f64>,
    pub tou_cost: PeriodMap<f64>,
    pub import_cost: f64,
    pub export_credit: f64,
    pub net_cost: f64,
    /// Linear 30-day scaling of `net_cost`, not a forecast
    pub monthly_estimate: f64,
    /// Linear 365-day scaling of `net_cost`, not a forecast
    pub annual_estimate: f64,
}

impl UsageSummary {
    /// Share of grid imports that fell in `period`, in percent (0 without imports)
    pub fn import_share_pct(&self, period: TouPeriod) -> f64 {
        if self.total_import_kwh > 0.0 {
            self.tou_import_kwh[period] / self.total_import_kwh * 100.0
        } else {
            0.0
        }
    }
}

/// Per-day totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub consumption_kwh: f64,
    pub generation_kwh: f64,
    pub net_kwh: f64,
    /// Grid imports per period (exports excluded)
    pub import_kwh: PeriodMap<f64>,
    pub cost: f64,
}

impl DailyUsage {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            consumption_kwh: 0.0,
            generation_kwh: 0.0,
            net_kwh: 0.0,
            import_kwh: PeriodMap::default(),
            cost: 0.0,
        }
    }
}

/// Recommendation priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Info,
    Tip,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Info => "INFO",
            Priority::Tip => "TIP",
        };
        f.write_str(s)
    }
}

/// Advisory finding derived from a usage summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub category: String,
    pub issue: String,
    pub recommendation: String,
    pub potential_savings: String,
}

/// Daily production reported by the solar installer portal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarProduction {
    pub date: NaiveDate,
    pub production_kwh: f64,
    pub notes: Option<String>,
}

/// Household activity log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub activity: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    /// Power draw entered by the user, if any
    pub est_kw: Option<f64>,
    pub duration_hours: f64,
    pub est_kwh: f64,
}
