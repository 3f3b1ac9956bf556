//! Usage aggregation over classified intervals
//!
//! Readings are classified and priced one by one, then folded into a
//! [`UsageSummary`]. Exports only count toward the export total and the flat
//! export credit; the per-period breakdown covers grid imports.

pub mod recommend;

pub use recommend::{recommend, RecommendationEngine};

use crate::core::{
    ClassifiedInterval, Config, DailyUsage, DateRange, Error, IntervalReading, PeriodMap, Recommendation,
    Result, TouPeriod, UsageSummary,
};
use crate::pricing::{RateSchedule, TouClassifier};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const DAYS_PER_MONTH: f64 = 30.0;
const DAYS_PER_YEAR: f64 = 365.0;

/// Classify and price every reading
///
/// Fails with [`Error::InvalidReading`] when a reading carries a non-finite value.
pub fn classify_readings(
    readings: &[IntervalReading],
    classifier: &TouClassifier,
    schedule: &RateSchedule,
) -> Result<Vec<ClassifiedInterval>> {
    readings
        .iter()
        .map(|reading| {
            check_reading(reading)?;
            let period = classifier.classify_timestamp(reading.timestamp);
            Ok(ClassifiedInterval {
                reading: reading.clone(),
                period,
                cost: schedule.price(reading.net_energy_kwh, period),
            })
        })
        .collect()
}

fn check_reading(reading: &IntervalReading) -> Result<()> {
    let values = [
        ("net energy", Some(reading.net_energy_kwh)),
        ("consumption", reading.consumption_kwh),
        ("generation", reading.generation_kwh),
    ];

    for (name, value) in values {
        if let Some(v) = value {
            if !v.is_finite() {
                return Err(Error::InvalidReading(format!(
                    "{} at {} is not a finite number ({})",
                    name, reading.timestamp, v
                )));
            }
        }
    }
    Ok(())
}

/// Keep the intervals whose date falls inside `range`
pub fn filter_range(intervals: &[ClassifiedInterval], range: DateRange) -> Vec<ClassifiedInterval> {
    intervals
        .iter()
        .filter(|iv| range.contains(iv.date()))
        .cloned()
        .collect()
}

/// Running totals folded over intervals
#[derive(Default)]
struct Totals {
    dates: BTreeSet<NaiveDate>,
    consumption: f64,
    has_consumption: bool,
    generation: f64,
    import_kwh: f64,
    export_kwh: f64,
    export_cost: f64,
    tou_import: PeriodMap<f64>,
    tou_cost: PeriodMap<f64>,
}

impl Totals {
    fn add(mut self, iv: &ClassifiedInterval) -> Self {
        let reading = &iv.reading;
        self.dates.insert(reading.date());

        if let Some(c) = reading.consumption_kwh {
            self.consumption += c;
            self.has_consumption = true;
        }
        self.generation += reading.generation_kwh.unwrap_or(0.0);

        if reading.is_import() {
            self.import_kwh += reading.net_energy_kwh;
            self.tou_import[iv.period] += reading.net_energy_kwh;
            self.tou_cost[iv.period] += iv.cost;
        } else if reading.is_export() {
            self.export_kwh += reading.net_energy_kwh;
            self.export_cost += iv.cost;
        }
        self
    }
}

/// Aggregate classified intervals into a usage summary
///
/// `day_count` is the number of distinct dates across imports and exports.
/// Monthly and annual figures scale `net_cost` linearly by day count; they
/// are approximations, not forecasts.
pub fn aggregate(intervals: &[ClassifiedInterval]) -> Result<UsageSummary> {
    for iv in intervals {
        check_reading(&iv.reading)?;
        if !iv.cost.is_finite() {
            return Err(Error::InvalidReading(format!("cost at {} is not finite", iv.reading.timestamp)));
        }
    }

    let totals = intervals.iter().fold(Totals::default(), Totals::add);

    let (first_date, last_date) = match (totals.dates.first(), totals.dates.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(Error::NoData),
    };
    let day_count = totals.dates.len();
    let days = day_count as f64;

    let total_consumption_kwh = if totals.has_consumption {
        totals.consumption
    } else {
        totals.import_kwh
    };
    let total_export_kwh = totals.export_kwh.abs();

    let import_cost = totals.tou_cost.total();
    let export_credit = -totals.export_cost;
    let net_cost = import_cost - export_credit;

    log::debug!(
        "Aggregated {} intervals over {} days ({} to {})",
        intervals.len(),
        day_count,
        first_date,
        last_date
    );

    Ok(UsageSummary {
        day_count,
        first_date,
        last_date,
        total_consumption_kwh,
        total_generation_kwh: totals.generation,
        total_import_kwh: totals.import_kwh,
        total_export_kwh,
        daily_avg_consumption: total_consumption_kwh / days,
        daily_avg_import: totals.import_kwh / days,
        daily_avg_export: total_export_kwh / days,
        tou_import_kwh: totals.tou_import,
        tou_cost: totals.tou_cost,
        import_cost,
        export_credit,
        net_cost,
        monthly_estimate: net_cost * DAYS_PER_MONTH / days,
        annual_estimate: net_cost * DAYS_PER_YEAR / days,
    })
}

/// Per-day totals, sorted by date
pub fn daily_breakdown(intervals: &[ClassifiedInterval]) -> Vec<DailyUsage> {
    let mut days: BTreeMap<NaiveDate, DailyUsage> = BTreeMap::new();

    for iv in intervals {
        let reading = &iv.reading;
        let day = days.entry(reading.date()).or_insert_with(|| DailyUsage::new(reading.date()));

        day.consumption_kwh += reading.consumption_kwh.unwrap_or(0.0);
        day.generation_kwh += reading.generation_kwh.unwrap_or(0.0);
        day.net_kwh += reading.net_energy_kwh;
        day.cost += iv.cost;
        if reading.is_import() {
            day.import_kwh[iv.period] += reading.net_energy_kwh;
        }
    }

    days.into_values().collect()
}

/// Value of moving on-peak imports into super off-peak, e.g. with a home battery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryEstimate {
    pub on_peak_import_kwh: f64,
    /// Rate difference between on-peak and super off-peak imports
    pub rate_spread: f64,
    pub period_savings: f64,
    pub monthly_savings: f64,
    pub annual_savings: f64,
}

/// Savings if every on-peak import were charged at the super off-peak rate
pub fn battery_estimate(summary: &UsageSummary, schedule: &RateSchedule) -> Option<BatteryEstimate> {
    if summary.day_count == 0 {
        return None;
    }

    let days = summary.day_count as f64;
    let on_peak_import_kwh = summary.tou_import_kwh[TouPeriod::OnPeak];
    let rate_spread = schedule.total_rate(TouPeriod::OnPeak) - schedule.total_rate(TouPeriod::SuperOffPeak);
    let period_savings = on_peak_import_kwh * rate_spread;

    Some(BatteryEstimate {
        on_peak_import_kwh,
        rate_spread,
        period_savings,
        monthly_savings: period_savings * DAYS_PER_MONTH / days,
        annual_savings: period_savings * DAYS_PER_YEAR / days,
    })
}

/// Analysis over one loaded dataset with an immutable configuration
pub struct AnalysisSession {
    config: Config,
    schedule: RateSchedule,
    intervals: Vec<ClassifiedInterval>,
}

impl AnalysisSession {
    /// Validate the configuration and classify the readings
    pub fn new(config: &Config, readings: &[IntervalReading]) -> Result<Self> {
        config.validate()?;
        let schedule = config.rates.schedule()?;
        let classifier = TouClassifier::new(&config.calendar);
        let intervals = classify_readings(readings, &classifier, &schedule)?;

        log::info!("Classified {} intervals for rate plan {}", intervals.len(), config.site.rate_plan);

        Ok(Self {
            config: config.clone(),
            schedule,
            intervals,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn schedule(&self) -> &RateSchedule {
        &self.schedule
    }

    pub fn intervals(&self) -> &[ClassifiedInterval] {
        &self.intervals
    }

    /// Usage summary over `range`
    pub fn summary(&self, range: DateRange) -> Result<UsageSummary> {
        aggregate(&filter_range(&self.intervals, range))
    }

    /// Per-day totals over `range`
    pub fn daily(&self, range: DateRange) -> Vec<DailyUsage> {
        daily_breakdown(&filter_range(&self.intervals, range))
    }

    pub fn recommendations(&self, summary: &UsageSummary) -> Vec<Recommendation> {
        RecommendationEngine::new(&self.config.recommendations, &self.config.site.rate_plan).recommend(
            summary,
            &self.schedule,
            self.config.site.solar_capacity_kw,
        )
    }

    pub fn battery(&self, summary: &UsageSummary) -> Option<BatteryEstimate> {
        battery_estimate(summary, &self.schedule)
    }
}
