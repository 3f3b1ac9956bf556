//! Pricing engine for time-of-use interval costs
//!
//! - Rate schedule: per-period delivery rate plus a flat generation rate
//! - Export credit: flat per-kWh credit for energy sent to the grid
//! - TOU classification lives in [`tou`]

pub mod tou;

pub use tou::{classify, TouClassifier};

use crate::core::{Error, PeriodMap, Result, TouPeriod};
use serde::{Deserialize, Serialize};

/// Validated rate schedule, all values in $/kWh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSchedule {
    delivery: PeriodMap<f64>,
    generation_rate: f64,
    export_credit_rate: f64,
}

impl RateSchedule {
    /// Create a schedule, rejecting negative or non-finite rates
    pub fn new(delivery: PeriodMap<f64>, generation_rate: f64, export_credit_rate: f64) -> Result<Self> {
        for (period, rate) in delivery.iter() {
            check_rate(&format!("{} delivery rate", period), *rate)?;
        }
        check_rate("generation rate", generation_rate)?;
        check_rate("export credit rate", export_credit_rate)?;

        Ok(Self {
            delivery,
            generation_rate,
            export_credit_rate,
        })
    }

    pub fn delivery_rate(&self, period: TouPeriod) -> f64 {
        self.delivery[period]
    }

    pub fn generation_rate(&self) -> f64 {
        self.generation_rate
    }

    pub fn export_credit_rate(&self) -> f64 {
        self.export_credit_rate
    }

    /// Import price for a period: delivery plus generation
    pub fn total_rate(&self, period: TouPeriod) -> f64 {
        self.delivery[period] + self.generation_rate
    }

    /// Import prices for every period
    pub fn total_rates(&self) -> PeriodMap<f64> {
        PeriodMap::from_fn(|p| self.total_rate(p))
    }

    /// Cost of one interval; negative for exports
    pub fn price(&self, net_energy_kwh: f64, period: TouPeriod) -> f64 {
        if net_energy_kwh > 0.0 {
            net_energy_kwh * self.total_rate(period)
        } else {
            net_energy_kwh * self.export_credit_rate
        }
    }
}

/// Cost of one interval under `schedule`, see [`RateSchedule::price`]
pub fn price(net_energy_kwh: f64, period: TouPeriod, schedule: &RateSchedule) -> f64 {
    schedule.price(net_energy_kwh, period)
}

fn check_rate(name: &str, rate: f64) -> Result<()> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(Error::InvalidConfiguration(format!(
            "{} must be a non-negative number, got {}",
            name, rate
        )));
    }
    Ok(())
}
