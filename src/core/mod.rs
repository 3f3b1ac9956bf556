//! Core module - configuration, errors, and common types

mod config;
mod error;
mod types;

pub use config::{Config, GeneralConfig, SiteConfig, RatesConfig, CalendarConfig, RecommendationConfig, IngestConfig};
pub use error::{Error, Result};
pub use types::{IntervalReading, TouPeriod, PeriodMap, ClassifiedInterval, DateRange, UsageSummary, DailyUsage, Priority, Recommendation, SolarProduction, Activity};
