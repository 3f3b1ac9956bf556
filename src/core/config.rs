//! Configuration management

use crate::core::{Error, PeriodMap, Result};
use crate::pricing::RateSchedule;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub recommendations: RecommendationConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

        let app_config_dir = config_dir.join("solarcost-analyzer");

        if !app_config_dir.exists() {
            fs::create_dir_all(&app_config_dir)?;
        }

        Ok(app_config_dir.join("config.toml"))
    }

    /// Load configuration from the default location, writing defaults on first run
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            let config = Self::default();
            config.save_to(&path)?;
            log::info!("Wrote default configuration to {}", path.display());
            return Ok(config);
        }

        Self::load_from(&path)
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check every section for values the analysis cannot work with
    pub fn validate(&self) -> Result<()> {
        self.rates.schedule()?;

        let capacity = self.site.solar_capacity_kw;
        if !capacity.is_finite() || capacity < 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "solar_capacity_kw must be a non-negative number, got {}",
                capacity
            )));
        }

        self.calendar.validate()?;
        self.recommendations.validate()?;
        Ok(())
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory searched for usage exports
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Where the JSON report is written
    #[serde(default = "default_report_path")]
    pub report_path: String,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_data_dir() -> String { "data".to_string() }
fn default_report_path() -> String { "analysis_report.json".to_string() }
fn default_currency_symbol() -> String { "$".to_string() }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            report_path: default_report_path(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

/// Household and provider description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Installed PV capacity in kW
    #[serde(default = "default_solar_capacity")]
    pub solar_capacity_kw: f64,
    /// Delivery utility
    #[serde(default = "default_utility")]
    pub utility: String,
    /// Community choice aggregator supplying generation
    #[serde(default = "default_cca")]
    pub cca: String,
    #[serde(default = "default_rate_plan")]
    pub rate_plan: String,
}

fn default_solar_capacity() -> f64 { 5.985 }
fn default_utility() -> String { "SDG&E".to_string() }
fn default_cca() -> String { "Clean Energy Alliance (CEA)".to_string() }
fn default_rate_plan() -> String { "EV-TOU-5".to_string() }

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            solar_capacity_kw: default_solar_capacity(),
            utility: default_utility(),
            cca: default_cca(),
            rate_plan: default_rate_plan(),
        }
    }
}

/// Rate plan, all values in $/kWh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesConfig {
    #[serde(default = "default_super_off_peak_delivery")]
    pub super_off_peak_delivery: f64,
    #[serde(default = "default_off_peak_delivery")]
    pub off_peak_delivery: f64,
    #[serde(default = "default_on_peak_delivery")]
    pub on_peak_delivery: f64,
    /// Flat generation charge added to every period
    #[serde(default = "default_generation_rate")]
    pub generation_rate: f64,
    /// Credit paid for exported energy
    #[serde(default = "default_export_credit_rate")]
    pub export_credit_rate: f64,
}

fn default_super_off_peak_delivery() -> f64 { 0.043 }
fn default_off_peak_delivery() -> f64 { 0.329 }
fn default_on_peak_delivery() -> f64 { 0.329 }
fn default_generation_rate() -> f64 { 0.09 }
fn default_export_credit_rate() -> f64 { 0.04 }

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            super_off_peak_delivery: default_super_off_peak_delivery(),
            off_peak_delivery: default_off_peak_delivery(),
            on_peak_delivery: default_on_peak_delivery(),
            generation_rate: default_generation_rate(),
            export_credit_rate: default_export_credit_rate(),
        }
    }
}

impl RatesConfig {
    /// Build the validated rate schedule
    pub fn schedule(&self) -> Result<RateSchedule> {
        RateSchedule::new(
            PeriodMap {
                super_off_peak: self.super_off_peak_delivery,
                off_peak: self.off_peak_delivery,
                on_peak: self.on_peak_delivery,
            },
            self.generation_rate,
            self.export_credit_rate,
        )
    }
}

/// TOU calendar parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Months (1-12) with the weekday midday super off-peak window
    #[serde(default = "default_spring_months")]
    pub spring_months: Vec<u32>,
    /// Start hour of the spring midday window (inclusive)
    #[serde(default = "default_spring_start_hour")]
    pub spring_start_hour: u32,
    /// End hour of the spring midday window (exclusive)
    #[serde(default = "default_spring_end_hour")]
    pub spring_end_hour: u32,
    /// Dates billed like weekends
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

fn default_spring_months() -> Vec<u32> { vec![3, 4] }
fn default_spring_start_hour() -> u32 { 10 }
fn default_spring_end_hour() -> u32 { 14 }

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            spring_months: default_spring_months(),
            spring_start_hour: default_spring_start_hour(),
            spring_end_hour: default_spring_end_hour(),
            holidays: Vec::new(),
        }
    }
}

impl CalendarConfig {
    fn validate(&self) -> Result<()> {
        if let Some(m) = self.spring_months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(Error::InvalidConfiguration(format!("spring month out of range: {}", m)));
        }
        if self.spring_start_hour > 24 || self.spring_end_hour > 24 {
            return Err(Error::InvalidConfiguration(format!(
                "spring window hours must be within 0-24, got {}-{}",
                self.spring_start_hour, self.spring_end_hour
            )));
        }
        Ok(())
    }
}

/// Thresholds and constants used by the recommendation rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationConfig {
    /// On-peak share of imports (%) above which shifting is advised
    #[serde(default = "default_on_peak_share_pct")]
    pub on_peak_share_pct: f64,
    /// Fraction of on-peak usage assumed movable to super off-peak
    #[serde(default = "default_shift_fraction")]
    pub shift_fraction: f64,
    /// Super off-peak share of imports (%) considered well optimized
    #[serde(default = "default_super_off_peak_share_pct")]
    pub super_off_peak_share_pct: f64,
    /// Super off-peak delivery rate of the alternate plan used for comparison
    #[serde(default = "default_alternate_plan_rate")]
    pub alternate_plan_rate: f64,
    #[serde(default = "default_alternate_plan_name")]
    pub alternate_plan_name: String,
    /// Conservative daily yield per installed kW
    #[serde(default = "default_expected_yield")]
    pub expected_yield_kwh_per_kw: f64,
    /// Production below this fraction of the expected yield is flagged
    #[serde(default = "default_underproduction_ratio")]
    pub underproduction_ratio: f64,
    /// Who to contact when production stays low
    #[serde(default = "default_installer")]
    pub installer: String,
}

fn default_on_peak_share_pct() -> f64 { 25.0 }
fn default_shift_fraction() -> f64 { 0.3 }
fn default_super_off_peak_share_pct() -> f64 { 40.0 }
fn default_alternate_plan_rate() -> f64 { 0.177 }
fn default_alternate_plan_name() -> String { "EV-TOU-2".to_string() }
fn default_expected_yield() -> f64 { 4.5 }
fn default_underproduction_ratio() -> f64 { 0.5 }
fn default_installer() -> String { "Sunrun".to_string() }

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            on_peak_share_pct: default_on_peak_share_pct(),
            shift_fraction: default_shift_fraction(),
            super_off_peak_share_pct: default_super_off_peak_share_pct(),
            alternate_plan_rate: default_alternate_plan_rate(),
            alternate_plan_name: default_alternate_plan_name(),
            expected_yield_kwh_per_kw: default_expected_yield(),
            underproduction_ratio: default_underproduction_ratio(),
            installer: default_installer(),
        }
    }
}

impl RecommendationConfig {
    fn validate(&self) -> Result<()> {
        let values = [
            ("on_peak_share_pct", self.on_peak_share_pct),
            ("shift_fraction", self.shift_fraction),
            ("super_off_peak_share_pct", self.super_off_peak_share_pct),
            ("alternate_plan_rate", self.alternate_plan_rate),
            ("expected_yield_kwh_per_kw", self.expected_yield_kwh_per_kw),
            ("underproduction_ratio", self.underproduction_ratio),
        ];

        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfiguration(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Ingestion adapter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Fail on the first malformed row instead of skipping it
    #[serde(default)]
    pub strict: bool,
    /// Accepted (lower-case) names of the production CSV date column
    #[serde(default = "default_date_columns")]
    pub date_columns: Vec<String>,
    /// Accepted (lower-case) names of the production CSV energy column
    #[serde(default = "default_production_columns")]
    pub production_columns: Vec<String>,
    /// Draw assumed for activities missing from the table
    #[serde(default = "default_appliance_kw")]
    pub default_appliance_kw: f64,
    /// Typical draw in kW per logged activity
    #[serde(default = "default_appliance_power")]
    pub appliance_power: BTreeMap<String, f64>,
}

fn default_date_columns() -> Vec<String> {
    ["date", "datetime", "timestamp"].iter().map(|s| s.to_string()).collect()
}

fn default_production_columns() -> Vec<String> {
    ["production", "kwh", "production (kwh)", "production_kwh", "generated", "energy"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_appliance_power() -> BTreeMap<String, f64> {
    [
        ("Laundry - Washer", 0.5),
        ("Laundry - Dryer", 3.0),
        ("Dishwasher", 1.8),
        ("Oven/Stove", 2.5),
        ("Microwave", 1.2),
        ("TV - Living Room", 0.15),
        ("TV - Bedroom", 0.1),
        ("Computer/Desktop", 0.3),
        ("Gaming Console", 0.2),
        ("Hair Dryer", 1.5),
        ("Vacuum", 1.0),
        ("Iron", 1.2),
        ("Pool Pump", 1.5),
        ("AC Running", 3.5),
        ("Space Heater", 1.5),
        ("EV Charging", 7.0),
        ("Hot Tub/Spa", 4.0),
    ]
    .iter()
    .map(|(name, kw)| (name.to_string(), *kw))
    .collect()
}

fn default_appliance_kw() -> f64 { 0.5 }

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            strict: false,
            date_columns: default_date_columns(),
            production_columns: default_production_columns(),
            default_appliance_kw: default_appliance_kw(),
            appliance_power: default_appliance_power(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let schedule = config.rates.schedule().unwrap();
        assert!((schedule.total_rate(crate::core::TouPeriod::SuperOffPeak) - 0.133).abs() < 1e-9);
        assert!((schedule.total_rate(crate::core::TouPeriod::OnPeak) - 0.419).abs() < 1e-9);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            [site]
            solar_capacity_kw = 8.0

            [rates]
            export_credit_rate = 0.05

            [calendar]
            holidays = ["2026-07-03"]
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.site.solar_capacity_kw, 8.0);
        assert_eq!(config.site.rate_plan, "EV-TOU-5");
        assert_eq!(config.rates.export_credit_rate, 0.05);
        assert_eq!(config.rates.generation_rate, 0.09);
        assert_eq!(config.calendar.spring_months, vec![3, 4]);
        assert_eq!(config.calendar.holidays, vec![NaiveDate::from_ymd_opt(2026, 7, 3).unwrap()]);
        assert_eq!(config.ingest.appliance_power.get("EV Charging"), Some(&7.0));
    }

    #[test]
    fn test_negative_rate_rejected() {
        let mut config = Config::default();
        config.rates.on_peak_delivery = -0.1;
        assert!(matches!(config.validate(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_bad_spring_month_rejected() {
        let mut config = Config::default();
        config.calendar.spring_months = vec![3, 13];
        assert!(matches!(config.validate(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.site.solar_capacity_kw = 7.2;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.site.solar_capacity_kw, 7.2);
        assert_eq!(loaded.recommendations, config.recommendations);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
