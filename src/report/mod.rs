//! Analysis report: JSON export and console summary

use crate::analysis::{AnalysisSession, BatteryEstimate};
use crate::core::{Activity, DailyUsage, Error, PeriodMap, Recommendation, Result, SolarProduction, TouPeriod, UsageSummary};
use crate::ingest::{activity_totals, production_totals};
use crate::pricing::RateSchedule;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Human-readable rate plan, as shown in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateDescriptions {
    pub super_off_peak: String,
    pub off_peak: String,
    pub on_peak: String,
    pub export_credit: String,
}

/// Site and rate plan the report was computed with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfiguration {
    pub solar_capacity_kw: f64,
    pub utility: String,
    pub cca: String,
    pub rate_plan: String,
    pub currency_symbol: String,
    pub rates: RateDescriptions,
    /// Delivery plus generation, $/kWh
    pub total_rates: PeriodMap<f64>,
    pub export_credit_rate: f64,
}

/// Installer-reported production over the loaded period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionSummary {
    pub total_kwh: f64,
    pub daily_avg_kwh: f64,
    pub days: usize,
}

/// Activity log totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub count: usize,
    pub total_est_kwh: f64,
    pub by_activity: BTreeMap<String, f64>,
}

/// Complete analysis report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: NaiveDateTime,
    pub configuration: ReportConfiguration,
    pub summary: UsageSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily: Option<Vec<DailyUsage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solar_production: Option<ProductionSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<BatteryEstimate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activities: Option<ActivitySummary>,
    pub recommendations: Vec<Recommendation>,
}

impl Report {
    /// Report for `summary` with the session's recommendations and battery estimate
    pub fn new(session: &AnalysisSession, summary: UsageSummary) -> Self {
        let config = session.config();
        let schedule = session.schedule();
        let symbol = &config.general.currency_symbol;

        let configuration = ReportConfiguration {
            solar_capacity_kw: config.site.solar_capacity_kw,
            utility: config.site.utility.clone(),
            cca: config.site.cca.clone(),
            rate_plan: config.site.rate_plan.clone(),
            currency_symbol: symbol.clone(),
            rates: describe_rates(schedule, symbol),
            total_rates: schedule.total_rates(),
            export_credit_rate: schedule.export_credit_rate(),
        };

        Self {
            generated_at: Local::now().naive_local(),
            configuration,
            recommendations: session.recommendations(&summary),
            battery: session.battery(&summary),
            summary,
            daily: None,
            solar_production: None,
            activities: None,
        }
    }

    pub fn with_daily(mut self, daily: Vec<DailyUsage>) -> Self {
        self.daily = Some(daily);
        self
    }

    pub fn with_production(mut self, days: &[SolarProduction]) -> Self {
        let (total_kwh, daily_avg_kwh, days) = production_totals(days);
        self.solar_production = Some(ProductionSummary { total_kwh, daily_avg_kwh, days });
        self
    }

    pub fn with_activities(mut self, activities: &[Activity]) -> Self {
        self.activities = Some(ActivitySummary {
            count: activities.len(),
            total_est_kwh: activities.iter().map(|a| a.est_kwh).sum(),
            by_activity: activity_totals(activities),
        });
        self
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(path, content)?;
        log::info!("Report saved to {}", path.display());
        Ok(())
    }

    /// Read a report previously written with [`Report::write_json`]
    pub fn read_json(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Console summary of a report
pub fn render_text(report: &Report) -> String {
    report.to_string()
}

/// e.g. `$0.133/kWh (4.3¢ delivery + 9¢ gen)`
fn describe_rates(schedule: &RateSchedule, symbol: &str) -> RateDescriptions {
    let describe = |period: TouPeriod| {
        format!(
            "{}{:.3}/kWh ({:.1}\u{00A2} delivery + {:.0}\u{00A2} gen)",
            symbol,
            schedule.total_rate(period),
            schedule.delivery_rate(period) * 100.0,
            schedule.generation_rate() * 100.0
        )
    };

    RateDescriptions {
        super_off_peak: describe(TouPeriod::SuperOffPeak),
        off_peak: describe(TouPeriod::OffPeak),
        on_peak: describe(TouPeriod::OnPeak),
        export_credit: format!("{}{:.3}/kWh", symbol, schedule.export_credit_rate()),
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.configuration;
        let s = &self.summary;
        let cur = c.currency_symbol.as_str();
        let rule = "=".repeat(60);

        writeln!(f, "{}", rule)?;
        writeln!(f, "SOLAR POWER ANALYSIS - {}", c.rate_plan)?;
        writeln!(f, "{} + {}", c.utility, c.cca)?;
        writeln!(f, "{}", rule)?;

        writeln!(f)?;
        writeln!(f, "Period: {} days ({} to {})", s.day_count, s.first_date, s.last_date)?;
        writeln!(f, "Solar System: {} kW", c.solar_capacity_kw)?;

        writeln!(f)?;
        writeln!(f, "--- USAGE ---")?;
        writeln!(f, "Total Consumption:  {:.1} kWh", s.total_consumption_kwh)?;
        writeln!(f, "Solar Generation:   {:.1} kWh", s.total_generation_kwh)?;
        writeln!(f, "Grid Import:        {:.1} kWh", s.total_import_kwh)?;
        writeln!(f, "Grid Export:        {:.1} kWh", s.total_export_kwh)?;

        writeln!(f)?;
        writeln!(f, "--- TIME-OF-USE BREAKDOWN ---")?;
        for period in TouPeriod::ALL {
            writeln!(
                f,
                "{:20} {:7.1} kWh ({:5.1}%)  {}{:7.2}  @ {}{:.3}/kWh",
                period.label(),
                s.tou_import_kwh[period],
                s.import_share_pct(period),
                cur,
                s.tou_cost[period],
                cur,
                c.total_rates[period]
            )?;
        }

        writeln!(f)?;
        writeln!(f, "--- COST SUMMARY ---")?;
        writeln!(f, "Import Cost:        {}{:.2}", cur, s.import_cost)?;
        writeln!(f, "Export Credit:     -{}{:.2}", cur, s.export_credit)?;
        writeln!(f, "{}", "\u{2500}".repeat(35))?;
        writeln!(f, "NET COST:           {}{:.2}", cur, s.net_cost)?;
        writeln!(f, "Monthly Estimate:   {}{:.2}", cur, s.monthly_estimate)?;
        writeln!(f, "Annual Estimate:    {}{:.2}", cur, s.annual_estimate)?;

        if let Some(production) = &self.solar_production {
            writeln!(f)?;
            writeln!(f, "--- SOLAR PRODUCTION ---")?;
            writeln!(f, "Reported:           {:.1} kWh over {} days", production.total_kwh, production.days)?;
            writeln!(f, "Daily Average:      {:.1} kWh", production.daily_avg_kwh)?;
        }

        if let Some(battery) = &self.battery {
            writeln!(f)?;
            writeln!(f, "--- BATTERY SHIFT ---")?;
            writeln!(f, "On-Peak Import:     {:.1} kWh", battery.on_peak_import_kwh)?;
            writeln!(f, "Monthly Savings:    {}{:.2}", cur, battery.monthly_savings)?;
            writeln!(f, "Annual Savings:     {}{:.2}", cur, battery.annual_savings)?;
        }

        if let Some(activities) = &self.activities {
            writeln!(f)?;
            writeln!(f, "--- ACTIVITIES ---")?;
            writeln!(f, "{} logged, ~{:.1} kWh estimated", activities.count, activities.total_est_kwh)?;
            for (name, kwh) in &activities.by_activity {
                writeln!(f, "  {:24} {:6.1} kWh", name, kwh)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "--- RECOMMENDATIONS ---")?;
        for rec in &self.recommendations {
            writeln!(f)?;
            writeln!(f, "[{}] {}", rec.priority, rec.category)?;
            writeln!(f, "  {}", rec.issue)?;
            writeln!(f, "  \u{2192} {}", rec.recommendation)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Config, DateRange, IntervalReading, Priority};
    use chrono::NaiveDate;

    fn session() -> AnalysisSession {
        let day = NaiveDate::from_ymd_opt(2026, 1, 13).unwrap();
        let readings = vec![
            IntervalReading::new(day.and_hms_opt(2, 0, 0).unwrap(), 6.0),
            IntervalReading::new(day.and_hms_opt(12, 0, 0).unwrap(), -4.0),
            IntervalReading::new(day.and_hms_opt(18, 0, 0).unwrap(), 5.0),
        ];
        AnalysisSession::new(&Config::default(), &readings).unwrap()
    }

    fn report() -> Report {
        let session = session();
        let summary = session.summary(DateRange::default()).unwrap();
        Report::new(&session, summary)
    }

    #[test]
    fn test_rate_descriptions() {
        let rates = report().configuration.rates;
        assert_eq!(rates.super_off_peak, "$0.133/kWh (4.3\u{00A2} delivery + 9\u{00A2} gen)");
        assert_eq!(rates.on_peak, "$0.419/kWh (32.9\u{00A2} delivery + 9\u{00A2} gen)");
        assert_eq!(rates.export_credit, "$0.040/kWh");
    }

    #[test]
    fn test_report_contents() {
        let report = report();
        assert_eq!(report.summary.day_count, 1);
        assert!(report.battery.is_some());
        assert_eq!(report.recommendations.last().unwrap().priority, Priority::Tip);
        assert!(report.daily.is_none());
    }

    #[test]
    fn test_optional_sections() {
        let session = session();
        let summary = session.summary(DateRange::default()).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 1, 13).unwrap();

        let report = Report::new(&session, summary)
            .with_daily(session.daily(DateRange::default()))
            .with_production(&[SolarProduction { date: day, production_kwh: 20.0, notes: None }]);

        assert_eq!(report.daily.as_ref().map(Vec::len), Some(1));
        assert_eq!(
            report.solar_production,
            Some(ProductionSummary { total_kwh: 20.0, daily_avg_kwh: 20.0, days: 1 })
        );
        assert!(report.activities.is_none());
    }

    #[test]
    fn test_write_and_read_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis_report.json");
        let report = report();

        report.write_json(&path).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["configuration"]["rate_plan"], "EV-TOU-5");
        assert_eq!(raw["recommendations"].as_array().map(Vec::len), Some(report.recommendations.len()));
        assert!(raw.get("daily").is_none());

        let loaded = Report::read_json(&path).unwrap();
        assert_eq!(loaded.summary, report.summary);
        assert_eq!(loaded.battery, report.battery);
        assert_eq!(loaded.configuration, report.configuration);
    }

    #[test]
    fn test_render_text() {
        let text = render_text(&report());

        assert!(text.contains("SOLAR POWER ANALYSIS - EV-TOU-5"));
        assert!(text.contains("Period: 1 days (2026-01-13 to 2026-01-13)"));
        assert!(text.contains("Super Off Peak"));
        assert!(text.contains("Export Credit:     -$0.16"));
        assert!(text.contains("[TIP] Best Practices"));
        assert!(!text.contains("--- ACTIVITIES ---"));
    }
}
