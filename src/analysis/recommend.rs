//! Rule-based optimization recommendations
//!
//! Rules are evaluated in a fixed order so callers can show the first few:
//! peak usage, super off-peak utilization, solar production, then the
//! general tip which is always present.

use crate::core::{Priority, Recommendation, RecommendationConfig, TouPeriod, UsageSummary};
use crate::pricing::RateSchedule;

const DAYS_PER_MONTH: f64 = 30.0;

/// Produces recommendations from a usage summary
pub struct RecommendationEngine {
    settings: RecommendationConfig,
    rate_plan: String,
}

impl RecommendationEngine {
    pub fn new(settings: &RecommendationConfig, rate_plan: &str) -> Self {
        Self {
            settings: settings.clone(),
            rate_plan: rate_plan.to_string(),
        }
    }

    /// Evaluate every rule against `summary`
    pub fn recommend(
        &self,
        summary: &UsageSummary,
        schedule: &RateSchedule,
        solar_capacity_kw: f64,
    ) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        // Per-day scaling needs at least one day of data
        if summary.day_count > 0 {
            recommendations.extend(self.peak_usage(summary, schedule));
            recommendations.extend(self.super_off_peak_usage(summary, schedule));
            recommendations.extend(self.solar_production(summary, solar_capacity_kw));
        }
        recommendations.push(self.general_tip());

        log::debug!("Produced {} recommendations", recommendations.len());
        recommendations
    }

    fn peak_usage(&self, summary: &UsageSummary, schedule: &RateSchedule) -> Option<Recommendation> {
        let on_peak_pct = summary.import_share_pct(TouPeriod::OnPeak);
        if on_peak_pct <= self.settings.on_peak_share_pct {
            return None;
        }

        let on_peak_import = summary.tou_import_kwh[TouPeriod::OnPeak];
        let rate_on = schedule.total_rate(TouPeriod::OnPeak);
        let rate_super = schedule.total_rate(TouPeriod::SuperOffPeak);
        let monthly_savings = on_peak_import * self.settings.shift_fraction * (rate_on - rate_super)
            * DAYS_PER_MONTH
            / summary.day_count as f64;

        let plan_note = if schedule.total_rate(TouPeriod::OffPeak) == rate_on {
            format!(
                "Your {} plan charges the same rate for on-peak and off-peak, \
                 but shifting to super off-peak (before 6am) saves significantly.",
                self.rate_plan
            )
        } else {
            format!(
                "Your {} plan charges more on-peak, and shifting to super off-peak \
                 (before 6am) saves the most.",
                self.rate_plan
            )
        };

        Some(Recommendation {
            priority: Priority::High,
            category: "Peak Usage".to_string(),
            issue: format!(
                "{:.0}% of your grid imports happen during on-peak (4-9pm)",
                on_peak_pct
            ),
            recommendation: format!(
                "Shift high-consumption activities to before 4pm or after 9pm. {}",
                plan_note
            ),
            potential_savings: format!(
                "${:.0}/month if you shift {:.0}% to super off-peak",
                monthly_savings,
                self.settings.shift_fraction * 100.0
            ),
        })
    }

    fn super_off_peak_usage(&self, summary: &UsageSummary, schedule: &RateSchedule) -> Option<Recommendation> {
        let super_off_pct = summary.import_share_pct(TouPeriod::SuperOffPeak);
        if super_off_pct <= self.settings.super_off_peak_share_pct {
            return None;
        }

        let super_import = summary.tou_import_kwh[TouPeriod::SuperOffPeak];
        let delivery = schedule.delivery_rate(TouPeriod::SuperOffPeak);
        let saved = super_import * (self.settings.alternate_plan_rate - delivery);

        Some(Recommendation {
            priority: Priority::Info,
            category: "EV Charging".to_string(),
            issue: format!("Great! {:.0}% of imports during super off-peak", super_off_pct),
            recommendation: format!(
                "Your EV charging timing is excellent. The {:.1}\u{00A2} delivery rate \
                 is saving you ~${:.0} vs {} rates.",
                delivery * 100.0,
                saved,
                self.settings.alternate_plan_name
            ),
            potential_savings: "Already optimized!".to_string(),
        })
    }

    fn solar_production(&self, summary: &UsageSummary, solar_capacity_kw: f64) -> Option<Recommendation> {
        if summary.total_generation_kwh <= 0.0 || !solar_capacity_kw.is_finite() || solar_capacity_kw <= 0.0 {
            return None;
        }

        let expected_daily = solar_capacity_kw * self.settings.expected_yield_kwh_per_kw;
        let actual_daily = summary.total_generation_kwh / summary.day_count as f64;
        if actual_daily >= expected_daily * self.settings.underproduction_ratio {
            return None;
        }

        Some(Recommendation {
            priority: Priority::Medium,
            category: "Solar Production".to_string(),
            issue: format!(
                "Solar producing {:.1} kWh/day (expected ~{:.0} kWh/day)",
                actual_daily, expected_daily
            ),
            recommendation: format!(
                "Your solar production seems lower than expected for a {}kW system. \
                 This could be due to weather, shading, or system issues. \
                 Consider contacting {} if this persists.",
                solar_capacity_kw, self.settings.installer
            ),
            potential_savings: "Varies based on issue".to_string(),
        })
    }

    fn general_tip(&self) -> Recommendation {
        Recommendation {
            priority: Priority::Tip,
            category: "Best Practices".to_string(),
            issue: format!("Maximize your {} benefits", self.rate_plan),
            recommendation: "Run dishwasher/laundry before 6am or on weekend mornings (super off-peak). \
                             Use solar production hours (10am-3pm) for daytime loads. \
                             Avoid 4-9pm for heavy appliances when possible."
                .to_string(),
            potential_savings: "Ongoing savings".to_string(),
        }
    }
}

/// Recommendations with the default thresholds and rate plan name
pub fn recommend(summary: &UsageSummary, schedule: &RateSchedule, solar_capacity_kw: f64) -> Vec<Recommendation> {
    let settings = RecommendationConfig::default();
    RecommendationEngine::new(&settings, "EV-TOU-5").recommend(summary, schedule, solar_capacity_kw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PeriodMap, RatesConfig};
    use chrono::NaiveDate;

    fn schedule() -> RateSchedule {
        RatesConfig::default().schedule().unwrap()
    }

    fn summary(tou_import: PeriodMap<f64>, generation: f64, days: usize) -> UsageSummary {
        let total_import = tou_import.total();
        let tou_cost = PeriodMap::from_fn(|p| tou_import[p] * schedule().total_rate(p));
        let import_cost = tou_cost.total();
        let d = days.max(1) as f64;
        UsageSummary {
            day_count: days,
            first_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            last_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            total_consumption_kwh: total_import,
            total_generation_kwh: generation,
            total_import_kwh: total_import,
            total_export_kwh: 0.0,
            daily_avg_consumption: total_import / d,
            daily_avg_import: total_import / d,
            daily_avg_export: 0.0,
            tou_import_kwh: tou_import,
            tou_cost,
            import_cost,
            export_credit: 0.0,
            net_cost: import_cost,
            monthly_estimate: import_cost * 30.0 / d,
            annual_estimate: import_cost * 365.0 / d,
        }
    }

    fn imports(super_off_peak: f64, off_peak: f64, on_peak: f64) -> PeriodMap<f64> {
        PeriodMap { super_off_peak, off_peak, on_peak }
    }

    #[test]
    fn test_tip_always_last() {
        let recs = recommend(&summary(imports(1.0, 8.0, 1.0), 0.0, 1), &schedule(), 5.985);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, Priority::Tip);
        assert_eq!(recs[0].potential_savings, "Ongoing savings");
    }

    #[test]
    fn test_peak_usage_savings() {
        // 50% on-peak over 10 days
        let recs = recommend(&summary(imports(10.0, 40.0, 50.0), 0.0, 10), &schedule(), 5.985);
        let peak = &recs[0];

        assert_eq!(peak.priority, Priority::High);
        assert_eq!(peak.category, "Peak Usage");
        assert!(peak.issue.starts_with("50%"));
        // 50 * 0.3 * 0.286 * 30 / 10 = 12.87
        assert_eq!(peak.potential_savings, "$13/month if you shift 30% to super off-peak");
        assert!(peak.recommendation.contains("same rate for on-peak and off-peak"));
    }

    #[test]
    fn test_peak_threshold_is_strict() {
        let recs = recommend(&summary(imports(25.0, 50.0, 25.0), 0.0, 1), &schedule(), 5.985);
        assert!(recs.iter().all(|r| r.priority != Priority::High));
    }

    #[test]
    fn test_no_imports_suppresses_share_rules() {
        let recs = recommend(&summary(imports(0.0, 0.0, 0.0), 0.0, 3), &schedule(), 5.985);
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn test_super_off_peak_info() {
        let recs = recommend(&summary(imports(60.0, 30.0, 10.0), 0.0, 5), &schedule(), 5.985);
        let info = recs.iter().find(|r| r.priority == Priority::Info).unwrap();

        assert_eq!(info.category, "EV Charging");
        assert_eq!(info.potential_savings, "Already optimized!");
        // 60 * (0.177 - 0.043) = 8.04
        assert!(info.recommendation.contains("4.3\u{00A2}"));
        assert!(info.recommendation.contains("~$8 vs EV-TOU-2"));
    }

    #[test]
    fn test_solar_underproduction() {
        // 5.985 kW * 4.5 = 26.9 kWh/day expected, 10 kWh/day actual
        let recs = recommend(&summary(imports(1.0, 8.0, 1.0), 20.0, 2), &schedule(), 5.985);
        let solar = recs.iter().find(|r| r.priority == Priority::Medium).unwrap();
        assert_eq!(solar.issue, "Solar producing 10.0 kWh/day (expected ~27 kWh/day)");

        // 15 kWh/day is above half the expected yield
        let recs = recommend(&summary(imports(1.0, 8.0, 1.0), 30.0, 2), &schedule(), 5.985);
        assert!(recs.iter().all(|r| r.priority != Priority::Medium));
    }

    #[test]
    fn test_solar_rule_skipped_without_valid_capacity() {
        for capacity in [f64::NAN, f64::INFINITY, 0.0] {
            let recs = recommend(&summary(imports(1.0, 8.0, 1.0), 2.0, 2), &schedule(), capacity);
            assert!(recs.iter().all(|r| r.priority != Priority::Medium));
            assert!(recs.iter().all(|r| !r.issue.contains("NaN")));
        }
    }

    #[test]
    fn test_order_peak_before_solar_before_tip() {
        let recs = recommend(&summary(imports(5.0, 5.0, 10.0), 4.0, 2), &schedule(), 5.985);
        let priorities: Vec<Priority> = recs.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![Priority::High, Priority::Medium, Priority::Tip]);
    }

    #[test]
    fn test_zero_day_summary_only_tip() {
        let recs = recommend(&summary(imports(0.0, 0.0, 10.0), 5.0, 0), &schedule(), 5.985);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, Priority::Tip);
    }

    #[test]
    fn test_custom_thresholds() {
        let settings = RecommendationConfig {
            on_peak_share_pct: 5.0,
            shift_fraction: 0.5,
            ..Default::default()
        };
        let engine = RecommendationEngine::new(&settings, "TOU-DR1");
        let recs = engine.recommend(&summary(imports(45.0, 45.0, 10.0), 0.0, 30), &schedule(), 5.985);

        assert_eq!(recs[0].priority, Priority::High);
        assert!(recs[0].potential_savings.ends_with("if you shift 50% to super off-peak"));
        assert_eq!(recs.last().unwrap().issue, "Maximize your TOU-DR1 benefits");
    }
}
