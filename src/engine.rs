use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::domain::{ActiveSource, AggregatedState, EnergySource, ManagementMode};
use crate::policy::EnergyManagementConfig;

/// Rule codes explaining how a recommendation came about, in evaluation
/// order: one entry per rejected predicate plus the accepting one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RuleCode {
    ManualOverride,
    SolarMinPowerMet,
    SolarBelowMinPower,
    BatterySocAboveMin,
    BatterySocBelowMin,
    BatterySocUnknown,
    GridAvailable,
    GridAvoidedDuringPeak,
    PriorityFallback,
}

/// Configured limits currently exceeded. Detected on every evaluation,
/// independent of the recommendation, so operators see violations even
/// while a manual override is active.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ViolationCode {
    GridImportExceeded,
    GridChargingDisallowed,
    GridExportDisallowed,
    BatteryOverchargeRisk,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    pub code: ViolationCode,
    pub detail: String,
}

/// Output of one arbitration pass. Recomputed every cycle; only the latest
/// value is kept by the service (plus a bounded history for operators).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceDecision {
    pub recommended_source: ActiveSource,
    pub reasons: Vec<RuleCode>,
    pub violations: Vec<Violation>,
}

/// Decide the recommended energy source for the current fleet state.
///
/// Total function: the config has already passed validation, every
/// arithmetic edge resolves to a defined value, and automatic mode is
/// guaranteed a recommendation by the priority-order fallback.
pub fn evaluate(
    state: &AggregatedState,
    config: &EnergyManagementConfig,
    now: NaiveTime,
) -> SourceDecision {
    let violations = detect_violations(state, config);

    if config.mode == ManagementMode::Manual {
        // Manual mode is authoritative: violations are reported but never
        // override the operator's selection.
        let source = config
            .manual_source
            .expect("validated manual config carries a source");
        return SourceDecision {
            recommended_source: source.into(),
            reasons: vec![RuleCode::ManualOverride],
            violations,
        };
    }

    let mut reasons = Vec::new();
    for source in &config.priority_order {
        match eligibility(*source, state, config, now) {
            Eligibility::Eligible(code) => {
                reasons.push(code);
                return SourceDecision {
                    recommended_source: (*source).into(),
                    reasons,
                    violations,
                };
            }
            Eligibility::Ineligible(code) => reasons.push(code),
        }
    }

    // Nothing qualified: availability beats preference, fall back to the
    // last priority entry even if its own predicate said no.
    reasons.push(RuleCode::PriorityFallback);
    SourceDecision {
        recommended_source: config.fallback_source().into(),
        reasons,
        violations,
    }
}

enum Eligibility {
    Eligible(RuleCode),
    Ineligible(RuleCode),
}

fn eligibility(
    source: EnergySource,
    state: &AggregatedState,
    config: &EnergyManagementConfig,
    now: NaiveTime,
) -> Eligibility {
    match source {
        EnergySource::Solar => {
            if state.total_solar_power_w >= config.solar_min_power_w {
                Eligibility::Eligible(RuleCode::SolarMinPowerMet)
            } else {
                Eligibility::Ineligible(RuleCode::SolarBelowMinPower)
            }
        }
        // Max SOC gates charging only; a full battery is still eligible to
        // discharge. The overcharge side is covered by violations.
        EnergySource::Battery => match state.weighted_battery_soc_pct {
            None => Eligibility::Ineligible(RuleCode::BatterySocUnknown),
            Some(soc) if soc > config.battery_min_soc_pct => {
                Eligibility::Eligible(RuleCode::BatterySocAboveMin)
            }
            Some(_) => Eligibility::Ineligible(RuleCode::BatterySocBelowMin),
        },
        EnergySource::Grid => {
            if config.avoid_grid_during_peak && config.is_peak_hours(now) {
                Eligibility::Ineligible(RuleCode::GridAvoidedDuringPeak)
            } else {
                Eligibility::Eligible(RuleCode::GridAvailable)
            }
        }
    }
}

fn detect_violations(
    state: &AggregatedState,
    config: &EnergyManagementConfig,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    if state.total_grid_power_w > config.grid_max_import_w {
        violations.push(Violation {
            code: ViolationCode::GridImportExceeded,
            detail: format!(
                "grid import {:.0} W exceeds configured cap {:.0} W",
                state.total_grid_power_w, config.grid_max_import_w
            ),
        });
    }

    if !config.enable_grid_charging
        && state.total_battery_power_w > 0.0
        && state.total_grid_power_w > 0.0
    {
        violations.push(Violation {
            code: ViolationCode::GridChargingDisallowed,
            detail: format!(
                "battery charging at {:.0} W while importing {:.0} W with grid charging disabled",
                state.total_battery_power_w, state.total_grid_power_w
            ),
        });
    }

    if !config.enable_grid_export && state.total_grid_power_w < 0.0 {
        violations.push(Violation {
            code: ViolationCode::GridExportDisallowed,
            detail: format!(
                "exporting {:.0} W to grid with export disabled",
                -state.total_grid_power_w
            ),
        });
    }

    if let Some(soc) = state.weighted_battery_soc_pct {
        if soc >= config.battery_max_soc_pct && state.total_battery_power_w > 0.0 {
            violations.push(Violation {
                code: ViolationCode::BatteryOverchargeRisk,
                detail: format!(
                    "battery at {:.1}% SOC (max {:.1}%) still charging at {:.0} W",
                    soc, config.battery_max_soc_pct, state.total_battery_power_w
                ),
            });
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn state() -> AggregatedState {
        AggregatedState::default()
    }

    fn config() -> EnergyManagementConfig {
        EnergyManagementConfig {
            solar_min_power_w: 100.0,
            grid_max_import_w: 3000.0,
            ..EnergyManagementConfig::default()
        }
    }

    fn has_violation(decision: &SourceDecision, code: ViolationCode) -> bool {
        decision.violations.iter().any(|v| v.code == code)
    }

    #[test]
    fn test_solar_wins_when_above_minimum() {
        let mut s = state();
        s.total_solar_power_w = 500.0;
        s.weighted_battery_soc_pct = Some(50.0);

        let decision = evaluate(&s, &config(), noon());
        assert_eq!(decision.recommended_source, ActiveSource::Solar);
        assert_eq!(decision.reasons, vec![RuleCode::SolarMinPowerMet]);
    }

    #[test]
    fn test_falls_through_to_grid_with_reason_trail() {
        let mut s = state();
        s.total_solar_power_w = 0.0;
        s.weighted_battery_soc_pct = Some(10.0);
        s.total_grid_power_w = 1000.0;

        let decision = evaluate(&s, &config(), noon());
        assert_eq!(decision.recommended_source, ActiveSource::Grid);
        assert_eq!(
            decision.reasons,
            vec![
                RuleCode::SolarBelowMinPower,
                RuleCode::BatterySocBelowMin,
                RuleCode::GridAvailable,
            ]
        );
        assert!(decision.violations.is_empty());
    }

    #[test]
    fn test_grid_import_violation_reported_alongside_recommendation() {
        let mut s = state();
        s.weighted_battery_soc_pct = Some(10.0);
        s.total_grid_power_w = 3500.0;

        let decision = evaluate(&s, &config(), noon());
        assert_eq!(decision.recommended_source, ActiveSource::Grid);
        assert!(has_violation(&decision, ViolationCode::GridImportExceeded));
    }

    #[test]
    fn test_battery_soc_boundary_is_strict() {
        let mut s = state();
        s.weighted_battery_soc_pct = Some(20.0);

        // SOC equal to the minimum is not above it.
        let decision = evaluate(&s, &config(), noon());
        assert_ne!(decision.recommended_source, ActiveSource::Battery);

        s.weighted_battery_soc_pct = Some(20.1);
        let decision = evaluate(&s, &config(), noon());
        assert_eq!(decision.recommended_source, ActiveSource::Battery);
    }

    #[test]
    fn test_full_battery_still_discharges() {
        // Max SOC gates charging, not discharge eligibility.
        let mut s = state();
        s.weighted_battery_soc_pct = Some(95.0);
        s.total_battery_power_w = -800.0;

        let decision = evaluate(&s, &config(), noon());
        assert_eq!(decision.recommended_source, ActiveSource::Battery);
        assert!(!has_violation(&decision, ViolationCode::BatteryOverchargeRisk));
    }

    #[test]
    fn test_overcharge_risk_flagged_when_charging_past_max() {
        let mut s = state();
        s.total_solar_power_w = 4000.0;
        s.weighted_battery_soc_pct = Some(92.0);
        s.total_battery_power_w = 1200.0;

        let decision = evaluate(&s, &config(), noon());
        assert_eq!(decision.recommended_source, ActiveSource::Solar);
        assert!(has_violation(&decision, ViolationCode::BatteryOverchargeRisk));
    }

    #[test]
    fn test_unknown_soc_excludes_battery() {
        let mut s = state();
        s.weighted_battery_soc_pct = None;

        let decision = evaluate(&s, &config(), noon());
        assert_eq!(decision.recommended_source, ActiveSource::Grid);
        assert!(decision.reasons.contains(&RuleCode::BatterySocUnknown));
    }

    #[test]
    fn test_peak_avoidance_defers_grid_until_fallback() {
        let mut cfg = config();
        cfg.peak_hours_start = time(17, 0);
        cfg.peak_hours_end = time(22, 0);

        let mut s = state();
        s.weighted_battery_soc_pct = Some(5.0);

        // Inside the peak window nothing is eligible; grid still wins as
        // the fallback, with the avoidance recorded in the trail.
        let decision = evaluate(&s, &cfg, time(18, 30));
        assert_eq!(decision.recommended_source, ActiveSource::Grid);
        assert_eq!(
            decision.reasons,
            vec![
                RuleCode::SolarBelowMinPower,
                RuleCode::BatterySocBelowMin,
                RuleCode::GridAvoidedDuringPeak,
                RuleCode::PriorityFallback,
            ]
        );
    }

    #[test]
    fn test_fallback_is_last_priority_entry() {
        let mut cfg = config();
        cfg.priority_order =
            vec![EnergySource::Grid, EnergySource::Solar, EnergySource::Battery];
        cfg.avoid_grid_during_peak = true;
        cfg.peak_hours_start = time(0, 0);
        cfg.peak_hours_end = time(23, 59);

        let s = state(); // nothing eligible: no solar, no SOC, peak all day
        let decision = evaluate(&s, &cfg, noon());
        assert_eq!(decision.recommended_source, ActiveSource::Battery);
        assert_eq!(decision.reasons.last(), Some(&RuleCode::PriorityFallback));
    }

    #[test]
    fn test_manual_mode_is_authoritative() {
        let mut cfg = config();
        cfg.mode = ManagementMode::Manual;
        cfg.manual_source = Some(EnergySource::Grid);

        let mut s = state();
        s.total_grid_power_w = 4000.0; // over the 3000 W cap

        let decision = evaluate(&s, &cfg, noon());
        assert_eq!(decision.recommended_source, ActiveSource::Grid);
        assert_eq!(decision.reasons, vec![RuleCode::ManualOverride]);
        assert!(has_violation(&decision, ViolationCode::GridImportExceeded));
    }

    #[test]
    fn test_grid_charging_and_export_violations() {
        let mut cfg = config();
        cfg.enable_grid_charging = false;
        cfg.enable_grid_export = false;

        let mut s = state();
        s.total_battery_power_w = 900.0;
        s.total_grid_power_w = 600.0;
        let decision = evaluate(&s, &cfg, noon());
        assert!(has_violation(&decision, ViolationCode::GridChargingDisallowed));

        s.total_battery_power_w = 0.0;
        s.total_grid_power_w = -750.0;
        let decision = evaluate(&s, &cfg, noon());
        assert!(has_violation(&decision, ViolationCode::GridExportDisallowed));
        assert!(!has_violation(&decision, ViolationCode::GridChargingDisallowed));
    }

    #[test]
    fn test_grid_charging_allowed_when_enabled() {
        let mut cfg = config();
        cfg.enable_grid_charging = true;

        let mut s = state();
        s.total_battery_power_w = 900.0;
        s.total_grid_power_w = 600.0;
        let decision = evaluate(&s, &cfg, noon());
        assert!(!has_violation(&decision, ViolationCode::GridChargingDisallowed));
    }
}
