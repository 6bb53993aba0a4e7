//! SOC hysteresis and solar power decision
//!
//! The permit gate opens at or above the start threshold and closes at or
//! below the stop threshold; between the two it holds its previous value.
//! While permitted, the heater follows whether solar power exceeds its
//! threshold. Closing the permit switches the heater off in the same step.

use serde::Serialize;

use crate::combiner::CombinedEvent;
use crate::config::ControllerConfig;
use crate::error::Result;

/// Battery protection gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Permit {
    #[default]
    Withheld,
    Granted,
}

/// Thresholds taken from a validated controller configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// SOC percentage that grants the permit
    pub soc_start: f64,
    /// SOC percentage that withholds the permit
    pub soc_stop: f64,
    /// Solar power in watts that must be exceeded
    pub power: f64,
}

impl Thresholds {
    pub fn from_config(config: &ControllerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            soc_start: config.battery_soc_start_threshold.unwrap_or_default(),
            soc_stop: config.battery_soc_stop_threshold.unwrap_or_default(),
            power: config.solar_power_threshold.unwrap_or_default(),
        })
    }
}

/// Mutable decision state; starts withheld with the heater off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerState {
    pub permit: Permit,
    pub heater_on: bool,
}

/// Inputs of one evaluation after coercion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readings {
    pub enabled: bool,
    /// SOC as an integer percentage
    pub soc_percent: f64,
    /// Solar power truncated to whole watts
    pub power_watts: f64,
}

impl Readings {
    /// Coerce a combined event; a missing enable input counts as enabled
    pub fn from_event(event: &CombinedEvent) -> Self {
        Self {
            enabled: event.enabled.is_none_or(|e| e.is_truthy()),
            soc_percent: (event.soc.as_f64() * 100.0).trunc(),
            power_watts: event.power.truncated(),
        }
    }
}

/// Externally observable result of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub enabled: bool,
    pub permit: Permit,
    pub heater_on: bool,
}

/// Apply the transition rules to `state` and report the outcome
pub fn evaluate(
    state: &mut ControllerState,
    thresholds: &Thresholds,
    readings: &Readings,
) -> Evaluation {
    if !readings.enabled {
        // Permit is frozen so re-enabling resumes from the last battery decision
        state.heater_on = false;
    } else {
        match state.permit {
            Permit::Withheld if readings.soc_percent >= thresholds.soc_start => {
                state.permit = Permit::Granted;
            }
            Permit::Granted if readings.soc_percent <= thresholds.soc_stop => {
                state.permit = Permit::Withheld;
                state.heater_on = false;
            }
            _ => {}
        }

        if state.permit == Permit::Granted {
            state.heater_on = readings.power_watts > thresholds.power;
        }
    }

    Evaluation {
        enabled: readings.enabled,
        permit: state.permit,
        heater_on: state.heater_on,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::SensorValue;

    fn thresholds() -> Thresholds {
        Thresholds {
            soc_start: 70.0,
            soc_stop: 40.0,
            power: 200.0,
        }
    }

    fn readings(enabled: bool, soc: f64, power: f64) -> Readings {
        Readings::from_event(&CombinedEvent {
            enabled: Some(SensorValue::from(enabled)),
            soc: SensorValue::new(soc),
            power: SensorValue::new(power),
        })
    }

    #[test]
    fn scenario_battery_and_power_sequence() {
        let mut state = ControllerState::default();
        let t = thresholds();

        let e = evaluate(&mut state, &t, &readings(true, 0.50, 100.0));
        assert_eq!((e.permit, e.heater_on), (Permit::Withheld, false));

        let e = evaluate(&mut state, &t, &readings(true, 0.75, 250.0));
        assert_eq!((e.permit, e.heater_on), (Permit::Granted, true));

        let e = evaluate(&mut state, &t, &readings(true, 0.75, 150.0));
        assert_eq!((e.permit, e.heater_on), (Permit::Granted, false));

        let e = evaluate(&mut state, &t, &readings(true, 0.35, 300.0));
        assert_eq!((e.permit, e.heater_on), (Permit::Withheld, false));
    }

    #[test]
    fn withdrawal_forces_off_in_same_step() {
        let mut state = ControllerState {
            permit: Permit::Granted,
            heater_on: true,
        };
        let e = evaluate(&mut state, &thresholds(), &readings(true, 0.40, 5000.0));
        assert_eq!(e.permit, Permit::Withheld);
        assert!(!e.heater_on);
    }

    #[test]
    fn no_permit_change_inside_band() {
        let t = thresholds();
        for start in [Permit::Withheld, Permit::Granted] {
            let mut state = ControllerState {
                permit: start,
                heater_on: false,
            };
            for soc in [0.41, 0.55, 0.69, 0.60, 0.45] {
                evaluate(&mut state, &t, &readings(true, soc, 0.0));
                assert_eq!(state.permit, start, "soc {} flipped permit", soc);
            }
        }
    }

    #[test]
    fn band_edges_are_inclusive() {
        let t = thresholds();
        let mut state = ControllerState::default();
        evaluate(&mut state, &t, &readings(true, 0.70, 0.0));
        assert_eq!(state.permit, Permit::Granted);
        evaluate(&mut state, &t, &readings(true, 0.40, 0.0));
        assert_eq!(state.permit, Permit::Withheld);
    }

    #[test]
    fn power_threshold_is_exclusive() {
        let mut state = ControllerState::default();
        let e = evaluate(&mut state, &thresholds(), &readings(true, 0.9, 200.9));
        // Truncated to 200 W, not above the threshold
        assert!(!e.heater_on);
        let e = evaluate(&mut state, &thresholds(), &readings(true, 0.9, 201.0));
        assert!(e.heater_on);
    }

    #[test]
    fn disabled_forces_off_and_freezes_permit() {
        let t = thresholds();
        let mut state = ControllerState {
            permit: Permit::Granted,
            heater_on: true,
        };
        let e = evaluate(&mut state, &t, &readings(false, 0.90, 500.0));
        assert!(!e.enabled);
        assert!(!e.heater_on);
        assert_eq!(e.permit, Permit::Granted);

        // Low SOC while disabled does not touch the permit
        evaluate(&mut state, &t, &readings(false, 0.10, 500.0));
        assert_eq!(state.permit, Permit::Granted);

        let e = evaluate(&mut state, &t, &readings(true, 0.50, 500.0));
        assert_eq!(e.permit, Permit::Granted);
        assert!(e.heater_on);
    }

    #[test]
    fn missing_enable_topic_counts_as_enabled() {
        let r = Readings::from_event(&CombinedEvent {
            enabled: None,
            soc: SensorValue::new(0.8),
            power: SensorValue::new(10.0),
        });
        assert!(r.enabled);
        assert_eq!(r.soc_percent, 80.0);
    }

    #[test]
    fn malformed_values_flow_through_comparisons() {
        let t = thresholds();
        let mut state = ControllerState::default();
        // Above 100% still satisfies the start threshold
        evaluate(&mut state, &t, &readings(true, 1.5, 0.0));
        assert_eq!(state.permit, Permit::Granted);

        // NaN power never exceeds the threshold, NaN SOC never crosses an edge
        let e = evaluate(&mut state, &t, &readings(true, f64::NAN, f64::NAN));
        assert_eq!(e.permit, Permit::Granted);
        assert!(!e.heater_on);

        let r = Readings::from_event(&CombinedEvent {
            enabled: Some(SensorValue::missing()),
            soc: SensorValue::new(0.8),
            power: SensorValue::new(900.0),
        });
        assert!(!r.enabled);
    }
}
