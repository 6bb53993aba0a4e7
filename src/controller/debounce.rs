//! Output debouncing
//!
//! The relay command is written on every evaluation. The status line is only
//! produced when the enable flag, the permit or the heater state differ from
//! the previous evaluation.

use std::fmt;

use serde::Serialize;

use super::hysteresis::{Evaluation, Permit};

/// Human-readable heater state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaterStatus {
    Disabled,
    On,
    OffSolarPowerTooLow,
    OffBatterySocTooLow,
}

impl HeaterStatus {
    pub fn from_evaluation(eval: &Evaluation) -> Self {
        match (eval.enabled, eval.heater_on, eval.permit) {
            (false, _, _) => HeaterStatus::Disabled,
            (true, true, _) => HeaterStatus::On,
            (true, false, Permit::Granted) => HeaterStatus::OffSolarPowerTooLow,
            (true, false, Permit::Withheld) => HeaterStatus::OffBatterySocTooLow,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            HeaterStatus::Disabled => "solar water heating is disabled",
            HeaterStatus::On => "solar water heating is enabled and ON",
            HeaterStatus::OffSolarPowerTooLow => {
                "solar water heating is enabled and OFF (solar power too low)"
            }
            HeaterStatus::OffBatterySocTooLow => {
                "solar water heating is enabled and OFF (battery SOC too low)"
            }
        }
    }
}

impl fmt::Display for HeaterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// What to emit for one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emission {
    /// Relay command, written unconditionally
    pub command: bool,
    /// Status transition, present only on change
    pub status: Option<HeaterStatus>,
}

/// Holds the last emitted evaluation for change detection
#[derive(Debug, Clone, Default)]
pub struct OutputDebouncer {
    last: Option<Evaluation>,
}

impl OutputDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Evaluation> {
        self.last
    }

    pub fn debounce(&mut self, eval: Evaluation) -> Emission {
        let changed = self.last != Some(eval);
        self.last = Some(eval);
        Emission {
            command: eval.heater_on,
            status: changed.then(|| HeaterStatus::from_evaluation(&eval)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(enabled: bool, permit: Permit, heater_on: bool) -> Evaluation {
        Evaluation {
            enabled,
            permit,
            heater_on,
        }
    }

    #[test]
    fn first_evaluation_always_reports() {
        let mut d = OutputDebouncer::new();
        let out = d.debounce(eval(true, Permit::Withheld, false));
        assert!(!out.command);
        assert_eq!(out.status, Some(HeaterStatus::OffBatterySocTooLow));
    }

    #[test]
    fn repeated_evaluation_is_silent_but_commands() {
        let mut d = OutputDebouncer::new();
        let e = eval(true, Permit::Granted, true);
        d.debounce(e);
        let held = d.last();
        for _ in 0..3 {
            let out = d.debounce(e);
            assert!(out.command);
            assert_eq!(out.status, None);
            assert_eq!(d.last(), held);
        }
    }

    #[test]
    fn permit_change_alone_reports() {
        let mut d = OutputDebouncer::new();
        d.debounce(eval(true, Permit::Withheld, false));
        let out = d.debounce(eval(true, Permit::Granted, false));
        assert_eq!(out.status, Some(HeaterStatus::OffSolarPowerTooLow));
    }

    #[test]
    fn status_texts() {
        assert_eq!(
            HeaterStatus::from_evaluation(&eval(false, Permit::Granted, false)).to_string(),
            "solar water heating is disabled"
        );
        assert_eq!(
            HeaterStatus::On.to_string(),
            "solar water heating is enabled and ON"
        );
        assert_eq!(
            HeaterStatus::OffSolarPowerTooLow.to_string(),
            "solar water heating is enabled and OFF (solar power too low)"
        );
        assert_eq!(
            HeaterStatus::OffBatterySocTooLow.to_string(),
            "solar water heating is enabled and OFF (battery SOC too low)"
        );
    }
}
