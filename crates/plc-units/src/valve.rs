//! Valve with a finite stroke rate.
//!
//! A new target opening is not reached instantly: the valve travels toward
//! it at `(max_opening - min_opening) / full_travel_time` percent per second.

use plc_core::{ParamMap, Real};

use crate::error::{UnitError, UnitResult};
use crate::params::ParamSet;
use crate::unit::{Unit, UnitKind, require_step};

pub const TYPE_TAG: &str = "valve";

/// Distance below which the valve snaps onto its target.
pub const PRECISION: Real = 0.01;

const STORABLE: &[&str] = &["current_opening", "target_opening"];

#[derive(Debug, Clone)]
pub struct Valve {
    params: ParamSet,
}

impl Valve {
    pub fn default_params() -> ParamSet {
        ParamSet::new()
            .with_config("min_opening", 0.0)
            .with_config("max_opening", 100.0)
            .with_config("full_travel_time", 5.0)
            .with_input("target_opening", 0.0)
            .with_output("current_opening", 0.0)
    }

    /// Build a valve. Unless given explicitly, both the current and the
    /// target opening start at `min_opening`.
    pub fn new(initial: &ParamMap) -> UnitResult<Self> {
        let mut params = Self::default_params();
        params.apply_initial(TYPE_TAG, initial);

        let min = params.config_value("min_opening");
        let max = params.config_value("max_opening");
        if min >= max {
            return Err(UnitError::InvalidArg {
                what: "min_opening must be less than max_opening",
            });
        }
        let travel = params.config_value("full_travel_time");
        if travel <= 0.0 {
            return Err(UnitError::InvalidParam {
                name: "full_travel_time",
                value: travel,
                what: "must be positive",
            });
        }
        if !initial.contains_key("current_opening") {
            params.output.insert("current_opening".to_string(), min);
        }
        if !initial.contains_key("target_opening") {
            params.input.insert("target_opening".to_string(), min);
        }

        tracing::info!(min, max, full_travel_time = travel, "valve initialized");
        Ok(Self { params })
    }
}

impl Unit for Valve {
    fn type_tag(&self) -> &str {
        TYPE_TAG
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Model
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn execute(&mut self, step: Option<Real>) -> UnitResult<()> {
        let step = require_step(TYPE_TAG, step)?;
        if step <= 0.0 {
            return Err(UnitError::InvalidParam {
                name: "step",
                value: step,
                what: "must be positive",
            });
        }

        let min = self.params.config_value("min_opening");
        let max = self.params.config_value("max_opening");
        let travel = self.params.config_value("full_travel_time");
        let target = self.params.input_value("target_opening").max(min).min(max);
        let current = self.params.output_value("current_opening");
        self.params.input.insert("target_opening".to_string(), target);

        let diff = target - current;
        let next = if diff.abs() < PRECISION {
            target
        } else {
            let max_change = (max - min) / travel * step;
            (current + diff.max(-max_change).min(max_change)).max(min).min(max)
        };
        self.params.output.insert("current_opening".to_string(), next);

        tracing::debug!(target, current_opening = next, "valve executed");
        Ok(())
    }

    fn storable(&self) -> &[&'static str] {
        STORABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valve(values: &[(&str, Real)]) -> Valve {
        let initial: ParamMap = values.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        Valve::new(&initial).unwrap()
    }

    fn opening(v: &Valve) -> Real {
        v.params().output_value("current_opening")
    }

    #[test]
    fn travels_at_stroke_rate() {
        let mut v = valve(&[("target_opening", 100.0)]);
        v.execute(Some(0.5)).unwrap();
        assert_eq!(opening(&v), 10.0);
        for _ in 0..9 {
            v.execute(Some(0.5)).unwrap();
        }
        assert_eq!(opening(&v), 100.0);
    }

    #[test]
    fn closes_toward_lower_target() {
        let mut v = valve(&[("current_opening", 50.0), ("target_opening", 45.0)]);
        v.execute(Some(0.5)).unwrap();
        assert_eq!(opening(&v), 45.0);
    }

    #[test]
    fn snaps_within_precision() {
        let mut v = valve(&[("current_opening", 50.0), ("target_opening", 50.005)]);
        v.execute(Some(0.5)).unwrap();
        assert_eq!(opening(&v), 50.005);
    }

    #[test]
    fn target_is_clamped_to_range() {
        let mut v = valve(&[
            ("min_opening", 10.0),
            ("max_opening", 60.0),
            ("target_opening", 500.0),
        ]);
        assert_eq!(opening(&v), 10.0);
        v.execute(Some(100.0)).unwrap();
        assert_eq!(v.params().input_value("target_opening"), 60.0);
        assert_eq!(opening(&v), 60.0);
    }

    #[test]
    fn starts_at_min_opening() {
        let v = valve(&[("min_opening", 20.0)]);
        assert_eq!(opening(&v), 20.0);
        assert_eq!(v.params().input_value("target_opening"), 20.0);
    }

    #[test]
    fn invalid_construction() {
        for values in [
            vec![("min_opening", 50.0), ("max_opening", 50.0)],
            vec![("full_travel_time", 0.0)],
        ] {
            let initial: ParamMap = values.iter().map(|(k, v)| (k.to_string(), *v)).collect();
            assert!(Valve::new(&initial).is_err());
        }
    }

    #[test]
    fn nonpositive_step_is_an_error() {
        let mut v = valve(&[]);
        assert!(v.execute(Some(0.0)).is_err());
        assert!(v.execute(None).is_err());
    }
}
