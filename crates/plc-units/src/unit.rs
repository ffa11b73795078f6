//! The capability every computational unit exposes to the engine.

use std::fmt;

use plc_core::{ParamAddr, ParamMap, Real};

use crate::error::UnitResult;
use crate::params::{Bucket, ParamSet};

/// What a unit simulates, which decides how the engine executes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// Physical-process model, advanced by the cycle's step size.
    Model,
    /// Control algorithm with its own fixed sampling.
    Algorithm,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnitKind::Model => "model",
            UnitKind::Algorithm => "algorithm",
        })
    }
}

/// A stateful computational unit.
///
/// Everything the engine reads or writes lives in the unit's [`ParamSet`].
/// State a unit keeps outside its parameters (a PID's integral accumulator)
/// is private to it and only visible through [`Unit::internal_state`].
pub trait Unit: Send + fmt::Debug {
    /// Type tag the unit was registered under.
    fn type_tag(&self) -> &str;

    fn kind(&self) -> UnitKind;

    fn params(&self) -> &ParamSet;

    fn params_mut(&mut self) -> &mut ParamSet;

    /// Advance the unit by one execution.
    ///
    /// Models receive `Some(step)` in seconds; algorithms receive `None`.
    fn execute(&mut self, step: Option<Real>) -> UnitResult<()>;

    /// Names of the parameters that vary at runtime and are worth storing.
    fn storable(&self) -> &[&'static str];

    /// Diagnostic view of private state. Never published.
    fn internal_state(&self) -> ParamMap {
        ParamMap::new()
    }

    /// Route an external write to the input or config bucket.
    fn set_param(&mut self, name: &str, value: Real) -> Bucket {
        self.params_mut().set(name, value)
    }

    /// Storable parameters keyed `instance.param`.
    fn storable_params(&self, instance: &str) -> ParamMap {
        let params = self.params();
        self.storable()
            .iter()
            .filter_map(|&name| {
                params
                    .get(name)
                    .map(|v| (ParamAddr::new(instance, name).key(), v))
            })
            .collect()
    }
}

/// Unwrap the step a model was given.
pub(crate) fn require_step(type_tag: &str, step: Option<Real>) -> UnitResult<Real> {
    step.ok_or_else(|| crate::error::UnitError::MissingStep {
        type_tag: type_tag.to_string(),
    })
}
