//! Type-tag registry of unit factories.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use plc_core::{ParamMap, Real};

use crate::error::{UnitError, UnitResult};
use crate::params::ParamSet;
use crate::pid::{self, Pid};
use crate::tank::{self, CylindricalTank};
use crate::unit::{Unit, UnitKind};
use crate::valve::{self, Valve};

/// Construction inputs handed to a factory.
#[derive(Debug, Clone, Copy)]
pub struct UnitSpec<'a> {
    /// Initial values for any declared parameter, from any bucket.
    pub params: &'a ParamMap,
    /// Cycle period of the configuration the unit is built for (seconds).
    pub cycle_period: Real,
}

type Factory = dyn Fn(&UnitSpec<'_>) -> UnitResult<Box<dyn Unit>> + Send + Sync;

/// Maps type tags (`PID`, `cylindrical_tank`, `valve`, ...) to factories.
///
/// The default registry holds the built-in units; embedding code can
/// register more with [`UnitRegistry::register`].
#[derive(Clone)]
pub struct UnitRegistry {
    factories: BTreeMap<String, Arc<Factory>>,
}

impl UnitRegistry {
    /// Registry without any unit type.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the built-in units.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(pid::TYPE_TAG, |spec| {
            Ok(Box::new(Pid::new(spec.params, spec.cycle_period)?))
        });
        registry.register(tank::TYPE_TAG, |spec| {
            Ok(Box::new(CylindricalTank::new(spec.params)?))
        });
        registry.register(valve::TYPE_TAG, |spec| Ok(Box::new(Valve::new(spec.params)?)));
        registry
    }

    /// Register (or replace) the factory for `type_tag`.
    pub fn register<F>(&mut self, type_tag: impl Into<String>, factory: F)
    where
        F: Fn(&UnitSpec<'_>) -> UnitResult<Box<dyn Unit>> + Send + Sync + 'static,
    {
        self.factories.insert(type_tag.into(), Arc::new(factory));
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.factories.contains_key(type_tag)
    }

    pub fn type_tags(&self) -> impl Iterator<Item = &str> + '_ {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(
        &self,
        type_tag: &str,
        params: &ParamMap,
        cycle_period: Real,
    ) -> UnitResult<Box<dyn Unit>> {
        let factory = self
            .factories
            .get(type_tag)
            .ok_or_else(|| UnitError::UnknownType {
                type_tag: type_tag.to_string(),
            })?;
        factory(&UnitSpec {
            params,
            cycle_period,
        })
    }

    /// Parameters a type declares, with their default values.
    pub fn declared_params(&self, type_tag: &str) -> UnitResult<ParamSet> {
        Ok(self.create(type_tag, &ParamMap::new(), 0.0)?.params().clone())
    }

    pub fn kind(&self, type_tag: &str) -> UnitResult<UnitKind> {
        Ok(self.create(type_tag, &ParamMap::new(), 0.0)?.kind())
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}
