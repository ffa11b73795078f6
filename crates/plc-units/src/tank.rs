//! Cylindrical tank with a valve-controlled inlet and a free outlet.
//!
//! The inlet sits at the top of the tank and delivers
//! `inlet_area * inlet_velocity * opening/100`. The outlet at the bottom
//! drains following Torricelli's law, `outlet_area * sqrt(2 g level)`.

use std::f64::consts::PI;

use plc_core::units::{self, Area, Length, Volume, VolumeRate, constants::GRAVITY_MPS2};
use plc_core::{ParamMap, Real, ensure_finite};

use crate::error::{UnitError, UnitResult};
use crate::params::ParamSet;
use crate::unit::{Unit, UnitKind, require_step};

pub const TYPE_TAG: &str = "cylindrical_tank";

const STORABLE: &[&str] = &["level", "valve_opening"];

#[derive(Debug, Clone)]
pub struct CylindricalTank {
    params: ParamSet,
}

impl CylindricalTank {
    pub fn default_params() -> ParamSet {
        ParamSet::new()
            .with_config("height", 2.0)
            .with_config("radius", 0.5)
            .with_config("inlet_area", 0.06)
            .with_config("inlet_velocity", 3.0)
            .with_config("outlet_area", 0.001)
            .with_input("valve_opening", 0.0)
            .with_output("level", 0.0)
    }

    /// Build a tank from initial values. `initial_level` is accepted as an
    /// alias of `level`; an explicit `level` (a restored snapshot) wins.
    pub fn new(initial: &ParamMap) -> UnitResult<Self> {
        let mut initial = initial.clone();
        if let Some(level) = initial.remove("initial_level") {
            initial.entry("level".to_string()).or_insert(level);
        }
        let mut params = Self::default_params();
        params.apply_initial(TYPE_TAG, &initial);

        for name in ["height", "radius"] {
            let value = params.config_value(name);
            if value <= 0.0 {
                return Err(UnitError::InvalidParam {
                    name,
                    value,
                    what: "must be positive",
                });
            }
        }

        tracing::info!(
            height = params.config_value("height"),
            radius = params.config_value("radius"),
            level = params.output_value("level"),
            "cylindrical tank initialized"
        );
        Ok(Self { params })
    }

    fn base_area(&self) -> Area {
        let r = self.params.config_value("radius");
        units::m2(PI * r * r)
    }

    fn inflow(&self, opening: Real) -> VolumeRate {
        let area = units::m2(self.params.config_value("inlet_area"));
        let velocity = units::mps(self.params.config_value("inlet_velocity"));
        area * velocity * (opening / 100.0)
    }

    fn outflow(&self, level: Real) -> VolumeRate {
        if level <= 0.0 {
            return units::m3ps(0.0);
        }
        let area = units::m2(self.params.config_value("outlet_area"));
        area * units::mps((2.0 * GRAVITY_MPS2 * level).sqrt())
    }
}

impl Unit for CylindricalTank {
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
        let step = units::s(require_step(TYPE_TAG, step)?);
        let opening = self.params.input_value("valve_opening").clamp(0.0, 100.0);
        let level = self.params.output_value("level");

        let inflow = self.inflow(opening);
        let outflow = self.outflow(level);
        let volume: Volume = (inflow - outflow) * step;
        let change: Length = volume / self.base_area();

        let height = self.params.config_value("height");
        let next = ensure_finite(level + change.value, "tank level")?
            .max(0.0)
            .min(height);
        self.params.output.insert("level".to_string(), next);

        tracing::debug!(
            opening,
            level = next,
            inflow = inflow.value,
            outflow = outflow.value,
            "tank executed"
        );
        Ok(())
    }

    fn storable(&self) -> &[&'static str] {
        STORABLE
    }
}
