//! PID control algorithm.
//!
//! Positional PID with rectangular integration, a bounded integral
//! accumulator, and conditional-integration anti-windup:
//!
//! ```text
//! e  = sv - pv
//! p  = kp * e
//! I += e * sample_time            (only when ti > EPSILON)
//! i  = (kp / ti) * I
//! d  = kp * td * (e - e_prev) / sample_time   (0 on the first execution)
//! mv = clamp(p + i + d, l, h)
//! ```
//!
//! When the output saturates in the direction the error pushes it, this
//! execution's integral increment is reverted and the output recomputed.

use plc_core::{EPSILON, ParamMap, Real, ensure_finite, is_significant};

use crate::error::{UnitError, UnitResult};
use crate::params::ParamSet;
use crate::unit::{Unit, UnitKind};

pub const TYPE_TAG: &str = "PID";

const STORABLE: &[&str] = &["kp", "ti", "td", "pv", "sv", "mv"];

const DEFAULT_SAMPLE_TIME: Real = 0.5;

/// Operating mode written to the `mode` output. Manual mode is accepted at
/// construction but never computed differently.
pub const MODE_AUTO: Real = 1.0;

#[derive(Debug, Clone)]
pub struct Pid {
    params: ParamSet,
    integral: Real,
    last_error: Real,
    first_run: bool,
    unclamped: Real,
}

impl Pid {
    /// Declared parameters with their default values.
    pub fn default_params(sample_time: Real) -> ParamSet {
        ParamSet::new()
            .with_config("kp", 12.0)
            .with_config("ti", 30.0)
            .with_config("td", 0.15)
            .with_config("h", 100.0)
            .with_config("l", 0.0)
            .with_config("sample_time", sample_time)
            .with_input("pv", 0.0)
            .with_input("sv", 0.0)
            .with_output("mv", 0.0)
            .with_output("mode", MODE_AUTO)
    }

    /// Build a controller from initial values.
    ///
    /// `sample_time` falls back to `cycle_period` (when positive) before the
    /// built-in default.
    pub fn new(initial: &ParamMap, cycle_period: Real) -> UnitResult<Self> {
        let sample_time = if cycle_period > 0.0 {
            cycle_period
        } else {
            DEFAULT_SAMPLE_TIME
        };
        let mut params = Self::default_params(sample_time);
        params.apply_initial(TYPE_TAG, initial);
        validate(&params)?;

        tracing::info!(
            kp = params.config_value("kp"),
            ti = params.config_value("ti"),
            td = params.config_value("td"),
            l = params.config_value("l"),
            h = params.config_value("h"),
            sample_time = params.config_value("sample_time"),
            "PID initialized"
        );

        Ok(Self {
            params,
            integral: 0.0,
            last_error: 0.0,
            first_run: true,
            unclamped: 0.0,
        })
    }

    pub fn integral(&self) -> Real {
        self.integral
    }

    pub fn last_error(&self) -> Real {
        self.last_error
    }
}

fn validate(params: &ParamSet) -> UnitResult<()> {
    let sample_time = params.config_value("sample_time");
    if sample_time <= 0.0 {
        return Err(UnitError::InvalidParam {
            name: "sample_time",
            value: sample_time,
            what: "must be positive",
        });
    }
    let (h, l) = (params.config_value("h"), params.config_value("l"));
    if h <= l {
        return Err(UnitError::InvalidArg {
            what: "output upper limit h must be greater than lower limit l",
        });
    }
    let ti = params.config_value("ti");
    if ti < 0.0 {
        return Err(UnitError::InvalidParam {
            name: "ti",
            value: ti,
            what: "must not be negative",
        });
    }
    let td = params.config_value("td");
    if td < 0.0 {
        return Err(UnitError::InvalidParam {
            name: "td",
            value: td,
            what: "must not be negative",
        });
    }
    let mode = params.output_value("mode");
    if mode != 0.0 && mode != 1.0 {
        return Err(UnitError::InvalidParam {
            name: "mode",
            value: mode,
            what: "must be 0 (manual) or 1 (auto)",
        });
    }
    Ok(())
}

/// Bound on the integral accumulator, `(h - l) * ti^2 / (kp * sample_time)`.
fn integral_limit(kp: Real, ti: Real, h: Real, l: Real, sample_time: Real) -> Real {
    if is_significant(ti) && is_significant(kp) && is_significant(sample_time) {
        (h - l) * ti / kp * ti / sample_time
    } else {
        Real::INFINITY
    }
}

// Tolerates l > h after a runtime write instead of panicking like `clamp`.
fn limit(v: Real, l: Real, h: Real) -> Real {
    l.max(h.min(v))
}

impl Unit for Pid {
    fn type_tag(&self) -> &str {
        TYPE_TAG
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Algorithm
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn execute(&mut self, _step: Option<Real>) -> UnitResult<()> {
        let p = &self.params;
        let kp = p.config_value("kp");
        let ti = p.config_value("ti");
        let td = p.config_value("td");
        let h = p.config_value("h");
        let l = p.config_value("l");
        let pv = ensure_finite(p.input_value("pv"), "pv")?;
        let sv = ensure_finite(p.input_value("sv"), "sv")?;

        let mut sample_time = p.config_value("sample_time");
        if sample_time <= 0.0 {
            tracing::error!(sample_time, "invalid PID sample_time, substituting epsilon");
            sample_time = EPSILON;
        }

        let error = sv - pv;
        let p_term = kp * error;

        let integrating = is_significant(ti);
        let increment = if integrating { error * sample_time } else { 0.0 };
        let mut i_term = 0.0;
        if integrating {
            let bound = integral_limit(kp, ti, h, l, sample_time);
            self.integral = (self.integral + increment).max(-bound).min(bound);
            i_term = kp / ti * self.integral;
        }

        let d_term = if self.first_run {
            self.first_run = false;
            0.0
        } else if is_significant(sample_time) {
            kp * td * (error - self.last_error) / sample_time
        } else {
            0.0
        };

        let mut unclamped = p_term + i_term + d_term;
        let mut mv = limit(unclamped, l, h);

        if integrating && ((mv >= h && error > 0.0) || (mv <= l && error < 0.0)) {
            self.integral -= increment;
            i_term = kp / ti * self.integral;
            unclamped = p_term + i_term + d_term;
            mv = limit(unclamped, l, h);
        }

        self.unclamped = unclamped;
        self.last_error = error;
        self.params.output.insert("mv".to_string(), mv);
        self.params.output.insert("mode".to_string(), MODE_AUTO);

        tracing::debug!(pv, sv, error, mv, "PID executed");
        Ok(())
    }

    fn storable(&self) -> &[&'static str] {
        STORABLE
    }

    fn internal_state(&self) -> ParamMap {
        ParamMap::from([
            ("integral".to_string(), self.integral),
            ("last_error".to_string(), self.last_error),
            ("mv_unclamped".to_string(), self.unclamped),
        ])
    }
}
