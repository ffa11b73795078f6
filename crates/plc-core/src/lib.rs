//! plc-core: shared foundation for the soft PLC.
//!
//! Contains:
//! - params (parameter addressing `instance.param`, flat parameter maps)
//! - numeric (Real + finiteness and significance checks)
//! - ids (compact arena indices for graph nodes)
//! - units (uom SI types + constructors for the physical models)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod params;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use params::{ParamAddr, ParamMap, ParamValue};
