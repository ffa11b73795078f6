//! SI quantities used by the physical process models.

use uom::si::f64::{
    Area as UomArea, Length as UomLength, Time as UomTime, Velocity as UomVelocity,
    Volume as UomVolume, VolumeRate as UomVolumeRate,
};

pub type Area = UomArea;
pub type Length = UomLength;
pub type Time = UomTime;
pub type Velocity = UomVelocity;
pub type Volume = UomVolume;
pub type VolumeRate = UomVolumeRate;

#[inline]
pub fn m2(v: f64) -> Area {
    use uom::si::area::square_meter;
    Area::new::<square_meter>(v)
}

#[inline]
pub fn mps(v: f64) -> Velocity {
    use uom::si::velocity::meter_per_second;
    Velocity::new::<meter_per_second>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

/// Flow in cubic metres per second.
#[inline]
pub fn m3ps(v: f64) -> VolumeRate {
    use uom::si::volume_rate::cubic_meter_per_second;
    VolumeRate::new::<cubic_meter_per_second>(v)
}

pub mod constants {
    /// Standard gravity in m/s².
    pub const GRAVITY_MPS2: f64 = 9.81;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_times_time_is_volume() {
        let q = m2(0.06) * mps(3.0);
        let v: Volume = q * s(0.5);
        assert!((v.value - 0.09).abs() < 1e-12);
    }

    #[test]
    fn volume_over_area_is_length() {
        let v: Volume = m3ps(0.2) * s(1.0);
        let h: Length = v / m2(0.5);
        assert!((h.value - 0.4).abs() < 1e-12);
    }
}
