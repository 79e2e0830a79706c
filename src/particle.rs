#![warn(missing_docs)]
//! Module for handling neutrons travelling through the mirror assembly
use std::fmt::Display;

use nalgebra::{Point3, Vector3};
use num::Zero;
use serde::{Deserialize, Serialize};
use uom::si::{
    f64::{Length, Time, Velocity},
    length::meter,
    time::second,
    velocity::meter_per_second,
};

use crate::{
    constants::velocity_to_wavelength,
    error::{NmoError, NmoResult},
    meter, second,
};

/// Location of a [`Particle`] with respect to a mirror substrate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubstrateState {
    /// The particle currently traverses a substrate wafer.
    InSubstrate,
    /// The particle propagates in vacuum.
    InVacuum,
    /// Substrate transport is not modelled for this particle.
    #[default]
    Untracked,
}

/// Struct that contains all information about a neutron
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Particle {
    /// current position
    pos: Point3<Length>,
    /// velocity in m/s
    vel: Vector3<f64>,
    /// spin (polarization) vector. Mirrors are non-magnetic and leave it untouched.
    spin: Vector3<f64>,
    /// statistical weight
    w: f64,
    substrate: SubstrateState,
    absorbed: bool,
    /// elapsed flight time since creation
    t: Time,
}
impl Particle {
    /// Creates a new [`Particle`] with unit weight and zero spin.
    ///
    /// # Errors
    /// This function returns an error if
    ///  - any position coordinate is not finite
    ///  - any velocity component is not finite or the velocity is zero
    pub fn new(position: Point3<Length>, velocity: Vector3<f64>) -> NmoResult<Self> {
        Self::with_weight(position, velocity, 1.0)
    }
    /// Creates a new [`Particle`] with a given statistical weight.
    ///
    /// # Errors
    /// This function returns an error if
    ///  - any position coordinate is not finite
    ///  - any velocity component is not finite or the velocity is zero
    ///  - the weight is negative or not finite
    pub fn with_weight(
        position: Point3<Length>,
        velocity: Vector3<f64>,
        weight: f64,
    ) -> NmoResult<Self> {
        if position.iter().any(|c| !c.is_finite()) {
            return Err(NmoError::Other("position must be finite".into()));
        }
        if velocity.iter().any(|c| !c.is_finite()) || velocity.norm().is_zero() {
            return Err(NmoError::Other(
                "velocity must be finite and non-zero".into(),
            ));
        }
        if weight.is_sign_negative() || !weight.is_finite() {
            return Err(NmoError::Other("weight must be >=0.0 and finite".into()));
        }
        Ok(Self {
            pos: position,
            vel: velocity,
            spin: Vector3::zeros(),
            w: weight,
            substrate: SubstrateState::default(),
            absorbed: false,
            t: Time::zero(),
        })
    }
    /// Returns the position of this [`Particle`].
    #[must_use]
    pub fn position(&self) -> Point3<Length> {
        self.pos
    }
    /// Returns the position of this [`Particle`] in meters as plain numbers.
    #[must_use]
    pub fn position_m(&self) -> Point3<f64> {
        self.pos.map(|c| c.get::<meter>())
    }
    /// Returns the velocity of this [`Particle`] in m/s.
    #[must_use]
    pub const fn velocity(&self) -> Vector3<f64> {
        self.vel
    }
    /// Sets the velocity of this [`Particle`].
    ///
    /// # Errors
    ///
    /// This function will return an error if the velocity is zero or not finite.
    pub fn set_velocity(&mut self, velocity: Vector3<f64>) -> NmoResult<()> {
        if velocity.iter().any(|c| !c.is_finite()) || velocity.norm().is_zero() {
            return Err(NmoError::Other(
                "velocity must be finite and non-zero".into(),
            ));
        }
        self.vel = velocity;
        Ok(())
    }
    /// Returns the speed (absolute velocity) of this [`Particle`].
    #[must_use]
    pub fn speed(&self) -> Velocity {
        Velocity::new::<meter_per_second>(self.vel.norm())
    }
    /// Returns the de Broglie wavelength of this [`Particle`].
    #[must_use]
    pub fn wavelength(&self) -> Length {
        meter!(velocity_to_wavelength(self.vel.norm()))
    }
    /// Returns the spin vector of this [`Particle`].
    #[must_use]
    pub const fn spin(&self) -> Vector3<f64> {
        self.spin
    }
    /// Sets the spin vector of this [`Particle`].
    pub fn set_spin(&mut self, spin: Vector3<f64>) {
        self.spin = spin;
    }
    /// Returns the statistical weight of this [`Particle`].
    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.w
    }
    /// Multiply the statistical weight by the given factor.
    ///
    /// Factors outside `[0.0, 1.0]` (or `NaN`) are clamped to this range, since optical elements can only remove weight.
    pub fn attenuate(&mut self, factor: f64) {
        let factor = if factor.is_nan() {
            0.0
        } else {
            factor.clamp(0.0, 1.0)
        };
        self.w *= factor;
    }
    /// Returns the elapsed flight time of this [`Particle`].
    #[must_use]
    pub fn time(&self) -> Time {
        self.t
    }
    /// Returns the substrate state of this [`Particle`].
    #[must_use]
    pub const fn substrate_state(&self) -> SubstrateState {
        self.substrate
    }
    /// Sets the substrate state of this [`Particle`].
    pub fn set_substrate_state(&mut self, state: SubstrateState) {
        self.substrate = state;
    }
    /// Returns `true` if this [`Particle`] has been absorbed.
    #[must_use]
    pub const fn absorbed(&self) -> bool {
        self.absorbed
    }
    /// Marks this [`Particle`] as absorbed. This is a terminal state.
    pub fn absorb(&mut self) {
        self.absorbed = true;
    }
    /// Propagate the particle freely along its velocity for the given time.
    ///
    /// # Errors
    /// This functions returns an error if the propagation time is not finite.
    pub fn propagate(&mut self, time: Time) -> NmoResult<()> {
        if !time.is_finite() {
            return Err(NmoError::Other("propagation time must be finite".into()));
        }
        let dt = time.get::<second>();
        let new_pos = self.position_m() + dt * self.vel;
        self.pos = meter!(new_pos.x, new_pos.y, new_pos.z);
        self.t += time;
        Ok(())
    }
    /// Returns the position at which this particle would be after the given time (in seconds) without moving it.
    #[must_use]
    pub fn position_after(&self, dt: f64) -> Point3<f64> {
        self.position_m() + dt * self.vel
    }
    /// Returns `true` if position, velocity and weight contain only finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.pos.iter().all(|c| c.is_finite())
            && self.vel.iter().all(|c| c.is_finite())
            && self.w.is_finite()
            && self.t.is_finite()
    }
    /// Move the particle to `position` (in meters) and advance its elapsed time by `elapsed` seconds.
    pub(crate) fn place(&mut self, position: Point3<f64>, elapsed: f64) {
        self.pos = meter!(position.x, position.y, position.z);
        self.t += second!(elapsed);
    }
}
impl Display for Particle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let m = Length::format_args(meter, uom::fmt::DisplayStyle::Abbreviation);
        write!(
            f,
            "pos: ({}, {}, {}), vel: ({}, {}, {}) m/s, weight: {:.6}, absorbed: {}",
            m.with(self.pos[0]),
            m.with(self.pos[1]),
            m.with(self.pos[2]),
            self.vel[0],
            self.vel[1],
            self.vel[2],
            self.w,
            self.absorbed
        )
    }
}
#[cfg(test)]
mod test {
    use super::*;
    use crate::millimeter;
    use approx::assert_relative_eq;
    use nalgebra::vector;
    use uom::si::length::angstrom;

    #[test]
    fn new() {
        let pos = millimeter!(1.0, 2.0, 3.0);
        let vel = vector![0.0, 0.0, 1000.0];
        let p = Particle::new(pos, vel).unwrap();
        assert_eq!(p.position(), pos);
        assert_eq!(p.velocity(), vel);
        assert_eq!(p.weight(), 1.0);
        assert_eq!(p.time(), Time::zero());
        assert_eq!(p.spin(), Vector3::zeros());
        assert_eq!(p.substrate_state(), SubstrateState::Untracked);
        assert!(!p.absorbed());
        assert!(Particle::new(millimeter!(f64::NAN, 0.0, 0.0), vel).is_err());
        assert!(Particle::new(pos, Vector3::zeros()).is_err());
        assert!(Particle::new(pos, vector![f64::INFINITY, 0.0, 1.0]).is_err());
        assert!(Particle::with_weight(pos, vel, -0.1).is_err());
        assert!(Particle::with_weight(pos, vel, f64::NAN).is_err());
        assert!(Particle::with_weight(pos, vel, 0.0).is_ok());
    }
    #[test]
    fn set_velocity() {
        let mut p = Particle::new(Point3::origin(), vector![0.0, 0.0, 1.0]).unwrap();
        assert!(p.set_velocity(Vector3::zeros()).is_err());
        p.set_velocity(vector![1.0, 0.0, 0.0]).unwrap();
        assert_eq!(p.velocity(), vector![1.0, 0.0, 0.0]);
    }
    #[test]
    fn wavelength() {
        let p = Particle::new(Point3::origin(), vector![0.0, 0.0, 2200.0]).unwrap();
        assert_relative_eq!(p.wavelength().get::<angstrom>(), 1.798, max_relative = 1.0e-3);
        assert_relative_eq!(p.speed().get::<meter_per_second>(), 2200.0);
    }
    #[test]
    fn propagate() {
        let mut p = Particle::new(Point3::origin(), vector![0.0, 100.0, 1000.0]).unwrap();
        assert!(p.propagate(second!(f64::NAN)).is_err());
        p.propagate(second!(1.0e-3)).unwrap();
        assert_relative_eq!(p.position().y.get::<meter>(), 0.1);
        assert_relative_eq!(p.position().z.get::<meter>(), 1.0);
        assert_relative_eq!(p.time().get::<second>(), 1.0e-3);
        p.propagate(second!(1.0e-3)).unwrap();
        assert_relative_eq!(p.position().z.get::<meter>(), 2.0);
        assert_relative_eq!(p.time().get::<second>(), 2.0e-3);
    }
    #[test]
    fn attenuate() {
        let mut p = Particle::new(Point3::origin(), vector![0.0, 0.0, 1.0]).unwrap();
        p.attenuate(0.5);
        assert_eq!(p.weight(), 0.5);
        p.attenuate(2.0);
        assert_eq!(p.weight(), 0.5);
        p.attenuate(f64::NAN);
        assert_eq!(p.weight(), 0.0);
    }
    #[test]
    fn absorb() {
        let mut p = Particle::new(Point3::origin(), vector![0.0, 0.0, 1.0]).unwrap();
        p.absorb();
        assert!(p.absorbed());
    }
    #[test]
    fn display() {
        let p = Particle::new(Point3::origin(), vector![0.0, 0.0, 1.0]).unwrap();
        assert_eq!(
            format!("{p}"),
            "pos: (0 m, 0 m, 0 m), vel: (0, 0, 1) m/s, weight: 1.000000, absorbed: false"
        );
    }
}
