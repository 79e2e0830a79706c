//! Physical constants for neutron optics.
//!
//! Wave-vector conversions follow the usual neutron scattering convention with wave vectors in Å⁻¹ and
//! velocities in m/s.
use std::f64::consts::PI;

/// Neutron rest mass in kg (CODATA 2018)
pub const NEUTRON_MASS: f64 = 1.674_927_498_04e-27;
/// Reduced Planck constant in J·s
pub const HBAR: f64 = 1.054_571_817e-34;
/// Conversion factor velocity (m/s) → wave vector (Å⁻¹)
pub const V2K: f64 = NEUTRON_MASS / HBAR * 1.0e-10;
/// Conversion factor wave vector (Å⁻¹) → velocity (m/s)
pub const K2V: f64 = 1.0 / V2K;
/// Reference velocity (m/s) at which thermal absorption cross sections are tabulated
pub const REFERENCE_VELOCITY: f64 = 2200.0;

/// Convert a neutron velocity (m/s) into its de Broglie wavelength in meters.
///
/// Returns infinity for a zero velocity.
#[must_use]
pub fn velocity_to_wavelength(velocity: f64) -> f64 {
    2.0 * PI / (velocity.abs() * V2K) * 1.0e-10
}
/// Convert a de Broglie wavelength in meters into the neutron velocity in m/s.
#[must_use]
pub fn wavelength_to_velocity(wavelength: f64) -> f64 {
    2.0 * PI / (wavelength * 1.0e10) * K2V
}
