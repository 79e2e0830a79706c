#![warn(missing_docs)]
//! Neutron transport through the substrate wafer of a mirror.
//!
//! Neutrons which are not reflected by a coating may enter the (silicon) substrate. The interface is treated as locally
//! planar: the tangential velocity is conserved while the normal component is changed by the optical (Fermi) potential
//! of the substrate. Inside, the weight is attenuated by absorption and incoherent scattering.
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use uom::si::{
    area::square_meter,
    energy::joule,
    f64::{Area, Energy, Length, VolumetricNumberDensity},
    length::meter,
    volumetric_number_density::per_cubic_meter,
};

use crate::{
    barn,
    constants::{NEUTRON_MASS, REFERENCE_VELOCITY},
    electronvolt,
    error::{NmoError, NmoResult},
    millimeter,
    particle::{Particle, SubstrateState},
};

/// Result of a refraction at a substrate interface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Refraction {
    /// The neutron passes the interface with the given new velocity (in m/s).
    Transmitted(Vector3<f64>),
    /// The normal velocity is too small to overcome the optical potential.
    TotalReflection,
}

/// Material and geometry of a mirror substrate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Substrate {
    thickness: Length,
    potential: Energy,
    number_density: VolumetricNumberDensity,
    absorption_cross_section: Area,
    scattering_cross_section: Area,
}
impl Default for Substrate {
    /// A silicon wafer with a thickness of 0.3 mm.
    fn default() -> Self {
        Self {
            thickness: millimeter!(0.3),
            potential: electronvolt!(54.0e-9),
            number_density: VolumetricNumberDensity::new::<per_cubic_meter>(4.994e28),
            absorption_cross_section: barn!(0.171),
            scattering_cross_section: barn!(0.004),
        }
    }
}
impl Substrate {
    /// Creates a new [`Substrate`].
    ///
    /// `absorption_cross_section` refers to the reference velocity of 2200 m/s and is scaled with the 1/v law.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the thickness is not positive and finite
    ///   - the potential, the number density or the cross sections are negative or not finite
    pub fn new(
        thickness: Length,
        potential: Energy,
        number_density: VolumetricNumberDensity,
        absorption_cross_section: Area,
        scattering_cross_section: Area,
    ) -> NmoResult<Self> {
        let substrate = Self {
            thickness,
            potential,
            number_density,
            absorption_cross_section,
            scattering_cross_section,
        };
        substrate.validate()?;
        Ok(substrate)
    }
    /// Creates a silicon [`Substrate`] with the given thickness.
    ///
    /// # Errors
    ///
    /// This function will return an error if the thickness is not positive and finite.
    pub fn silicon(thickness: Length) -> NmoResult<Self> {
        let substrate = Self {
            thickness,
            ..Self::default()
        };
        substrate.validate()?;
        Ok(substrate)
    }
    /// Check the substrate parameters.
    ///
    /// # Errors
    ///
    /// This function will return an error if a parameter is out of its valid range.
    pub fn validate(&self) -> NmoResult<()> {
        if !self.thickness.is_finite() || self.thickness.get::<meter>() <= 0.0 {
            return Err(NmoError::Configuration(
                "substrate thickness must be > 0 and finite".into(),
            ));
        }
        let values = [
            self.potential.get::<joule>(),
            self.number_density.get::<per_cubic_meter>(),
            self.absorption_cross_section.get::<square_meter>(),
            self.scattering_cross_section.get::<square_meter>(),
        ];
        if values.iter().any(|v| !v.is_finite() || v.is_sign_negative()) {
            return Err(NmoError::Configuration(
                "substrate potential, density and cross sections must be >= 0 and finite".into(),
            ));
        }
        Ok(())
    }
    /// Returns the thickness of this [`Substrate`].
    #[must_use]
    pub fn thickness(&self) -> Length {
        self.thickness
    }
    /// Returns the optical potential of this [`Substrate`].
    #[must_use]
    pub fn potential(&self) -> Energy {
        self.potential
    }
    /// Critical normal velocity `√(2V/m_n)` (in m/s) needed to enter the substrate.
    #[must_use]
    pub fn critical_velocity(&self) -> f64 {
        f64::sqrt(2.0 * self.potential.get::<joule>() / NEUTRON_MASS)
    }
    /// Refract a velocity at an interface with the given (normalized) normal.
    ///
    /// The orientation of the normal does not matter. If `entering` is `true`, the neutron passes from vacuum into the
    /// substrate, otherwise from the substrate into vacuum.
    #[must_use]
    pub fn refract(
        &self,
        velocity: &Vector3<f64>,
        normal: &Vector3<f64>,
        entering: bool,
    ) -> Refraction {
        let v_n = velocity.dot(normal);
        let tangential = velocity - v_n * normal;
        let v_c2 = self.critical_velocity().powi(2);
        let v_n2 = if entering {
            v_n.mul_add(v_n, -v_c2)
        } else {
            v_n.mul_add(v_n, v_c2)
        };
        if v_n2 <= 0.0 || !v_n2.is_finite() {
            return Refraction::TotalReflection;
        }
        Refraction::Transmitted(tangential + v_n.signum() * v_n2.sqrt() * normal)
    }
    /// Velocity dependent attenuation coefficient `μ(v) = N·(σ_abs,2200·2200 m/s + σ_scatter·v)` (in 1/s).
    #[must_use]
    pub fn attenuation_rate(&self, speed: f64) -> f64 {
        let n = self.number_density.get::<per_cubic_meter>();
        let sigma_abs = self.absorption_cross_section.get::<square_meter>();
        let sigma_scatter = self.scattering_cross_section.get::<square_meter>();
        n * sigma_abs.mul_add(REFERENCE_VELOCITY, sigma_scatter * speed.abs())
    }
    /// Transmission `exp(−t·μ(v))` for a flight time `t` (in s) inside the substrate.
    #[must_use]
    pub fn transmission(&self, speed: f64, time: f64) -> f64 {
        f64::exp(-time * self.attenuation_rate(speed))
    }
    /// Transport a particle through the wafer.
    ///
    /// The particle is assumed to sit on the front interface at `entry` (in meters). It is refracted into the substrate,
    /// crosses the (parallel) slab and is refracted back into vacuum. On return, the particle sits on the rear interface
    /// with its weight attenuated. If the particle cannot enter the substrate, it is left untouched and
    /// [`Refraction::TotalReflection`] is returned.
    ///
    /// # Errors
    ///
    /// This function will return an error if the resulting velocity is not valid.
    pub fn transit(
        &self,
        particle: &mut Particle,
        entry: Point3<f64>,
        normal: &Vector3<f64>,
    ) -> NmoResult<Refraction> {
        let velocity = particle.velocity();
        let Refraction::Transmitted(inside) = self.refract(&velocity, normal, true) else {
            return Ok(Refraction::TotalReflection);
        };
        particle.set_substrate_state(SubstrateState::InSubstrate);
        let v_n = inside.dot(normal).abs();
        let time = self.thickness.get::<meter>() / v_n;
        let exit = entry + time * inside;
        particle.attenuate(self.transmission(inside.norm(), time));
        particle.place(exit, time);
        let outside = match self.refract(&inside, normal, false) {
            Refraction::Transmitted(v) => v,
            Refraction::TotalReflection => velocity,
        };
        particle.set_velocity(outside)?;
        particle.set_substrate_state(SubstrateState::InVacuum);
        Ok(Refraction::Transmitted(outside))
    }
}
