#![warn(missing_docs)]
//! Beam sources creating the particles of a simulation run.
//!
//! ## Example
//!
//! ```rust
//! use nmo_tracer::{angstrom, meter, source::{BeamSource, RectangularSource}};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let source = RectangularSource::new(
//!     meter!(0.0, 0.0, -6.0),
//!     (meter!(0.0), meter!(0.0)),
//!     meter!(-0.5),
//!     (meter!(0.05), meter!(0.05)),
//!     (angstrom!(4.0), angstrom!(6.0)),
//! )
//! .unwrap();
//! let mut rng = StdRng::seed_from_u64(42);
//! let particle = source.sample(&mut rng).unwrap();
//! assert!(particle.velocity().z > 0.0);
//! ```
use nalgebra::{point, Point3};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::meter};

use crate::{
    constants::wavelength_to_velocity,
    error::{NmoError, NmoResult},
    particle::Particle,
};

/// Trait for the generation of beam particles.
pub trait BeamSource: Send + Sync {
    /// Draw a single particle using the given random number generator.
    ///
    /// # Errors
    ///
    /// This function will return an error if the sampled particle is invalid.
    fn sample(&self, rng: &mut dyn RngCore) -> NmoResult<Particle>;
}

/// Rectangular source emitting uniformly towards a rectangular aim window.
///
/// The starting point is drawn uniformly from the source rectangle, the direction points to a uniformly drawn point of
/// the aim window and the speed follows from a wavelength drawn uniformly from the given band. A source rectangle of
/// zero size is a point source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangularSource {
    center: Point3<Length>,
    half_extent: (Length, Length),
    aim_z: Length,
    aim_half_extent: (Length, Length),
    wavelength: (Length, Length),
}
impl RectangularSource {
    /// Create a new [`RectangularSource`].
    ///
    /// `half_extent` and `aim_half_extent` are (half width in x, half height in y). The aim window is centered on the
    /// optical axis.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - any value is not finite
    ///   - an extent is negative
    ///   - the aim plane coincides with the source plane
    ///   - the wavelength band is not `0 < min <= max`
    pub fn new(
        center: Point3<Length>,
        half_extent: (Length, Length),
        aim_z: Length,
        aim_half_extent: (Length, Length),
        wavelength: (Length, Length),
    ) -> NmoResult<Self> {
        let source = Self {
            center,
            half_extent,
            aim_z,
            aim_half_extent,
            wavelength,
        };
        source.validate()?;
        Ok(source)
    }
    /// Check the parameters of this [`RectangularSource`].
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn validate(&self) -> NmoResult<()> {
        if self.center.iter().any(|c| !c.is_finite()) || !self.aim_z.is_finite() {
            return Err(NmoError::Configuration(
                "source and aim positions must be finite".into(),
            ));
        }
        for extent in [
            self.half_extent.0,
            self.half_extent.1,
            self.aim_half_extent.0,
            self.aim_half_extent.1,
        ] {
            if !extent.is_finite() || extent.is_sign_negative() {
                return Err(NmoError::Configuration(
                    "source extents must be >= 0.0 and finite".into(),
                ));
            }
        }
        #[allow(clippy::float_cmp)]
        if self.aim_z.get::<meter>() == self.center.z.get::<meter>() {
            return Err(NmoError::Configuration(
                "aim plane must not coincide with the source plane".into(),
            ));
        }
        let (min, max) = (
            self.wavelength.0.get::<meter>(),
            self.wavelength.1.get::<meter>(),
        );
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) {
            return Err(NmoError::Configuration(
                "wavelength band must fulfil 0 < min <= max".into(),
            ));
        }
        Ok(())
    }
    /// Returns the wavelength band of this [`RectangularSource`].
    #[must_use]
    pub const fn wavelength(&self) -> (Length, Length) {
        self.wavelength
    }
}
fn symmetric(rng: &mut dyn RngCore, half: Length) -> f64 {
    let half = half.get::<meter>();
    if half > 0.0 {
        rng.random_range(-half..half)
    } else {
        0.0
    }
}
impl BeamSource for RectangularSource {
    fn sample(&self, rng: &mut dyn RngCore) -> NmoResult<Particle> {
        let c = self.center.map(|c| c.get::<meter>());
        let start = point![
            c.x + symmetric(rng, self.half_extent.0),
            c.y + symmetric(rng, self.half_extent.1),
            c.z
        ];
        let target = point![
            symmetric(rng, self.aim_half_extent.0),
            symmetric(rng, self.aim_half_extent.1),
            self.aim_z.get::<meter>()
        ];
        let (min, max) = (
            self.wavelength.0.get::<meter>(),
            self.wavelength.1.get::<meter>(),
        );
        let wavelength = if max > min {
            rng.random_range(min..max)
        } else {
            min
        };
        let direction = (target - start).normalize();
        Particle::new(
            start.map(Length::new::<meter>),
            direction * wavelength_to_velocity(wavelength),
        )
    }
}
