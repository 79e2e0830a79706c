//! Planar disks perpendicular to the optical axis
//!
//! Disks model beam stops, slits and (transparent) reference planes.
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use uom::si::{f64::Length, length::meter};

use super::{time_to_plane, Face, Hit, SurfaceGeometry};
use crate::{
    error::{NmoError, NmoResult},
    particle::Particle,
};

/// Behaviour of a [`Disk`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum DiskMode {
    /// particles pass the disk unaffected
    #[default]
    Transparent,
    /// particles hitting the disk within its extent are absorbed (beam stop)
    Absorbing,
    /// particles are absorbed everywhere on the plane outside the disk extent (slit)
    Aperture,
}

/// A rectangular disk at a fixed z position, centered on the optical axis.
#[derive(Debug, Clone)]
pub struct Disk {
    z: f64,
    half_width: f64,
    half_height: f64,
    mode: DiskMode,
}
impl Disk {
    /// Create a new [`Disk`] at position `z` with the given `extent` (half width in x, half height in y).
    ///
    /// # Errors
    ///
    /// This function will return an error if the z position is not finite.
    pub fn new(z: Length, extent: (Length, Length), mode: DiskMode) -> NmoResult<Self> {
        if !z.is_finite() {
            return Err(NmoError::Configuration(
                "disk position must be finite".into(),
            ));
        }
        Ok(Self {
            z: z.get::<meter>(),
            half_width: extent.0.get::<meter>(),
            half_height: extent.1.get::<meter>(),
            mode,
        })
    }
    /// Returns the z position of this [`Disk`] (in meters).
    #[must_use]
    pub const fn z(&self) -> f64 {
        self.z
    }
    /// Returns the mode of this [`Disk`].
    #[must_use]
    pub const fn mode(&self) -> DiskMode {
        self.mode
    }
    /// Returns the half width and half height (in meters).
    #[must_use]
    pub const fn extent(&self) -> (f64, f64) {
        (self.half_width, self.half_height)
    }
    /// Check the extent of this [`Disk`].
    ///
    /// # Errors
    ///
    /// This function will return an error if the half width or the half height is not positive.
    pub fn validate(&self) -> NmoResult<()> {
        if self.half_width.is_nan()
            || self.half_height.is_nan()
            || self.half_width <= 0.0
            || self.half_height <= 0.0
        {
            return Err(NmoError::Configuration(
                "disk extent must be > 0".into(),
            ));
        }
        Ok(())
    }
    fn contains(&self, point: &Point3<f64>) -> bool {
        point.x.abs() <= self.half_width && point.y.abs() <= self.half_height
    }
    /// Returns `true` if a particle crossing the plane at `point` (in meters) is absorbed.
    #[must_use]
    pub fn blocks(&self, point: &Point3<f64>) -> bool {
        match self.mode {
            DiskMode::Transparent => false,
            DiskMode::Absorbing => self.contains(point),
            DiskMode::Aperture => !self.contains(point),
        }
    }
}
impl SurfaceGeometry for Disk {
    fn calc_intersection(&self, particle: &Particle) -> Option<Hit> {
        let pos = particle.position_m();
        let vel = particle.velocity();
        let t = time_to_plane(&pos, &vel, self.z)?;
        let point = pos + t * vel;
        // an aperture acts on the whole plane
        if self.mode != DiskMode::Aperture && !self.contains(&point) {
            return None;
        }
        Some(Hit {
            time: t,
            point,
            normal: nalgebra::Vector3::z(),
            face: if vel.z > 0.0 { Face::Front } else { Face::Back },
        })
    }
    fn name(&self) -> String {
        format!("disk ({})", self.mode)
    }
}
