//! Module for handling the surfaces of a scene
//!
//! This module contains the [`SurfaceGeometry`] trait which handles the calculation of intersections of a
//! [`Particle`] with a surface as well as the [`Surface`] enum containing the concrete surface types.
use std::fmt::{Debug, Display};

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use strum::Display as StrumDisplay;

use crate::particle::Particle;

mod detector_plane;
mod disk;
mod mirror_channel;

pub use detector_plane::{AxisBinning, DetectorAxis, DetectorBinning, DetectorPlane, MAX_BINS};
pub use disk::{Disk, DiskMode};
pub use mirror_channel::{MirrorChannel, TransverseAxis};

/// Smallest time of flight (in seconds) counted as an intersection.
///
/// This prevents a particle sitting on a surface from hitting the same surface again.
pub const T_MIN: f64 = 1.0e-12;

/// Handle of a surface inside a [`Scene`](crate::scene::Scene).
///
/// Handles are assigned in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SurfaceId(pub usize);

impl Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Side of a mirror hit by a particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum Face {
    /// concave side facing the optical axis
    Front,
    /// outer side
    Back,
}

/// Intersection of a particle trajectory with a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// time of flight (in seconds) until the intersection
    pub time: f64,
    /// intersection point (in meters)
    pub point: Point3<f64>,
    /// normalized surface normal at the intersection point
    pub normal: Vector3<f64>,
    /// face of the surface which was hit
    pub face: Face,
}

/// Trait for handling the geometry of surfaces.
pub trait SurfaceGeometry: Send + Sync {
    /// Calculate the earliest intersection (with a time of flight > [`T_MIN`]) of the given [`Particle`]'s straight
    /// trajectory with this surface.
    ///
    /// This function returns `None` if the trajectory does not intersect with the surface.
    fn calc_intersection(&self, particle: &Particle) -> Option<Hit>;
    /// Return the surface type as string (for debugging purposes)
    fn name(&self) -> String;
}

/// A surface of a [`Scene`](crate::scene::Scene).
#[derive(Debug, Clone)]
pub enum Surface {
    /// elliptic mirror channel wall
    Mirror(MirrorChannel),
    /// disk (beam stop, slit or transparent plane)
    Disk(Disk),
    /// detector plane
    Detector(DetectorPlane),
}
impl Surface {
    fn geometry(&self) -> &dyn SurfaceGeometry {
        match self {
            Self::Mirror(m) => m,
            Self::Disk(d) => d,
            Self::Detector(d) => d,
        }
    }
    /// Calculate the intersection with the underlying surface.
    ///
    /// See [`SurfaceGeometry::calc_intersection`].
    #[must_use]
    pub fn calc_intersection(&self, particle: &Particle) -> Option<Hit> {
        self.geometry().calc_intersection(particle)
    }
}
impl Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.geometry().name())
    }
}
impl Debug for dyn SurfaceGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Time of flight (in seconds) of a particle until it reaches the plane `z = z_plane` (in meters).
///
/// Returns `None` if the particle moves parallel to the plane or if the plane is not ahead of the particle (by more than
/// [`T_MIN`]).
#[must_use]
pub fn time_to_plane(position: &Point3<f64>, velocity: &Vector3<f64>, z_plane: f64) -> Option<f64> {
    if velocity.z == 0.0 {
        return None;
    }
    let t = (z_plane - position.z) / velocity.z;
    (t > T_MIN && t.is_finite()).then_some(t)
}
