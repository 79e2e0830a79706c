#![warn(missing_docs)]
//! Construction of nested, confocal elliptic mirror assemblies.
//!
//! The mirrors of a nested mirror optic (NMO) share two focal points on the optical (z) axis. Starting from a defining
//! point on the outermost mirror, each further mirror is sized such that its entrance edge lies on the line connecting the
//! near focus with the exit edge of its outer neighbour (Zimmer construction). Hence, no mirror shadows a neighbour
//! for particles emitted from the near focus.
use std::fmt::Display;

use log::{debug, info};
use num::Zero;
use serde::{Deserialize, Serialize};
use uom::si::{
    f64::{Angle, Length},
    length::meter,
};

use crate::{
    error::{NmoError, NmoResult},
    meter, radian,
};

/// Conic profile `x² = k1 + k2·z + k3·z²` of a single elliptic mirror in the x-z plane.
///
/// All coefficients refer to SI base units (meters). The profile is rotationally independent: only the positive `x` branch
/// is used as mirror surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConicProfile {
    k1: f64,
    k2: f64,
    k3: f64,
    a: f64,
    c: f64,
    foci: (f64, f64),
    defining_point: (f64, f64),
}
impl ConicProfile {
    /// Reconstruct the ellipse with the given focal points running through the point `(z, r)`.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - any of the given values is not finite
    ///   - both focal points coincide
    ///   - the discriminant of the semi-major axis equation is negative or not finite (`NumericDegeneracy`)
    pub fn through_point(z: Length, r: Length, l_start: Length, l_end: Length) -> NmoResult<Self> {
        let (z, r) = (z.get::<meter>(), r.get::<meter>());
        let (l_start, l_end) = (l_start.get::<meter>(), l_end.get::<meter>());
        if !(z.is_finite() && r.is_finite() && l_start.is_finite() && l_end.is_finite()) {
            return Err(NmoError::Configuration(
                "mirror defining point and focal points must be finite".into(),
            ));
        }
        #[allow(clippy::float_cmp)]
        if l_start == l_end {
            return Err(NmoError::Configuration(
                "focal points LStart and LEnd must differ".into(),
            ));
        }
        let c = (l_end - l_start) / 2.0;
        let u = z + c - l_end;
        let s = r.mul_add(r, u.mul_add(u, c * c));
        let discriminant = s.mul_add(s, -4.0 * c * c * u * u);
        if !discriminant.is_finite() || discriminant.is_sign_negative() {
            return Err(NmoError::NumericDegeneracy(format!(
                "negative discriminant {discriminant} for mirror through z={z} m, r={r} m"
            )));
        }
        let a_squared = (s + discriminant.sqrt()) / 2.0;
        let a = a_squared.sqrt();
        let k3 = c * c / a_squared - 1.0;
        let k2 = 2.0 * k3 * (c - l_end);
        let k1 = (k3 * (c - l_end)).mul_add(c - l_end, a_squared - c * c);
        Ok(Self {
            k1,
            k2,
            k3,
            a,
            c,
            foci: (l_start, l_end),
            defining_point: (z, r),
        })
    }
    /// Returns the coefficients `(k1, k2, k3)` of this [`ConicProfile`].
    #[must_use]
    pub const fn coefficients(&self) -> (f64, f64, f64) {
        (self.k1, self.k2, self.k3)
    }
    /// Returns the semi-major axis `a` (in meters).
    #[must_use]
    pub const fn semi_major_axis(&self) -> f64 {
        self.a
    }
    /// Returns half the focal separation `c` (in meters).
    #[must_use]
    pub const fn half_focal_distance(&self) -> f64 {
        self.c
    }
    /// Returns the z positions (in meters) of the near and the far focus.
    #[must_use]
    pub const fn foci(&self) -> (f64, f64) {
        self.foci
    }
    /// Returns the point `(z, r)` (in meters) this profile was constructed through.
    #[must_use]
    pub const fn defining_point(&self) -> (f64, f64) {
        self.defining_point
    }
    /// Evaluate `k1 + k2·z + k3·z²` at the given z position (in meters).
    #[must_use]
    pub fn radicand(&self, z: f64) -> f64 {
        self.k3.mul_add(z * z, self.k2.mul_add(z, self.k1))
    }
    /// Returns the mirror radius (positive x branch, in meters) at the given z position (in meters).
    ///
    /// Returns `None` if the plane lies beyond the ellipse vertex (non-positive radicand).
    #[must_use]
    pub fn radius_at(&self, z: f64) -> Option<f64> {
        let radicand = self.radicand(z);
        if radicand > 0.0 && radicand.is_finite() {
            Some(radicand.sqrt())
        } else {
            None
        }
    }
    /// Relative deviation of `k3` from `c²/a² − 1`.
    #[must_use]
    pub fn conic_invariant_error(&self) -> f64 {
        let expected = self.c * self.c / (self.a * self.a) - 1.0;
        ((self.k3 - expected) / expected.abs().max(f64::EPSILON)).abs()
    }
    #[cfg(test)]
    pub(crate) fn from_raw(k1: f64, k2: f64, k3: f64, a: f64, c: f64, foci: (f64, f64)) -> Self {
        Self {
            k1,
            k2,
            k3,
            a,
            c,
            foci,
            defining_point: (f64::NAN, f64::NAN),
        }
    }
}

/// Builder for a set of nested confocal mirrors.
///
/// ```rust
/// use nmo_tracer::{assembly::MirrorAssemblyBuilder, meter};
///
/// let assembly = MirrorAssemblyBuilder::new(5, meter!(0.05), (meter!(-6.0), meter!(6.0)), (meter!(-0.5), meter!(0.5)))
///     .with_defining_point(meter!(0.0), meter!(0.05))
///     .build()
///     .unwrap();
/// assert_eq!(assembly.radii().len(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct MirrorAssemblyBuilder {
    count: usize,
    defining_point: (Length, Length),
    extraction_plane: Length,
    foci: (Length, Length),
    bank: (Length, Length),
}
impl MirrorAssemblyBuilder {
    /// Create a new [`MirrorAssemblyBuilder`] for `count` mirrors.
    ///
    /// `foci` are the near (`LStart`) and far (`LEnd`) focal point, `bank` the axial extent (`lStart`, `lEnd`) of the mirrors.
    /// By default, the outermost mirror runs through `(lStart, outer_radius)` and radii are extracted at `lStart`.
    #[must_use]
    pub const fn new(
        count: usize,
        outer_radius: Length,
        foci: (Length, Length),
        bank: (Length, Length),
    ) -> Self {
        Self {
            count,
            defining_point: (bank.0, outer_radius),
            extraction_plane: bank.0,
            foci,
            bank,
        }
    }
    /// Set the point `(z0, r0)` on the outermost mirror.
    #[must_use]
    pub fn with_defining_point(mut self, z: Length, r: Length) -> Self {
        self.defining_point = (z, r);
        self
    }
    /// Set the z position at which the mirror radii are reported.
    #[must_use]
    pub fn with_extraction_plane(mut self, z: Length) -> Self {
        self.extraction_plane = z;
        self
    }
    fn validate(&self) -> NmoResult<()> {
        if self.count == 0 {
            return Err(NmoError::Configuration(
                "number of mirrors must be > 0".into(),
            ));
        }
        let (z0, r0) = self.defining_point;
        let (l_start, l_end) = self.foci;
        let (bank_start, bank_end) = self.bank;
        if [z0, r0, l_start, l_end, bank_start, bank_end, self.extraction_plane]
            .iter()
            .any(|v| !v.is_finite())
        {
            return Err(NmoError::Configuration(
                "all assembly parameters must be finite".into(),
            ));
        }
        if r0 <= Length::zero() {
            return Err(NmoError::Configuration(
                "defining radius r0 must be > 0".into(),
            ));
        }
        if l_start == l_end {
            return Err(NmoError::Configuration(
                "focal points LStart and LEnd must differ".into(),
            ));
        }
        if bank_start >= bank_end {
            return Err(NmoError::Configuration(
                "mirror bank start lStart must be < lEnd".into(),
            ));
        }
        if l_start >= bank_start {
            return Err(NmoError::Configuration(
                "near focus LStart must lie upstream of the mirror bank start lStart".into(),
            ));
        }
        Ok(())
    }
    /// Run the Zimmer construction.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the parameters are invalid (`Configuration`)
    ///   - a mirror cannot be constructed or its radius at the extraction plane or the bank exit is not real (`NumericDegeneracy`)
    ///   - memory for the mirror list could not be reserved (`Allocation`)
    pub fn build(&self) -> NmoResult<MirrorAssembly> {
        self.validate()?;
        let mut radii = Vec::new();
        radii
            .try_reserve(self.count)
            .map_err(|e| NmoError::Allocation(format!("could not reserve mirror radii: {e}")))?;
        let mut profiles = Vec::new();
        profiles
            .try_reserve(self.count)
            .map_err(|e| NmoError::Allocation(format!("could not reserve mirror profiles: {e}")))?;
        let (l_start, l_end) = self.foci;
        let bank_start = self.bank.0.get::<meter>();
        let bank_end = self.bank.1.get::<meter>();
        let z_extract = self.extraction_plane.get::<meter>();
        let projection = (bank_start - l_start.get::<meter>()) / (bank_end - l_start.get::<meter>());
        let mut point = self.defining_point;
        for k in 0..self.count {
            let profile = ConicProfile::through_point(point.0, point.1, l_start, l_end)?;
            let radius = profile.radius_at(z_extract).ok_or_else(|| {
                NmoError::NumericDegeneracy(format!(
                    "mirror #{k}: extraction plane z={z_extract} m lies beyond the ellipse vertex"
                ))
            })?;
            let exit_radius = profile.radius_at(bank_end).ok_or_else(|| {
                NmoError::NumericDegeneracy(format!(
                    "mirror #{k}: bank end z={bank_end} m lies beyond the ellipse vertex"
                ))
            })?;
            let (k1, k2, k3) = profile.coefficients();
            debug!("mirror #{k}: r={radius:.6e} m, k1={k1:.6e}, k2={k2:.6e}, k3={k3:.6e}");
            radii.push(radius);
            profiles.push(profile);
            point = (self.bank.0, meter!(exit_radius * projection));
        }
        let assembly = MirrorAssembly {
            radii,
            profiles,
            near_focus_distance: (z_extract - l_start.get::<meter>()).abs(),
        };
        info!("{}", assembly.summary());
        Ok(assembly)
    }
}

/// Result of a Zimmer construction.
#[derive(Debug, Clone)]
pub struct MirrorAssembly {
    radii: Vec<f64>,
    profiles: Vec<ConicProfile>,
    near_focus_distance: f64,
}
impl MirrorAssembly {
    /// Returns the mirror radii (in meters) at the extraction plane, ordered from the outermost to the innermost mirror.
    #[must_use]
    pub fn radii(&self) -> &[f64] {
        &self.radii
    }
    /// Returns the conic profiles, ordered from the outermost to the innermost mirror.
    #[must_use]
    pub fn profiles(&self) -> &[ConicProfile] {
        &self.profiles
    }
    /// Returns an [`AssemblySummary`] of this assembly.
    #[must_use]
    pub fn summary(&self) -> AssemblySummary {
        let first = self.radii.first().copied().unwrap_or_default();
        let last = self.radii.last().copied().unwrap_or_default();
        AssemblySummary {
            mirror_count: self.radii.len(),
            outer_radius: meter!(first),
            inner_radius: meter!(last),
            min_divergence: radian!(f64::atan(last / self.near_focus_distance)),
            max_divergence: radian!(f64::atan(first / self.near_focus_distance)),
        }
    }
}

/// Summary of a [`MirrorAssembly`] including the divergence range accepted from the near focus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblySummary {
    /// number of mirrors
    pub mirror_count: usize,
    /// radius of the outermost mirror at the extraction plane
    pub outer_radius: Length,
    /// radius of the innermost mirror at the extraction plane
    pub inner_radius: Length,
    /// smallest divergence angle (seen from the near focus) covered by the assembly
    pub min_divergence: Angle,
    /// largest divergence angle (seen from the near focus) covered by the assembly
    pub max_divergence: Angle,
}
impl Display for AssemblySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use uom::si::{angle::radian, length::millimeter};
        write!(
            f,
            "{} mirrors, radii {:.3} mm .. {:.3} mm, divergence coverage {:.3} mrad .. {:.3} mrad",
            self.mirror_count,
            self.inner_radius.get::<millimeter>(),
            self.outer_radius.get::<millimeter>(),
            self.min_divergence.get::<radian>() * 1.0e3,
            self.max_divergence.get::<radian>() * 1.0e3
        )
    }
}
