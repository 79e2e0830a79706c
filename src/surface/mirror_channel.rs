//! Elliptic mirror channel wall
//!
//! A mirror follows the conic profile `u² = k1 + k2·z + k3·z²` on the positive branch of its transverse coordinate
//! `u`. For a horizontally focusing mirror `u` is x and the mirror is extruded along y, a vertically focusing mirror
//! uses `u = y` and is extruded along x. The mirror is bounded axially by `zs <= z <= ze`.
use nalgebra::{vector, Point3, Vector3};
use roots::{find_roots_quadratic, Roots};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use uom::si::{f64::Length, length::meter};

use super::{Face, Hit, SurfaceGeometry, T_MIN};
use crate::{
    assembly::ConicProfile,
    coatings::CoatingType,
    error::{NmoError, NmoResult},
    particle::Particle,
};

/// Relative discriminant below which two roots are merged into a single touching point.
const TANGENT_TOLERANCE: f64 = 1.0e-10;

/// Transverse axis along which a mirror focuses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum TransverseAxis {
    /// horizontal focusing, mirror surfaces extruded along y
    #[default]
    X,
    /// vertical focusing, mirror surfaces extruded along x
    Y,
}
impl TransverseAxis {
    /// Split a vector into its (transverse, extrusion) components.
    #[must_use]
    pub fn split(self, v: &Vector3<f64>) -> (f64, f64) {
        match self {
            Self::X => (v.x, v.y),
            Self::Y => (v.y, v.x),
        }
    }
    /// Assemble a vector from its transverse, extrusion and axial components.
    #[must_use]
    pub fn compose(self, transverse: f64, extrusion: f64, z: f64) -> Vector3<f64> {
        match self {
            Self::X => vector![transverse, extrusion, z],
            Self::Y => vector![extrusion, transverse, z],
        }
    }
}

/// A single elliptic mirror of a nested mirror assembly.
#[derive(Debug, Clone)]
pub struct MirrorChannel {
    index: usize,
    profile: ConicProfile,
    axis: TransverseAxis,
    zs: f64,
    ze: f64,
    half_height: f64,
    front: CoatingType,
    back: CoatingType,
    double_reflections: bool,
}
impl MirrorChannel {
    /// Create a new [`MirrorChannel`] with the given conic profile, axial `bounds` (`zs`, `ze`) and `coatings`
    /// (front, back).
    ///
    /// The mirror focuses along x and is unbounded along y unless [`with_axis`](Self::with_axis) or
    /// [`with_half_height`](Self::with_half_height) are used. Reflections off the back face are disabled by default.
    ///
    /// # Errors
    ///
    /// This function will return an error if the bounds are not finite.
    pub fn new(
        index: usize,
        profile: ConicProfile,
        bounds: (Length, Length),
        coatings: (CoatingType, CoatingType),
    ) -> NmoResult<Self> {
        let zs = bounds.0.get::<meter>();
        let ze = bounds.1.get::<meter>();
        if !zs.is_finite() || !ze.is_finite() {
            return Err(NmoError::Configuration(format!(
                "mirror #{index}: axial bounds must be finite"
            )));
        }
        Ok(Self {
            index,
            profile,
            axis: TransverseAxis::X,
            zs,
            ze,
            half_height: f64::INFINITY,
            front: coatings.0,
            back: coatings.1,
            double_reflections: false,
        })
    }
    /// Set the transverse axis along which the mirror focuses.
    #[must_use]
    pub const fn with_axis(mut self, axis: TransverseAxis) -> Self {
        self.axis = axis;
        self
    }
    /// Limit the extent of the mirror along its extrusion axis to `|extrusion| <= half_height`.
    #[must_use]
    pub fn with_half_height(mut self, half_height: Length) -> Self {
        self.half_height = half_height.get::<meter>();
        self
    }
    /// Allow (or forbid) reflections off the back face.
    #[must_use]
    pub const fn with_double_reflections(mut self, double_reflections: bool) -> Self {
        self.double_reflections = double_reflections;
        self
    }
    /// Returns the index of this [`MirrorChannel`] within its assembly.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
    /// Returns the conic profile of this [`MirrorChannel`].
    #[must_use]
    pub const fn profile(&self) -> &ConicProfile {
        &self.profile
    }
    /// Returns the transverse axis along which this [`MirrorChannel`] focuses.
    #[must_use]
    pub const fn axis(&self) -> TransverseAxis {
        self.axis
    }
    /// Returns the axial bounds `(zs, ze)` (in meters).
    #[must_use]
    pub const fn bounds(&self) -> (f64, f64) {
        (self.zs, self.ze)
    }
    /// Returns the half extent along the extrusion axis (in meters).
    #[must_use]
    pub const fn half_height(&self) -> f64 {
        self.half_height
    }
    /// Returns the coating of the given face.
    #[must_use]
    pub const fn coating(&self, face: Face) -> &CoatingType {
        match face {
            Face::Front => &self.front,
            Face::Back => &self.back,
        }
    }
    /// Returns `true` if particles may be reflected off the back face.
    #[must_use]
    pub const fn double_reflections(&self) -> bool {
        self.double_reflections
    }
    /// Returns the mirror radius at the center of its axial extent (in meters), if defined.
    #[must_use]
    pub fn nominal_radius(&self) -> Option<f64> {
        self.profile.radius_at(0.5 * (self.zs + self.ze))
    }
    /// Returns the mirror radius at the given z position (in meters), if defined.
    #[must_use]
    pub fn radius_at(&self, z: f64) -> Option<f64> {
        self.profile.radius_at(z)
    }
    /// Check the geometry of this mirror.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - `zs >= ze`
    ///   - the half height is not positive
    ///   - any coefficient is not finite
    ///   - `k3` deviates from `c²/a² − 1` by more than a relative tolerance of 1e-9
    ///   - the profile has no real radius at the center of the mirror
    ///   - the coating of a face is invalid
    pub fn validate(&self) -> NmoResult<()> {
        if self.zs >= self.ze {
            return Err(NmoError::Configuration(format!(
                "mirror #{}: zs must be < ze",
                self.index
            )));
        }
        if self.half_height.is_nan() || self.half_height <= 0.0 {
            return Err(NmoError::Configuration(format!(
                "mirror #{}: half height must be > 0",
                self.index
            )));
        }
        let (k1, k2, k3) = self.profile.coefficients();
        let a = self.profile.semi_major_axis();
        let c = self.profile.half_focal_distance();
        if [k1, k2, k3, a, c].iter().any(|v| !v.is_finite()) {
            return Err(NmoError::Configuration(format!(
                "mirror #{}: conic coefficients must be finite",
                self.index
            )));
        }
        if self.profile.conic_invariant_error() > 1.0e-9 {
            return Err(NmoError::Configuration(format!(
                "mirror #{}: k3 is inconsistent with c²/a² − 1",
                self.index
            )));
        }
        if self.nominal_radius().is_none() {
            return Err(NmoError::Configuration(format!(
                "mirror #{}: no real mirror surface within its axial bounds",
                self.index
            )));
        }
        for face in [Face::Front, Face::Back] {
            self.coating(face).validate().map_err(|e| match e {
                NmoError::Configuration(msg) => NmoError::Configuration(format!(
                    "mirror #{}, {face} face: {msg}",
                    self.index
                )),
                e => e,
            })?;
        }
        Ok(())
    }
    fn accept(&self, t: f64, pos: &Point3<f64>, vel: &Vector3<f64>) -> Option<Hit> {
        if t <= T_MIN || !t.is_finite() {
            return None;
        }
        let point = pos + t * vel;
        let (u, w) = self.axis.split(&point.coords);
        if u <= 0.0 || point.z < self.zs || point.z > self.ze || w.abs() > self.half_height {
            return None;
        }
        let (_, k2, k3) = self.profile.coefficients();
        // gradient of u² − k1 − k2·z − k3·z² points away from the optical axis
        let normal = self
            .axis
            .compose(2.0 * u, 0.0, -(2.0 * k3).mul_add(point.z, k2))
            .normalize();
        let face = if vel.dot(&normal) > 0.0 {
            Face::Front
        } else {
            Face::Back
        };
        Some(Hit {
            time: t,
            point,
            normal,
            face,
        })
    }
}

impl SurfaceGeometry for MirrorChannel {
    fn calc_intersection(&self, particle: &Particle) -> Option<Hit> {
        let pos = particle.position_m();
        let vel = particle.velocity();
        let (k1, k2, k3) = self.profile.coefficients();
        let (pu, _) = self.axis.split(&pos.coords);
        let (vu, _) = self.axis.split(&vel);
        // insert trajectory (p: position, v: velocity) into u² = k1 + k2·z + k3·z²:
        // (p_u + t·v_u)² − k1 − k2·(p_z + t·v_z) − k3·(p_z + t·v_z)² = 0
        // This translates into the quadratic equation
        // at² + bt + c = 0 with
        // a = v_u² − k3·v_z²
        // b = 2·p_u·v_u − k2·v_z − 2·k3·p_z·v_z
        // c = p_u² − k1 − k2·p_z − k3·p_z²
        let a = vu.mul_add(vu, -k3 * vel.z * vel.z);
        let b = (2.0 * pu).mul_add(vu, -k2 * vel.z) - 2.0 * k3 * pos.z * vel.z;
        let c = pu.mul_add(pu, -k1) - k2.mul_add(pos.z, k3 * pos.z * pos.z);
        let discriminant = b.mul_add(b, -4.0 * a * c);
        if a != 0.0 && discriminant.abs() <= TANGENT_TOLERANCE * b.mul_add(b, (4.0 * a * c).abs()) {
            return None;
        }
        match find_roots_quadratic(a, b, c) {
            Roots::No(_) => None,
            Roots::One(t) => {
                if a == 0.0 {
                    // trajectory parallel to an asymptotic direction: single regular crossing
                    self.accept(t[0], &pos, &vel)
                } else {
                    // double root: the trajectory only touches the surface
                    None
                }
            }
            Roots::Two(t) => self
                .accept(t[0], &pos, &vel)
                .or_else(|| self.accept(t[1], &pos, &vel)),
            _ => None,
        }
    }
    fn name(&self) -> String {
        format!("mirror channel {}", self.index)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{coatings::SupermirrorParams, meter};
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;

    fn mirror() -> MirrorChannel {
        let profile =
            ConicProfile::through_point(meter!(0.0), meter!(0.05), meter!(-6.0), meter!(6.0))
                .unwrap();
        MirrorChannel::new(
            0,
            profile,
            (meter!(-0.5), meter!(0.5)),
            (CoatingType::Perfect, CoatingType::Perfect),
        )
        .unwrap()
    }
    #[test]
    fn new() {
        let m = mirror();
        assert_eq!(m.index(), 0);
        assert_eq!(m.bounds(), (-0.5, 0.5));
        assert!(m.half_height().is_infinite());
        assert!(!m.double_reflections());
        assert_eq!(m.coating(Face::Front), &CoatingType::Perfect);
        assert_relative_eq!(m.nominal_radius().unwrap(), 0.05, max_relative = 1.0e-12);
        assert!(m.validate().is_ok());
        let profile = *m.profile();
        assert!(MirrorChannel::new(
            0,
            profile,
            (meter!(f64::NAN), meter!(0.5)),
            (CoatingType::Perfect, CoatingType::Perfect)
        )
        .is_err());
    }
    #[test]
    fn validate() {
        let m = mirror();
        let profile = *m.profile();
        let reversed = MirrorChannel::new(
            1,
            profile,
            (meter!(0.5), meter!(-0.5)),
            (CoatingType::Perfect, CoatingType::Perfect),
        )
        .unwrap();
        assert_matches!(reversed.validate(), Err(NmoError::Configuration(_)));
        let flat = mirror().with_half_height(meter!(0.0));
        assert_matches!(flat.validate(), Err(NmoError::Configuration(_)));
        let (k1, k2, k3) = profile.coefficients();
        let broken = ConicProfile::from_raw(
            k1,
            k2,
            k3 * 1.01,
            profile.semi_major_axis(),
            profile.half_focal_distance(),
            profile.foci(),
        );
        let m = MirrorChannel::new(
            2,
            broken,
            (meter!(-0.5), meter!(0.5)),
            (CoatingType::Perfect, CoatingType::Perfect),
        )
        .unwrap();
        assert_matches!(m.validate(), Err(NmoError::Configuration(_)));
    }
    #[test]
    fn invalid_coatings() {
        let m = mirror();
        let profile = *m.profile();
        let mut params = SupermirrorParams::default();
        params.qc = -1.0;
        params.w = 0.0;
        let bad_front = MirrorChannel::new(
            3,
            profile,
            (meter!(-0.5), meter!(0.5)),
            (CoatingType::Supermirror(params), CoatingType::Perfect),
        )
        .unwrap();
        assert_eq!(
            bad_front.validate(),
            Err(NmoError::Configuration(
                "mirror #3, front face: supermirror qc must be > 0.0".into()
            ))
        );
        let bad_back = MirrorChannel::new(
            4,
            profile,
            (meter!(-0.5), meter!(0.5)),
            (
                CoatingType::Perfect,
                CoatingType::ConstantR { reflectivity: 7.0 },
            ),
        )
        .unwrap();
        assert_matches!(
            bad_back.validate(),
            Err(NmoError::Configuration(msg)) if msg.starts_with("mirror #4, back face:")
        );
    }
    #[test]
    fn axis() {
        assert_eq!(TransverseAxis::default(), TransverseAxis::X);
        let v = vector![1.0, 2.0, 3.0];
        assert_eq!(TransverseAxis::X.split(&v), (1.0, 2.0));
        assert_eq!(TransverseAxis::Y.split(&v), (2.0, 1.0));
        assert_eq!(TransverseAxis::Y.compose(2.0, 1.0, 3.0), v);
        assert_eq!(TransverseAxis::X.compose(1.0, 2.0, 3.0), v);
        assert_eq!(mirror().axis(), TransverseAxis::X);
    }
    #[test]
    fn vertical_hit() {
        let m = mirror().with_axis(TransverseAxis::Y).with_half_height(meter!(0.03));
        // travelling in x only: never reaches the mirror surface along y
        let p = Particle::new(meter!(0.0, 0.0, -1.0), vector![50.0, 0.0, 1000.0]).unwrap();
        assert!(m.calc_intersection(&p).is_none());
        let p = Particle::new(meter!(0.0, 0.0, -1.0), vector![0.0, 50.0, 1000.0]).unwrap();
        let hit = m.calc_intersection(&p).unwrap();
        assert_eq!(hit.face, Face::Front);
        assert_relative_eq!(
            hit.point.y,
            m.radius_at(hit.point.z).unwrap(),
            max_relative = 1.0e-9
        );
        assert!(hit.normal.y > 0.0);
        assert_relative_eq!(hit.normal.x, 0.0);
        // outside the extent along x
        let p = Particle::new(meter!(0.05, 0.0, -1.0), vector![0.0, 50.0, 1000.0]).unwrap();
        assert!(m.calc_intersection(&p).is_none());
    }
    #[test]
    fn front_hit() {
        let m = mirror();
        let p = Particle::new(meter!(0.0, 0.0, -1.0), vector![50.0, 0.0, 1000.0]).unwrap();
        let hit = m.calc_intersection(&p).unwrap();
        assert_eq!(hit.face, Face::Front);
        assert!(hit.time > 0.0);
        assert_relative_eq!(
            hit.point.x,
            m.radius_at(hit.point.z).unwrap(),
            max_relative = 1.0e-9
        );
        assert!(hit.normal.x > 0.0);
        assert_relative_eq!(hit.normal.norm(), 1.0);
    }
    #[test]
    fn back_hit() {
        let m = mirror();
        let p = Particle::new(meter!(0.06, 0.0, -0.2), vector![-50.0, 0.0, 1000.0]).unwrap();
        let hit = m.calc_intersection(&p).unwrap();
        assert_eq!(hit.face, Face::Back);
    }
    #[test]
    fn misses() {
        let m = mirror();
        // outside axial range
        let p = Particle::new(meter!(0.0, 0.0, -1.0), vector![500.0, 0.0, 1000.0]).unwrap();
        assert!(m.calc_intersection(&p).is_none());
        // moving away
        let p = Particle::new(meter!(0.0, 0.0, 0.0), vector![-50.0, 0.0, 1000.0]).unwrap();
        assert!(m.calc_intersection(&p).is_none());
        // passes above the mirror
        let m = mirror().with_half_height(meter!(0.01));
        let p = Particle::new(meter!(0.0, 0.02, -1.0), vector![50.0, 0.0, 1000.0]).unwrap();
        assert!(m.calc_intersection(&p).is_none());
    }
    #[test]
    fn tangent_is_miss() {
        let m = mirror();
        // the vertex of the symmetric ellipse lies at z=0: a trajectory along x=r(0) touches the mirror there
        let r = m.radius_at(0.0).unwrap();
        let p = Particle::new(meter!(r, 0.0, -0.4), vector![0.0, 0.0, 1000.0]).unwrap();
        assert!(m.calc_intersection(&p).is_none());
    }
    #[test]
    fn sitting_on_surface() {
        let m = mirror();
        let r = m.radius_at(0.2).unwrap();
        // particle on the surface moving inwards: no immediate re-hit
        let p = Particle::new(meter!(r, 0.0, 0.2), vector![-10.0, 0.0, 1000.0]).unwrap();
        assert!(m.calc_intersection(&p).is_none());
    }
    #[test]
    fn name() {
        assert_eq!(mirror().name(), "mirror channel 0");
    }
}
