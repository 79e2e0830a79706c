//! Module for handling mirror coatings
//!
//! A coating determines the probability that a neutron hitting a mirror face is reflected.
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::error::NmoResult;

mod constant_r;
mod perfect;
mod supermirror;

pub use constant_r::ConstantR;
pub use perfect::Perfect;
pub use supermirror::{Supermirror, SupermirrorParams};

/// Serializable description of a mirror coating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Display, EnumIter)]
pub enum CoatingType {
    /// Ideal mirror. Reflectivity is always 1.0
    Perfect,
    /// Coating with a constant given reflectivity
    ConstantR {
        /// reflectivity in the range `[0.0, 1.0]`
        reflectivity: f64,
    },
    /// Supermirror with the usual empirical reflectivity curve
    Supermirror(SupermirrorParams),
}
impl Default for CoatingType {
    fn default() -> Self {
        Self::Supermirror(SupermirrorParams::default())
    }
}
impl CoatingType {
    /// Calculate the reflectivity of the underlying coating model.
    ///
    /// See [`Coating::calc_reflectivity`].
    #[must_use]
    pub fn calc_reflectivity(&self, velocity: &Vector3<f64>, surface_normal: &Vector3<f64>) -> f64 {
        match self {
            Self::Perfect => Perfect.calc_reflectivity(velocity, surface_normal),
            Self::ConstantR { reflectivity } => ConstantR::clamped(*reflectivity)
                .calc_reflectivity(velocity, surface_normal),
            Self::Supermirror(params) => {
                Supermirror::from(*params).calc_reflectivity(velocity, surface_normal)
            }
        }
    }
    /// Check the parameters of the underlying coating model.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - a constant reflectivity is outside `[0.0, 1.0]` or `NaN`
    ///   - the supermirror parameters are invalid (see [`SupermirrorParams::validate`])
    pub fn validate(&self) -> NmoResult<()> {
        match self {
            Self::Perfect => Ok(()),
            Self::ConstantR { reflectivity } => ConstantR::new(*reflectivity).map(|_| ()),
            Self::Supermirror(params) => params.validate(),
        }
    }
}

/// Trait for the reflectivity models of a mirror coating.
pub trait Coating {
    /// Calculate the reflectivity for a neutron with the given velocity (in m/s) hitting a surface with the given
    /// (normalized) normal vector.
    ///
    /// The returned value is always in the range `[0.0, 1.0]`.
    fn calc_reflectivity(&self, velocity: &Vector3<f64>, surface_normal: &Vector3<f64>) -> f64;
}

/// Clamp a reflectivity to `[0.0, 1.0]`. `NaN` is mapped to 0.0.
#[must_use]
pub fn clamp_reflectivity(reflectivity: f64) -> f64 {
    if reflectivity.is_nan() {
        0.0
    } else {
        reflectivity.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::vector;
    use strum::IntoEnumIterator;

    #[test]
    fn default() {
        assert_eq!(
            CoatingType::default(),
            CoatingType::Supermirror(SupermirrorParams::default())
        );
    }
    #[test]
    fn clamp() {
        assert_eq!(clamp_reflectivity(f64::NAN), 0.0);
        assert_eq!(clamp_reflectivity(-0.1), 0.0);
        assert_eq!(clamp_reflectivity(1.1), 1.0);
        assert_eq!(clamp_reflectivity(0.3), 0.3);
    }
    #[test]
    fn dispatch() {
        let v = vector![0.0, 5.0, 1000.0];
        let n = vector![0.0, -1.0, 0.0];
        assert_eq!(CoatingType::Perfect.calc_reflectivity(&v, &n), 1.0);
        assert_relative_eq!(
            CoatingType::ConstantR { reflectivity: 0.7 }.calc_reflectivity(&v, &n),
            0.7
        );
        assert_relative_eq!(
            CoatingType::Supermirror(SupermirrorParams::default()).calc_reflectivity(&v, &n),
            0.99
        );
    }
    #[test]
    fn all_types_bounded() {
        let n = vector![0.0, -1.0, 0.0];
        for coating in CoatingType::iter() {
            for v_perp in [0.0, 1.0, 10.0, 50.0, 100.0, 1000.0] {
                let r = coating.calc_reflectivity(&vector![0.0, v_perp, 1000.0], &n);
                assert!((0.0..=1.0).contains(&r), "{coating}: {r}");
            }
        }
    }
    #[test]
    fn validate() {
        assert!(CoatingType::Perfect.validate().is_ok());
        assert!(CoatingType::ConstantR { reflectivity: 0.5 }.validate().is_ok());
        assert!(CoatingType::ConstantR { reflectivity: 7.0 }.validate().is_err());
        assert!(CoatingType::ConstantR { reflectivity: f64::NAN }.validate().is_err());
        assert!(CoatingType::default().validate().is_ok());
        let mut params = SupermirrorParams::default();
        params.qc = -1.0;
        assert!(CoatingType::Supermirror(params).validate().is_err());
        let mut params = SupermirrorParams::default();
        params.m = f64::NAN;
        assert!(CoatingType::Supermirror(params).validate().is_err());
    }
    #[test]
    fn display() {
        assert_eq!(format!("{}", CoatingType::Perfect), "Perfect");
    }
}
