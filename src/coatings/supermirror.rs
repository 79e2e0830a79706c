use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::{clamp_reflectivity, Coating};
use crate::{
    constants::V2K,
    error::{NmoError, NmoResult},
};

/// Parameters of the empirical supermirror reflectivity curve.
///
/// Momentum transfer values are given in Å⁻¹.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupermirrorParams {
    /// m-value (cutoff in units of the critical momentum transfer of nickel)
    pub m: f64,
    /// reflectivity below the critical momentum transfer
    pub r0: f64,
    /// critical momentum transfer
    pub qc: f64,
    /// slope of the reflectivity above `qc`
    pub alpha: f64,
    /// width of the cutoff
    pub w: f64,
}
impl Default for SupermirrorParams {
    fn default() -> Self {
        Self {
            m: 4.0,
            r0: 0.99,
            qc: 0.0217,
            alpha: 0.0,
            w: 0.003,
        }
    }
}
impl SupermirrorParams {
    /// Default supermirror parameters with a given m-value.
    #[must_use]
    pub fn with_m(m: f64) -> Self {
        Self {
            m,
            ..Self::default()
        }
    }
    /// Check the parameters for physically meaningful values.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - any value is not finite
    ///   - `r0` is outside `[0.0, 1.0]`
    ///   - `qc` or `w` are not positive
    pub fn validate(&self) -> NmoResult<()> {
        for (name, value) in [
            ("m", self.m),
            ("r0", self.r0),
            ("qc", self.qc),
            ("alpha", self.alpha),
            ("w", self.w),
        ] {
            if !value.is_finite() {
                return Err(NmoError::Configuration(format!(
                    "supermirror {name} must be finite"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.r0) {
            return Err(NmoError::Configuration(
                "supermirror r0 must be in the range [0.0, 1.0]".into(),
            ));
        }
        if self.qc <= 0.0 {
            return Err(NmoError::Configuration(
                "supermirror qc must be > 0.0".into(),
            ));
        }
        if self.w <= 0.0 {
            return Err(NmoError::Configuration(
                "supermirror w must be > 0.0".into(),
            ));
        }
        Ok(())
    }
}

/// Supermirror coating.
///
/// The reflectivity as function of the momentum transfer `q = 2·|v⊥|·V2K` follows
///
/// ```text
/// R(q) = r0                                                  for q <= qc
/// R(q) = r0/2 · (1 − tanh((q − m·qc)/w)) · (1 − alpha·(q − qc))  for q > qc
/// ```
///
/// A coating with `m <= 0` does not reflect at all. For `0 < m < 1` the curve of an `m = 1` coating with a critical
/// momentum transfer of `m·qc` is used.
pub struct Supermirror {
    params: SupermirrorParams,
}
impl From<SupermirrorParams> for Supermirror {
    fn from(params: SupermirrorParams) -> Self {
        Self { params }
    }
}
impl Supermirror {
    /// Reflectivity for a given momentum transfer `q` (in Å⁻¹).
    #[must_use]
    pub fn reflectivity(&self, q: f64) -> f64 {
        let p = &self.params;
        if p.m <= 0.0 {
            return 0.0;
        }
        let (m, qc) = if p.m < 1.0 {
            (1.0, p.m * p.qc)
        } else {
            (p.m, p.qc)
        };
        if q <= qc {
            return clamp_reflectivity(p.r0);
        }
        let r = 0.5
            * p.r0
            * (1.0 - f64::tanh((q - m * qc) / p.w))
            * p.alpha.mul_add(-(q - qc), 1.0);
        clamp_reflectivity(r)
    }
}
impl Coating for Supermirror {
    fn calc_reflectivity(&self, velocity: &Vector3<f64>, surface_normal: &Vector3<f64>) -> f64 {
        let q = 2.0 * velocity.dot(surface_normal).abs() * V2K;
        self.reflectivity(q)
    }
}
