use super::{clamp_reflectivity, Coating};
use crate::error::{NmoError, NmoResult};
use nalgebra::Vector3;

/// Coating with a constant reflectivity independent of velocity and angle of incidence.
pub struct ConstantR {
    reflectivity: f64,
}

impl ConstantR {
    /// Creates a new [`ConstantR`] coating.
    ///
    /// # Errors
    ///
    /// This function will return an error if the reflectivity is outside `[0.0, 1.0]` or not finite.
    pub fn new(reflectivity: f64) -> NmoResult<Self> {
        if !(0.0..=1.0).contains(&reflectivity) {
            return Err(NmoError::Configuration(
                "constant reflectivity must be in the range [0.0, 1.0]".into(),
            ));
        }
        Ok(Self { reflectivity })
    }
    pub(super) fn clamped(reflectivity: f64) -> Self {
        Self {
            reflectivity: clamp_reflectivity(reflectivity),
        }
    }
}

impl Coating for ConstantR {
    fn calc_reflectivity(&self, _velocity: &Vector3<f64>, _surface_normal: &Vector3<f64>) -> f64 {
        self.reflectivity
    }
}
