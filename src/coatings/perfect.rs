use super::Coating;
use nalgebra::Vector3;

/// Ideal mirror coating
///
/// This model reflects every neutron independent of velocity and angle of incidence.
pub struct Perfect;

impl Coating for Perfect {
    fn calc_reflectivity(&self, _velocity: &Vector3<f64>, _surface_normal: &Vector3<f64>) -> f64 {
        1.0
    }
}
