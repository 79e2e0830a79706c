//! Detector planes perpendicular to the optical axis
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use uom::si::{f64::Length, length::meter};

use super::{time_to_plane, Face, Hit, SurfaceGeometry};
use crate::{
    constants::velocity_to_wavelength,
    error::{NmoError, NmoResult},
    particle::Particle,
    utils::{f64_to_usize, usize_to_f64},
};

/// Largest number of bins of a [`DetectorBinning`] (2048 × 2048).
pub const MAX_BINS: usize = 1 << 22;

/// Quantity recorded along a histogram axis of a [`DetectorPlane`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum DetectorAxis {
    /// horizontal position (m)
    X,
    /// vertical position (m)
    Y,
    /// horizontal divergence `atan(v_x/v_z)` (rad)
    DivergenceX,
    /// vertical divergence `atan(v_y/v_z)` (rad)
    DivergenceY,
    /// de Broglie wavelength (m)
    Wavelength,
}
impl DetectorAxis {
    /// Returns the value of this quantity for the given particle.
    #[must_use]
    pub fn value(&self, particle: &Particle) -> f64 {
        let v = particle.velocity();
        match self {
            Self::X => particle.position_m().x,
            Self::Y => particle.position_m().y,
            Self::DivergenceX => f64::atan2(v.x, v.z),
            Self::DivergenceY => f64::atan2(v.y, v.z),
            Self::Wavelength => velocity_to_wavelength(v.norm()),
        }
    }
}

/// Binning of a single histogram axis covering the half-open range `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBinning {
    /// recorded quantity
    pub axis: DetectorAxis,
    /// lower bound (inclusive, SI base units)
    pub min: f64,
    /// upper bound (exclusive, SI base units)
    pub max: f64,
    /// number of bins
    pub bins: usize,
}
impl AxisBinning {
    /// Create a new [`AxisBinning`].
    ///
    /// # Errors
    ///
    /// This function will return an error if the range is empty or not finite or if the number of bins is zero.
    pub fn new(axis: DetectorAxis, min: f64, max: f64, bins: usize) -> NmoResult<Self> {
        let binning = Self {
            axis,
            min,
            max,
            bins,
        };
        binning.validate()?;
        Ok(binning)
    }
    /// Check the range and number of bins.
    ///
    /// # Errors
    ///
    /// This function will return an error if the range is empty or not finite or if the number of bins is zero.
    pub fn validate(&self) -> NmoResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min >= self.max {
            return Err(NmoError::Configuration(format!(
                "{} binning: range must be finite and min < max",
                self.axis
            )));
        }
        if self.bins == 0 {
            return Err(NmoError::Configuration(format!(
                "{} binning: number of bins must be > 0",
                self.axis
            )));
        }
        Ok(())
    }
    /// Returns the bin index of `value` or `None` if it lies outside `[min, max)`.
    #[must_use]
    pub fn bin(&self, value: f64) -> Option<usize> {
        if !(self.min..self.max).contains(&value) {
            return None;
        }
        let idx = f64_to_usize((value - self.min) / (self.max - self.min) * usize_to_f64(self.bins));
        Some(idx.min(self.bins - 1))
    }
    /// Returns the center of the given bin.
    #[must_use]
    pub fn bin_center(&self, idx: usize) -> f64 {
        let width = (self.max - self.min) / usize_to_f64(self.bins);
        (usize_to_f64(idx) + 0.5).mul_add(width, self.min)
    }
}

/// Two dimensional binning of a [`DetectorPlane`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorBinning {
    /// first (column) axis
    pub x_axis: AxisBinning,
    /// second (row) axis
    pub y_axis: AxisBinning,
}
impl DetectorBinning {
    /// Returns the total number of bins (saturating at `usize::MAX`).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.x_axis.bins.saturating_mul(self.y_axis.bins)
    }
    /// Check both axes and the total number of bins.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - an axis is invalid (see [`AxisBinning::validate`])
    ///   - the total number of bins exceeds [`MAX_BINS`]
    pub fn validate(&self) -> NmoResult<()> {
        self.x_axis.validate()?;
        self.y_axis.validate()?;
        match self.x_axis.bins.checked_mul(self.y_axis.bins) {
            Some(total) if total <= MAX_BINS => Ok(()),
            _ => Err(NmoError::Configuration(format!(
                "binning of {} × {} exceeds the maximum of {MAX_BINS} bins",
                self.x_axis.bins, self.y_axis.bins
            ))),
        }
    }
    /// Always `false` for a validated binning.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Returns the linear bin index (`x + y·nx`) for the given particle.
    #[must_use]
    pub fn bin(&self, particle: &Particle) -> Option<usize> {
        let ix = self.x_axis.bin(self.x_axis.axis.value(particle))?;
        let iy = self.y_axis.bin(self.y_axis.axis.value(particle))?;
        Some(iy * self.x_axis.bins + ix)
    }
}

/// A rectangular detector plane at a fixed z position, centered on the optical axis.
#[derive(Debug, Clone)]
pub struct DetectorPlane {
    label: String,
    z: f64,
    half_width: f64,
    half_height: f64,
    binning: Option<DetectorBinning>,
}
impl DetectorPlane {
    /// Create a new [`DetectorPlane`].
    ///
    /// # Errors
    ///
    /// This function will return an error if the z position is not finite.
    pub fn new(
        label: &str,
        z: Length,
        extent: (Length, Length),
        binning: Option<DetectorBinning>,
    ) -> NmoResult<Self> {
        if !z.is_finite() {
            return Err(NmoError::Configuration(format!(
                "detector '{label}': position must be finite"
            )));
        }
        Ok(Self {
            label: label.to_owned(),
            z: z.get::<meter>(),
            half_width: extent.0.get::<meter>(),
            half_height: extent.1.get::<meter>(),
            binning,
        })
    }
    /// Returns the label of this [`DetectorPlane`].
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
    /// Returns the z position of this [`DetectorPlane`] (in meters).
    #[must_use]
    pub const fn z(&self) -> f64 {
        self.z
    }
    /// Returns the half width and half height (in meters).
    #[must_use]
    pub const fn extent(&self) -> (f64, f64) {
        (self.half_width, self.half_height)
    }
    /// Returns the binning of this [`DetectorPlane`].
    #[must_use]
    pub const fn binning(&self) -> Option<&DetectorBinning> {
        self.binning.as_ref()
    }
    /// Check extent and binning.
    ///
    /// # Errors
    ///
    /// This function will return an error if the extent is not positive or the binning is invalid.
    pub fn validate(&self) -> NmoResult<()> {
        if self.half_width.is_nan()
            || self.half_height.is_nan()
            || self.half_width <= 0.0
            || self.half_height <= 0.0
        {
            return Err(NmoError::Configuration(format!(
                "detector '{}': extent must be > 0",
                self.label
            )));
        }
        if let Some(binning) = &self.binning {
            binning.validate().map_err(|e| match e {
                NmoError::Configuration(msg) => {
                    NmoError::Configuration(format!("detector '{}': {msg}", self.label))
                }
                e => e,
            })?;
        }
        Ok(())
    }
}
impl SurfaceGeometry for DetectorPlane {
    fn calc_intersection(&self, particle: &Particle) -> Option<Hit> {
        let pos = particle.position_m();
        let vel = particle.velocity();
        let t = time_to_plane(&pos, &vel, self.z)?;
        let point = pos + t * vel;
        if point.x.abs() > self.half_width || point.y.abs() > self.half_height {
            return None;
        }
        Some(Hit {
            time: t,
            point,
            normal: Vector3::z(),
            face: if vel.z > 0.0 { Face::Front } else { Face::Back },
        })
    }
    fn name(&self) -> String {
        format!("detector '{}'", self.label)
    }
}
