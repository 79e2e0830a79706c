#![warn(missing_docs)]
//! Accumulation of particles arriving at detector planes.
//!
//! Each detector keeps the number of recorded particles as well as the sum of their weights (`p`) and of the squared
//! weights (`p2`, for the statistical error). Optionally, these sums are additionally histogrammed over two quantities.
//! Accumulators of independent batches are combined with [`merge`](DetectorSet::merge).
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::{
    error::{NmoError, NmoResult},
    particle::Particle,
    scene::Scene,
    surface::{AxisBinning, DetectorBinning, DetectorPlane},
};

/// Number of events and weight sums of a single bin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BinStats {
    /// number of recorded particles
    pub n: u64,
    /// sum of weights
    pub p: f64,
    /// sum of squared weights
    pub p2: f64,
}
impl BinStats {
    fn add(&mut self, weight: f64) {
        self.n += 1;
        self.p += weight;
        self.p2 += weight * weight;
    }
    fn merge(&mut self, other: &Self) {
        self.n += other.n;
        self.p += other.p;
        self.p2 += other.p2;
    }
    /// Statistical error `√p2` of the summed weight.
    #[must_use]
    pub fn error(&self) -> f64 {
        self.p2.sqrt()
    }
}

/// Accumulator of a single [`DetectorPlane`].
#[derive(Debug, Clone)]
pub struct DetectorAccumulator {
    label: String,
    total: BinStats,
    binning: Option<DetectorBinning>,
    bins: Vec<BinStats>,
}
impl DetectorAccumulator {
    /// Create an empty accumulator for the given [`DetectorPlane`].
    #[must_use]
    pub fn new(plane: &DetectorPlane) -> Self {
        let binning = plane.binning().copied();
        let bins = binning.map_or_else(Vec::new, |b| vec![BinStats::default(); b.len()]);
        Self {
            label: plane.label().to_owned(),
            total: BinStats::default(),
            binning,
            bins,
        }
    }
    /// Returns the label of the underlying detector.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
    /// Returns the totals of this accumulator.
    #[must_use]
    pub const fn total(&self) -> &BinStats {
        &self.total
    }
    /// Record a particle.
    ///
    /// Particles outside the histogram range only contribute to the totals.
    pub fn record(&mut self, particle: &Particle) {
        let weight = particle.weight();
        self.total.add(weight);
        if let Some(idx) = self.binning.as_ref().and_then(|b| b.bin(particle)) {
            self.bins[idx].add(weight);
        }
    }
    /// Add the contents of another accumulator bin by bin.
    ///
    /// # Errors
    ///
    /// This function will return an error if both accumulators belong to differently binned detectors.
    pub fn merge(&mut self, other: &Self) -> NmoResult<()> {
        if self.binning != other.binning || self.bins.len() != other.bins.len() {
            return Err(NmoError::Other(format!(
                "cannot merge detector '{}' with differently binned detector '{}'",
                self.label, other.label
            )));
        }
        self.total.merge(&other.total);
        for (bin, other_bin) in self.bins.iter_mut().zip(&other.bins) {
            bin.merge(other_bin);
        }
        Ok(())
    }
    /// Consume the accumulator and return its [`DetectorResult`].
    #[must_use]
    pub fn finalize(self) -> DetectorResult {
        let histogram = self.binning.map(|b| Histogram {
            x_axis: b.x_axis,
            y_axis: b.y_axis,
            bins: self.bins,
        });
        DetectorResult {
            label: self.label,
            total: self.total,
            histogram,
        }
    }
}

/// Accumulators of all detectors of a [`Scene`].
#[derive(Debug, Clone, Default)]
pub struct DetectorSet {
    accumulators: Vec<DetectorAccumulator>,
}
impl DetectorSet {
    /// Create empty accumulators for all detectors of the given [`Scene`] (in registration order).
    #[must_use]
    pub fn new(scene: &Scene) -> Self {
        Self {
            accumulators: scene.detector_planes().map(DetectorAccumulator::new).collect(),
        }
    }
    /// Returns the accumulators in detector registration order.
    #[must_use]
    pub fn accumulators(&self) -> &[DetectorAccumulator] {
        &self.accumulators
    }
    /// Record a particle at the detector with the given slot.
    ///
    /// Unknown slots are ignored.
    pub fn record(&mut self, slot: usize, particle: &Particle) {
        if let Some(acc) = self.accumulators.get_mut(slot) {
            acc.record(particle);
        }
    }
    /// Merge another [`DetectorSet`] of the same scene.
    ///
    /// # Errors
    ///
    /// This function will return an error if the detector sets belong to different scenes.
    pub fn merge(&mut self, other: &Self) -> NmoResult<()> {
        if self.accumulators.len() != other.accumulators.len() {
            return Err(NmoError::Other(
                "cannot merge detector sets of different size".into(),
            ));
        }
        for (acc, other_acc) in self.accumulators.iter_mut().zip(&other.accumulators) {
            acc.merge(other_acc)?;
        }
        Ok(())
    }
    /// Sum of all recorded weights over all detectors.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.accumulators.iter().map(|a| a.total.p).sum()
    }
    /// Consume all accumulators and return their results.
    #[must_use]
    pub fn finalize(self) -> Vec<DetectorResult> {
        self.accumulators
            .into_iter()
            .map(DetectorAccumulator::finalize)
            .collect()
    }
}

/// Two dimensional histogram of a [`DetectorResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// column axis
    pub x_axis: AxisBinning,
    /// row axis
    pub y_axis: AxisBinning,
    /// bins in row major order (`x + y·nx`)
    pub bins: Vec<BinStats>,
}

#[derive(Serialize)]
struct HistogramRow {
    x: f64,
    y: f64,
    n: u64,
    p: f64,
    p2: f64,
}

/// Final result of a single detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorResult {
    /// detector label
    pub label: String,
    /// totals over the whole detector
    pub total: BinStats,
    /// optional histogram
    pub histogram: Option<Histogram>,
}
impl DetectorResult {
    /// Write the histogram as CSV (columns `x, y, n, p, p2` with bin centers).
    ///
    /// Nothing is written if the detector has no histogram.
    ///
    /// # Errors
    ///
    /// This function will return an error if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> NmoResult<()> {
        let Some(histogram) = &self.histogram else {
            return Ok(());
        };
        let mut writer = csv::Writer::from_writer(writer);
        let nx = histogram.x_axis.bins;
        for (idx, bin) in histogram.bins.iter().enumerate() {
            writer
                .serialize(HistogramRow {
                    x: histogram.x_axis.bin_center(idx % nx),
                    y: histogram.y_axis.bin_center(idx / nx),
                    n: bin.n,
                    p: bin.p,
                    p2: bin.p2,
                })
                .map_err(|e| NmoError::Io(e.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}
