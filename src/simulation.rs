#![warn(missing_docs)]
//! Parallel Monte-Carlo runs over many particles.
//!
//! Particles are traced in chunks of fixed size on a [`rayon`] thread pool. Every chunk accumulates into its own
//! [`DetectorSet`]. Chunks are processed in waves of a bounded number of chunks; after each wave the partial results
//! are merged in chunk order and dropped, so memory does not grow with the length of the run. Since each particle
//! draws its random numbers from a generator seeded with its own index, a run gives bit-identical results for any
//! number of threads and any wave size.
use std::{
    fs::File,
    io::BufWriter,
    ops::Range,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Local};
use log::{info, warn};
use rand::{rngs::StdRng, SeedableRng};
use rayon::{prelude::*, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::{
    detector::{DetectorResult, DetectorSet},
    error::{NmoError, NmoResult},
    scene::Scene,
    source::BeamSource,
    tracer::{AnomalyTally, RayTracer, TraceConfig, TraceState},
};

/// Settings of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    particles: usize,
    seed: u64,
    threads: usize,
    chunk_size: usize,
    wave_chunks: usize,
}
impl Default for RunConfig {
    /// Create a default config with the following parameters:
    ///   - number of particles: `100_000`
    ///   - seed: `0`
    ///   - threads: `0` (rayon default, usually the number of cores)
    ///   - chunk size: `4096`
    ///   - chunks per wave: `0` (four chunks per worker thread)
    fn default() -> Self {
        Self {
            particles: 100_000,
            seed: 0,
            threads: 0,
            chunk_size: 4096,
            wave_chunks: 0,
        }
    }
}
impl RunConfig {
    /// Returns the number of particles to be traced.
    #[must_use]
    pub const fn particles(&self) -> usize {
        self.particles
    }
    /// Sets the number of particles to be traced.
    pub fn set_particles(&mut self, particles: usize) {
        self.particles = particles;
    }
    /// Returns the base seed of the run.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
    /// Sets the base seed of the run.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }
    /// Returns the number of worker threads (`0` = rayon default).
    #[must_use]
    pub const fn threads(&self) -> usize {
        self.threads
    }
    /// Sets the number of worker threads (`0` = rayon default).
    pub fn set_threads(&mut self, threads: usize) {
        self.threads = threads;
    }
    /// Returns the number of particles traced as one unit of work.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }
    /// Sets the number of particles traced as one unit of work.
    ///
    /// # Errors
    ///
    /// This function will return an error if the chunk size is zero.
    pub fn set_chunk_size(&mut self, chunk_size: usize) -> NmoResult<()> {
        if chunk_size == 0 {
            return Err(NmoError::Configuration("chunk size must be > 0".into()));
        }
        self.chunk_size = chunk_size;
        Ok(())
    }
    /// Returns the number of chunks traced in parallel before their results are merged (`0` = four per thread).
    #[must_use]
    pub const fn wave_chunks(&self) -> usize {
        self.wave_chunks
    }
    /// Sets the number of chunks traced in parallel before their results are merged (`0` = four per thread).
    ///
    /// Only the peak memory of a run depends on this value, never its result.
    pub fn set_wave_chunks(&mut self, wave_chunks: usize) {
        self.wave_chunks = wave_chunks;
    }
}

/// Cancellation flag of a running [`Simulation`].
///
/// The flag may be cloned and set from any thread. Chunks which have not yet started are skipped, chunks in progress
/// are completed.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    cancelled: Arc<AtomicBool>,
}
impl RunControl {
    /// Create a new (not cancelled) [`RunControl`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Request cancellation of the run.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
    /// Returns `true` if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Particle counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// particles traced to completion
    pub traced: u64,
    /// particles absorbed anywhere in the scene
    pub absorbed: u64,
    /// particles recorded by a detector
    pub detected: u64,
    /// particles leaving the scene without being detected
    pub escaped: u64,
    /// source samples which did not give a valid particle
    pub rejected: u64,
}
impl RunStatistics {
    fn merge(&mut self, other: &Self) {
        self.traced += other.traced;
        self.absorbed += other.absorbed;
        self.detected += other.detected;
        self.escaped += other.escaped;
        self.rejected += other.rejected;
    }
}

/// Result of a [`Simulation`] run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// start of the run
    pub timestamp: DateTime<Local>,
    /// run settings
    pub run: RunConfig,
    /// `true` if the run was cancelled before all chunks were traced
    pub cancelled: bool,
    /// particle counts
    pub statistics: RunStatistics,
    /// irregularly stopped particles
    pub anomalies: AnomalyTally,
    /// one result per detector (in registration order)
    pub detectors: Vec<DetectorResult>,
}
impl RunReport {
    /// Returns the result of the detector with the given label.
    #[must_use]
    pub fn detector(&self, label: &str) -> Option<&DetectorResult> {
        self.detectors.iter().find(|d| d.label == label)
    }
    /// Write this report as YAML file.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file cannot be created or written.
    pub fn save_yaml(&self, path: &Path) -> NmoResult<()> {
        let file = File::create(path)
            .map_err(|e| NmoError::Io(format!("could not create {}: {e}", path.display())))?;
        serde_yaml::to_writer(BufWriter::new(file), self)
            .map_err(|e| NmoError::Io(format!("could not write report: {e}")))
    }
    /// Write the histograms of all binned detectors as CSV files `<label>.csv` into the given directory.
    ///
    /// # Errors
    ///
    /// This function will return an error if the directory or a file cannot be created or written.
    pub fn write_csv(&self, directory: &Path) -> NmoResult<()> {
        std::fs::create_dir_all(directory)?;
        for detector in self.detectors.iter().filter(|d| d.histogram.is_some()) {
            let path = directory.join(format!("{}.csv", detector.label));
            let file = File::create(&path)
                .map_err(|e| NmoError::Io(format!("could not create {}: {e}", path.display())))?;
            detector.write_csv(BufWriter::new(file))?;
        }
        Ok(())
    }
}

/// Partial result of a single chunk.
struct ChunkResult {
    detectors: DetectorSet,
    anomalies: AnomalyTally,
    statistics: RunStatistics,
}

/// SplitMix64 finalizer decorrelating neighbouring particle indices.
const fn mix(index: u64) -> u64 {
    let mut z = index.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Batch runner tracing particles of a [`BeamSource`] through a [`Scene`].
#[derive(Debug, Clone, Copy)]
pub struct Simulation<'a> {
    scene: &'a Scene,
    trace: &'a TraceConfig,
    run: &'a RunConfig,
}
impl<'a> Simulation<'a> {
    /// Creates a new [`Simulation`].
    #[must_use]
    pub const fn new(scene: &'a Scene, trace: &'a TraceConfig, run: &'a RunConfig) -> Self {
        Self { scene, trace, run }
    }
    fn trace_chunk<S: BeamSource + ?Sized>(&self, source: &S, range: Range<usize>) -> ChunkResult {
        let tracer = RayTracer::new(self.scene, self.trace);
        let mut detectors = DetectorSet::new(self.scene);
        let mut anomalies = AnomalyTally::default();
        let mut statistics = RunStatistics::default();
        for idx in range {
            let mut rng = StdRng::seed_from_u64(self.run.seed ^ mix(idx as u64));
            let Ok(mut particle) = source.sample(&mut rng) else {
                statistics.rejected += 1;
                continue;
            };
            let outcome = tracer.trace(&mut particle, &mut rng, &mut detectors);
            statistics.traced += 1;
            match (outcome.state, outcome.detector) {
                (TraceState::Exited, Some(_)) => statistics.detected += 1,
                (TraceState::Exited, None) => statistics.escaped += 1,
                _ => statistics.absorbed += 1,
            }
            if let Some(anomaly) = outcome.anomaly {
                anomalies.record(anomaly);
            }
        }
        ChunkResult {
            detectors,
            anomalies,
            statistics,
        }
    }
    /// Trace all particles of the run.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the chunk size is zero
    ///   - the thread pool cannot be created
    pub fn run<S: BeamSource + ?Sized>(
        &self,
        source: &S,
        control: &RunControl,
    ) -> NmoResult<RunReport> {
        let timestamp = Local::now();
        let chunk_size = self.run.chunk_size;
        if chunk_size == 0 {
            return Err(NmoError::Configuration("chunk size must be > 0".into()));
        }
        let particles = self.run.particles;
        let nr_of_chunks = particles.div_ceil(chunk_size);
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.run.threads)
            .build()
            .map_err(|e| NmoError::Other(format!("could not create thread pool: {e}")))?;
        info!(
            "tracing {particles} particles in {nr_of_chunks} chunks on {} threads",
            pool.current_num_threads()
        );
        let wave_chunks = if self.run.wave_chunks == 0 {
            4 * pool.current_num_threads()
        } else {
            self.run.wave_chunks
        };
        let mut detectors = DetectorSet::new(self.scene);
        let mut anomalies = AnomalyTally::default();
        let mut statistics = RunStatistics::default();
        let mut cancelled = false;
        let mut wave_start = 0;
        while wave_start < nr_of_chunks {
            let wave_end = (wave_start + wave_chunks).min(nr_of_chunks);
            let partials: Vec<Option<ChunkResult>> = pool.install(|| {
                (wave_start..wave_end)
                    .into_par_iter()
                    .map(|chunk| {
                        if control.is_cancelled() {
                            return None;
                        }
                        let start = chunk * chunk_size;
                        let end = (start + chunk_size).min(particles);
                        Some(self.trace_chunk(source, start..end))
                    })
                    .collect()
            });
            for partial in partials {
                let Some(partial) = partial else {
                    cancelled = true;
                    continue;
                };
                detectors.merge(&partial.detectors)?;
                anomalies.merge(&partial.anomalies);
                statistics.merge(&partial.statistics);
            }
            if control.is_cancelled() {
                cancelled |= wave_end < nr_of_chunks;
                break;
            }
            wave_start = wave_end;
        }
        if cancelled {
            warn!(
                "run cancelled after {} of {particles} particles",
                statistics.traced + statistics.rejected
            );
        }
        if statistics.rejected > 0 {
            warn!("{} source samples were rejected", statistics.rejected);
        }
        anomalies.report();
        info!(
            "traced {} particles: {} detected, {} escaped, {} absorbed",
            statistics.traced, statistics.detected, statistics.escaped, statistics.absorbed
        );
        Ok(RunReport {
            timestamp,
            run: self.run.clone(),
            cancelled,
            statistics,
            anomalies,
            detectors: detectors.finalize(),
        })
    }
}
