#![warn(missing_docs)]
//! Tracing of single particles through a [`Scene`].
//!
//! A particle moves on straight lines between surface interactions. At each step, the earliest intersection with any
//! candidate surface is determined and the particle is moved there. Depending on the surface type it is then reflected,
//! refracted into a mirror substrate, absorbed, recorded by a detector or simply passes on.
use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
    detector::DetectorSet,
    error::{NmoError, NmoResult},
    particle::Particle,
    scene::{ChannelWindow, Scene},
    substrate::{Refraction, Substrate},
    surface::{Face, Hit, Surface, SurfaceId},
};

/// State of a particle during tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TraceState {
    /// propagating towards the next surface
    InFlight,
    /// specular reflection at the last hit surface
    Reflecting,
    /// entering the substrate of the last hit mirror
    Refracting,
    /// terminal: absorbed
    Absorbed,
    /// terminal: left the scene or recorded by a detector
    Exited,
}

/// Irregular termination of a particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Anomaly {
    /// the particle exceeded the maximum number of interactions
    BounceLimitExceeded,
    /// the particle state contained non-finite numbers
    NonFinite,
}

/// Number of anomalies observed during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyTally {
    /// particles stopped by the interaction limit
    pub bounce_limit_exceeded: u64,
    /// particles stopped because of non-finite numbers
    pub non_finite: u64,
}
impl AnomalyTally {
    /// Count an anomaly.
    pub fn record(&mut self, anomaly: Anomaly) {
        match anomaly {
            Anomaly::BounceLimitExceeded => self.bounce_limit_exceeded += 1,
            Anomaly::NonFinite => self.non_finite += 1,
        }
    }
    /// Add the counts of another tally.
    pub fn merge(&mut self, other: &Self) {
        self.bounce_limit_exceeded += other.bounce_limit_exceeded;
        self.non_finite += other.non_finite;
    }
    /// Total number of anomalies.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.bounce_limit_exceeded + self.non_finite
    }
    /// Log a single warning summarizing all anomalies (if any).
    pub fn report(&self) {
        if self.total() > 0 {
            warn!(
                "{} particles were stopped irregularly ({} exceeded the interaction limit, {} had non-finite state)",
                self.total(),
                self.bounce_limit_exceeded,
                self.non_finite
            );
        }
    }
}

/// Configuration of the [`RayTracer`].
///
/// The config contains the following info
///   - maximum number of surface interactions / particle
///   - minimum weight / particle
///   - whether the narrowed collision search is disabled
///   - the optional mirror substrate model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    max_interactions: usize,
    min_weight: f64,
    exhaustive_search: bool,
    #[serde(skip)]
    substrate: Option<Substrate>,
}
impl Default for TraceConfig {
    /// Create a default config with the following parameters:
    ///   - maximum number of interactions / particle: `1000`
    ///   - minimum weight / particle: `1e-10`
    ///   - narrowed collision search
    ///   - no substrate transport (unreflected particles are absorbed)
    fn default() -> Self {
        Self {
            max_interactions: 1000,
            min_weight: 1.0e-10,
            exhaustive_search: false,
            substrate: None,
        }
    }
}
impl TraceConfig {
    /// Returns the maximum number of surface interactions of a particle.
    #[must_use]
    pub const fn max_interactions(&self) -> usize {
        self.max_interactions
    }
    /// Sets the maximum number of surface interactions of a particle.
    pub fn set_max_interactions(&mut self, max_interactions: usize) {
        self.max_interactions = max_interactions;
    }
    /// Returns the weight below which particles are dropped.
    #[must_use]
    pub const fn min_weight(&self) -> f64 {
        self.min_weight
    }
    /// Sets the weight below which particles are dropped.
    ///
    /// # Errors
    ///
    /// This function will return an error if the given weight is negative or not finite.
    pub fn set_min_weight(&mut self, min_weight: f64) -> NmoResult<()> {
        if !min_weight.is_finite() || min_weight.is_sign_negative() {
            return Err(NmoError::Configuration(
                "minimum weight must be >=0.0 and finite".into(),
            ));
        }
        self.min_weight = min_weight;
        Ok(())
    }
    /// Returns `true` if all mirror channels are checked for every step.
    #[must_use]
    pub const fn exhaustive_search(&self) -> bool {
        self.exhaustive_search
    }
    /// Check all mirror channels in every step instead of the neighbourhood of the particle only.
    pub fn set_exhaustive_search(&mut self, exhaustive_search: bool) {
        self.exhaustive_search = exhaustive_search;
    }
    /// Returns the substrate model, if refraction into mirror substrates is enabled.
    #[must_use]
    pub const fn substrate(&self) -> Option<&Substrate> {
        self.substrate.as_ref()
    }
    /// Enable (`Some`) or disable (`None`) refraction into mirror substrates.
    ///
    /// # Errors
    ///
    /// This function will return an error if the substrate parameters are invalid.
    pub fn set_substrate(&mut self, substrate: Option<Substrate>) -> NmoResult<()> {
        if let Some(s) = &substrate {
            s.validate()?;
        }
        self.substrate = substrate;
        Ok(())
    }
}

/// Result of tracing a single particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceOutcome {
    /// terminal state ([`TraceState::Absorbed`] or [`TraceState::Exited`])
    pub state: TraceState,
    /// number of surface interactions
    pub interactions: usize,
    /// irregular termination, if any
    pub anomaly: Option<Anomaly>,
    /// detector which recorded the particle, if any
    pub detector: Option<SurfaceId>,
}

/// Tracer for single particles through a [`Scene`].
#[derive(Debug, Clone, Copy)]
pub struct RayTracer<'a> {
    scene: &'a Scene,
    config: &'a TraceConfig,
}
impl<'a> RayTracer<'a> {
    /// Creates a new [`RayTracer`].
    #[must_use]
    pub const fn new(scene: &'a Scene, config: &'a TraceConfig) -> Self {
        Self { scene, config }
    }
    /// Find the earliest intersection of the particle's trajectory with any surface of the scene.
    ///
    /// Simultaneous intersections are resolved in favour of the surface registered first.
    #[must_use]
    pub fn find_next_hit(&self, particle: &Particle) -> Option<(SurfaceId, Hit)> {
        let window = if self.config.exhaustive_search {
            ChannelWindow::All
        } else {
            self.scene.channel_window(particle)
        };
        let channels = match window {
            ChannelWindow::Empty => &[][..],
            ChannelWindow::Range(range) => &self.scene.channels()[range],
            ChannelWindow::All => self.scene.channels(),
        };
        let mut best: Option<(SurfaceId, Hit)> = None;
        for id in channels.iter().chain(self.scene.non_channel_surfaces()) {
            let Some(hit) = self
                .scene
                .surface(*id)
                .and_then(|s| s.calc_intersection(particle))
            else {
                continue;
            };
            let better = best.as_ref().map_or(true, |(best_id, best_hit)| {
                hit.time < best_hit.time || (hit.time <= best_hit.time && *id < *best_id)
            });
            if better {
                best = Some((*id, hit));
            }
        }
        best
    }
    /// Trace a particle until it is absorbed or leaves the scene.
    ///
    /// Reflection probabilities are sampled from `rng`; particles arriving at a detector are recorded in `detectors`.
    pub fn trace<R: Rng + ?Sized>(
        &self,
        particle: &mut Particle,
        rng: &mut R,
        detectors: &mut DetectorSet,
    ) -> TraceOutcome {
        let mut state = TraceState::InFlight;
        let mut interactions = 0;
        let mut anomaly = None;
        let mut detector = None;
        let mut last_hit: Option<Hit> = None;
        loop {
            if !matches!(state, TraceState::Absorbed | TraceState::Exited) {
                if !particle.is_finite() {
                    anomaly = Some(Anomaly::NonFinite);
                    state = TraceState::Absorbed;
                } else if particle.weight() < self.config.min_weight {
                    state = TraceState::Absorbed;
                }
            }
            state = match state {
                TraceState::InFlight => {
                    if interactions >= self.config.max_interactions {
                        anomaly = Some(Anomaly::BounceLimitExceeded);
                        TraceState::Absorbed
                    } else if let Some((id, hit)) = self.find_next_hit(particle) {
                        interactions += 1;
                        particle.place(hit.point, hit.time);
                        last_hit = Some(hit);
                        self.interact(id, &hit, particle, rng, detectors, &mut detector)
                    } else {
                        TraceState::Exited
                    }
                }
                TraceState::Reflecting => {
                    if let Some(hit) = &last_hit {
                        if reflect(particle, hit).is_err() {
                            anomaly = Some(Anomaly::NonFinite);
                            TraceState::Absorbed
                        } else {
                            TraceState::InFlight
                        }
                    } else {
                        TraceState::InFlight
                    }
                }
                TraceState::Refracting => match (self.config.substrate(), &last_hit) {
                    (Some(substrate), Some(hit)) => {
                        match substrate.transit(particle, hit.point, &hit.normal) {
                            Ok(Refraction::Transmitted(_)) => TraceState::InFlight,
                            Ok(Refraction::TotalReflection) => TraceState::Reflecting,
                            Err(_) => {
                                anomaly = Some(Anomaly::NonFinite);
                                TraceState::Absorbed
                            }
                        }
                    }
                    _ => TraceState::Absorbed,
                },
                TraceState::Absorbed => {
                    particle.absorb();
                    break;
                }
                TraceState::Exited => break,
            };
        }
        TraceOutcome {
            state,
            interactions,
            anomaly,
            detector,
        }
    }
    fn interact<R: Rng + ?Sized>(
        &self,
        id: SurfaceId,
        hit: &Hit,
        particle: &Particle,
        rng: &mut R,
        detectors: &mut DetectorSet,
        detector: &mut Option<SurfaceId>,
    ) -> TraceState {
        match self.scene.surface(id) {
            Some(Surface::Mirror(mirror)) => {
                if hit.face == Face::Back && !mirror.double_reflections() {
                    return TraceState::Absorbed;
                }
                let reflectivity = mirror
                    .coating(hit.face)
                    .calc_reflectivity(&particle.velocity(), &hit.normal);
                if rng.random::<f64>() < reflectivity {
                    TraceState::Reflecting
                } else if self.config.substrate.is_some() {
                    TraceState::Refracting
                } else {
                    TraceState::Absorbed
                }
            }
            Some(Surface::Disk(disk)) => {
                if disk.blocks(&hit.point) {
                    TraceState::Absorbed
                } else {
                    TraceState::InFlight
                }
            }
            Some(Surface::Detector(_)) => {
                if let Some(slot) = self.scene.detector_slot(id) {
                    detectors.record(slot, particle);
                }
                *detector = Some(id);
                TraceState::Exited
            }
            None => TraceState::Exited,
        }
    }
}

/// Specular reflection `v' = v − 2(v·n)n` at the given hit.
fn reflect(particle: &mut Particle, hit: &Hit) -> NmoResult<()> {
    let v = particle.velocity();
    let reflected = v - 2.0 * v.dot(&hit.normal) * hit.normal;
    particle.set_velocity(reflected)
}
