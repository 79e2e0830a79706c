#![warn(missing_docs)]
//! Immutable description of all surfaces a particle may interact with.
//!
//! A [`Scene`] is assembled with a [`SceneBuilder`] and validated once. Surfaces are stored in an arena and referenced by
//! [`SurfaceId`] handles which follow the registration order. The mirror channels are additionally kept sorted by
//! transverse axis and radius, which allows the tracer to restrict the intersection tests to the mirrors next to a
//! particle.
use std::ops::Range;

use itertools::Itertools;
use log::{info, warn};
use strum::IntoEnumIterator;
use uom::si::f64::Length;

use crate::{
    collision::{bracket_by, Bracket},
    error::{NmoError, NmoResult},
    particle::Particle,
    surface::{
        DetectorBinning, DetectorPlane, Disk, DiskMode, MirrorChannel, Surface, SurfaceId,
        TransverseAxis,
    },
};

/// Default maximum number of mirror channels of a [`Scene`]
pub const MAX_MIRROR_CHANNELS: usize = 1024;
/// Default maximum number of disks of a [`Scene`]
pub const MAX_DISKS: usize = 64;
/// Default maximum number of detectors of a [`Scene`]
pub const MAX_DETECTORS: usize = 16;

/// Builder for a [`Scene`].
#[derive(Debug)]
pub struct SceneBuilder {
    surfaces: Vec<Surface>,
    max_mirrors: usize,
    max_disks: usize,
    max_detectors: usize,
    mirrors: usize,
    disks: usize,
    detectors: usize,
}
impl Default for SceneBuilder {
    fn default() -> Self {
        Self::with_capacity(MAX_MIRROR_CHANNELS, MAX_DISKS, MAX_DETECTORS)
    }
}
impl SceneBuilder {
    /// Create a new [`SceneBuilder`] with the default capacities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Create a new [`SceneBuilder`] with the given capacities.
    #[must_use]
    pub const fn with_capacity(mirrors: usize, disks: usize, detectors: usize) -> Self {
        Self {
            surfaces: Vec::new(),
            max_mirrors: mirrors,
            max_disks: disks,
            max_detectors: detectors,
            mirrors: 0,
            disks: 0,
            detectors: 0,
        }
    }
    fn push(&mut self, surface: Surface) -> SurfaceId {
        self.surfaces.push(surface);
        SurfaceId(self.surfaces.len() - 1)
    }
    /// Add a mirror channel.
    ///
    /// # Errors
    ///
    /// This function will return an error if the mirror capacity is exhausted.
    pub fn add_mirror_channel(&mut self, channel: MirrorChannel) -> NmoResult<SurfaceId> {
        if self.mirrors >= self.max_mirrors {
            return Err(NmoError::CapacityExceeded(format!(
                "scene holds at most {} mirror channels",
                self.max_mirrors
            )));
        }
        self.mirrors += 1;
        Ok(self.push(Surface::Mirror(channel)))
    }
    /// Add a disk at position `z` with the given `extent` (half width, half height).
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the disk capacity is exhausted
    ///   - the z position is not finite
    pub fn add_disk(
        &mut self,
        z: Length,
        extent: (Length, Length),
        mode: DiskMode,
    ) -> NmoResult<SurfaceId> {
        if self.disks >= self.max_disks {
            return Err(NmoError::CapacityExceeded(format!(
                "scene holds at most {} disks",
                self.max_disks
            )));
        }
        let disk = Disk::new(z, extent, mode)?;
        self.disks += 1;
        Ok(self.push(Surface::Disk(disk)))
    }
    /// Add a detector plane at position `z` with the given `extent` (half width, half height).
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the detector capacity is exhausted
    ///   - the z position is not finite
    pub fn add_detector(
        &mut self,
        z: Length,
        extent: (Length, Length),
        label: &str,
        binning: Option<DetectorBinning>,
    ) -> NmoResult<SurfaceId> {
        if self.detectors >= self.max_detectors {
            return Err(NmoError::CapacityExceeded(format!(
                "scene holds at most {} detectors",
                self.max_detectors
            )));
        }
        let detector = DetectorPlane::new(label, z, extent, binning)?;
        self.detectors += 1;
        Ok(self.push(Surface::Detector(detector)))
    }
    /// Ids of the channels of one transverse axis in ascending radius order.
    fn sorted_channels(&self, axis: TransverseAxis) -> NmoResult<Vec<SurfaceId>> {
        let (mut ids, radii): (Vec<SurfaceId>, Vec<f64>) = self
            .surfaces
            .iter()
            .enumerate()
            .filter_map(|(idx, surface)| match surface {
                Surface::Mirror(m) if m.axis() == axis => {
                    Some((SurfaceId(idx), m.nominal_radius().unwrap_or(f64::NAN)))
                }
                _ => None,
            })
            .unzip();
        let ascending = radii.iter().tuple_windows().all(|(a, b)| a < b);
        let descending = radii.iter().tuple_windows().all(|(a, b)| a > b);
        if !ascending && !descending {
            return Err(NmoError::Configuration(format!(
                "nominal radii of the {axis} focusing mirror channels must be strictly monotonic"
            )));
        }
        if descending && ids.len() > 1 {
            ids.reverse();
        }
        Ok(ids)
    }
    /// Validate all surfaces and build the [`Scene`].
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - any surface is invalid
    ///   - the nominal radii of the mirror channels of one transverse axis are not strictly monotonic in registration
    ///     order
    pub fn build(self) -> NmoResult<Scene> {
        let mut channels = Vec::with_capacity(self.mirrors);
        let mut others = Vec::with_capacity(self.disks + self.detectors);
        let mut detectors = Vec::with_capacity(self.detectors);
        for (idx, surface) in self.surfaces.iter().enumerate() {
            match surface {
                Surface::Mirror(m) => {
                    m.validate()?;
                }
                Surface::Disk(d) => {
                    d.validate()?;
                    others.push(SurfaceId(idx));
                }
                Surface::Detector(d) => {
                    d.validate()?;
                    others.push(SurfaceId(idx));
                    detectors.push(SurfaceId(idx));
                }
            }
        }
        for axis in TransverseAxis::iter() {
            channels.extend(self.sorted_channels(axis)?);
        }
        let mut scene = Scene {
            surfaces: self.surfaces,
            channels,
            others,
            detectors,
            uniform: None,
        };
        scene.uniform = scene.uniform_channel_extent();
        info!(
            "scene: {} mirror channels, {} disks, {} detectors, narrowed collision search: {}",
            scene.channels.len(),
            self.disks,
            scene.detectors.len(),
            scene.uniform.is_some()
        );
        Ok(scene)
    }
}

/// Common geometry of all channels allowing a narrowed search.
#[derive(Debug, Clone, Copy)]
struct UniformExtent {
    axis: TransverseAxis,
    zs: f64,
    ze: f64,
    half_height: f64,
}

/// Mirror channels which have to be checked for an intersection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelWindow {
    /// no channel can be hit
    Empty,
    /// the channels with the given indices (in ascending radius order)
    Range(Range<usize>),
    /// all channels
    All,
}

/// Validated, immutable collection of surfaces.
#[derive(Debug)]
pub struct Scene {
    surfaces: Vec<Surface>,
    channels: Vec<SurfaceId>,
    others: Vec<SurfaceId>,
    detectors: Vec<SurfaceId>,
    uniform: Option<UniformExtent>,
}
impl Scene {
    fn mirror(&self, ascending_idx: usize) -> Option<&MirrorChannel> {
        match self.surfaces.get(self.channels.get(ascending_idx)?.0)? {
            Surface::Mirror(m) => Some(m),
            _ => None,
        }
    }
    fn uniform_channel_extent(&self) -> Option<UniformExtent> {
        let first = self.mirror(0)?;
        let axis = first.axis();
        let (zs, ze) = first.bounds();
        let half_height = first.half_height();
        #[allow(clippy::float_cmp)]
        let same_extent = (0..self.channels.len()).all(|i| {
            self.mirror(i).is_some_and(|m| {
                m.axis() == axis && m.bounds() == (zs, ze) && m.half_height() == half_height
            })
        });
        if !same_extent {
            return None;
        }
        // the walls must not cross within the common extent
        for z in [zs, ze] {
            let radii: Option<Vec<f64>> = (0..self.channels.len())
                .map(|i| self.mirror(i).and_then(|m| m.radius_at(z)))
                .collect();
            if !radii.is_some_and(|r| r.iter().tuple_windows().all(|(a, b)| a < b)) {
                warn!("mirror channels are not nested at z={z} m, using exhaustive collision search");
                return None;
            }
        }
        Some(UniformExtent {
            axis,
            zs,
            ze,
            half_height,
        })
    }
    /// Returns all surfaces of this [`Scene`] in registration order.
    #[must_use]
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }
    /// Returns the surface with the given [`SurfaceId`].
    #[must_use]
    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(id.0)
    }
    /// Returns the ids of all mirror channels, horizontally focusing channels first, each group sorted by ascending
    /// nominal radius.
    #[must_use]
    pub fn channels(&self) -> &[SurfaceId] {
        &self.channels
    }
    /// Returns the ids of all disks and detectors in registration order.
    #[must_use]
    pub fn non_channel_surfaces(&self) -> &[SurfaceId] {
        &self.others
    }
    /// Returns the ids of all detectors in registration order.
    #[must_use]
    pub fn detectors(&self) -> &[SurfaceId] {
        &self.detectors
    }
    /// Returns the position of a detector in [`detectors`](Self::detectors).
    #[must_use]
    pub fn detector_slot(&self, id: SurfaceId) -> Option<usize> {
        self.detectors.iter().position(|d| *d == id)
    }
    /// Returns the detector planes in registration order.
    pub fn detector_planes(&self) -> impl Iterator<Item = &DetectorPlane> {
        self.detectors.iter().filter_map(|id| match &self.surfaces[id.0] {
            Surface::Detector(d) => Some(d),
            _ => None,
        })
    }
    /// Returns `true` if all mirror channels focus along the same axis, share one axial and lateral extent and are
    /// nested within it.
    ///
    /// Only then the tracer may restrict the intersection tests to the neighbourhood of a particle.
    #[must_use]
    pub fn has_uniform_channels(&self) -> bool {
        self.uniform.is_some()
    }
    /// Returns the common axial extent `(zs, ze)` (in meters) of all channels, if any.
    #[must_use]
    pub fn channel_range(&self) -> Option<(f64, f64)> {
        self.uniform.map(|u| (u.zs, u.ze))
    }
    /// Locate a point `(z, r)` (in meters) within the nested channels, `r` being the transverse coordinate.
    ///
    /// The index refers to the ascending channel order. Returns [`Bracket::Miss`] if the channels do not share a
    /// common extent.
    #[must_use]
    pub fn bracket_channel(&self, z: f64, r: f64) -> Bracket {
        if self.uniform.is_none() {
            return Bracket::Miss;
        }
        bracket_by(self.channels.len(), r, |i| {
            self.mirror(i)
                .and_then(|m| m.radius_at(z))
                .unwrap_or(f64::NAN)
        })
    }
    /// Determine the mirror channels a particle may hit next.
    ///
    /// The particle is projected onto the entrance (or exit) plane of the channels if it is outside their axial extent.
    /// The window covers both walls of the gap found by [`bracket_channel`](Self::bracket_channel) plus one neighbour
    /// on each side.
    #[must_use]
    pub fn channel_window(&self, particle: &Particle) -> ChannelWindow {
        let n = self.channels.len();
        if n == 0 {
            return ChannelWindow::Empty;
        }
        let Some(uniform) = self.uniform else {
            return ChannelWindow::All;
        };
        let pos = particle.position_m();
        let vel = particle.velocity();
        let reference = if pos.z < uniform.zs {
            if vel.z <= 0.0 {
                return ChannelWindow::Empty;
            }
            particle.position_after((uniform.zs - pos.z) / vel.z)
        } else if pos.z > uniform.ze {
            if vel.z >= 0.0 {
                return ChannelWindow::Empty;
            }
            particle.position_after((uniform.ze - pos.z) / vel.z)
        } else {
            pos
        };
        let (r, w) = uniform.axis.split(&reference.coords);
        // particles outside the lateral extent may enter the channels from the side
        if w.abs() > uniform.half_height || !r.is_finite() {
            return ChannelWindow::All;
        }
        let z = reference.z.clamp(uniform.zs, uniform.ze);
        match self.bracket_channel(z, r) {
            Bracket::Channel(i) => ChannelWindow::Range(i.saturating_sub(1)..(i + 3).min(n)),
            Bracket::Miss => {
                let below = self
                    .mirror(0)
                    .and_then(|m| m.radius_at(z))
                    .is_some_and(|r0| r < r0);
                if below {
                    ChannelWindow::Range(0..2.min(n))
                } else {
                    ChannelWindow::Range(n.saturating_sub(2)..n)
                }
            }
        }
    }
}
