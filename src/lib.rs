//! This is the documentation for the **nmo-tracer** package, a Monte-Carlo ray tracer for neutrons travelling through
//! **n**ested **m**irror **o**ptics (NMO).
//!
//! An assembly of confocal, elliptic mirror channels is constructed with the [`MirrorAssemblyBuilder`](assembly::MirrorAssemblyBuilder)
//! and placed in a [`Scene`](scene::Scene) together with disks and detectors. Particles drawn from a
//! [`BeamSource`](source::BeamSource) are traced by the [`RayTracer`](tracer::RayTracer), in parallel batches via the
//! [`Simulation`](simulation::Simulation).
#![allow(clippy::module_name_repetitions)]

pub mod assembly;
pub mod coatings;
pub mod collision;
pub mod config;
pub mod console;
pub mod constants;
pub mod detector;
pub mod error;
pub mod mirror_table;
pub mod particle;
pub mod scene;
pub mod simulation;
pub mod source;
pub mod substrate;
pub mod surface;
pub mod tracer;
pub mod utils;

/// Return the version information of the currently built `nmo-tracer` executable.
#[must_use]
pub fn get_version() -> String {
    format!("{} ({})", env!("CARGO_PKG_VERSION"), env!("CARGO_PKG_NAME"))
}
