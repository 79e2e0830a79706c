#![warn(missing_docs)]
//! Configuration of a complete simulation read from a YAML file.
//!
//! Lengths are given in meters. A minimal configuration only needs the mirror assembly and the source:
//!
//! ```yaml
//! assembly:
//!   count: 5
//!   outer_radius: 0.05
//!   near_focus: -6.0
//!   far_focus: 6.0
//!   bank_start: -0.5
//!   bank_end: 0.5
//! source:
//!   center: [0.0, 0.0, -6.0]
//!   half_extent: [0.0, 0.0]
//!   aim_z: -0.5
//!   aim_half_extent: [0.06, 0.06]
//!   wavelength: [4.0e-10, 6.0e-10]
//! ```
//!
//! Horizontally and vertically focusing banks are installed in series by adding a `second_assembly` with
//! `axis: Y`.
use std::{
    fs,
    path::{Path, PathBuf},
};

use log::info;
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

use crate::{
    assembly::{ConicProfile, MirrorAssemblyBuilder},
    coatings::{CoatingType, SupermirrorParams},
    error::{NmoError, NmoResult},
    millimeter,
    mirror_table::MirrorTable,
    scene::{Scene, SceneBuilder},
    simulation::RunConfig,
    source::RectangularSource,
    substrate::Substrate,
    surface::{DetectorBinning, DiskMode, MirrorChannel, TransverseAxis},
    tracer::TraceConfig,
};

/// Geometry and coatings of the nested mirror assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// number of mirrors
    pub count: usize,
    /// radius of the outermost mirror at the defining plane
    pub outer_radius: Length,
    /// near focal point `LStart`
    pub near_focus: Length,
    /// far focal point `LEnd`
    pub far_focus: Length,
    /// start of the mirror bank `lStart`
    pub bank_start: Length,
    /// end of the mirror bank `lEnd`
    pub bank_end: Length,
    /// transverse axis along which the mirrors focus (default: `X`, horizontal focusing)
    #[serde(default)]
    pub axis: TransverseAxis,
    /// z position of the defining point of the outermost mirror (default: `bank_start`)
    #[serde(default)]
    pub defining_z: Option<Length>,
    /// plane at which radii are reported and tabulated radii are given (default: `bank_start`)
    #[serde(default)]
    pub extraction_plane: Option<Length>,
    /// half extent of the mirrors along their extrusion axis (default: unbounded)
    #[serde(default)]
    pub half_height: Option<Length>,
    /// allow reflections off the back face of the mirrors
    #[serde(default)]
    pub double_reflections: bool,
    /// coating of the concave mirror faces
    #[serde(default)]
    pub front_coating: CoatingType,
    /// coating of the outer mirror faces
    #[serde(default)]
    pub back_coating: CoatingType,
    /// optional table of mirror radii and m-values replacing the analytic construction
    #[serde(default)]
    pub mirror_table: Option<PathBuf>,
}
impl AssemblyConfig {
    fn foci(&self) -> (Length, Length) {
        (self.near_focus, self.far_focus)
    }
    fn extraction_plane(&self) -> Length {
        self.extraction_plane.unwrap_or(self.bank_start)
    }
    /// Conic profiles with their (front, back) coatings, ordered from the outermost to the innermost mirror.
    ///
    /// An existing mirror table takes precedence over the analytic construction. Its m-values override the configured
    /// coatings by supermirror coatings.
    ///
    /// # Errors
    ///
    /// This function will return an error if the table cannot be read or the mirrors cannot be constructed.
    pub fn mirrors(&self) -> NmoResult<Vec<(ConicProfile, CoatingType, CoatingType)>> {
        let table = match &self.mirror_table {
            Some(path) => MirrorTable::read_optional(path)?,
            None => None,
        };
        if let Some(table) = table {
            info!("using {} tabulated mirrors", table.len());
            let profiles = table.profiles(self.extraction_plane(), self.foci())?;
            let coating = |m: Option<f64>, default: CoatingType| {
                m.map_or(default, |m| CoatingType::Supermirror(SupermirrorParams::with_m(m)))
            };
            return Ok(table
                .rows()
                .iter()
                .zip(profiles)
                .map(|(row, profile)| {
                    (
                        profile,
                        coating(row.front_m, self.front_coating),
                        coating(row.back_m, self.back_coating),
                    )
                })
                .collect());
        }
        let assembly = MirrorAssemblyBuilder::new(
            self.count,
            self.outer_radius,
            self.foci(),
            (self.bank_start, self.bank_end),
        )
        .with_defining_point(
            self.defining_z.unwrap_or(self.bank_start),
            self.outer_radius,
        )
        .with_extraction_plane(self.extraction_plane())
        .build()?;
        Ok(assembly
            .profiles()
            .iter()
            .map(|p| (*p, self.front_coating, self.back_coating))
            .collect())
    }
}

/// Refraction into the mirror substrates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstrateConfig {
    /// enable refraction and transport through the silicon substrate
    pub refraction: bool,
    /// substrate thickness
    pub thickness: Length,
}
impl Default for SubstrateConfig {
    fn default() -> Self {
        Self {
            refraction: false,
            thickness: millimeter!(0.3),
        }
    }
}

/// A disk of the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskConfig {
    /// z position
    pub z: Length,
    /// half width in x
    pub half_width: Length,
    /// half height in y
    pub half_height: Length,
    /// behaviour of the disk
    #[serde(default)]
    pub mode: DiskMode,
}

/// A detector of the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// unique label
    pub label: String,
    /// z position
    pub z: Length,
    /// half width in x
    pub half_width: Length,
    /// half height in y
    pub half_height: Length,
    /// optional 2D histogram
    #[serde(default)]
    pub binning: Option<DetectorBinning>,
}

/// Complete configuration of a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NmoConfig {
    /// nested mirror assembly
    pub assembly: AssemblyConfig,
    /// optional second assembly installed in series, usually focusing along the other transverse axis
    #[serde(default)]
    pub second_assembly: Option<AssemblyConfig>,
    /// substrate model
    #[serde(default)]
    pub substrate: SubstrateConfig,
    /// disks (slits, beam stops, reference planes)
    #[serde(default)]
    pub disks: Vec<DiskConfig>,
    /// detector planes
    #[serde(default)]
    pub detectors: Vec<DetectorConfig>,
    /// beam source
    pub source: RectangularSource,
    /// tracer settings
    #[serde(default)]
    pub trace: TraceConfig,
    /// run settings
    #[serde(default)]
    pub run: RunConfig,
}
impl NmoConfig {
    /// Returns the mirror assemblies in installation order.
    pub fn assemblies(&self) -> impl Iterator<Item = &AssemblyConfig> {
        std::iter::once(&self.assembly).chain(self.second_assembly.as_ref())
    }
    /// Parse a configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// This function will return an error if the string is not a valid configuration.
    pub fn from_yaml(yaml: &str) -> NmoResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| NmoError::Configuration(format!("parsing of configuration failed: {e}")))?;
        config.source.validate()?;
        Ok(config)
    }
    /// Read a configuration from a YAML file.
    ///
    /// Relative mirror table paths are resolved relative to the directory of the configuration file.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file cannot be read or is not a valid configuration.
    pub fn from_file(path: &Path) -> NmoResult<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| NmoError::Io(format!("cannot read file {}: {e}", path.display())))?;
        let mut config = Self::from_yaml(&contents)?;
        if let Some(parent) = path.parent() {
            let assemblies =
                std::iter::once(&mut config.assembly).chain(config.second_assembly.as_mut());
            for assembly in assemblies {
                if let Some(table) = &mut assembly.mirror_table {
                    if table.is_relative() {
                        *table = parent.join(&*table);
                    }
                }
            }
        }
        Ok(config)
    }
    /// Tracer settings including the configured substrate model.
    ///
    /// # Errors
    ///
    /// This function will return an error if the substrate parameters are invalid.
    pub fn trace_config(&self) -> NmoResult<TraceConfig> {
        let mut trace = self.trace.clone();
        let substrate = if self.substrate.refraction {
            Some(Substrate::silicon(self.substrate.thickness)?)
        } else {
            None
        };
        trace.set_substrate(substrate)?;
        Ok(trace)
    }
    /// Construct the mirrors and assemble the [`Scene`].
    ///
    /// Mirrors are registered first (assembly by assembly, outermost to innermost), followed by the disks and the
    /// detectors in file order. Mirror indices run on across both assemblies.
    ///
    /// # Errors
    ///
    /// This function will return an error if the mirrors cannot be constructed or the scene is invalid.
    pub fn build_scene(&self) -> NmoResult<Scene> {
        let mut builder = SceneBuilder::new();
        let mut index = 0;
        for assembly in self.assemblies() {
            for (profile, front, back) in assembly.mirrors()? {
                let mut channel = MirrorChannel::new(
                    index,
                    profile,
                    (assembly.bank_start, assembly.bank_end),
                    (front, back),
                )?
                .with_axis(assembly.axis)
                .with_double_reflections(assembly.double_reflections);
                if let Some(half_height) = assembly.half_height {
                    channel = channel.with_half_height(half_height);
                }
                builder.add_mirror_channel(channel)?;
                index += 1;
            }
        }
        for disk in &self.disks {
            builder.add_disk(disk.z, (disk.half_width, disk.half_height), disk.mode)?;
        }
        for detector in &self.detectors {
            if self.detectors.iter().filter(|d| d.label == detector.label).count() > 1 {
                return Err(NmoError::Configuration(format!(
                    "detector label '{}' is not unique",
                    detector.label
                )));
            }
            builder.add_detector(
                detector.z,
                (detector.half_width, detector.half_height),
                &detector.label,
                detector.binning,
            )?;
        }
        builder.build()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::surface::Surface;
    use assert_matches::assert_matches;
    use std::io::Write;

    const MINIMAL: &str = "
assembly:
  count: 5
  outer_radius: 0.05
  near_focus: -6.0
  far_focus: 6.0
  bank_start: -0.5
  bank_end: 0.5
source:
  center: [0.0, 0.0, -6.0]
  half_extent: [0.0, 0.0]
  aim_z: -0.5
  aim_half_extent: [0.06, 0.06]
  wavelength: [4.0e-10, 6.0e-10]
";
    #[test]
    fn minimal() {
        let config = NmoConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.assembly.count, 5);
        assert_eq!(config.assembly.front_coating, CoatingType::default());
        assert!(!config.assembly.double_reflections);
        assert!(!config.substrate.refraction);
        assert!(config.disks.is_empty());
        assert_eq!(config.run, RunConfig::default());
        assert_eq!(config.trace, TraceConfig::default());
        let scene = config.build_scene().unwrap();
        assert_eq!(scene.channels().len(), 5);
        assert!(scene.has_uniform_channels());
        assert!(config.trace_config().unwrap().substrate().is_none());
    }
    #[test]
    fn full() {
        let yaml = format!(
            "{MINIMAL}substrate:
  refraction: true
  thickness: 0.0005
disks:
  - z: -0.51
    half_width: 0.06
    half_height: 0.06
    mode: Aperture
detectors:
  - label: focus
    z: 6.0
    half_width: 0.01
    half_height: 0.01
    binning:
      x_axis: {{axis: X, min: -0.01, max: 0.01, bins: 20}}
      y_axis: {{axis: Y, min: -0.01, max: 0.01, bins: 20}}
trace:
  max_interactions: 50
  exhaustive_search: true
run:
  particles: 1000
  seed: 42
"
        );
        let config = NmoConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.disks[0].mode, DiskMode::Aperture);
        assert_eq!(config.trace.max_interactions(), 50);
        assert!(config.trace.exhaustive_search());
        assert_eq!(config.run.particles(), 1000);
        assert_eq!(config.run.seed(), 42);
        assert_eq!(config.run.chunk_size(), RunConfig::default().chunk_size());
        let trace = config.trace_config().unwrap();
        assert!(trace.substrate().is_some());
        let scene = config.build_scene().unwrap();
        assert_eq!(scene.surfaces().len(), 7);
        assert_eq!(scene.detectors().len(), 1);
        assert!(scene.detector_planes().next().unwrap().binning().is_some());
    }
    #[test]
    fn coatings() {
        let yaml = MINIMAL.replace(
            "  bank_end: 0.5\n",
            "  bank_end: 0.5\n  front_coating: Perfect\n  back_coating: !ConstantR\n    reflectivity: 0.5\n  double_reflections: true\n",
        );
        let config = NmoConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.assembly.front_coating, CoatingType::Perfect);
        assert_eq!(
            config.assembly.back_coating,
            CoatingType::ConstantR { reflectivity: 0.5 }
        );
        let scene = config.build_scene().unwrap();
        assert_matches!(
            &scene.surfaces()[0],
            Surface::Mirror(m) if m.double_reflections()
        );
    }
    #[test]
    fn invalid_coating() {
        let yaml = MINIMAL.replace(
            "  bank_end: 0.5\n",
            "  bank_end: 0.5\n  front_coating: !Supermirror {m: .nan, w: -0.5}\n",
        );
        let config = NmoConfig::from_yaml(&yaml).unwrap();
        assert_matches!(
            config.build_scene(),
            Err(NmoError::Configuration(msg)) if msg == "mirror #0, front face: supermirror m must be finite"
        );
        let yaml = MINIMAL.replace(
            "  bank_end: 0.5\n",
            "  bank_end: 0.5\n  back_coating: !ConstantR {reflectivity: 7.0}\n",
        );
        let config = NmoConfig::from_yaml(&yaml).unwrap();
        assert_matches!(
            config.build_scene(),
            Err(NmoError::Configuration(msg)) if msg.starts_with("mirror #0, back face")
        );
    }
    #[test]
    fn crossed_assemblies() {
        let yaml = format!(
            "{MINIMAL}second_assembly:
  count: 3
  outer_radius: 0.04
  near_focus: -6.0
  far_focus: 7.0
  bank_start: 0.6
  bank_end: 1.2
  axis: Y
"
        );
        let config = NmoConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.assembly.axis, TransverseAxis::X);
        assert_eq!(config.assemblies().count(), 2);
        let scene = config.build_scene().unwrap();
        assert_eq!(scene.channels().len(), 8);
        assert!(!scene.has_uniform_channels());
        let vertical: Vec<usize> = scene
            .surfaces()
            .iter()
            .filter_map(|s| match s {
                Surface::Mirror(m) if m.axis() == TransverseAxis::Y => Some(m.index()),
                _ => None,
            })
            .collect();
        assert_eq!(vertical, vec![5, 6, 7]);
        assert_eq!(NmoConfig::from_yaml(MINIMAL).unwrap().assemblies().count(), 1);
    }
    #[test]
    fn broken_mirror_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mirrors.txt"), "# broken\nx y\n1 -0.1\n").unwrap();
        let yaml = MINIMAL.replace(
            "  bank_end: 0.5\n",
            "  bank_end: 0.5\n  mirror_table: mirrors.txt\n",
        );
        let config_path = dir.path().join("config.yaml");
        std::fs::write(&config_path, yaml).unwrap();
        let config = NmoConfig::from_file(&config_path).unwrap();
        assert_eq!(config.assembly.mirrors().unwrap().len(), 5);
    }
    #[test]
    fn invalid() {
        assert_matches!(NmoConfig::from_yaml("foo: bar"), Err(NmoError::Configuration(_)));
        let yaml = MINIMAL.replace("count: 5", "count: 0");
        let config = NmoConfig::from_yaml(&yaml).unwrap();
        assert_matches!(config.build_scene(), Err(NmoError::Configuration(_)));
        let yaml = MINIMAL.replace("wavelength: [4.0e-10, 6.0e-10]", "wavelength: [6.0e-10, 4.0e-10]");
        assert_matches!(NmoConfig::from_yaml(&yaml), Err(NmoError::Configuration(_)));
        let yaml = format!(
            "{MINIMAL}detectors:
  - {{label: a, z: 6.0, half_width: 0.1, half_height: 0.1}}
  - {{label: a, z: 7.0, half_width: 0.1, half_height: 0.1}}
"
        );
        let config = NmoConfig::from_yaml(&yaml).unwrap();
        assert_matches!(config.build_scene(), Err(NmoError::Configuration(_)));
    }
    #[test]
    fn mirror_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = std::fs::File::create(dir.path().join("mirrors.txt")).unwrap();
        writeln!(table, "# index radius front back").unwrap();
        writeln!(table, "0\t0.05\t3.0\t0.0").unwrap();
        writeln!(table, "1\t0.04").unwrap();
        let yaml = MINIMAL.replace(
            "  bank_end: 0.5\n",
            "  bank_end: 0.5\n  mirror_table: mirrors.txt\n",
        );
        let config_path = dir.path().join("config.yaml");
        std::fs::write(&config_path, yaml).unwrap();
        let config = NmoConfig::from_file(&config_path).unwrap();
        let mirrors = config.assembly.mirrors().unwrap();
        assert_eq!(mirrors.len(), 2);
        assert_eq!(
            mirrors[0].1,
            CoatingType::Supermirror(SupermirrorParams::with_m(3.0))
        );
        assert_eq!(
            mirrors[0].2,
            CoatingType::Supermirror(SupermirrorParams::with_m(0.0))
        );
        assert_eq!(mirrors[1].1, CoatingType::default());
        assert_eq!(config.build_scene().unwrap().channels().len(), 2);

        // missing table: analytic construction
        std::fs::remove_file(dir.path().join("mirrors.txt")).unwrap();
        assert_eq!(config.assembly.mirrors().unwrap().len(), 5);
    }
    #[test]
    fn missing_file() {
        assert_matches!(
            NmoConfig::from_file(Path::new("./does_not_exist.yaml")),
            Err(NmoError::Io(_))
        );
    }
}
