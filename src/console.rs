//! Handling the NMO tracer CLI
//!
//! This module handles the command line parsing and the validation of the given paths.
use std::path::{Path, PathBuf};

use clap::{builder::Str, Parser};

use crate::{
    error::{NmoError, NmoResult},
    get_version,
    simulation::RunConfig,
};

/// Validated command line arguments of the `nmo-tracer` application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// path of the YAML configuration
    pub config: PathBuf,
    /// path of the YAML report to be written
    pub output: PathBuf,
    /// directory for the CSV export of the detector histograms
    pub csv_dir: Option<PathBuf>,
    /// overrides the number of particles of the configuration
    pub particles: Option<usize>,
    /// overrides the seed of the configuration
    pub seed: Option<u64>,
    /// overrides the number of threads of the configuration
    pub threads: Option<usize>,
}

/// Raw command line arguments as parsed by clap.
#[derive(Parser, Debug)]
#[command(author, version = Str::from(get_version()), about, long_about = None)]
pub struct PartialArgs {
    /// YAML file describing mirror assembly, scene, source and run
    #[arg(short, long)]
    config: String,

    /// number of particles (overrides the configuration)
    #[arg(short = 'n', long)]
    particles: Option<usize>,

    /// random seed (overrides the configuration)
    #[arg(short, long)]
    seed: Option<u64>,

    /// number of worker threads, 0 = all cores (overrides the configuration)
    #[arg(short, long)]
    threads: Option<usize>,

    /// report file. if not defined, `<config>_report.yaml` next to the configuration is used
    #[arg(short, long)]
    output: Option<String>,

    /// directory for CSV files of the detector histograms
    #[arg(long)]
    csv_dir: Option<String>,
}

fn config_path_is_valid(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

fn default_output(config: &Path) -> PathBuf {
    let stem = config
        .file_stem()
        .map_or_else(|| "nmo".into(), |s| s.to_string_lossy());
    config.with_file_name(format!("{stem}_report.yaml"))
}

impl TryFrom<PartialArgs> for Args {
    type Error = NmoError;

    fn try_from(part_args: PartialArgs) -> NmoResult<Self> {
        let config = PathBuf::from(&part_args.config);
        if !config_path_is_valid(&config) {
            return Err(NmoError::Configuration(format!(
                "{} is not a readable .yaml file",
                config.display()
            )));
        }
        let output = part_args
            .output
            .map_or_else(|| default_output(&config), PathBuf::from);
        Ok(Self {
            config,
            output,
            csv_dir: part_args.csv_dir.map(PathBuf::from),
            particles: part_args.particles,
            seed: part_args.seed,
            threads: part_args.threads,
        })
    }
}
impl Args {
    /// Apply the command line overrides to the given [`RunConfig`].
    pub fn apply(&self, run: &mut RunConfig) {
        if let Some(particles) = self.particles {
            run.set_particles(particles);
        }
        if let Some(seed) = self.seed {
            run.set_seed(seed);
        }
        if let Some(threads) = self.threads {
            run.set_threads(threads);
        }
    }
}
