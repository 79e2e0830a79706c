use clap::Parser;
use log::info;
use nmo_tracer::{
    config::NmoConfig,
    console::{Args, PartialArgs},
    error::NmoResult,
    simulation::{RunControl, Simulation},
};

fn main() -> NmoResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    //parse CLI arguments
    let args = Args::try_from(PartialArgs::parse())?;

    //read configuration and assemble the scene
    let mut config = NmoConfig::from_file(&args.config)?;
    args.apply(&mut config.run);
    let scene = config.build_scene()?;
    let trace = config.trace_config()?;

    //trace all particles
    let report = Simulation::new(&scene, &trace, &config.run).run(&config.source, &RunControl::new())?;

    //write results
    report.save_yaml(&args.output)?;
    info!("report written to {}", args.output.display());
    if let Some(csv_dir) = &args.csv_dir {
        report.write_csv(csv_dir)?;
        info!("histograms written to {}", csv_dir.display());
    }
    Ok(())
}
