use approx::assert_relative_eq;
use nalgebra::vector;
use nmo_tracer::{
    angstrom,
    assembly::{ConicProfile, MirrorAssemblyBuilder},
    coatings::CoatingType,
    collision::Bracket,
    detector::DetectorSet,
    error::NmoResult,
    meter,
    particle::Particle,
    scene::{Scene, SceneBuilder},
    simulation::{RunConfig, RunControl, Simulation},
    source::{BeamSource, RectangularSource},
    substrate::Substrate,
    surface::{MirrorChannel, Surface, SurfaceId, TransverseAxis},
    tracer::{RayTracer, TraceConfig, TraceState},
};
use rand::{rngs::StdRng, RngCore, SeedableRng};

fn assembly_scene(count: usize, coating: CoatingType, double_reflections: bool) -> Scene {
    let assembly = MirrorAssemblyBuilder::new(
        count,
        meter!(0.05),
        (meter!(-6.0), meter!(6.0)),
        (meter!(-0.5), meter!(0.5)),
    )
    .with_defining_point(meter!(0.0), meter!(0.05))
    .with_extraction_plane(meter!(0.0))
    .build()
    .unwrap();
    let mut builder = SceneBuilder::new();
    for (i, profile) in assembly.profiles().iter().enumerate() {
        builder
            .add_mirror_channel(
                MirrorChannel::new(i, *profile, (meter!(-0.5), meter!(0.5)), (coating, coating))
                    .unwrap()
                    .with_double_reflections(double_reflections),
            )
            .unwrap();
    }
    builder
        .add_detector(meter!(6.0), (meter!(100.0), meter!(100.0)), "focus", None)
        .unwrap();
    builder.build().unwrap()
}
fn outermost(scene: &Scene) -> &MirrorChannel {
    match scene.surface(*scene.channels().last().unwrap()).unwrap() {
        Surface::Mirror(m) => m,
        _ => unreachable!(),
    }
}
fn source() -> RectangularSource {
    RectangularSource::new(
        meter!(0.0, 0.0, -6.0),
        (meter!(0.0), meter!(0.0)),
        meter!(-0.5),
        (meter!(0.05), meter!(0.05)),
        (angstrom!(3.0), angstrom!(8.0)),
    )
    .unwrap()
}

#[test]
fn five_mirrors_focus() {
    let scene = assembly_scene(5, CoatingType::Perfect, false);
    assert_eq!(scene.channels().len(), 5);
    let mirror = outermost(&scene);
    let x = mirror.radius_at(-0.4).unwrap();
    let config = TraceConfig::default();
    let tracer = RayTracer::new(&scene, &config);
    let mut particle = Particle::new(meter!(0.0, 0.0, -6.0), vector![x / 5.6 * 1000.0, 0.0, 1000.0]).unwrap();
    let (id, hit) = tracer.find_next_hit(&particle).unwrap();
    assert_eq!(id, *scene.channels().last().unwrap());
    assert_relative_eq!(hit.point.z, -0.4, epsilon = 1.0e-9);

    let mut detectors = DetectorSet::new(&scene);
    let outcome = tracer.trace(&mut particle, &mut StdRng::seed_from_u64(0), &mut detectors);
    assert_eq!(outcome.state, TraceState::Exited);
    assert_eq!(outcome.interactions, 2);
    let v = particle.velocity();
    // single reflection towards the far focus, i.e. at a small angle to the optical axis
    assert!(v.x < 0.0);
    assert!((v.x / v.z).abs() < 0.01);
    assert_relative_eq!(particle.position_m().x, 0.0, epsilon = 1.0e-9);
}
#[test]
fn single_mirror() {
    let scene = assembly_scene(1, CoatingType::Perfect, false);
    assert_eq!(scene.channels().len(), 1);
    let r = outermost(&scene).radius_at(0.0).unwrap();
    assert_relative_eq!(r, 0.05, max_relative = 1.0e-12);
    assert_eq!(scene.bracket_channel(0.0, r), Bracket::Channel(0));
    assert_eq!(scene.bracket_channel(0.0, 0.01), Bracket::Miss);
    assert_eq!(scene.bracket_channel(0.0, 0.06), Bracket::Miss);

    let config = TraceConfig::default();
    let tracer = RayTracer::new(&scene, &config);
    let mut particle = Particle::new(meter!(0.0, 0.0, -6.0), vector![r / 6.0 * 1000.0, 0.0, 1000.0]).unwrap();
    let outcome = tracer.trace(&mut particle, &mut StdRng::seed_from_u64(0), &mut DetectorSet::new(&scene));
    assert_eq!(outcome.interactions, 2);
    assert_relative_eq!(particle.position_m().x, 0.0, epsilon = 1.0e-9);
}
#[test]
fn crossed_banks_focus_to_a_point() {
    let foci = (meter!(-6.0), meter!(6.0));
    let horizontal = ConicProfile::through_point(meter!(-0.75), meter!(0.05), foci.0, foci.1).unwrap();
    let vertical = ConicProfile::through_point(meter!(0.75), meter!(0.05), foci.0, foci.1).unwrap();
    let perfect = (CoatingType::Perfect, CoatingType::Perfect);
    let mut builder = SceneBuilder::new();
    builder
        .add_mirror_channel(
            MirrorChannel::new(0, horizontal, (meter!(-1.0), meter!(-0.5)), perfect).unwrap(),
        )
        .unwrap();
    builder
        .add_mirror_channel(
            MirrorChannel::new(1, vertical, (meter!(0.5), meter!(1.0)), perfect)
                .unwrap()
                .with_axis(TransverseAxis::Y),
        )
        .unwrap();
    let focus = builder
        .add_detector(meter!(6.0), (meter!(0.01), meter!(0.01)), "focus", None)
        .unwrap();
    let scene = builder.build().unwrap();
    assert!(!scene.has_uniform_channels());

    let config = TraceConfig::default();
    let tracer = RayTracer::new(&scene, &config);
    let mut particle = Particle::new(
        meter!(0.0, 0.0, -6.0),
        vector![0.05 / 5.25 * 1000.0, 0.05 / 6.75 * 1000.0, 1000.0],
    )
    .unwrap();
    let (id, hit) = tracer.find_next_hit(&particle).unwrap();
    assert_eq!(id, SurfaceId(0));
    assert!((-1.0..=-0.5).contains(&hit.point.z));
    let outcome = tracer.trace(&mut particle, &mut StdRng::seed_from_u64(0), &mut DetectorSet::new(&scene));
    assert_eq!(outcome.state, TraceState::Exited);
    assert_eq!(outcome.detector, Some(focus));
    // one reflection in each bank
    assert_eq!(outcome.interactions, 3);
    let v = particle.velocity();
    assert!(v.x < 0.0);
    assert!(v.y < 0.0);
    let pos = particle.position_m();
    assert_relative_eq!(pos.x, 0.0, epsilon = 1.0e-4);
    assert_relative_eq!(pos.y, 0.0, epsilon = 1.0e-4);
}
#[test]
fn tangent_trajectory_is_a_miss() {
    let scene = assembly_scene(3, CoatingType::Perfect, false);
    let r = outermost(&scene).radius_at(0.0).unwrap();
    let config = TraceConfig::default();
    let tracer = RayTracer::new(&scene, &config);
    let mut particle = Particle::new(meter!(r, 0.0, -0.4), vector![0.0, 0.0, 1000.0]).unwrap();
    let outcome = tracer.trace(&mut particle, &mut StdRng::seed_from_u64(0), &mut DetectorSet::new(&scene));
    assert_eq!(outcome.state, TraceState::Exited);
    assert_eq!(outcome.interactions, 1);
    assert_eq!(outcome.detector, Some(SurfaceId(3)));
    assert_eq!(particle.velocity(), vector![0.0, 0.0, 1000.0]);
}
#[test]
fn weight_conservation() {
    let scene = assembly_scene(5, CoatingType::Perfect, true);
    let trace = TraceConfig::default();
    let mut run = RunConfig::default();
    run.set_particles(2000);
    run.set_chunk_size(100).unwrap();
    let report = Simulation::new(&scene, &trace, &run)
        .run(&source(), &RunControl::new())
        .unwrap();
    assert_eq!(report.statistics.absorbed, 0);
    assert_eq!(report.anomalies.total(), 0);
    let focus = report.detector("focus").unwrap();
    assert_eq!(focus.total.n, 2000);
    assert_relative_eq!(focus.total.p, 2000.0, max_relative = 1.0e-12);
}
#[test]
fn thread_count_does_not_change_results() {
    let scene = assembly_scene(8, CoatingType::default(), false);
    let mut trace = TraceConfig::default();
    trace.set_substrate(Some(Substrate::default())).unwrap();
    let mut run = RunConfig::default();
    run.set_particles(3000);
    run.set_chunk_size(128).unwrap();
    run.set_seed(1234);
    let mut reports = Vec::new();
    for threads in [1, 3, 8] {
        run.set_threads(threads);
        reports.push(
            Simulation::new(&scene, &trace, &run)
                .run(&source(), &RunControl::new())
                .unwrap(),
        );
    }
    for report in &reports[1..] {
        assert_eq!(report.statistics, reports[0].statistics);
        assert_eq!(report.anomalies, reports[0].anomalies);
        assert_eq!(report.detectors, reports[0].detectors);
    }
}
#[test]
fn narrowed_search_agrees_with_exhaustive_search() {
    let scene = assembly_scene(10, CoatingType::default(), true);
    assert!(scene.has_uniform_channels());
    let mut run = RunConfig::default();
    run.set_particles(3000);
    run.set_seed(99);
    let narrowed = TraceConfig::default();
    let mut exhaustive = TraceConfig::default();
    exhaustive.set_exhaustive_search(true);
    let a = Simulation::new(&scene, &narrowed, &run)
        .run(&source(), &RunControl::new())
        .unwrap();
    let b = Simulation::new(&scene, &exhaustive, &run)
        .run(&source(), &RunControl::new())
        .unwrap();
    assert_eq!(a.statistics, b.statistics);
    assert_eq!(a.detectors, b.detectors);

    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..500 {
        let particle = source().sample(&mut rng).unwrap();
        let narrowed_hit = RayTracer::new(&scene, &narrowed).find_next_hit(&particle);
        let exhaustive_hit = RayTracer::new(&scene, &exhaustive).find_next_hit(&particle);
        assert_eq!(narrowed_hit, exhaustive_hit);
    }
}

struct CancellingSource {
    inner: RectangularSource,
    control: RunControl,
}
impl BeamSource for CancellingSource {
    fn sample(&self, rng: &mut dyn RngCore) -> NmoResult<Particle> {
        self.control.cancel();
        self.inner.sample(rng)
    }
}
#[test]
fn cancelled_chunks_are_skipped_entirely() {
    let scene = assembly_scene(5, CoatingType::Perfect, true);
    let trace = TraceConfig::default();
    let mut run = RunConfig::default();
    run.set_particles(1000);
    run.set_chunk_size(10).unwrap();
    run.set_threads(1);
    let control = RunControl::new();
    let source = CancellingSource {
        inner: source(),
        control: control.clone(),
    };
    let report = Simulation::new(&scene, &trace, &run)
        .run(&source, &control)
        .unwrap();
    assert!(report.cancelled);
    assert_eq!(report.statistics.traced, 10);
    assert_eq!(report.detector("focus").unwrap().total.n, 10);
}
