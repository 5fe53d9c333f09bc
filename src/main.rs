//! Headless particle swarm host
//!
//! Drives the simulation loop and hands the position buffer to a frame sink
//! every tick, the way a renderer would upload it to a GPU buffer.

mod frame;

use anyhow::Context;
use clap::Parser;
use frame::{FpsCounter, FrameSink, UploadStats};
use particle_physics::{
    DEFAULT_PARTICLE_COUNT, DEFAULT_WORKERS, GRAVITY, POSITION_BOUND, TIMESTEP, VELOCITY_BOUND,
};
use particle_simulation::{ParticleSimulation, SimulationParams};
use std::time::Duration;

const WINDOW_TITLE_PREFIX: &str = "Particles";

#[derive(Parser, Debug)]
#[command(about = "Radial-gravity particle swarm on a pool of worker threads")]
struct Args {
    /// Number of particles
    #[arg(short = 'n', long, default_value_t = DEFAULT_PARTICLE_COUNT)]
    particles: usize,

    /// Worker threads per tick
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Ticks to run; runs until killed when omitted
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Timestep in seconds
    #[arg(long, default_value_t = TIMESTEP)]
    dt: f32,

    /// Radial pull magnitude
    #[arg(long, default_value_t = GRAVITY)]
    gravity: f32,

    /// Half-width of the initial position cube
    #[arg(long, default_value_t = POSITION_BOUND)]
    position_bound: f32,

    /// Half-width of the initial velocity cube
    #[arg(long, default_value_t = VELOCITY_BOUND)]
    velocity_bound: f32,

    /// Barrier timeout in milliseconds, 0 disables it
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Seed for the initial distribution
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn params(&self) -> SimulationParams {
        SimulationParams {
            particle_count: self.particles,
            workers: self.workers,
            dt: self.dt,
            gravity: self.gravity,
            position_bound: self.position_bound,
            velocity_bound: self.velocity_bound,
            barrier_timeout: (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms)),
            seed: self.seed,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Starting particle swarm simulation...");

    let mut simulation =
        ParticleSimulation::new(args.params()).context("failed to start simulation")?;

    let mut sink = UploadStats::default();
    let mut fps = FpsCounter::new(WINDOW_TITLE_PREFIX);

    while args.ticks.map_or(true, |limit| simulation.ticks() < limit) {
        simulation
            .step()
            .with_context(|| format!("stopped after {} ticks", simulation.ticks()))?;

        sink.upload(simulation.position_bytes());
        if let Some(title) = fps.frame() {
            log::info!("{title}");
        }
    }

    log::info!(
        "Finished {} ticks, uploaded {} frames ({} bytes)",
        simulation.ticks(),
        sink.frames,
        sink.bytes
    );
    Ok(())
}
