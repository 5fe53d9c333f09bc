//! Simulation parameters fixed at startup

use std::time::Duration;

use particle_physics::{
    DEFAULT_PARTICLE_COUNT, DEFAULT_WORKERS, GRAVITY, MAX_BOUND, POSITION_BOUND, TIMESTEP,
    VELOCITY_BOUND,
};

use crate::error::ConfigError;

/// How long the owner waits at the barrier before declaring the tick failed
pub const DEFAULT_BARRIER_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq)]
pub struct SimulationParams {
    /// Number of particles, fixed for the lifetime of the simulation
    pub particle_count: usize,
    /// Worker threads spawned per tick
    pub workers: usize,
    /// Timestep in seconds
    pub dt: f32,
    /// Magnitude of the radial pull
    pub gravity: f32,
    /// Half-width of the initial position cube
    pub position_bound: f32,
    /// Half-width of the initial velocity cube
    pub velocity_bound: f32,
    /// `None` waits at the barrier forever
    pub barrier_timeout: Option<Duration>,
    /// Seed for the initial distribution; `None` draws from the thread RNG
    pub seed: Option<u64>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            particle_count: DEFAULT_PARTICLE_COUNT,
            workers: DEFAULT_WORKERS,
            dt: TIMESTEP,
            gravity: GRAVITY,
            position_bound: POSITION_BOUND,
            velocity_bound: VELOCITY_BOUND,
            barrier_timeout: Some(DEFAULT_BARRIER_TIMEOUT),
            seed: None,
        }
    }
}

impl SimulationParams {
    /// Reject configurations the simulation loop must never start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particle_count == 0 {
            return Err(ConfigError::NoParticles);
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ConfigError::InvalidTimestep(self.dt));
        }
        if !self.gravity.is_finite() {
            return Err(ConfigError::InvalidGravity(self.gravity));
        }
        for (name, value) in [
            ("position", self.position_bound),
            ("velocity", self.velocity_bound),
        ] {
            if !(0.0..=MAX_BOUND).contains(&value) {
                return Err(ConfigError::InvalidBound { name, value });
            }
        }
        if self.barrier_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroBarrierTimeout);
        }
        Ok(())
    }
}
