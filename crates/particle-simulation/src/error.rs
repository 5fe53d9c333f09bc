//! Error types for configuration, ticks, and the simulation loop

use std::time::Duration;

use particle_physics::StateError;
use thiserror::Error;

/// Startup configuration that must never reach the simulation loop
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("particle count must be positive")]
    NoParticles,

    #[error("worker count must be positive")]
    NoWorkers,

    #[error("timestep must be finite and positive, got {0}")]
    InvalidTimestep(f32),

    #[error("gravity must be finite, got {0}")]
    InvalidGravity(f32),

    #[error("{name} bound must be finite, non-negative and at most f32::MAX / 2, got {value}")]
    InvalidBound { name: &'static str, value: f32 },

    #[error("barrier timeout must be non-zero (use no timeout to wait forever)")]
    ZeroBarrierTimeout,
}

/// A tick that did not complete cleanly
///
/// Particle state after any of these is unspecified: some batches may have been
/// advanced and others not, and batches abandoned at a timed-out barrier are
/// filled with NaN.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },

    #[error("barrier timed out after {timeout:?} with {completed}/{expected} workers done")]
    BarrierTimeout {
        timeout: Duration,
        completed: usize,
        expected: usize,
    },

    #[error("failed to spawn worker {worker}")]
    Spawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("completion channel closed with {completed}/{expected} workers done")]
    WorkerLost { completed: usize, expected: usize },

    #[error("could not rebuild particle state: {0}")]
    State(#[from] StateError),
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid particle state: {0}")]
    State(#[from] StateError),

    #[error("state holds {actual} particles, configuration expects {expected}")]
    ParticleCountMismatch { expected: usize, actual: usize },

    #[error("tick {tick} failed: {source}")]
    Tick {
        tick: u64,
        #[source]
        source: TickError,
    },

    #[error("simulation halted after a failed tick {tick}")]
    Halted { tick: u64 },
}
