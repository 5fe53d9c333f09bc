//! Physical constants and defaults for the particle swarm
//!
//! Units are arbitrary simulation units: distance units, seconds, and
//! distance units per second squared for the radial pull.

/// Number of particles simulated when nothing else is configured
pub const DEFAULT_PARTICLE_COUNT: usize = 1_000_000;

/// Worker threads used per tick when nothing else is configured
pub const DEFAULT_WORKERS: usize = 4;

/// Fixed integration timestep (seconds)
pub const TIMESTEP: f32 = 0.01;

/// Magnitude of the radial pull towards the origin
pub const GRAVITY: f32 = 9.0;

/// Half-width of the cube initial positions are sampled from
pub const POSITION_BOUND: f32 = 32.0;

/// Half-width of the cube initial velocities are sampled from
pub const VELOCITY_BOUND: f32 = 10.0;

/// Largest cube half-width that can be sampled; the full width must stay finite
pub const MAX_BOUND: f32 = f32::MAX / 2.0;

/// Homogeneous coordinate carried by every position
pub const POSITION_W: f32 = 1.0;

/// Homogeneous coordinate carried by every velocity
pub const VELOCITY_W: f32 = 0.0;

/// Bytes per particle in the uploaded position buffer (4 x f32)
pub const PARTICLE_STRIDE_BYTES: usize = 16;
