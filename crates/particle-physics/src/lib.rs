//! # Particle Physics
//!
//! Particle state storage and the per-particle motion rule for a swarm of
//! point masses under a single-center radial pull.

pub mod constants;
pub mod forces;
pub mod particle;

pub use constants::*;
pub use forces::*;
pub use particle::*;
