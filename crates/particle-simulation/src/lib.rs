//! # Particle Simulation Engine
//!
//! CPU simulation of the particle swarm: partitions the particles into
//! batches, advances each batch on its own worker thread and waits for all of
//! them at a completion barrier before handing positions back to the caller.

pub mod error;
pub mod integrator;
pub mod params;
pub mod partition;
pub mod simulation;

pub use error::*;
pub use integrator::*;
pub use params::*;
pub use partition::*;
pub use simulation::*;
