//! Particle state storage
//!
//! Positions and velocities live in two parallel arrays of `Vec4`, one entry
//! per particle. The fourth lane is the homogeneous coordinate the renderer
//! expects (1 for positions, 0 for velocities); physics never reads it.

use glam::Vec4;
use rand::Rng;
use thiserror::Error;

use crate::constants::{MAX_BOUND, PARTICLE_STRIDE_BYTES, POSITION_W, VELOCITY_W};

#[derive(Debug, Error, PartialEq)]
pub enum StateError {
    #[error("position and velocity arrays differ in length ({positions} vs {velocities})")]
    LengthMismatch { positions: usize, velocities: usize },

    #[error("{name} bound must be finite, non-negative and at most f32::MAX / 2, got {value}")]
    InvalidBound { name: &'static str, value: f32 },
}

/// Position and velocity arrays for every particle in the swarm
///
/// The particle count is fixed at construction. There are no in-place
/// mutators: the integrator takes both arrays out with
/// [`ParticleState::into_parts`], hands owned batches to its workers, and
/// rebuilds the state with [`ParticleState::from_parts`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleState {
    positions: Vec<Vec4>,
    velocities: Vec<Vec4>,
}

impl ParticleState {
    /// Sample `count` particles uniformly inside the given cubes using the
    /// thread-local RNG
    pub fn initialize(
        count: usize,
        position_bound: f32,
        velocity_bound: f32,
    ) -> Result<Self, StateError> {
        Self::initialize_with_rng(count, position_bound, velocity_bound, &mut rand::rng())
    }

    /// Sample `count` particles with a caller-provided RNG
    ///
    /// Every axis is drawn independently from `[-bound, bound]`.
    pub fn initialize_with_rng<R: Rng>(
        count: usize,
        position_bound: f32,
        velocity_bound: f32,
        rng: &mut R,
    ) -> Result<Self, StateError> {
        check_bound("position", position_bound)?;
        check_bound("velocity", velocity_bound)?;

        let positions = (0..count)
            .map(|_| sample_cube(rng, position_bound).extend(POSITION_W))
            .collect();
        let velocities = (0..count)
            .map(|_| sample_cube(rng, velocity_bound).extend(VELOCITY_W))
            .collect();

        Ok(Self {
            positions,
            velocities,
        })
    }

    /// Build a state from explicit arrays
    ///
    /// The homogeneous lanes are taken as given.
    pub fn from_parts(positions: Vec<Vec4>, velocities: Vec<Vec4>) -> Result<Self, StateError> {
        if positions.len() != velocities.len() {
            return Err(StateError::LengthMismatch {
                positions: positions.len(),
                velocities: velocities.len(),
            });
        }
        Ok(Self {
            positions,
            velocities,
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec4] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec4] {
        &self.velocities
    }

    /// Positions as raw bytes, `len() * 16` long, ready for a GPU upload
    pub fn position_bytes(&self) -> &[u8] {
        let bytes: &[u8] = bytemuck::cast_slice(&self.positions);
        debug_assert_eq!(bytes.len(), self.positions.len() * PARTICLE_STRIDE_BYTES);
        bytes
    }

    /// Give up both arrays, positions first
    pub fn into_parts(self) -> (Vec<Vec4>, Vec<Vec4>) {
        (self.positions, self.velocities)
    }
}

// `random_range(-bound..=bound)` needs `2 * bound` to be finite
fn check_bound(name: &'static str, value: f32) -> Result<(), StateError> {
    if (0.0..=MAX_BOUND).contains(&value) {
        Ok(())
    } else {
        Err(StateError::InvalidBound { name, value })
    }
}

fn sample_cube<R: Rng>(rng: &mut R, bound: f32) -> glam::Vec3 {
    glam::Vec3::new(
        rng.random_range(-bound..=bound),
        rng.random_range(-bound..=bound),
        rng.random_range(-bound..=bound),
    )
}
