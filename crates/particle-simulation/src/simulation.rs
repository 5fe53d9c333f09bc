//! CPU particle simulation owner
//!
//! `ParticleSimulation` owns the particle arrays for the whole run. During a
//! tick it hands them to the integrator's workers as owned batches and gets
//! them back at the barrier; between ticks the host may read positions for
//! upload.
//!
//! A failed tick halts the simulation: the state may be half advanced, so
//! further steps are refused instead of serving it as progress.

use std::num::NonZeroUsize;
use std::sync::Arc;

use glam::Vec4;
use particle_physics::{MotionRule, ParticleState, RadialGravity};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{ConfigError, SimulationError};
use crate::integrator::{ParallelIntegrator, TickReport};
use crate::params::SimulationParams;

pub struct ParticleSimulation<R: MotionRule = RadialGravity> {
    params: SimulationParams,
    state: ParticleState,
    integrator: ParallelIntegrator,
    rule: Arc<R>,
    ticks: u64,
    halted: bool,
}

impl ParticleSimulation<RadialGravity> {
    /// Validate `params` and initialize a random swarm
    pub fn new(params: SimulationParams) -> Result<Self, SimulationError> {
        let rule = RadialGravity::new(params.dt, params.gravity);
        Self::with_rule(params, rule)
    }
}

impl<R: MotionRule + Send + 'static> ParticleSimulation<R> {
    /// Like [`ParticleSimulation::new`] but advancing particles with `rule`
    pub fn with_rule(params: SimulationParams, rule: R) -> Result<Self, SimulationError> {
        params.validate()?;

        log::info!("Initializing ParticleSimulation...");
        let state = match params.seed {
            Some(seed) => ParticleState::initialize_with_rng(
                params.particle_count,
                params.position_bound,
                params.velocity_bound,
                &mut StdRng::seed_from_u64(seed),
            )?,
            None => ParticleState::initialize(
                params.particle_count,
                params.position_bound,
                params.velocity_bound,
            )?,
        };

        Self::build(params, state, rule)
    }

    /// Start from an existing state
    ///
    /// The state's length must match `params.particle_count`.
    pub fn from_state(
        params: SimulationParams,
        state: ParticleState,
        rule: R,
    ) -> Result<Self, SimulationError> {
        params.validate()?;
        Self::build(params, state, rule)
    }

    /// Assemble an already validated configuration
    fn build(
        params: SimulationParams,
        state: ParticleState,
        rule: R,
    ) -> Result<Self, SimulationError> {
        if state.len() != params.particle_count {
            return Err(SimulationError::ParticleCountMismatch {
                expected: params.particle_count,
                actual: state.len(),
            });
        }

        let workers = NonZeroUsize::new(params.workers).ok_or(ConfigError::NoWorkers)?;
        let integrator = ParallelIntegrator::new(workers, params.barrier_timeout);

        log::info!(
            "✓ {} particles, {} workers, dt={}, gravity={}",
            state.len(),
            params.workers,
            params.dt,
            params.gravity
        );
        if let Some(timeout) = params.barrier_timeout {
            log::info!("  Barrier timeout: {:?}", timeout);
        }

        Ok(Self {
            params,
            state,
            integrator,
            rule: Arc::new(rule),
            ticks: 0,
            halted: false,
        })
    }

    /// Advance the swarm by one timestep
    pub fn step(&mut self) -> Result<TickReport, SimulationError> {
        if self.halted {
            return Err(SimulationError::Halted { tick: self.ticks });
        }

        match self.integrator.tick(&mut self.state, &self.rule) {
            Ok(report) => {
                self.ticks += 1;
                Ok(report)
            }
            Err(source) => {
                self.halted = true;
                log::error!("Simulation halted at tick {}: {}", self.ticks, source);
                Err(SimulationError::Tick {
                    tick: self.ticks,
                    source,
                })
            }
        }
    }

    /// Run `ticks` steps, stopping at the first failure
    pub fn run(&mut self, ticks: u64) -> Result<(), SimulationError> {
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(())
    }

    pub fn positions(&self) -> &[Vec4] {
        self.state.positions()
    }

    /// Position buffer in GPU layout, `particle_count * 16` bytes
    pub fn position_bytes(&self) -> &[u8] {
        self.state.position_bytes()
    }

    pub fn state(&self) -> &ParticleState {
        &self.state
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Completed ticks
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TickError;

    fn small_params() -> SimulationParams {
        SimulationParams {
            particle_count: 256,
            workers: 3,
            seed: Some(42),
            ..Default::default()
        }
    }

    #[test]
    fn test_config_error_aborts_startup() {
        let params = SimulationParams {
            workers: 0,
            ..small_params()
        };
        assert!(matches!(
            ParticleSimulation::new(params),
            Err(SimulationError::Config(ConfigError::NoWorkers))
        ));
    }

    #[test]
    fn test_seeded_runs_agree() {
        let mut a = ParticleSimulation::new(small_params()).unwrap();
        let mut b = ParticleSimulation::new(small_params()).unwrap();

        a.run(10).unwrap();
        b.run(10).unwrap();

        assert_eq!(a.ticks(), 10);
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn test_worker_count_does_not_change_result() {
        let mut one = ParticleSimulation::new(SimulationParams {
            workers: 1,
            ..small_params()
        })
        .unwrap();
        let mut many = ParticleSimulation::new(SimulationParams {
            workers: 7,
            ..small_params()
        })
        .unwrap();

        one.run(5).unwrap();
        many.run(5).unwrap();

        assert_eq!(one.positions(), many.positions());
    }

    #[test]
    fn test_state_length_must_match_params() {
        let state = ParticleState::initialize(10, 1.0, 1.0).unwrap();
        let result =
            ParticleSimulation::from_state(small_params(), state, RadialGravity::default());
        assert!(matches!(
            result,
            Err(SimulationError::ParticleCountMismatch {
                expected: 256,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_unsampleable_bound_fails_startup() {
        let params = SimulationParams {
            position_bound: 3.0e38,
            ..small_params()
        };
        assert!(matches!(
            ParticleSimulation::new(params),
            Err(SimulationError::Config(ConfigError::InvalidBound {
                name: "position",
                ..
            }))
        ));
    }

    struct AlwaysPanics;

    impl MotionRule for AlwaysPanics {
        fn advance(&self, _position: &mut Vec4, _velocity: &mut Vec4) {
            panic!("rule failure");
        }
    }

    #[test]
    fn test_failed_tick_halts() {
        let mut sim = ParticleSimulation::with_rule(small_params(), AlwaysPanics).unwrap();

        match sim.step() {
            Err(SimulationError::Tick {
                tick: 0,
                source: TickError::WorkerPanicked { .. },
            }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(sim.is_halted());
        assert_eq!(sim.ticks(), 0);
        assert!(matches!(sim.step(), Err(SimulationError::Halted { tick: 0 })));
    }
}
