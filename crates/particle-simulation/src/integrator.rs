//! Parallel integrator: fan-out over worker threads, fan-in at a barrier
//!
//! Every tick the particle arrays are moved out of the state and cut into
//! contiguous owned batches (see [`crate::partition`]), one per worker thread.
//! Each worker sends exactly one completion signal carrying its batch back,
//! whether it finished, was told to abort, or panicked. The owner blocks on
//! the completion channel until every worker has reported, then stitches the
//! batches back together in order.
//!
//! With a barrier timeout configured, the wait ends at the deadline no matter
//! what the workers are doing. The owner raises a shared abort flag, which
//! workers check every [`ABORT_CHECK_STRIDE`] particles, and returns without
//! joining them. Batches that never came back are replaced by
//! [`abandoned_position`] / [`abandoned_velocity`] so the state keeps its
//! length.

use std::any::Any;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError};
use glam::Vec4;
use particle_physics::{MotionRule, ParticleState, POSITION_W, VELOCITY_W};

use crate::error::TickError;
use crate::partition::batch_ranges;

/// Particles a worker advances between checks of the abort flag
pub const ABORT_CHECK_STRIDE: usize = 1024;

/// Placeholder for a position whose batch was abandoned at a timed-out barrier
pub fn abandoned_position() -> Vec4 {
    Vec4::new(f32::NAN, f32::NAN, f32::NAN, POSITION_W)
}

/// Placeholder for a velocity whose batch was abandoned at a timed-out barrier
pub fn abandoned_velocity() -> Vec4 {
    Vec4::new(f32::NAN, f32::NAN, f32::NAN, VELOCITY_W)
}

/// Summary of a completed tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub workers: usize,
    pub particles: usize,
    pub elapsed: Duration,
}

enum BatchOutcome {
    Done,
    Aborted,
    Panicked(String),
}

/// One worker's share of the arrays
struct Batch {
    worker: usize,
    positions: Vec<Vec4>,
    velocities: Vec<Vec4>,
}

struct CompletionSignal {
    batch: Batch,
    outcome: BatchOutcome,
}

#[derive(Debug, Clone)]
pub struct ParallelIntegrator {
    workers: NonZeroUsize,
    barrier_timeout: Option<Duration>,
}

impl ParallelIntegrator {
    pub fn new(workers: NonZeroUsize, barrier_timeout: Option<Duration>) -> Self {
        Self {
            workers,
            barrier_timeout,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers.get()
    }

    pub fn barrier_timeout(&self) -> Option<Duration> {
        self.barrier_timeout
    }

    /// Advance every particle once with `rule`
    ///
    /// On `Ok` every worker has been joined and `state` holds the advanced
    /// particles. On `Err` the state keeps its length but may be partially
    /// advanced; after a barrier timeout the stragglers are left running
    /// detached and their particles read as NaN.
    pub fn tick<R>(&self, state: &mut ParticleState, rule: &Arc<R>) -> Result<TickReport, TickError>
    where
        R: MotionRule + Send + 'static,
    {
        let started = Instant::now();
        let particles = state.len();
        let workers = self.workers.get();
        let ranges = batch_ranges(particles, workers);

        let (positions, velocities) = std::mem::take(state).into_parts();
        let mut slots: Vec<Option<Batch>> = (0..workers).map(|_| None).collect();

        let (tx, rx) = flume::bounded::<CompletionSignal>(workers);
        let abort = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(workers);
        let mut spawn_error = None;

        for batch in split_batches(positions, velocities, &ranges) {
            let worker = batch.worker;
            if spawn_error.is_some() {
                slots[worker] = Some(batch);
                continue;
            }

            let rule = Arc::clone(rule);
            let abort_flag = Arc::clone(&abort);
            let tx = tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("integrator-{worker}"))
                .spawn(move || {
                    let mut batch = batch;
                    let outcome =
                        run_batch(&*rule, &mut batch.positions, &mut batch.velocities, &abort_flag);
                    // The owner may have stopped listening after a timeout
                    let _ = tx.send(CompletionSignal { batch, outcome });
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    log::error!("failed to spawn integrator worker {worker}: {source}");
                    abort.store(true, Ordering::Relaxed);
                    spawn_error = Some(TickError::Spawn { worker, source });
                }
            }
        }
        drop(tx);

        let barrier = self.await_barrier(&rx, &abort, handles.len(), &mut slots);
        let (positions, velocities) = reassemble(slots, &ranges, particles);
        *state = ParticleState::from_parts(positions, velocities)?;

        if let Some(err) = spawn_error {
            return Err(err);
        }
        barrier?;
        join_workers(handles);

        let report = TickReport {
            workers,
            particles,
            elapsed: started.elapsed(),
        };
        log::trace!(
            "tick: {} particles over {} workers in {:?}",
            particles,
            workers,
            report.elapsed
        );
        Ok(report)
    }

    /// Collect one signal per spawned worker, parking each returned batch in
    /// its slot
    ///
    /// Returns at the deadline even if workers are still running.
    fn await_barrier(
        &self,
        rx: &Receiver<CompletionSignal>,
        abort: &AtomicBool,
        expected: usize,
        slots: &mut [Option<Batch>],
    ) -> Result<(), TickError> {
        let deadline = self.barrier_timeout.map(|timeout| Instant::now() + timeout);
        let mut completed = 0;
        let mut failure = None;

        while completed < expected {
            let signal = match deadline {
                Some(deadline) => match rx.recv_deadline(deadline) {
                    Ok(signal) => signal,
                    Err(RecvTimeoutError::Timeout) => {
                        let timeout = self.barrier_timeout.unwrap_or_default();
                        log::error!(
                            "barrier timed out after {:?}: {}/{} workers done, abandoning tick",
                            timeout,
                            completed,
                            expected
                        );
                        abort.store(true, Ordering::Relaxed);
                        return Err(failure.unwrap_or(TickError::BarrierTimeout {
                            timeout,
                            completed,
                            expected,
                        }));
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        return Err(TickError::WorkerLost {
                            completed,
                            expected,
                        })
                    }
                },
                None => rx.recv().map_err(|_| TickError::WorkerLost {
                    completed,
                    expected,
                })?,
            };
            completed += 1;

            let worker = signal.batch.worker;
            match signal.outcome {
                BatchOutcome::Done => log::trace!("worker {} done", worker),
                BatchOutcome::Aborted => log::debug!("worker {} aborted", worker),
                BatchOutcome::Panicked(message) => {
                    log::error!("worker {} panicked: {}", worker, message);
                    // The tick is lost anyway, let the other workers stop early
                    abort.store(true, Ordering::Relaxed);
                    failure.get_or_insert(TickError::WorkerPanicked { worker, message });
                }
            }
            slots[worker] = Some(signal.batch);
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Cut both arrays into one owned batch per range, in worker order
///
/// Worker 0 keeps the original allocations.
fn split_batches(
    mut positions: Vec<Vec4>,
    mut velocities: Vec<Vec4>,
    ranges: &[Range<usize>],
) -> Vec<Batch> {
    let mut batches: Vec<Batch> = ranges
        .iter()
        .enumerate()
        .rev()
        .map(|(worker, range)| {
            let (positions, velocities) = if range.start == 0 {
                (
                    std::mem::take(&mut positions),
                    std::mem::take(&mut velocities),
                )
            } else {
                (
                    positions.split_off(range.start),
                    velocities.split_off(range.start),
                )
            };
            Batch {
                worker,
                positions,
                velocities,
            }
        })
        .collect();
    batches.reverse();
    batches
}

/// Stitch batches back in worker order, filling abandoned ones
fn reassemble(
    slots: Vec<Option<Batch>>,
    ranges: &[Range<usize>],
    particles: usize,
) -> (Vec<Vec4>, Vec<Vec4>) {
    let mut positions: Vec<Vec4> = Vec::new();
    let mut velocities: Vec<Vec4> = Vec::new();

    for (slot, range) in slots.into_iter().zip(ranges) {
        match slot {
            Some(batch) if positions.is_empty() => {
                positions = batch.positions;
                velocities = batch.velocities;
            }
            Some(mut batch) => {
                positions.append(&mut batch.positions);
                velocities.append(&mut batch.velocities);
            }
            None => {
                positions.resize(positions.len() + range.len(), abandoned_position());
                velocities.resize(velocities.len() + range.len(), abandoned_velocity());
            }
        }
    }

    debug_assert_eq!(positions.len(), particles);
    (positions, velocities)
}

/// Every worker has signalled, so these joins return at once
fn join_workers(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if handle.join().is_err() {
            log::warn!("integrator worker exited abnormally after signalling");
        }
    }
}

fn run_batch<R: MotionRule + ?Sized>(
    rule: &R,
    positions: &mut [Vec4],
    velocities: &mut [Vec4],
    abort: &AtomicBool,
) -> BatchOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let chunks = positions
            .chunks_mut(ABORT_CHECK_STRIDE)
            .zip(velocities.chunks_mut(ABORT_CHECK_STRIDE));

        for (pos_chunk, vel_chunk) in chunks {
            if abort.load(Ordering::Relaxed) {
                return BatchOutcome::Aborted;
            }
            for (p, v) in pos_chunk.iter_mut().zip(vel_chunk.iter_mut()) {
                rule.advance(p, v);
            }
        }
        BatchOutcome::Done
    }));

    result.unwrap_or_else(|payload| BatchOutcome::Panicked(panic_message(payload)))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
