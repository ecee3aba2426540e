//! Ensemble averaging over independent growth runs
//!
//! Every run grows its own copy of the seed surface. Finished runs are folded
//! into an [`EnsembleReducer`]: one accumulator per checkpoint plus one each
//! for the regression slope and intercept. In threaded mode the runs are
//! launched in batches of at most `threads` workers, each worker merging its
//! result under a single lock once its trajectory is complete.

use std::sync::Mutex;
use std::thread;

use tracing::{debug, info, instrument, trace};

use crate::deposition::DepositionStrategy;
use crate::growth::{checkpoint_axis, GrowthTrajectory, TrajectoryResult};
use crate::numeric::{Height, Real};
use crate::snapshot::Field;
use crate::stats::SnapshotAccumulator;
use crate::surface::Surface;
use crate::GrowthError;

/// Shared reduction target of an ensemble.
#[derive(Debug, Clone, Default)]
pub struct EnsembleReducer<F: Real> {
    checkpoints: Vec<SnapshotAccumulator<F>>,
    slope: SnapshotAccumulator<F>,
    intercept: SnapshotAccumulator<F>,
}

impl<F: Real> EnsembleReducer<F> {
    pub fn new() -> Self {
        Self {
            checkpoints: Vec::new(),
            slope: SnapshotAccumulator::new(),
            intercept: SnapshotAccumulator::new(),
        }
    }

    /// Folds one finished trajectory in.
    ///
    /// The first merge fixes the checkpoint count; later results must match it.
    pub fn merge(&mut self, result: &TrajectoryResult<F>) -> Result<(), GrowthError> {
        if self.checkpoints.is_empty() {
            self.checkpoints = vec![SnapshotAccumulator::new(); result.checkpoints()];
        } else if self.checkpoints.len() != result.checkpoints() {
            return Err(GrowthError::ShapeMismatch {
                context: "ensemble checkpoint",
                expected: self.checkpoints.len(),
                got: result.checkpoints(),
            });
        }

        for (acc, snapshot) in self.checkpoints.iter_mut().zip(&result.snapshots) {
            acc.record_sample(snapshot);
        }
        self.slope.record_sample(&result.fit.slope);
        self.intercept.record_sample(&result.fit.intercept);
        Ok(())
    }

    pub fn checkpoints(&self) -> &[SnapshotAccumulator<F>] {
        &self.checkpoints
    }

    pub fn slope(&self) -> &SnapshotAccumulator<F> {
        &self.slope
    }

    pub fn intercept(&self) -> &SnapshotAccumulator<F> {
        &self.intercept
    }

    /// Number of trajectories merged so far.
    pub fn runs(&self) -> usize {
        self.slope.count()
    }
}

#[derive(Debug, Clone)]
pub struct EnsembleAggregator<H, F: Real> {
    seed: Surface<H>,
    systems: usize,
    reducer: EnsembleReducer<F>,
    nl: Vec<F>,
}

impl<H: Height, F: Real> EnsembleAggregator<H, F> {
    /// Ensemble of `systems` runs on a flat 1D surface of `size` sites.
    pub fn new(size: usize, systems: usize) -> Self {
        Self::from_surface(Surface::new(size), systems)
    }

    /// Ensemble of `systems` runs on a flat `size_x * size_y` plane.
    pub fn with_shape(size_x: usize, size_y: usize, systems: usize) -> Self {
        Self::from_surface(Surface::with_shape(size_x, size_y), systems)
    }

    /// Ensemble of `systems` runs, each starting from a copy of `seed`.
    pub fn from_surface(seed: Surface<H>, systems: usize) -> Self {
        Self {
            seed,
            systems,
            reducer: EnsembleReducer::new(),
            nl: Vec::new(),
        }
    }

    pub fn systems(&self) -> usize {
        self.systems
    }

    pub fn seed_surface(&self) -> &Surface<H> {
        &self.seed
    }

    pub fn reducer(&self) -> &EnsembleReducer<F> {
        &self.reducer
    }

    pub fn nl(&self) -> &[F] {
        &self.nl
    }

    pub fn checkpoints(&self) -> &[SnapshotAccumulator<F>] {
        self.reducer.checkpoints()
    }

    pub fn slope(&self) -> &SnapshotAccumulator<F> {
        self.reducer.slope()
    }

    pub fn intercept(&self) -> &SnapshotAccumulator<F> {
        self.reducer.intercept()
    }

    /// Ensemble mean of `field` at every checkpoint.
    pub fn field_average(&self, field: Field) -> Vec<F> {
        self.checkpoints()
            .iter()
            .map(|acc| acc.mean().value(field))
            .collect()
    }

    /// Ensemble variance of `field` at every checkpoint.
    pub fn field_variance(&self, field: Field) -> Vec<F> {
        self.checkpoints()
            .iter()
            .map(|acc| acc.variance().value(field))
            .collect()
    }

    /// Runs every system one after another on a single reused trajectory.
    #[instrument(skip(self, strategy), fields(systems = self.systems))]
    pub fn run<S>(
        &mut self,
        deposition_per_iteration: usize,
        nl_total: F,
        strategy: &S,
    ) -> Result<(), GrowthError>
    where
        S: DepositionStrategy<H> + ?Sized,
    {
        info!(size = self.seed.size(), "sequential ensemble starting");

        let mut trajectory = GrowthTrajectory::new(self.seed.clone());
        let mut nl = Vec::new();
        for run in 0..self.systems {
            trajectory.reset_from(&self.seed)?;
            trajectory.run(deposition_per_iteration, nl_total, strategy)?;

            let result = trajectory.take_result();
            self.reducer.merge(&result)?;
            debug!(run, checkpoints = result.checkpoints(), "trajectory merged");
            nl = result.nl;
        }
        self.nl = nl;

        info!(
            runs = self.reducer.runs(),
            checkpoints = self.nl.len(),
            "sequential ensemble complete"
        );
        Ok(())
    }

    /// Runs the systems in batches of at most `threads` concurrent workers.
    ///
    /// Workers share nothing but the reducer lock, which they take only to
    /// merge a finished trajectory. A batch is fully joined before the next
    /// one starts. The `nl` axis is rebuilt from the batch size and grid size,
    /// which assumes every run shares the same checkpoint cadence.
    #[instrument(skip(self, strategy), fields(systems = self.systems))]
    pub fn run_threaded<S>(
        &mut self,
        deposition_per_iteration: usize,
        nl_total: F,
        strategy: &S,
        threads: usize,
    ) -> Result<(), GrowthError>
    where
        S: DepositionStrategy<H> + Sync + ?Sized,
    {
        if threads == 0 {
            return Err(GrowthError::InvalidConfig(
                "threads must be greater than zero".to_string(),
            ));
        }
        info!(size = self.seed.size(), threads, "threaded ensemble starting");

        let reducer = Mutex::new(std::mem::take(&mut self.reducer));
        let seed = &self.seed;

        let mut outcome = Ok(());
        for batch_start in (0..self.systems).step_by(threads) {
            let batch_end = (batch_start + threads).min(self.systems);
            trace!(batch_start, batch_end, "launching batch");

            outcome = thread::scope(|scope| {
                let workers: Vec<_> = (batch_start..batch_end)
                    .map(|run| {
                        let reducer = &reducer;
                        scope.spawn(move || -> Result<(), GrowthError> {
                            let mut trajectory = GrowthTrajectory::new(seed.clone());
                            trajectory.run(deposition_per_iteration, nl_total, strategy)?;
                            let result = trajectory.take_result();

                            let mut shared =
                                reducer.lock().map_err(|_| GrowthError::ReducerPoisoned)?;
                            shared.merge(&result)?;
                            debug!(run, checkpoints = result.checkpoints(), "trajectory merged");
                            Ok(())
                        })
                    })
                    .collect();

                let mut batch_outcome = Ok(());
                for worker in workers {
                    let joined = match worker.join() {
                        Ok(joined) => joined,
                        Err(panic) => std::panic::resume_unwind(panic),
                    };
                    if batch_outcome.is_ok() {
                        batch_outcome = joined;
                    }
                }
                batch_outcome
            });

            if outcome.is_err() {
                break;
            }
        }

        self.reducer = reducer
            .into_inner()
            .map_err(|_| GrowthError::ReducerPoisoned)?;
        outcome?;

        self.nl = checkpoint_axis(deposition_per_iteration, self.seed.size(), nl_total);

        info!(
            runs = self.reducer.runs(),
            checkpoints = self.nl.len(),
            "threaded ensemble complete"
        );
        Ok(())
    }
}
