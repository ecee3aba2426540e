//! Growth of a single surface and scaling-exponent extraction
//!
//! A [`GrowthTrajectory`] repeatedly applies a deposition rule to its surface
//! and records one [`SurfaceSnapshot`] per step together with the number of
//! layers deposited per site (`nl`) before that step. The recorded series is
//! then fitted in log-log space to obtain slope and intercept for every
//! snapshot slot at once.

use std::ops::Range;

use tracing::debug;

use crate::deposition::DepositionStrategy;
use crate::numeric::{Height, Real};
use crate::snapshot::SurfaceSnapshot;
use crate::surface::Surface;
use crate::GrowthError;

/// Leading checkpoints with `nl` this close to zero are left out of the
/// default fit.
pub const NL_ZERO_TOLERANCE: f64 = 0.01;

/// Coefficients of `ln(field) = slope * ln(nl) + intercept`, per slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLogFit<F> {
    pub slope: SurfaceSnapshot<F>,
    pub intercept: SurfaceSnapshot<F>,
}

/// Recorded series of one finished trajectory.
#[derive(Debug, Clone)]
pub struct TrajectoryResult<F> {
    pub nl: Vec<F>,
    pub snapshots: Vec<SurfaceSnapshot<F>>,
    pub fit: LogLogFit<F>,
}

impl<F> TrajectoryResult<F> {
    pub fn checkpoints(&self) -> usize {
        self.snapshots.len()
    }
}

/// Layers added per site by one growth step.
pub fn nl_increment<F: Real>(deposition_per_iteration: usize, size: usize) -> F {
    F::from_usize(deposition_per_iteration) / F::from_usize(size)
}

/// The `nl` axis a fresh trajectory records under a fixed batch size.
pub fn checkpoint_axis<F: Real>(
    deposition_per_iteration: usize,
    size: usize,
    nl_total: F,
) -> Vec<F> {
    let mut axis = Vec::new();
    if deposition_per_iteration == 0 || size == 0 {
        return axis;
    }

    let step: F = nl_increment(deposition_per_iteration, size);
    let mut nl = F::zero();
    while nl < nl_total {
        axis.push(nl);
        nl += step;
    }
    axis
}

#[derive(Debug, Clone)]
pub struct GrowthTrajectory<H, F> {
    surface: Surface<H>,
    snapshots: Vec<SurfaceSnapshot<F>>,
    nl: Vec<F>,
}

impl<H: Height, F: Real> GrowthTrajectory<H, F> {
    pub fn new(surface: Surface<H>) -> Self {
        Self {
            surface,
            snapshots: Vec::new(),
            nl: Vec::new(),
        }
    }

    pub fn with_size(size: usize) -> Self {
        Self::new(Surface::new(size))
    }

    pub fn with_shape(size_x: usize, size_y: usize) -> Self {
        Self::new(Surface::with_shape(size_x, size_y))
    }

    pub fn surface(&self) -> &Surface<H> {
        &self.surface
    }

    pub fn snapshots(&self) -> &[SurfaceSnapshot<F>] {
        &self.snapshots
    }

    pub fn nl(&self) -> &[F] {
        &self.nl
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Flattens the surface and forgets the recorded series.
    pub fn reset(&mut self) {
        self.surface.clear();
        self.snapshots.clear();
        self.nl.clear();
    }

    /// Restarts from a copy of `seed` and forgets the recorded series.
    pub fn reset_from(&mut self, seed: &Surface<H>) -> Result<(), GrowthError> {
        self.surface.clear_from(seed)?;
        self.snapshots.clear();
        self.nl.clear();
        Ok(())
    }

    /// Grows the surface until `nl` reaches `nl_total`.
    ///
    /// Each step drops `deposition_per_iteration` particles, then records the
    /// pre-step `nl` and the new snapshot. A trajectory that already holds
    /// checkpoints resumes from its last recorded `nl`.
    pub fn run<S>(
        &mut self,
        deposition_per_iteration: usize,
        nl_total: F,
        strategy: &S,
    ) -> Result<(), GrowthError>
    where
        S: DepositionStrategy<H> + ?Sized,
    {
        if deposition_per_iteration == 0 {
            return Err(GrowthError::InvalidConfig(
                "deposition_per_iteration must be greater than zero".to_string(),
            ));
        }
        if self.surface.size() == 0 {
            return Err(GrowthError::InvalidConfig(
                "surface must have at least one site".to_string(),
            ));
        }

        let step: F = nl_increment(deposition_per_iteration, self.surface.size());
        let mut nl_current = self.nl.last().copied().unwrap_or_else(F::zero);
        let recorded_before = self.snapshots.len();

        while nl_current < nl_total {
            strategy.deposit(&mut self.surface, deposition_per_iteration);

            self.nl.push(nl_current);
            self.snapshots.push(self.surface.snapshot());

            nl_current += step;
        }

        debug!(
            checkpoints = self.snapshots.len() - recorded_before,
            nl_final = nl_current.to_f64(),
            "trajectory grown"
        );
        Ok(())
    }

    /// Log-log fit over every checkpoint, skipping a leading `nl ~ 0`.
    pub fn loglog_fit(&self) -> LogLogFit<F> {
        let from = match self.nl.first() {
            Some(&first) if first.abs() < F::from_f64(NL_ZERO_TOLERANCE) => 1,
            _ => 0,
        };
        fit_range(&self.nl[from..], &self.snapshots[from..])
    }

    /// Log-log fit over checkpoint indices `range`.
    pub fn loglog_fit_range(&self, range: Range<usize>) -> Result<LogLogFit<F>, GrowthError> {
        let len = self.snapshots.len();
        if range.start > range.end || range.end > len {
            return Err(GrowthError::InvalidRange {
                from: range.start,
                to: range.end,
                len,
            });
        }
        Ok(fit_range(&self.nl[range.clone()], &self.snapshots[range]))
    }

    /// Log-log fit over the checkpoints whose `nl` lies in `[nl_min, nl_max]`.
    ///
    /// Bounding indices are found by a linear scan.
    pub fn loglog_fit_nl(&self, nl_min: F, nl_max: F) -> LogLogFit<F> {
        let from = self
            .nl
            .iter()
            .position(|&nl| nl >= nl_min)
            .unwrap_or(self.nl.len());
        let to = self
            .nl
            .iter()
            .position(|&nl| nl > nl_max)
            .unwrap_or(self.nl.len())
            .max(from);
        fit_range(&self.nl[from..to], &self.snapshots[from..to])
    }

    /// Moves the recorded series out, fitted, leaving the trajectory empty
    /// but keeping its surface.
    pub fn take_result(&mut self) -> TrajectoryResult<F> {
        let fit = self.loglog_fit();
        TrajectoryResult {
            nl: std::mem::take(&mut self.nl),
            snapshots: std::mem::take(&mut self.snapshots),
            fit,
        }
    }
}

/// Ordinary least squares of `ln(snapshot)` on `ln(nl)`, slot by slot.
///
/// Fewer than two distinct points give NaN or infinite coefficients.
fn fit_range<F: Real>(nl: &[F], snapshots: &[SurfaceSnapshot<F>]) -> LogLogFit<F> {
    let count = F::from_usize(nl.len());

    let mut avg_x = F::zero();
    let mut avg_y = SurfaceSnapshot::default();
    for (&x, y) in nl.iter().zip(snapshots) {
        avg_x += x.ln();
        avg_y = avg_y + y.ln();
    }
    avg_x /= count;
    avg_y = avg_y / count;

    let mut num = SurfaceSnapshot::default();
    let mut den = F::zero();
    for (&x, y) in nl.iter().zip(snapshots) {
        let log_x = x.ln();
        num = num + (y.ln() - avg_y) * log_x;
        den += log_x * (log_x - avg_x);
    }

    let slope = num / den;
    let intercept = avg_y - slope * avg_x;
    LogLogFit { slope, intercept }
}
