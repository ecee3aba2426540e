//! Online moment accumulation
//!
//! [`StatisticalAccumulator`] keeps the running means of `value^1 ..
//! value^ORDER` over a stream of samples. Two accumulators merge by a
//! count-weighted average, so partial results built on different threads can
//! be reduced into one.

use std::marker::PhantomData;
use std::ops::{Add, Div, Mul, Sub};

use crate::numeric::Real;
use crate::snapshot::SurfaceSnapshot;

/// Default number of accumulated moments (mean and second moment).
pub const DEFAULT_ORDER: usize = 2;

/// A value that can be accumulated: closed under elementwise `+ - *` and
/// scalable by the floating type `F`.
pub trait StatVector<F>:
    Clone + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> + Mul<F, Output = Self> + Div<F, Output = Self>
{
    fn zero() -> Self;
}

macro_rules! impl_scalar_stat_vector {
    ($($t:ty),*) => {
        $(
            impl StatVector<$t> for $t {
                #[inline]
                fn zero() -> Self {
                    0.0
                }
            }
        )*
    };
}

impl_scalar_stat_vector!(f32, f64);

impl<F: Real> StatVector<F> for SurfaceSnapshot<F> {
    fn zero() -> Self {
        SurfaceSnapshot::splat(F::zero())
    }
}

/// Running moments of a stream of `T` values.
#[derive(Debug, Clone)]
pub struct StatisticalAccumulator<T, F, const ORDER: usize = DEFAULT_ORDER> {
    moments: [T; ORDER],
    count: usize,
    _scalar: PhantomData<F>,
}

/// Accumulator over whole surface snapshots.
pub type SnapshotAccumulator<F> = StatisticalAccumulator<SurfaceSnapshot<F>, F>;

impl<T, F, const ORDER: usize> StatisticalAccumulator<T, F, ORDER>
where
    T: StatVector<F>,
    F: Real,
{
    pub fn new() -> Self {
        assert!(ORDER >= 1, "an accumulator needs at least one moment");
        Self {
            moments: std::array::from_fn(|_| T::zero()),
            count: 0,
            _scalar: PhantomData,
        }
    }

    /// Builds an accumulator directly from a batch of samples.
    pub fn from_samples(samples: &[T]) -> Self {
        let mut acc = Self::new();
        if samples.is_empty() {
            return acc;
        }

        let size = F::from_usize(samples.len());
        for sample in samples {
            let mut power = sample.clone();
            for (order, moment) in acc.moments.iter_mut().enumerate() {
                if order > 0 {
                    power = power * sample.clone();
                }
                *moment = moment.clone() + power.clone() / size;
            }
        }
        acc.count = samples.len();
        acc
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn moments(&self) -> &[T; ORDER] {
        &self.moments
    }

    /// Accumulated mean of `value^order` (1-based), if `order` is tracked.
    pub fn moment(&self, order: usize) -> Option<&T> {
        order.checked_sub(1).and_then(|idx| self.moments.get(idx))
    }

    pub fn record_sample(&mut self, value: &T) {
        let n = F::from_usize(self.count);
        let next = F::from_usize(self.count + 1);
        let keep = n / next;

        let mut power = value.clone();
        for (order, moment) in self.moments.iter_mut().enumerate() {
            if order > 0 {
                power = power * value.clone();
            }
            *moment = moment.clone() * keep + power.clone() / next;
        }

        self.count += 1;
    }

    /// Folds a batch into this accumulator.
    pub fn record_samples(&mut self, samples: &[T]) {
        self.merge(&Self::from_samples(samples));
    }

    /// Combines `other` into `self` by count-weighted averaging of moments.
    pub fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            self.clone_from(other);
            return;
        }

        let total = F::from_usize(self.count + other.count);
        let own_weight = F::from_usize(self.count) / total;
        let other_weight = F::from_usize(other.count) / total;

        for (moment, incoming) in self.moments.iter_mut().zip(other.moments.iter()) {
            *moment = moment.clone() * own_weight + incoming.clone() * other_weight;
        }

        self.count += other.count;
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn mean(&self) -> T {
        self.moments[0].clone()
    }

    /// `E[x^2] - E[x]^2`, elementwise for vector values.
    pub fn variance(&self) -> T {
        assert!(ORDER >= 2, "variance requires at least two accumulated moments");
        let mean = self.moments[0].clone();
        self.moments[1].clone() - mean.clone() * mean
    }
}

impl<T, F, const ORDER: usize> Default for StatisticalAccumulator<T, F, ORDER>
where
    T: StatVector<F>,
    F: Real,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    type Scalar = StatisticalAccumulator<f64, f64>;

    fn sequential(samples: &[f64]) -> Scalar {
        let mut acc = Scalar::new();
        for s in samples {
            acc.record_sample(s);
        }
        acc
    }

    #[test]
    fn mean_and_variance_of_known_sample() {
        let acc = sequential(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(acc.count(), 8);
        assert_relative_eq!(acc.mean(), 5.0, epsilon = 1e-12);
        assert_relative_eq!(acc.variance(), 4.0, epsilon = 1e-12);
        assert_relative_eq!(*acc.moment(2).unwrap(), 29.0, epsilon = 1e-12);
        assert!(acc.moment(0).is_none());
        assert!(acc.moment(3).is_none());
    }

    #[test]
    fn batch_construction_matches_sequential_recording() {
        let samples = [0.5, -1.25, 3.0, 8.5, 2.25];
        let batch = Scalar::from_samples(&samples);
        let seq = sequential(&samples);
        assert_eq!(batch.count(), seq.count());
        assert_relative_eq!(batch.mean(), seq.mean(), epsilon = 1e-12);
        assert_relative_eq!(batch.variance(), seq.variance(), epsilon = 1e-12);
    }

    #[test]
    fn higher_order_accumulator_tracks_fourth_moment() {
        let mut acc = StatisticalAccumulator::<f64, f64, 4>::new();
        for s in [1.0, 2.0, 3.0, 6.0] {
            acc.record_sample(&s);
        }
        assert_relative_eq!(*acc.moment(4).unwrap(), 348.5, epsilon = 1e-9);
    }

    #[test]
    fn merging_empty_accumulators_is_neutral() {
        let mut empty = Scalar::new();
        empty.merge(&Scalar::new());
        assert!(empty.is_empty());
        assert_eq!(empty.mean(), 0.0);

        let filled = sequential(&[1.0, 3.0]);
        empty.merge(&filled);
        assert_eq!(empty.count(), 2);
        assert_relative_eq!(empty.mean(), 2.0);

        let mut filled_again = filled.clone();
        filled_again.merge(&Scalar::new());
        assert_eq!(filled_again.count(), 2);
        assert_relative_eq!(filled_again.variance(), 1.0);
    }

    #[test]
    fn record_samples_extends_existing_state() {
        let mut acc = sequential(&[1.0, 2.0]);
        acc.record_samples(&[3.0, 4.0, 5.0]);
        let expected = sequential(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(acc.count(), 5);
        assert_relative_eq!(acc.mean(), expected.mean(), epsilon = 1e-12);
        assert_relative_eq!(acc.variance(), expected.variance(), epsilon = 1e-12);
    }

    #[test]
    fn clear_resets_state() {
        let mut acc = sequential(&[1.0, 2.0]);
        acc.clear();
        assert!(acc.is_empty());
        assert_eq!(acc.mean(), 0.0);
    }

    #[test]
    fn snapshot_accumulator_is_elementwise() {
        let mut acc = SnapshotAccumulator::<f64>::new();
        acc.record_sample(&SurfaceSnapshot::splat(1.0));
        acc.record_sample(&SurfaceSnapshot::splat(3.0));
        assert!(acc.mean().slots().iter().all(|&v| (v - 2.0).abs() < 1e-12));
        assert!(acc.variance().slots().iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }

    proptest! {
        #[test]
        fn split_merge_matches_sequential(
            samples in prop::collection::vec(-1.0e3f64..1.0e3, 1..200),
            cut in 0usize..200,
            chunks in 1usize..12,
        ) {
            let cut = cut.min(samples.len());
            let seq = sequential(&samples);
            let tol = 1e-9 * (1.0 + seq.moment(2).copied().unwrap_or(0.0).abs());

            let left = sequential(&samples[..cut]);
            let right = Scalar::from_samples(&samples[cut..]);

            let mut left_right = left.clone();
            left_right.merge(&right);
            let mut right_left = right.clone();
            right_left.merge(&left);

            let mut chunked = Scalar::new();
            for chunk in samples.chunks(samples.len().div_ceil(chunks)) {
                chunked.merge(&Scalar::from_samples(chunk));
            }

            for acc in [&left_right, &right_left, &chunked] {
                prop_assert_eq!(acc.count(), seq.count());
                prop_assert!((acc.mean() - seq.mean()).abs() <= tol);
                prop_assert!((acc.moment(2).unwrap() - seq.moment(2).unwrap()).abs() <= tol);
            }
        }
    }
}
