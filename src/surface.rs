//! Discrete growing surface
//!
//! A fixed-size grid of integer heights, addressable by linear index or by
//! `(x, y)` coordinate on a `size_x * size_y` plane. A 1D surface is a plane
//! with `size_y == 1`.

use std::ops::{Index, IndexMut};

use crate::numeric::{Height, Real};
use crate::snapshot::SurfaceSnapshot;
use crate::GrowthError;

#[derive(Debug, Clone, PartialEq)]
pub struct Surface<H> {
    grid: Vec<H>,
    size_x: usize,
    size_y: usize,
}

impl<H: Height> Surface<H> {
    /// Zero-initialised 1D surface of `size` sites.
    pub fn new(size: usize) -> Self {
        Self::with_shape(size, 1)
    }

    /// Zero-initialised 2D surface of `size_x * size_y` sites.
    pub fn with_shape(size_x: usize, size_y: usize) -> Self {
        Self {
            grid: vec![H::default(); size_x * size_y],
            size_x,
            size_y,
        }
    }

    pub fn size(&self) -> usize {
        self.grid.len()
    }

    pub fn size_x(&self) -> usize {
        self.size_x
    }

    pub fn size_y(&self) -> usize {
        self.size_y
    }

    pub fn is_2d(&self) -> bool {
        self.size_y > 1
    }

    pub fn grid(&self) -> &[H] {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut [H] {
        &mut self.grid
    }

    /// Linear index of coordinate `(x, y)`.
    #[inline]
    pub fn linear_index(&self, x: usize, y: usize) -> usize {
        self.size_x * y + x
    }

    /// Coordinate of linear index `index`.
    #[inline]
    pub fn coordinates(&self, index: usize) -> (usize, usize) {
        (index % self.size_x, index / self.size_x)
    }

    /// Resets every site to zero, keeping the shape.
    pub fn clear(&mut self) {
        self.grid.fill(H::default());
    }

    /// Overwrites the grid with the contents of `seed`.
    pub fn clear_from(&mut self, seed: &Surface<H>) -> Result<(), GrowthError> {
        if seed.size() != self.size() {
            return Err(GrowthError::ShapeMismatch {
                context: "surface reset",
                expected: self.size(),
                got: seed.size(),
            });
        }
        self.grid.copy_from_slice(&seed.grid);
        self.size_x = seed.size_x;
        self.size_y = seed.size_y;
        Ok(())
    }

    /// `mean(height^order)` over all sites.
    pub fn nth_moment<F: Real>(&self, order: u32) -> F {
        let size = F::from_usize(self.size());
        let mut result = F::zero();
        for &h in &self.grid {
            result += pow(h.to_real::<F>(), order) / size;
        }
        result
    }

    /// `mean((height - mean)^order)` over all sites.
    pub fn nth_central_moment<F: Real>(&self, order: u32) -> F {
        let mean: F = self.nth_moment(1);
        let size = F::from_usize(self.size());
        let mut result = F::zero();
        for &h in &self.grid {
            result += pow(h.to_real::<F>() - mean, order) / size;
        }
        result
    }

    /// All moment statistics in a single pass over the grid.
    ///
    /// Powers are accumulated relative to the first site's height; the raw
    /// and central moments are then recovered by binomial expansion, which
    /// keeps the central moments exact for flat surfaces.
    pub fn snapshot<F: Real>(&self) -> SurfaceSnapshot<F> {
        let Some(&first) = self.grid.first() else {
            return SurfaceSnapshot::default();
        };

        let shift: F = first.to_real();
        let size = F::from_usize(self.size());
        let mut sums = [F::zero(); 4];
        for &h in &self.grid {
            let d = h.to_real::<F>() - shift;
            let d2 = d * d;
            sums[0] += d;
            sums[1] += d2;
            sums[2] += d2 * d;
            sums[3] += d2 * d2;
        }
        let [e1, e2, e3, e4] = sums.map(|s| s / size);

        let two = F::from_f64(2.0);
        let three = F::from_f64(3.0);
        let four = F::from_f64(4.0);
        let six = F::from_f64(6.0);

        let central = [
            F::zero(),
            e2 - e1 * e1,
            e3 - three * e1 * e2 + two * e1 * e1 * e1,
            e4 - four * e1 * e3 + six * e1 * e1 * e2 - three * e1 * e1 * e1 * e1,
        ];

        let c = shift;
        let raw = [
            c + e1,
            c * c + two * c * e1 + e2,
            c * c * c + three * c * c * e1 + three * c * e2 + e3,
            c * c * c * c + four * c * c * c * e1 + six * c * c * e2 + four * c * e3 + e4,
        ];

        SurfaceSnapshot::from_moments(raw, central)
    }
}

#[inline]
fn pow<F: Real>(value: F, order: u32) -> F {
    let mut power = F::one();
    for _ in 0..order {
        power *= value;
    }
    power
}

impl<H> Index<usize> for Surface<H> {
    type Output = H;

    #[inline]
    fn index(&self, index: usize) -> &H {
        &self.grid[index]
    }
}

impl<H> IndexMut<usize> for Surface<H> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut H {
        &mut self.grid[index]
    }
}

impl<H> Index<(usize, usize)> for Surface<H> {
    type Output = H;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &H {
        &self.grid[self.size_x * y + x]
    }
}

impl<H> IndexMut<(usize, usize)> for Surface<H> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut H {
        &mut self.grid[self.size_x * y + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn two_dimensional_addressing_is_row_major() {
        let mut surface = Surface::<i32>::with_shape(4, 3);
        surface[(1, 2)] = 5;
        assert_eq!(surface.size(), 12);
        assert_eq!(surface[9], 5);
        assert_eq!(surface.linear_index(1, 2), 9);
        assert_eq!(surface.coordinates(9), (1, 2));
        assert!(surface.is_2d());
    }

    #[test]
    fn constant_surface_is_flat() {
        let mut surface = Surface::<i64>::new(16);
        surface.grid_mut().fill(7);
        let snap: SurfaceSnapshot<f64> = surface.snapshot();
        assert_eq!(snap.height(), 7.0);
        assert_eq!(snap.variance(), 0.0);
        assert_eq!(snap.width(), 0.0);
        assert!(snap.skewness().is_nan());
        assert!(snap.kurtosis().is_nan());
    }

    #[test]
    fn single_pass_snapshot_matches_per_order_moments() {
        let mut surface = Surface::<i32>::new(6);
        for (cell, h) in surface.grid_mut().iter_mut().zip([3, 9, 4, 4, 12, 1]) {
            *cell = h;
        }
        let snap: SurfaceSnapshot<f64> = surface.snapshot();
        for order in 1..=4u32 {
            assert_relative_eq!(
                snap.moment(order as usize),
                surface.nth_moment::<f64>(order),
                max_relative = 1e-12
            );
        }
        for order in 2..=4u32 {
            assert_relative_eq!(
                snap.central_moment(order as usize),
                surface.nth_central_moment::<f64>(order),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn clear_keeps_shape() {
        let mut surface = Surface::<u32>::with_shape(3, 2);
        surface[(2, 1)] = 4;
        surface.clear();
        assert_eq!(surface.size(), 6);
        assert!(surface.grid().iter().all(|&h| h == 0));
    }

    #[test]
    fn clear_from_requires_matching_size() {
        let mut seed = Surface::<i32>::new(4);
        seed[2] = 3;
        let mut target = Surface::<i32>::new(4);
        target.clear_from(&seed).unwrap();
        assert_eq!(target.grid(), seed.grid());

        let mut small = Surface::<i32>::new(3);
        assert!(matches!(
            small.clear_from(&seed),
            Err(GrowthError::ShapeMismatch { expected: 3, got: 4, .. })
        ));
    }
}
