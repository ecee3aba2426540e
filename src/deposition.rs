//! Deposition rules
//!
//! A deposition rule mutates a [`Surface`] in place given a number of
//! particles to drop. Any `Fn(&mut Surface<H>, usize)` closure is a valid
//! rule; the two classic stochastic models are provided as unit structs.

use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::numeric::Height;
use crate::surface::Surface;

/// Drops `depositions` particles onto `surface`.
///
/// Implementations must not retain the surface beyond the call.
pub trait DepositionStrategy<H> {
    fn deposit(&self, surface: &mut Surface<H>, depositions: usize);
}

impl<H, T> DepositionStrategy<H> for T
where
    T: Fn(&mut Surface<H>, usize),
{
    fn deposit(&self, surface: &mut Surface<H>, depositions: usize) {
        self(surface, depositions)
    }
}

/// Each particle lands on a uniformly chosen site and sticks on top of it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDeposition;

impl RandomDeposition {
    pub fn deposit_with<H: Height, R: Rng + ?Sized>(
        surface: &mut Surface<H>,
        depositions: usize,
        rng: &mut R,
    ) {
        if surface.size() == 0 {
            return;
        }
        let sites = Uniform::new(0, surface.size());
        for _ in 0..depositions {
            surface[sites.sample(rng)] += H::one();
        }
    }
}

impl<H: Height> DepositionStrategy<H> for RandomDeposition {
    fn deposit(&self, surface: &mut Surface<H>, depositions: usize) {
        Self::deposit_with(surface, depositions, &mut rand::thread_rng());
    }
}

/// Each particle falls onto a uniformly chosen site and sticks at the first
/// contact with the column or one of its nearest neighbours, with periodic
/// boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct BallisticDeposition;

impl BallisticDeposition {
    pub fn deposit_with<H: Height, R: Rng + ?Sized>(
        surface: &mut Surface<H>,
        depositions: usize,
        rng: &mut R,
    ) {
        if surface.size() == 0 {
            return;
        }
        let sites = Uniform::new(0, surface.size());
        for _ in 0..depositions {
            let site = sites.sample(rng);
            let mut landing = surface[site] + H::one();
            for neighbour in neighbours(surface, site) {
                if surface[neighbour] > landing {
                    landing = surface[neighbour];
                }
            }
            surface[site] = landing;
        }
    }
}

impl<H: Height> DepositionStrategy<H> for BallisticDeposition {
    fn deposit(&self, surface: &mut Surface<H>, depositions: usize) {
        Self::deposit_with(surface, depositions, &mut rand::thread_rng());
    }
}

/// Nearest neighbours of `site` with periodic wrap; two on a line, four on a
/// plane.
fn neighbours<H: Height>(surface: &Surface<H>, site: usize) -> Vec<usize> {
    let sx = surface.size_x();
    let sy = surface.size_y();
    let (x, y) = surface.coordinates(site);

    let mut out = Vec::with_capacity(4);
    if sx > 1 {
        out.push(surface.linear_index((x + sx - 1) % sx, y));
        out.push(surface.linear_index((x + 1) % sx, y));
    }
    if sy > 1 {
        out.push(surface.linear_index(x, (y + sy - 1) % sy));
        out.push(surface.linear_index(x, (y + 1) % sy));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_deposition_conserves_mass() {
        let mut surface = Surface::<i32>::new(50);
        let mut rng = StdRng::seed_from_u64(7);
        RandomDeposition::deposit_with(&mut surface, 500, &mut rng);
        assert_eq!(surface.grid().iter().sum::<i32>(), 500);
    }

    #[test]
    fn random_deposition_is_reproducible_with_seed() {
        let mut a = Surface::<i32>::with_shape(8, 8);
        let mut b = Surface::<i32>::with_shape(8, 8);
        RandomDeposition::deposit_with(&mut a, 200, &mut StdRng::seed_from_u64(11));
        RandomDeposition::deposit_with(&mut b, 200, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }

    #[test]
    fn ballistic_on_single_site_stacks() {
        let mut surface = Surface::<i32>::new(1);
        BallisticDeposition::deposit_with(&mut surface, 4, &mut StdRng::seed_from_u64(1));
        assert_eq!(surface[0], 4);
    }

    #[test]
    fn ballistic_particle_sticks_to_taller_neighbour() {
        for seed in 0..16 {
            let mut surface = Surface::<i32>::new(3);
            surface[0] = 5;
            surface[2] = 5;
            BallisticDeposition::deposit_with(&mut surface, 1, &mut StdRng::seed_from_u64(seed));
            let grid = surface.grid().to_vec();
            assert!(
                grid == [5, 5, 5] || grid == [6, 0, 5] || grid == [5, 0, 6],
                "unexpected landing {grid:?}"
            );
        }
        assert_eq!(neighbours(&Surface::<i32>::new(3), 0), vec![2, 1]);
    }

    #[test]
    fn ballistic_deposition_never_lowers_sites() {
        let mut surface = Surface::<i64>::with_shape(6, 6);
        let mut rng = StdRng::seed_from_u64(3);
        BallisticDeposition::deposit_with(&mut surface, 100, &mut rng);
        let before = surface.clone();
        BallisticDeposition::deposit_with(&mut surface, 100, &mut rng);
        assert!(surface
            .grid()
            .iter()
            .zip(before.grid())
            .all(|(after, before)| after >= before));
        // each particle raises its column by at least one
        assert!(surface.grid().iter().sum::<i64>() >= 200);
    }

    #[test]
    fn neighbours_wrap_on_a_plane() {
        let surface = Surface::<i32>::with_shape(3, 3);
        let mut n = neighbours(&surface, 0);
        n.sort_unstable();
        assert_eq!(n, vec![1, 2, 3, 6]);
    }

    #[test]
    fn closures_are_strategies() {
        let strategy = |surface: &mut Surface<i32>, depositions: usize| {
            surface[0] += depositions as i32;
        };
        let mut surface = Surface::<i32>::new(2);
        strategy.deposit(&mut surface, 3);
        assert_eq!(surface[0], 3);
    }
}
