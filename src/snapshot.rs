//! Derived height statistics of one surface at one checkpoint
//!
//! A [`SurfaceSnapshot`] is a fixed vector of eleven named slots: the four
//! raw moments of height, the four central moments, and the width, skewness
//! and kurtosis computed from them. All arithmetic on snapshots is
//! elementwise over the slots, which is what ensemble averaging and the
//! log-log regression need.

use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

use crate::numeric::Real;
use crate::GrowthError;

/// Number of indexable slots in a snapshot.
pub const SLOT_COUNT: usize = 11;

const RAW_START: usize = 0;
const CENTRAL_START: usize = 4;
const WIDTH_SLOT: usize = 8;
const SKEWNESS_SLOT: usize = 9;
const KURTOSIS_SLOT: usize = 10;

/// Named view over a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Height,
    Width,
    Skewness,
    Kurtosis,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Height, Field::Width, Field::Skewness, Field::Kurtosis];

    pub fn name(self) -> &'static str {
        match self {
            Field::Height => "height",
            Field::Width => "width",
            Field::Skewness => "skewness",
            Field::Kurtosis => "kurtosis",
        }
    }

    /// Slot holding this field.
    pub fn slot(self) -> usize {
        match self {
            Field::Height => RAW_START,
            Field::Width => WIDTH_SLOT,
            Field::Skewness => SKEWNESS_SLOT,
            Field::Kurtosis => KURTOSIS_SLOT,
        }
    }
}

impl FromStr for Field {
    type Err = GrowthError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "height" => Ok(Field::Height),
            "width" => Ok(Field::Width),
            "skewness" => Ok(Field::Skewness),
            "kurtosis" => Ok(Field::Kurtosis),
            other => Err(GrowthError::InvalidField(format!(
                "unknown field name '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceSnapshot<F> {
    slots: [F; SLOT_COUNT],
}

impl<F: Real> SurfaceSnapshot<F> {
    /// Builds a snapshot from raw and central moments of order 1..=4.
    ///
    /// Width, skewness and kurtosis are computed here; a zero variance yields
    /// NaN skewness and kurtosis.
    pub fn from_moments(raw: [F; 4], central: [F; 4]) -> Self {
        let variance = central[1];
        let width = variance.sqrt();
        let skewness = central[2] / (width * width * width);
        let kurtosis = central[3] / (variance * variance);

        let mut slots = [F::zero(); SLOT_COUNT];
        slots[RAW_START..CENTRAL_START].copy_from_slice(&raw);
        slots[CENTRAL_START..WIDTH_SLOT].copy_from_slice(&central);
        slots[WIDTH_SLOT] = width;
        slots[SKEWNESS_SLOT] = skewness;
        slots[KURTOSIS_SLOT] = kurtosis;
        Self { slots }
    }

    /// Builds a snapshot from raw moments only, deriving the central ones.
    pub fn from_raw_moments(raw: [F; 4]) -> Self {
        let [m1, m2, m3, m4] = raw;
        let two = F::from_f64(2.0);
        let three = F::from_f64(3.0);
        let four = F::from_f64(4.0);
        let six = F::from_f64(6.0);

        let central = [
            F::zero(),
            m2 - m1 * m1,
            m3 - three * m1 * m2 + two * m1 * m1 * m1,
            m4 - four * m1 * m3 + six * m1 * m1 * m2 - three * m1 * m1 * m1 * m1,
        ];
        Self::from_moments(raw, central)
    }

    /// Raw slot vector, bypassing derivation.
    pub fn from_slots(slots: [F; SLOT_COUNT]) -> Self {
        Self { slots }
    }

    /// Every slot set to `value`.
    pub fn splat(value: F) -> Self {
        Self {
            slots: [value; SLOT_COUNT],
        }
    }

    pub fn slots(&self) -> &[F; SLOT_COUNT] {
        &self.slots
    }

    /// Raw moment of order `order` (1-based).
    pub fn moment(&self, order: usize) -> F {
        assert!((1..=4).contains(&order), "moment order must be in 1..=4");
        self.slots[RAW_START + order - 1]
    }

    /// Central moment of order `order` (1-based).
    pub fn central_moment(&self, order: usize) -> F {
        assert!((1..=4).contains(&order), "moment order must be in 1..=4");
        self.slots[CENTRAL_START + order - 1]
    }

    pub fn height(&self) -> F {
        self.slots[RAW_START]
    }

    pub fn variance(&self) -> F {
        self.slots[CENTRAL_START + 1]
    }

    pub fn width(&self) -> F {
        self.slots[WIDTH_SLOT]
    }

    pub fn skewness(&self) -> F {
        self.slots[SKEWNESS_SLOT]
    }

    pub fn kurtosis(&self) -> F {
        self.slots[KURTOSIS_SLOT]
    }

    pub fn value(&self, field: Field) -> F {
        self.slots[field.slot()]
    }

    /// Slot lookup by index in `0..SLOT_COUNT`.
    pub fn get(&self, index: usize) -> Result<F, GrowthError> {
        self.slots.get(index).copied().ok_or_else(|| {
            GrowthError::InvalidField(format!(
                "slot index {index} out of range 0..{SLOT_COUNT}"
            ))
        })
    }

    /// Field lookup by name: `height`, `width`, `skewness` or `kurtosis`.
    pub fn field(&self, name: &str) -> Result<F, GrowthError> {
        Ok(self.value(name.parse()?))
    }

    /// Applies `f` to every slot.
    pub fn map(&self, f: impl Fn(F) -> F) -> Self {
        Self {
            slots: self.slots.map(f),
        }
    }

    /// Combines two snapshots slot by slot.
    pub fn zip_with(&self, other: &Self, f: impl Fn(F, F) -> F) -> Self {
        let mut slots = self.slots;
        for (slot, &rhs) in slots.iter_mut().zip(other.slots.iter()) {
            *slot = f(*slot, rhs);
        }
        Self { slots }
    }

    pub fn ln(&self) -> Self {
        self.map(F::ln)
    }
}

macro_rules! impl_elementwise {
    ($($trait:ident :: $method:ident => $op:tt),*) => {
        $(
            impl<F: Real> $trait for SurfaceSnapshot<F> {
                type Output = Self;

                fn $method(self, rhs: Self) -> Self {
                    self.zip_with(&rhs, |a, b| a $op b)
                }
            }

            impl<F: Real> $trait<F> for SurfaceSnapshot<F> {
                type Output = Self;

                fn $method(self, rhs: F) -> Self {
                    self.map(|a| a $op rhs)
                }
            }
        )*
    };
}

impl_elementwise!(Add::add => +, Sub::sub => -, Mul::mul => *, Div::div => /);

impl<F: Real> Neg for SurfaceSnapshot<F> {
    type Output = Self;

    fn neg(self) -> Self {
        self.map(|a| -a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> SurfaceSnapshot<f64> {
        // heights {1, 2, 3, 6}: mean 3
        SurfaceSnapshot::from_raw_moments([3.0, 12.5, 63.0, 348.5])
    }

    #[test]
    fn derived_fields_follow_central_moments() {
        let snap = sample();
        assert_relative_eq!(snap.height(), 3.0);
        assert_relative_eq!(snap.variance(), 3.5, epsilon = 1e-12);
        assert_relative_eq!(snap.width(), 3.5_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(snap.central_moment(3), 4.5, epsilon = 1e-9);
        assert_relative_eq!(snap.skewness(), 4.5 / 3.5_f64.powf(1.5), epsilon = 1e-9);
        assert_relative_eq!(snap.central_moment(4), 24.5, epsilon = 1e-9);
        assert_relative_eq!(snap.kurtosis(), 24.5 / 12.25, epsilon = 1e-9);
    }

    #[test]
    fn index_and_name_views_agree() {
        let snap = sample();
        assert_eq!(snap.get(0).unwrap(), snap.height());
        assert_eq!(snap.get(8).unwrap(), snap.width());
        assert_eq!(snap.field("skewness").unwrap(), snap.get(9).unwrap());
        assert_eq!(snap.field("kurtosis").unwrap(), snap.get(10).unwrap());
        assert_eq!(snap.field("height").unwrap(), snap.moment(1));
    }

    #[test]
    fn out_of_range_lookups_fail() {
        let snap = sample();
        assert!(matches!(snap.get(SLOT_COUNT), Err(GrowthError::InvalidField(_))));
        assert!(matches!(snap.field("roughness"), Err(GrowthError::InvalidField(_))));
    }

    #[test]
    fn zero_variance_propagates_nan() {
        let snap = SurfaceSnapshot::from_raw_moments([4.0_f64, 16.0, 64.0, 256.0]);
        assert_eq!(snap.width(), 0.0);
        assert!(snap.skewness().is_nan());
        assert!(snap.kurtosis().is_nan());
    }

    #[test]
    fn elementwise_algebra() {
        let a = SurfaceSnapshot::splat(2.0_f64);
        let b = SurfaceSnapshot::splat(8.0_f64);
        let sum = a + b;
        let ratio = b / a;
        let scaled = a * 3.0;
        assert!(sum.slots().iter().all(|&v| v == 10.0));
        assert!(ratio.slots().iter().all(|&v| v == 4.0));
        assert!(scaled.slots().iter().all(|&v| v == 6.0));
        assert!((-a).slots().iter().all(|&v| v == -2.0));
    }

    #[test]
    fn map_applies_to_every_slot() {
        let snap = SurfaceSnapshot::splat(std::f64::consts::E).ln();
        assert!(snap.slots().iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }
}
