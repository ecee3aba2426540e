//! Numeric parameters of the growth core
//!
//! The simulation is generic over two caller-chosen types: an integer
//! [`Height`] stored on the grid and a floating [`Real`] used for every
//! statistic derived from it.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Floating-point type used for moments, snapshots and regression.
pub trait Real:
    Copy
    + Default
    + Debug
    + PartialOrd
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
{
    fn zero() -> Self;
    fn one() -> Self;
    fn from_f64(value: f64) -> Self;
    fn from_usize(value: usize) -> Self;
    fn to_f64(self) -> f64;
    fn sqrt(self) -> Self;
    fn ln(self) -> Self;
    fn abs(self) -> Self;
}

macro_rules! impl_real {
    ($($t:ty),*) => {
        $(
            impl Real for $t {
                #[inline]
                fn zero() -> Self {
                    0.0
                }

                #[inline]
                fn one() -> Self {
                    1.0
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $t
                }

                #[inline]
                fn from_usize(value: usize) -> Self {
                    value as $t
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn sqrt(self) -> Self {
                    <$t>::sqrt(self)
                }

                #[inline]
                fn ln(self) -> Self {
                    <$t>::ln(self)
                }

                #[inline]
                fn abs(self) -> Self {
                    <$t>::abs(self)
                }
            }
        )*
    };
}

impl_real!(f32, f64);

/// Integer type stored in each grid cell.
pub trait Height:
    Copy
    + Default
    + Debug
    + PartialOrd
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + AddAssign
{
    fn one() -> Self;
    fn from_usize(value: usize) -> Self;
    fn to_f64(self) -> f64;
    fn to_i64(self) -> i64;

    /// Converts the height into the statistics type.
    #[inline]
    fn to_real<F: Real>(self) -> F {
        F::from_f64(self.to_f64())
    }
}

macro_rules! impl_height {
    ($($t:ty),*) => {
        $(
            impl Height for $t {
                #[inline]
                fn one() -> Self {
                    1
                }

                #[inline]
                fn from_usize(value: usize) -> Self {
                    value as $t
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn to_i64(self) -> i64 {
                    self as i64
                }
            }
        )*
    };
}

impl_height!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_converts_into_either_real() {
        let h: i32 = -7;
        let as_f32: f32 = h.to_real();
        let as_f64: f64 = h.to_real();
        assert_eq!(as_f32, -7.0);
        assert_eq!(as_f64, -7.0);
    }

    #[test]
    fn real_from_usize_matches_cast() {
        assert_eq!(<f64 as Real>::from_usize(12), 12.0);
        assert!(<f32 as Real>::ln(0.0).is_infinite());
    }
}
