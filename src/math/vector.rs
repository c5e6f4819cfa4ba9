//! Vector capability set shared by 2D and 3D curves.

use std::fmt::Debug;
use std::ops::{Add, Mul, Neg, Sub};

use nalgebra::{Matrix, SVector};

use crate::error::{GeometryError, Result};

use super::TOLERANCE;

/// Value-type vector that bezier math and segments are generic over.
///
/// Implemented for every `nalgebra::SVector<f64, D>`, so [`Vector2`](super::Vector2)
/// and [`Vector3`](super::Vector3) curves share one implementation.
pub trait CurveVector:
    Copy
    + Debug
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + Neg<Output = Self>
{
    /// The zero vector.
    fn zero() -> Self;

    /// Dot product.
    fn dot(&self, other: &Self) -> f64;

    /// Euclidean norm.
    fn length(&self) -> f64;

    /// Returns the unit vector in the same direction.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroVector`] when the length is below [`TOLERANCE`].
    fn try_unit(&self) -> Result<Self>;

    /// Euclidean distance to `other`.
    fn distance(&self, other: &Self) -> f64 {
        (*other - *self).length()
    }

    /// Linear interpolation between `self` (at 0) and `other` (at 1).
    #[must_use]
    fn lerp(&self, other: &Self, t: f64) -> Self {
        *self + (*other - *self) * t
    }
}

impl<const D: usize> CurveVector for SVector<f64, D> {
    fn zero() -> Self {
        Self::zeros()
    }

    fn dot(&self, other: &Self) -> f64 {
        Matrix::dot(self, other)
    }

    fn length(&self) -> f64 {
        self.norm()
    }

    fn try_unit(&self) -> Result<Self> {
        let len = self.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(self / len)
    }
}

/// Distance from `point` to the segment `a`–`b`.
///
/// Falls back to the distance to `a` when the segment has zero length.
pub fn distance_to_segment<V: CurveVector>(point: &V, a: &V, b: &V) -> f64 {
    let ab = *b - *a;
    let len_sq = ab.dot(&ab);
    if len_sq < TOLERANCE * TOLERANCE {
        return point.distance(a);
    }
    let t = ((*point - *a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    point.distance(&(*a + ab * t))
}
