mod bezier;

pub use bezier::CubicBezier;

use crate::error::{GeometryError, Result};

/// Parameter domain for a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveDomain {
    /// Start of the parameter range.
    pub t_min: f64,
    /// End of the parameter range.
    pub t_max: f64,
}

impl CurveDomain {
    /// Creates a new curve domain.
    #[must_use]
    pub fn new(t_min: f64, t_max: f64) -> Self {
        Self { t_min, t_max }
    }

    /// The unit domain `[0, 1]` shared by all bezier curves.
    #[must_use]
    pub fn unit() -> Self {
        Self::new(0.0, 1.0)
    }

    /// Returns `Ok(t)` if `t` lies inside the domain.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidArgument`] if `t` is outside the domain or NaN.
    pub fn check(&self, t: f64) -> Result<f64> {
        if (self.t_min..=self.t_max).contains(&t) {
            Ok(t)
        } else {
            Err(GeometryError::InvalidArgument(format!(
                "parameter t = {t} is out of range [{}, {}]",
                self.t_min, self.t_max
            ))
            .into())
        }
    }
}

/// Trait for parametric curves over a vector space.
pub trait Curve {
    /// The point/vector type of the space the curve lives in.
    type Vector;

    /// Evaluates the curve at parameter `t`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is out of range or evaluation fails.
    fn evaluate(&self, t: f64) -> Result<Self::Vector>;

    /// Computes the unit tangent vector at parameter `t`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is out of range or the tangent is degenerate.
    fn tangent(&self, t: f64) -> Result<Self::Vector>;

    /// Returns the parameter domain of the curve.
    fn domain(&self) -> CurveDomain;

    /// Returns whether the curve is closed.
    fn is_closed(&self) -> bool;
}
