mod tessellate_chain;

pub use tessellate_chain::TessellateChain;

use crate::error::{ApproximationError, Result};

/// Upper bound accepted for [`ApproximationParams::max_depth`].
pub const MAX_DEPTH_LIMIT: u32 = 24;

/// Parameters controlling adaptive curve approximation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproximationParams {
    tolerance: f64,
    max_depth: u32,
}

impl ApproximationParams {
    /// Creates validated approximation parameters.
    ///
    /// * `tolerance` - Maximum allowed deviation between a curve piece and its chord
    /// * `max_depth` - Maximum subdivision depth; a curve yields at most `2^max_depth` pieces
    ///
    /// # Errors
    ///
    /// Returns an error if `tolerance` is not a positive finite number or
    /// `max_depth` exceeds [`MAX_DEPTH_LIMIT`].
    pub fn new(tolerance: f64, max_depth: u32) -> Result<Self> {
        let params = Self {
            tolerance,
            max_depth,
        };
        params.validate()?;
        Ok(params)
    }

    /// Returns the deviation tolerance.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Returns the maximum subdivision depth.
    #[must_use]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Checks the parameter ranges.
    ///
    /// # Errors
    ///
    /// See [`ApproximationParams::new`].
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ApproximationError::InvalidParameters(format!(
                "tolerance must be positive and finite, got {}",
                self.tolerance
            ))
            .into());
        }
        if self.max_depth > MAX_DEPTH_LIMIT {
            return Err(ApproximationError::InvalidParameters(format!(
                "max_depth must be at most {MAX_DEPTH_LIMIT}, got {}",
                self.max_depth
            ))
            .into());
        }
        Ok(())
    }
}

impl Default for ApproximationParams {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            max_depth: 10,
        }
    }
}

/// One point of an approximated curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproximationNode<V> {
    /// Position on the curve.
    pub point: V,
    /// Curve parameter the point was evaluated at.
    pub t: f64,
}

impl<V> ApproximationNode<V> {
    /// Creates a new node.
    #[must_use]
    pub fn new(point: V, t: f64) -> Self {
        Self { point, t }
    }
}

/// A vertex of a chain polyline, tagged with the segment it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolylineVertex<V> {
    /// Position of the vertex.
    pub point: V,
    /// Index of the source segment within the chain.
    pub segment: usize,
    /// Parameter on the source segment.
    pub t: f64,
}

/// A polyline approximation of a segment chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline<V> {
    /// The ordered vertices of the polyline.
    pub vertices: Vec<PolylineVertex<V>>,
    /// Whether the chain loops back onto its first segment.
    pub closed: bool,
}

impl<V: Copy> Polyline<V> {
    /// Returns the vertex positions only.
    #[must_use]
    pub fn points(&self) -> Vec<V> {
        self.vertices.iter().map(|v| v.point).collect()
    }
}
