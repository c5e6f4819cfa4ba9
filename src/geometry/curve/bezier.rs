use crate::error::{GeometryError, Result};
use crate::math::{distance_to_segment, CurveVector, TOLERANCE};
use crate::tessellation::{ApproximationNode, ApproximationParams};

use super::{Curve, CurveDomain};

/// A cubic bezier curve given by its four points.
///
/// This is a plain snapshot with no identity: segments hand one out via
/// [`Segment::plain`](crate::chain::Segment::plain) and all evaluation
/// goes through it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier<V> {
    /// Start anchor, `B(0)`.
    pub start: V,
    /// Control point attached to the start anchor.
    pub start_control: V,
    /// Control point attached to the end anchor.
    pub end_control: V,
    /// End anchor, `B(1)`.
    pub end: V,
}

impl<V: CurveVector> CubicBezier<V> {
    /// Creates a new cubic bezier curve.
    #[must_use]
    pub fn new(start: V, start_control: V, end_control: V, end: V) -> Self {
        Self {
            start,
            start_control,
            end_control,
            end,
        }
    }

    /// Creates a straight curve whose control points coincide with the anchors.
    #[must_use]
    pub fn line(start: V, end: V) -> Self {
        Self::new(start, start, end, end)
    }

    /// Evaluates `B(t) = (1-t)³·P0 + 3(1-t)²t·P1 + 3(1-t)t²·P2 + t³·P3`.
    ///
    /// Exact at the anchors: `t = 0` returns `start` and `t = 1` returns `end`
    /// without rounding. Values outside `[0, 1]` extrapolate.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn point_at(&self, t: f64) -> V {
        if t == 0.0 {
            return self.start;
        }
        if t == 1.0 {
            return self.end;
        }
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let t2 = t * t;
        self.start * (mt2 * mt)
            + self.start_control * (3.0 * mt2 * t)
            + self.end_control * (3.0 * mt * t2)
            + self.end * (t2 * t)
    }

    /// Returns the first derivative `B'(t)`.
    #[must_use]
    pub fn derivative_at(&self, t: f64) -> V {
        let mt = 1.0 - t;
        (self.start_control - self.start) * (3.0 * mt * mt)
            + (self.end_control - self.start_control) * (6.0 * mt * t)
            + (self.end - self.end_control) * (3.0 * t * t)
    }

    /// Returns the unit tangent at `t`.
    ///
    /// The derivative vanishes where a control point coincides with its
    /// anchor (a straight segment at `t = 0` or `t = 1`, or a fully
    /// collapsed curve). No direction is invented for those parameters.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroVector`] when the derivative has zero length.
    pub fn tangent_at(&self, t: f64) -> Result<V> {
        self.derivative_at(t).try_unit()
    }

    /// Samples `count` points at uniform parameter steps.
    ///
    /// For `count >= 2` both anchors are included; `count == 1` yields only
    /// the start anchor.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidArgument`] when `count` is zero.
    pub fn sample(&self, count: usize) -> Result<Vec<V>> {
        match count {
            0 => Err(GeometryError::InvalidArgument(
                "sample count must be at least 1".to_owned(),
            )
            .into()),
            1 => Ok(vec![self.start]),
            _ => {
                #[allow(clippy::cast_precision_loss)]
                let steps = (count - 1) as f64;
                #[allow(clippy::cast_precision_loss)]
                let points = (0..count)
                    .map(|i| self.point_at(i as f64 / steps))
                    .collect();
                Ok(points)
            }
        }
    }

    /// Splits the curve at `t` using de Casteljau's algorithm.
    #[must_use]
    pub fn split(&self, t: f64) -> (Self, Self) {
        let p01 = self.start.lerp(&self.start_control, t);
        let p12 = self.start_control.lerp(&self.end_control, t);
        let p23 = self.end_control.lerp(&self.end, t);
        let p012 = p01.lerp(&p12, t);
        let p123 = p12.lerp(&p23, t);
        let mid = p012.lerp(&p123, t);
        (
            Self::new(self.start, p01, p012, mid),
            Self::new(mid, p123, p23, self.end),
        )
    }

    /// Maximum distance of the control points from the chord.
    ///
    /// Used as the flatness measure for adaptive subdivision; the curve lies
    /// within this distance of its chord.
    #[must_use]
    pub fn flatness(&self) -> f64 {
        let d1 = distance_to_segment(&self.start_control, &self.start, &self.end);
        let d2 = distance_to_segment(&self.end_control, &self.start, &self.end);
        d1.max(d2)
    }

    /// Approximates the curve with a polyline by adaptive subdivision.
    ///
    /// A piece is accepted once its [`flatness`](Self::flatness) is within
    /// the tolerance or the depth bound is reached, so the recursion always
    /// terminates. The first node is the start anchor at `t = 0`, the last
    /// is the end anchor at `t = 1`.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` fail validation.
    pub fn approximate(&self, params: &ApproximationParams) -> Result<Vec<ApproximationNode<V>>> {
        params.validate()?;
        let mut nodes = vec![ApproximationNode::new(self.start, 0.0)];
        self.subdivide(0.0, 1.0, 0, params, &mut nodes);
        tracing::trace!(nodes = nodes.len(), "approximated cubic bezier");
        Ok(nodes)
    }

    fn subdivide(
        &self,
        t0: f64,
        t1: f64,
        depth: u32,
        params: &ApproximationParams,
        nodes: &mut Vec<ApproximationNode<V>>,
    ) {
        if depth >= params.max_depth() || self.flatness() <= params.tolerance() {
            nodes.push(ApproximationNode::new(self.end, t1));
            return;
        }
        let mid = 0.5 * (t0 + t1);
        let (left, right) = self.split(0.5);
        left.subdivide(t0, mid, depth + 1, params, nodes);
        right.subdivide(mid, t1, depth + 1, params, nodes);
    }

    /// Length of the polyline produced by [`approximate`](Self::approximate).
    ///
    /// # Errors
    ///
    /// Returns an error if `params` fail validation.
    pub fn length(&self, params: &ApproximationParams) -> Result<f64> {
        let nodes = self.approximate(params)?;
        Ok(nodes
            .windows(2)
            .map(|w| w[0].point.distance(&w[1].point))
            .sum())
    }

    /// Returns the same curve traversed from end to start.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self::new(self.end, self.end_control, self.start_control, self.start)
    }
}

impl<V: CurveVector> Curve for CubicBezier<V> {
    type Vector = V;

    fn evaluate(&self, t: f64) -> Result<V> {
        let t = self.domain().check(t)?;
        Ok(self.point_at(t))
    }

    fn tangent(&self, t: f64) -> Result<V> {
        let t = self.domain().check(t)?;
        self.tangent_at(t)
    }

    fn domain(&self) -> CurveDomain {
        CurveDomain::unit()
    }

    fn is_closed(&self) -> bool {
        self.start.distance(&self.end) < TOLERANCE
    }
}
