use std::cell::Cell;

use crate::error::Result;
use crate::geometry::curve::CubicBezier;
use crate::math::CurveVector;
use crate::tessellation::{ApproximationNode, ApproximationParams};

slotmap::new_key_type! {
    /// Unique identifier for a segment in the segment store.
    pub struct SegmentId;
}

/// A mutable field of a segment, used for change tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// The start anchor.
    Start,
    /// The absolute position of the start control point.
    StartControl,
    /// The absolute position of the end control point.
    EndControl,
    /// The end anchor.
    End,
    /// The link to the previous segment.
    Previous,
    /// The link to the next segment.
    Next,
}

impl Field {
    /// Every field of a segment.
    pub const ALL: [Field; 6] = [
        Field::Start,
        Field::StartControl,
        Field::EndControl,
        Field::End,
        Field::Previous,
        Field::Next,
    ];

    /// The fields the curve shape depends on.
    pub const GEOMETRY: [Field; 4] = [
        Field::Start,
        Field::StartControl,
        Field::EndControl,
        Field::End,
    ];

    fn index(self) -> usize {
        match self {
            Field::Start => 0,
            Field::StartControl => 1,
            Field::EndControl => 2,
            Field::End => 3,
            Field::Previous => 4,
            Field::Next => 5,
        }
    }
}

/// One cubic bezier curve with linkable neighbours.
///
/// Control points are stored as deltas from their anchors. The
/// `previous`/`next` links are non-owning handles into the owning
/// [`SegmentStore`](super::SegmentStore); only the store's link protocol
/// changes them.
///
/// All setters here are local: they never touch a neighbour. Use the
/// store's `set_start`/`set_end`/`move_start`/`move_end` to keep a chain
/// connected.
#[derive(Debug, Clone)]
pub struct Segment<V: CurveVector> {
    start: V,
    start_delta: V,
    end_delta: V,
    end: V,
    previous: Option<SegmentId>,
    next: Option<SegmentId>,
    clock: u64,
    revisions: [u64; 6],
    plain: Cell<Option<CubicBezier<V>>>,
}

impl<V: CurveVector> Segment<V> {
    /// Creates a segment from four absolute points.
    #[must_use]
    pub fn new(start: V, start_control: V, end_control: V, end: V) -> Self {
        Self {
            start,
            start_delta: start_control - start,
            end_delta: end_control - end,
            end,
            previous: None,
            next: None,
            clock: 0,
            revisions: [0; 6],
            plain: Cell::new(None),
        }
    }

    /// Creates a straight segment whose control points coincide with its anchors.
    #[must_use]
    pub fn line(start: V, end: V) -> Self {
        Self::new(start, start, end, end)
    }

    /// Creates an unlinked segment with the shape of `bezier`.
    #[must_use]
    pub fn from_bezier(bezier: &CubicBezier<V>) -> Self {
        Self::new(
            bezier.start,
            bezier.start_control,
            bezier.end_control,
            bezier.end,
        )
    }

    // --- Reads ---

    /// Returns the start anchor.
    #[must_use]
    pub fn start(&self) -> V {
        self.start
    }

    /// Returns the end anchor.
    #[must_use]
    pub fn end(&self) -> V {
        self.end
    }

    /// Returns the absolute start control point.
    #[must_use]
    pub fn start_control(&self) -> V {
        self.start + self.start_delta
    }

    /// Returns the absolute end control point.
    #[must_use]
    pub fn end_control(&self) -> V {
        self.end + self.end_delta
    }

    /// Returns `start_control - start`.
    #[must_use]
    pub fn start_control_delta(&self) -> V {
        self.start_delta
    }

    /// Returns `end_control - end`.
    #[must_use]
    pub fn end_control_delta(&self) -> V {
        self.end_delta
    }

    /// Unit direction from the start anchor toward its control point.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroVector`](crate::error::GeometryError::ZeroVector)
    /// when the control point sits on the anchor.
    pub fn start_direction(&self) -> Result<V> {
        self.start_delta.try_unit()
    }

    /// Unit direction from the end anchor toward its control point.
    ///
    /// This points back into the curve, so a smooth joint has
    /// `a.end_direction() == -b.start_direction()`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroVector`](crate::error::GeometryError::ZeroVector)
    /// when the control point sits on the anchor.
    pub fn end_direction(&self) -> Result<V> {
        self.end_delta.try_unit()
    }

    /// Returns the previous segment, if linked.
    #[must_use]
    pub fn previous(&self) -> Option<SegmentId> {
        self.previous
    }

    /// Returns the next segment, if linked.
    #[must_use]
    pub fn next(&self) -> Option<SegmentId> {
        self.next
    }

    /// Returns the revision at which `field` last changed.
    ///
    /// Revisions increase monotonically per segment; `0` means never changed.
    #[must_use]
    pub fn revision(&self, field: Field) -> u64 {
        self.revisions[field.index()]
    }

    /// Returns the latest revision of any field.
    #[must_use]
    pub fn clock(&self) -> u64 {
        self.clock
    }

    // --- Curve evaluation ---

    /// Returns the curve as a plain bezier.
    ///
    /// Memoized; the cache is dropped whenever a geometry field changes.
    #[must_use]
    pub fn plain(&self) -> CubicBezier<V> {
        if let Some(bezier) = self.plain.get() {
            return bezier;
        }
        let bezier = CubicBezier::new(self.start, self.start_control(), self.end_control(), self.end);
        self.plain.set(Some(bezier));
        bezier
    }

    /// Evaluates the curve at `t`.
    #[must_use]
    pub fn point_at(&self, t: f64) -> V {
        self.plain().point_at(t)
    }

    /// Unit tangent of the curve at `t`.
    ///
    /// # Errors
    ///
    /// Returns an error where the derivative vanishes, see [`CubicBezier::tangent_at`].
    pub fn direction(&self, t: f64) -> Result<V> {
        self.plain().tangent_at(t)
    }

    /// Adaptive polyline approximation of the curve.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` fail validation.
    pub fn calculate_approximation(
        &self,
        params: &ApproximationParams,
    ) -> Result<Vec<ApproximationNode<V>>> {
        self.plain().approximate(params)
    }

    /// Samples `point_count` nodes at uniform parameter steps.
    ///
    /// With `skip_last` the end anchor is dropped, so consecutive segments
    /// can be concatenated without repeating their shared joint.
    ///
    /// # Errors
    ///
    /// Returns an error when `point_count` is zero.
    pub fn approximate(
        &self,
        point_count: usize,
        skip_last: bool,
    ) -> Result<Vec<ApproximationNode<V>>> {
        let points = self.plain().sample(point_count)?;
        #[allow(clippy::cast_precision_loss)]
        let steps = point_count.saturating_sub(1).max(1) as f64;
        let keep = if skip_last {
            points.len() - 1
        } else {
            points.len()
        };
        #[allow(clippy::cast_precision_loss)]
        let nodes = points
            .into_iter()
            .take(keep)
            .enumerate()
            .map(|(i, point)| ApproximationNode::new(point, i as f64 / steps))
            .collect();
        Ok(nodes)
    }

    /// Length of the adaptive approximation.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` fail validation.
    pub fn length(&self, params: &ApproximationParams) -> Result<f64> {
        self.plain().length(params)
    }

    // --- Local mutation ---

    /// Moves the start anchor, keeping the start control point where it is.
    ///
    /// The control delta (and so the start tangent) changes.
    pub fn set_start(&mut self, point: V) {
        if point == self.start {
            return;
        }
        let control = self.start_control();
        self.start = point;
        self.start_delta = control - point;
        self.touch(&[Field::Start]);
    }

    /// Moves the end anchor, keeping the end control point where it is.
    pub fn set_end(&mut self, point: V) {
        if point == self.end {
            return;
        }
        let control = self.end_control();
        self.end = point;
        self.end_delta = control - point;
        self.touch(&[Field::End]);
    }

    /// Moves the start anchor and its control point together.
    ///
    /// The control delta is preserved.
    pub fn move_start(&mut self, point: V) {
        if point == self.start {
            return;
        }
        self.start = point;
        self.touch(&[Field::Start, Field::StartControl]);
    }

    /// Moves the end anchor and its control point together.
    pub fn move_end(&mut self, point: V) {
        if point == self.end {
            return;
        }
        self.end = point;
        self.touch(&[Field::End, Field::EndControl]);
    }

    /// Places the start control point at an absolute position.
    pub fn set_start_control(&mut self, point: V) {
        self.set_start_control_delta(point - self.start);
    }

    /// Places the end control point at an absolute position.
    pub fn set_end_control(&mut self, point: V) {
        self.set_end_control_delta(point - self.end);
    }

    /// Sets the start control point relative to the start anchor.
    pub fn set_start_control_delta(&mut self, delta: V) {
        if delta == self.start_delta {
            return;
        }
        self.start_delta = delta;
        self.touch(&[Field::StartControl]);
    }

    /// Sets the end control point relative to the end anchor.
    pub fn set_end_control_delta(&mut self, delta: V) {
        if delta == self.end_delta {
            return;
        }
        self.end_delta = delta;
        self.touch(&[Field::EndControl]);
    }

    /// Points the start handle along `direction`, keeping its length.
    ///
    /// A zero-length handle stays zero-length.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroVector`](crate::error::GeometryError::ZeroVector)
    /// if `direction` has zero length.
    pub fn set_start_direction(&mut self, direction: V) -> Result<()> {
        let unit = direction.try_unit()?;
        self.set_start_control_delta(unit * self.start_delta.length());
        Ok(())
    }

    /// Points the end handle along `direction`, keeping its length.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroVector`](crate::error::GeometryError::ZeroVector)
    /// if `direction` has zero length.
    pub fn set_end_direction(&mut self, direction: V) -> Result<()> {
        let unit = direction.try_unit()?;
        self.set_end_control_delta(unit * self.end_delta.length());
        Ok(())
    }

    pub(crate) fn set_previous_link(&mut self, previous: Option<SegmentId>) {
        if previous != self.previous {
            self.previous = previous;
            self.touch(&[Field::Previous]);
        }
    }

    pub(crate) fn set_next_link(&mut self, next: Option<SegmentId>) {
        if next != self.next {
            self.next = next;
            self.touch(&[Field::Next]);
        }
    }

    fn touch(&mut self, fields: &[Field]) {
        self.clock += 1;
        for field in fields {
            self.revisions[field.index()] = self.clock;
        }
        if fields.iter().any(|f| Field::GEOMETRY.contains(f)) {
            self.plain.set(None);
        }
    }
}
