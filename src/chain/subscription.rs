use crate::math::CurveVector;

use super::segment::{Field, Segment, SegmentId};

slotmap::new_key_type! {
    /// Token identifying a change subscription in the segment store.
    pub struct SubscriptionId;
}

/// Interest in a set of fields of one segment.
///
/// Changes are detected by comparing the segment's per-field revisions with
/// the clock value seen at the previous poll.
#[derive(Debug, Clone)]
pub(crate) struct Subscription {
    segment: SegmentId,
    fields: Vec<Field>,
    seen: u64,
}

impl Subscription {
    pub(crate) fn new<V: CurveVector>(id: SegmentId, segment: &Segment<V>, fields: &[Field]) -> Self {
        Self {
            segment: id,
            fields: fields.to_vec(),
            seen: segment.clock(),
        }
    }

    pub(crate) fn segment(&self) -> SegmentId {
        self.segment
    }

    /// Returns whether any watched field changed since the last poll, and
    /// marks the current state as seen.
    pub(crate) fn poll<V: CurveVector>(&mut self, segment: &Segment<V>) -> bool {
        let changed = self
            .fields
            .iter()
            .any(|field| segment.revision(*field) > self.seen);
        self.seen = segment.clock();
        changed
    }
}
