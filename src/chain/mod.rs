//! Segments and the protocol that keeps linked segments connected.
//!
//! A [`SegmentStore`] owns every [`Segment`]; segments refer to their
//! neighbours by [`SegmentId`]. Linking `a -> b` puts `a.end` on
//! `b.start` and, on request, turns the two handles at the joint to
//! opposite directions. Later anchor edits made through the store keep
//! the joint together.

mod segment;
mod store;
mod subscription;

pub use segment::{Field, Segment, SegmentId};
pub use store::{LinkOptions, SegmentStore};
pub use subscription::SubscriptionId;
