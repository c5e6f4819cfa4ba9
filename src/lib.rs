//! Cubic bezier segments that stay connected while they are edited.
//!
//! Profiles and paths of a sweep model are chains of [`chain::Segment`]s
//! owned by a [`chain::SegmentStore`]. The store's link protocol keeps
//! shared joints coincident (and optionally smooth); the [`tessellation`]
//! module turns chains into point sequences for mesh generation.

pub mod chain;
pub mod error;
pub mod geometry;
pub mod math;
pub mod tessellation;

pub use chain::{Field, LinkOptions, Segment, SegmentId, SegmentStore, SubscriptionId};
pub use error::{Result, SweepError};
pub use geometry::CubicBezier;
