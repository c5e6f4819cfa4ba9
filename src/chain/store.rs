use std::collections::HashSet;

use slotmap::SlotMap;

use crate::error::{ChainError, GeometryError, Result};
use crate::math::{CurveVector, TOLERANCE};

use super::segment::{Field, Segment, SegmentId};
use super::subscription::{Subscription, SubscriptionId};

/// Options for [`SegmentStore::set_previous_segment`] and
/// [`SegmentStore::set_next_segment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkOptions {
    /// Also update the reciprocal link on the neighbour.
    pub sync: bool,
    /// Turn this segment's boundary handle to oppose the neighbour's handle.
    pub copy_direction: bool,
}

impl LinkOptions {
    /// Reciprocal link that also makes the joint smooth in direction.
    #[must_use]
    pub fn smooth() -> Self {
        Self {
            sync: true,
            copy_direction: true,
        }
    }

    /// Link this side only, without touching the neighbour.
    #[must_use]
    pub fn local() -> Self {
        Self {
            sync: false,
            copy_direction: false,
        }
    }
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            sync: true,
            copy_direction: false,
        }
    }
}

/// Which end of a segment a link attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Start,
    End,
}

impl Side {
    fn opposite(self) -> Self {
        match self {
            Side::Start => Side::End,
            Side::End => Side::Start,
        }
    }
}

/// Arena that owns segments and maintains the links between them.
///
/// Segments refer to their neighbours by [`SegmentId`] (generational
/// indices), so chains and loops need no shared ownership. Every
/// cross-segment mutation goes through this type.
#[derive(Debug)]
pub struct SegmentStore<V: CurveVector> {
    segments: SlotMap<SegmentId, Segment<V>>,
    subscriptions: SlotMap<SubscriptionId, Subscription>,
}

impl<V: CurveVector> Default for SegmentStore<V> {
    fn default() -> Self {
        Self {
            segments: SlotMap::with_key(),
            subscriptions: SlotMap::with_key(),
        }
    }
}

impl<V: CurveVector> SegmentStore<V> {
    /// Creates a new, empty segment store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Segment ownership ---

    /// Inserts an unlinked segment and returns its ID.
    ///
    /// Links carried by `segment` (e.g. when it was cloned out of a store)
    /// are dropped.
    pub fn insert(&mut self, mut segment: Segment<V>) -> SegmentId {
        segment.set_previous_link(None);
        segment.set_next_link(None);
        self.segments.insert(segment)
    }

    /// Removes a segment, clearing the links its neighbours hold to it.
    ///
    /// Neighbour points are left untouched. Subscriptions watching the
    /// segment are dropped with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment is not in the store.
    pub fn remove(&mut self, id: SegmentId) -> Result<Segment<V>> {
        let (previous, next) = {
            let segment = self.get(id)?;
            (segment.previous(), segment.next())
        };
        if let Some(prev) = previous {
            self.drop_back_link(prev, Side::End, id);
        }
        if let Some(next) = next {
            self.drop_back_link(next, Side::Start, id);
        }
        let mut segment = self
            .segments
            .remove(id)
            .ok_or(ChainError::SegmentNotFound)?;
        segment.set_previous_link(None);
        segment.set_next_link(None);
        self.subscriptions.retain(|_, entry| entry.segment() != id);
        tracing::debug!(?id, "removed segment");
        Ok(segment)
    }

    /// Returns a reference to the segment, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment is not in the store.
    pub fn get(&self, id: SegmentId) -> Result<&Segment<V>> {
        Ok(self.segments.get(id).ok_or(ChainError::SegmentNotFound)?)
    }

    /// Returns a mutable reference to the segment for local edits.
    ///
    /// Edits made through this reference are never propagated to
    /// neighbours.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment is not in the store.
    pub fn get_mut(&mut self, id: SegmentId) -> Result<&mut Segment<V>> {
        Ok(self
            .segments
            .get_mut(id)
            .ok_or(ChainError::SegmentNotFound)?)
    }

    /// Returns whether `id` refers to a live segment.
    #[must_use]
    pub fn contains(&self, id: SegmentId) -> bool {
        self.segments.contains_key(id)
    }

    /// Returns the number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns whether the store holds no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Iterates over all segment IDs in storage order.
    pub fn ids(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.segments.keys()
    }

    // --- Link reads ---

    /// Returns the previous segment of `id`, or `None` if unlinked.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not in the store.
    pub fn previous(&self, id: SegmentId) -> Result<Option<SegmentId>> {
        Ok(self.get(id)?.previous())
    }

    /// Returns the next segment of `id`, or `None` if unlinked.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not in the store.
    pub fn next(&self, id: SegmentId) -> Result<Option<SegmentId>> {
        Ok(self.get(id)?.next())
    }

    // --- Link protocol ---

    /// Links `previous` before `id`, or unlinks with `None`.
    ///
    /// Linking moves this segment's start anchor onto the previous
    /// segment's end; the previous segment does not move. With
    /// `copy_direction` the start handle is turned to oppose the previous
    /// end handle. With `sync` the previous segment's `next` link is set to
    /// `id` as well.
    ///
    /// Unlinking with `None` never moves points. With `sync = false` only
    /// this side is cleared; with `sync = true` (the default) the old
    /// neighbour's `next` link is cleared too, so no one-sided link is left
    /// behind. Pass [`LinkOptions::local`] to clear this side alone.
    ///
    /// # Errors
    ///
    /// Returns an error if either segment is missing, if `previous == id`,
    /// or if `copy_direction` is requested and the previous end handle has
    /// zero length. Nothing is modified when an error is returned.
    pub fn set_previous_segment(
        &mut self,
        id: SegmentId,
        previous: Option<SegmentId>,
        options: LinkOptions,
    ) -> Result<()> {
        self.link(id, Side::Start, previous, options)
    }

    /// Links `next` after `id`, or unlinks with `None`.
    ///
    /// Linking moves this segment's end anchor onto the next segment's
    /// start. See [`set_previous_segment`](Self::set_previous_segment).
    ///
    /// # Errors
    ///
    /// Same as [`set_previous_segment`](Self::set_previous_segment).
    pub fn set_next_segment(
        &mut self,
        id: SegmentId,
        next: Option<SegmentId>,
        options: LinkOptions,
    ) -> Result<()> {
        self.link(id, Side::End, next, options)
    }

    fn link(
        &mut self,
        id: SegmentId,
        side: Side,
        neighbour: Option<SegmentId>,
        options: LinkOptions,
    ) -> Result<()> {
        let current = link_at(self.get(id)?, side);
        if current == neighbour {
            return Ok(());
        }

        // Validate before touching anything.
        let target = match neighbour {
            Some(n) if n == id => {
                return Err(GeometryError::InvalidArgument(
                    "a segment cannot be linked to itself".to_owned(),
                )
                .into());
            }
            Some(n) => {
                let other = self.get(n)?;
                let anchor = anchor_at(other, side.opposite());
                let direction = if options.copy_direction {
                    let handle = handle_at(other, side.opposite());
                    let dir = handle.try_unit().map_err(|_| {
                        GeometryError::Degenerate(
                            "neighbour handle has zero length, joint direction is undefined"
                                .to_owned(),
                        )
                    })?;
                    Some((dir, handle.length()))
                } else {
                    None
                };
                Some((n, anchor, direction))
            }
            None => None,
        };

        if let Some(old) = current {
            set_link_at(self.get_mut(id)?, side, None);
            if target.is_some() || options.sync {
                self.drop_back_link(old, side.opposite(), id);
            }
            tracing::debug!(?id, ?old, ?side, "unlinked segment");
        }

        let Some((n, anchor, direction)) = target else {
            return Ok(());
        };

        let segment = self.get_mut(id)?;
        set_link_at(segment, side, Some(n));
        match side {
            Side::Start => segment.set_start(anchor),
            Side::End => segment.set_end(anchor),
        }
        if let Some((dir, neighbour_len)) = direction {
            let chord = segment.start().distance(&segment.end());
            let own = handle_at(segment, side);
            let len = handle_length(own.length(), chord, neighbour_len);
            let delta = -dir * len;
            match side {
                Side::Start => segment.set_start_control_delta(delta),
                Side::End => segment.set_end_control_delta(delta),
            }
        }
        tracing::debug!(
            ?id,
            neighbour = ?n,
            ?side,
            sync = options.sync,
            copy_direction = options.copy_direction,
            "linked segment"
        );

        if options.sync {
            self.link(n, side.opposite(), Some(id), LinkOptions::local())?;
        }
        Ok(())
    }

    /// Clears `neighbour`'s link on `side` if it still points at `id`.
    fn drop_back_link(&mut self, neighbour: SegmentId, side: Side, id: SegmentId) {
        if let Some(segment) = self.segments.get_mut(neighbour) {
            if link_at(segment, side) == Some(id) {
                set_link_at(segment, side, None);
            }
        }
    }

    // --- Anchor edits ---

    /// Moves the start anchor, keeping the start control point fixed.
    ///
    /// With `sync` the previous segment's end anchor follows (its control
    /// point stays put).
    ///
    /// # Errors
    ///
    /// Returns an error if the segment is not in the store.
    pub fn set_start(&mut self, id: SegmentId, point: V, sync: bool) -> Result<()> {
        let segment = self.get_mut(id)?;
        segment.set_start(point);
        let previous = segment.previous();
        if let (true, Some(prev)) = (sync, previous) {
            tracing::trace!(?id, ?prev, "propagating start anchor");
            self.get_mut(prev)?.set_end(point);
        }
        Ok(())
    }

    /// Moves the end anchor, keeping the end control point fixed.
    ///
    /// With `sync` the next segment's start anchor follows.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment is not in the store.
    pub fn set_end(&mut self, id: SegmentId, point: V, sync: bool) -> Result<()> {
        let segment = self.get_mut(id)?;
        segment.set_end(point);
        let next = segment.next();
        if let (true, Some(next)) = (sync, next) {
            tracing::trace!(?id, ?next, "propagating end anchor");
            self.get_mut(next)?.set_start(point);
        }
        Ok(())
    }

    /// Moves the start anchor together with its control point.
    ///
    /// With `sync` the previous segment's end anchor and control move
    /// rigidly too, so a smooth joint stays smooth.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment is not in the store.
    pub fn move_start(&mut self, id: SegmentId, point: V, sync: bool) -> Result<()> {
        let segment = self.get_mut(id)?;
        segment.move_start(point);
        let previous = segment.previous();
        if let (true, Some(prev)) = (sync, previous) {
            self.get_mut(prev)?.move_end(point);
        }
        Ok(())
    }

    /// Moves the end anchor together with its control point.
    ///
    /// With `sync` the next segment's start moves rigidly too.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment is not in the store.
    pub fn move_end(&mut self, id: SegmentId, point: V, sync: bool) -> Result<()> {
        let segment = self.get_mut(id)?;
        segment.move_end(point);
        let next = segment.next();
        if let (true, Some(next)) = (sync, next) {
            self.get_mut(next)?.move_start(point);
        }
        Ok(())
    }

    // --- Chains ---

    /// Inserts `segment` and links it after `tail`.
    ///
    /// The new segment's start is moved onto `tail`'s end; `tail` is
    /// unchanged apart from its `next` link (any previous `next` is
    /// unlinked).
    ///
    /// # Errors
    ///
    /// Returns an error if `tail` is missing or the direction copy is
    /// degenerate; the new segment is not kept in that case.
    pub fn append(
        &mut self,
        tail: SegmentId,
        segment: Segment<V>,
        options: LinkOptions,
    ) -> Result<SegmentId> {
        self.get(tail)?;
        let id = self.insert(segment);
        if let Err(err) = self.set_previous_segment(id, Some(tail), options) {
            self.segments.remove(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Walks `previous` links back to the first segment of the chain.
    ///
    /// For a closed chain the walk stops when it returns to `id`, which is
    /// then returned.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment on the way is missing.
    pub fn head_of(&self, id: SegmentId) -> Result<SegmentId> {
        let mut visited = HashSet::new();
        let mut head = id;
        visited.insert(head);
        while let Some(prev) = self.get(head)?.previous() {
            if !visited.insert(prev) {
                return Ok(id);
            }
            head = prev;
        }
        Ok(head)
    }

    /// Returns the chain starting at `head`, following `next` links.
    ///
    /// The walk ends at an unlinked end or when a segment would repeat.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment on the way is missing.
    pub fn chain_from(&self, head: SegmentId) -> Result<Vec<SegmentId>> {
        let mut visited = HashSet::new();
        let mut chain = vec![head];
        visited.insert(head);
        let mut current = head;
        while let Some(next) = self.get(current)?.next() {
            if !visited.insert(next) {
                break;
            }
            chain.push(next);
            current = next;
        }
        Ok(chain)
    }

    /// Returns whether following `next` from `head` leads back to `head`.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment on the way is missing.
    pub fn is_closed_chain(&self, head: SegmentId) -> Result<bool> {
        let chain = self.chain_from(head)?;
        let Some(last) = chain.last() else {
            return Ok(false);
        };
        Ok(self.get(*last)?.next() == Some(head))
    }

    /// Samples every segment of the chain starting at `head` with
    /// `points_per_segment` points and concatenates the results.
    ///
    /// Shared joints appear once; a closed chain does not repeat its first
    /// point at the end. With one point per segment the result is the
    /// chain's joints: every segment start, plus the tail end of an open
    /// chain.
    ///
    /// # Errors
    ///
    /// Returns an error if `points_per_segment` is zero or a segment is missing.
    pub fn approximate_chain(&self, head: SegmentId, points_per_segment: usize) -> Result<Vec<V>> {
        let chain = self.chain_from(head)?;
        let closed = self.is_closed_chain(head)?;
        let mut points = Vec::with_capacity(chain.len() * points_per_segment + 1);
        if points_per_segment == 1 {
            for id in &chain {
                points.push(self.get(*id)?.start());
            }
            if let Some(tail) = chain.last().filter(|_| !closed) {
                points.push(self.get(*tail)?.end());
            }
            return Ok(points);
        }
        for (i, id) in chain.iter().enumerate() {
            let skip_last = closed || i + 1 < chain.len();
            let nodes = self.get(*id)?.approximate(points_per_segment, skip_last)?;
            points.extend(nodes.into_iter().map(|node| node.point));
        }
        Ok(points)
    }

    // --- Change subscriptions ---

    /// Registers interest in `fields` of segment `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment is not in the store.
    pub fn subscribe(&mut self, id: SegmentId, fields: &[Field]) -> Result<SubscriptionId> {
        let subscription = Subscription::new(id, self.get(id)?, fields);
        Ok(self.subscriptions.insert(subscription))
    }

    /// Drops a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool {
        self.subscriptions.remove(subscription).is_some()
    }

    /// Returns whether any watched field changed since the previous poll.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription is unknown, including one whose
    /// segment has been removed.
    pub fn poll(&mut self, subscription: SubscriptionId) -> Result<bool> {
        let entry = self
            .subscriptions
            .get_mut(subscription)
            .ok_or(ChainError::SubscriptionNotFound)?;
        let segment = self
            .segments
            .get(entry.segment())
            .ok_or(ChainError::SegmentNotFound)?;
        Ok(entry.poll(segment))
    }
}

fn link_at<V: CurveVector>(segment: &Segment<V>, side: Side) -> Option<SegmentId> {
    match side {
        Side::Start => segment.previous(),
        Side::End => segment.next(),
    }
}

fn set_link_at<V: CurveVector>(segment: &mut Segment<V>, side: Side, link: Option<SegmentId>) {
    match side {
        Side::Start => segment.set_previous_link(link),
        Side::End => segment.set_next_link(link),
    }
}

fn anchor_at<V: CurveVector>(segment: &Segment<V>, side: Side) -> V {
    match side {
        Side::Start => segment.start(),
        Side::End => segment.end(),
    }
}

fn handle_at<V: CurveVector>(segment: &Segment<V>, side: Side) -> V {
    match side {
        Side::Start => segment.start_control_delta(),
        Side::End => segment.end_control_delta(),
    }
}

/// Handle length to use when turning a handle at a smooth joint.
///
/// Keeps the current length; a collapsed handle gets a third of the chord,
/// and a collapsed segment borrows the neighbour's handle length.
fn handle_length(current: f64, chord: f64, neighbour: f64) -> f64 {
    if current >= TOLERANCE {
        current
    } else if chord >= TOLERANCE {
        chord / 3.0
    } else {
        neighbour
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::SweepError;
    use crate::math::{Vector2, Vector3};
    use approx::assert_relative_eq;

    fn v(x: f64, y: f64) -> Vector2 {
        Vector2::new(x, y)
    }

    fn curved(store: &mut SegmentStore<Vector2>, start: Vector2, end: Vector2) -> SegmentId {
        store.insert(Segment::new(
            start,
            start + v(1.0, 2.0),
            end + v(-1.0, 2.0),
            end,
        ))
    }

    #[test]
    fn link_previous_moves_only_this_start() {
        let mut store = SegmentStore::new();
        let a = store.insert(Segment::line(v(0.0, 0.0), v(5.0, 5.0)));
        let b = store.insert(Segment::line(v(0.0, 0.0), v(10.0, 0.0)));
        let a_before = store.get(a).unwrap().plain();

        store.set_previous_segment(b, Some(a), LinkOptions::default()).unwrap();

        assert_eq!(store.get(b).unwrap().start(), v(5.0, 5.0));
        assert_eq!(store.get(a).unwrap().plain(), a_before);
        assert_eq!(store.next(a).unwrap(), Some(b));
        assert_eq!(store.previous(b).unwrap(), Some(a));
    }

    #[test]
    fn link_next_moves_this_end() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let b = curved(&mut store, v(7.0, 3.0), v(12.0, 0.0));

        store.set_next_segment(a, Some(b), LinkOptions::default()).unwrap();

        assert_eq!(store.get(a).unwrap().end(), store.get(b).unwrap().start());
        assert_eq!(store.get(b).unwrap().start(), v(7.0, 3.0));
        assert_eq!(store.previous(b).unwrap(), Some(a));
    }

    #[test]
    fn link_with_copy_direction_makes_joint_smooth() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let b = curved(&mut store, v(5.0, 1.0), v(9.0, 0.0));
        let len_before = store.get(a).unwrap().end_control_delta().norm();

        store.set_next_segment(a, Some(b), LinkOptions::smooth()).unwrap();

        let end_dir = store.get(a).unwrap().end_direction().unwrap();
        let start_dir = store.get(b).unwrap().start_direction().unwrap();
        assert_relative_eq!(end_dir, -start_dir, epsilon = 1e-12);
        assert_relative_eq!(
            store.get(a).unwrap().end_control_delta().norm(),
            len_before,
            epsilon = 1e-12
        );
    }

    #[test]
    fn copy_direction_gives_collapsed_handle_a_third_of_chord() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(3.0, 0.0));
        let b = store.insert(Segment::line(v(3.0, 0.0), v(9.0, 0.0)));

        store.set_previous_segment(b, Some(a), LinkOptions::smooth()).unwrap();

        let seg = store.get(b).unwrap();
        assert_relative_eq!(seg.start_control_delta().norm(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(
            seg.start_direction().unwrap(),
            -store.get(a).unwrap().end_direction().unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn copy_direction_from_collapsed_handle_fails_without_changes() {
        let mut store = SegmentStore::new();
        let a = store.insert(Segment::line(v(0.0, 0.0), v(3.0, 0.0)));
        let b = curved(&mut store, v(5.0, 0.0), v(9.0, 0.0));

        let result = store.set_previous_segment(b, Some(a), LinkOptions::smooth());

        assert!(result.is_err());
        assert_eq!(store.previous(b).unwrap(), None);
        assert_eq!(store.next(a).unwrap(), None);
        assert_eq!(store.get(b).unwrap().start(), v(5.0, 0.0));
    }

    #[test]
    fn relinking_same_neighbour_is_a_no_op() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let b = curved(&mut store, v(6.0, 0.0), v(9.0, 0.0));
        store.set_next_segment(a, Some(b), LinkOptions::default()).unwrap();
        let clock_a = store.get(a).unwrap().clock();
        let clock_b = store.get(b).unwrap().clock();

        store.set_next_segment(a, Some(b), LinkOptions::default()).unwrap();

        assert_eq!(store.get(a).unwrap().clock(), clock_a);
        assert_eq!(store.get(b).unwrap().clock(), clock_b);
    }

    #[test]
    fn replacing_next_unlinks_old_neighbour() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let b = curved(&mut store, v(4.0, 0.0), v(8.0, 0.0));
        let c = curved(&mut store, v(4.0, 5.0), v(8.0, 5.0));
        store.set_next_segment(a, Some(b), LinkOptions::default()).unwrap();

        store.set_next_segment(a, Some(c), LinkOptions::default()).unwrap();

        assert_eq!(store.previous(b).unwrap(), None);
        assert_eq!(store.previous(c).unwrap(), Some(a));
        assert_eq!(store.next(a).unwrap(), Some(c));
        assert_eq!(store.get(a).unwrap().end(), v(4.0, 5.0));
    }

    #[test]
    fn replacing_previous_detaches_neighbours_old_next() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let b = curved(&mut store, v(4.0, 0.0), v(8.0, 0.0));
        let c = curved(&mut store, v(9.0, 9.0), v(12.0, 0.0));
        store.set_next_segment(a, Some(b), LinkOptions::default()).unwrap();

        // c takes a as its previous; a's old next (b) must lose its back link.
        store.set_previous_segment(c, Some(a), LinkOptions::default()).unwrap();

        assert_eq!(store.next(a).unwrap(), Some(c));
        assert_eq!(store.previous(b).unwrap(), None);
        assert_eq!(store.get(c).unwrap().start(), v(4.0, 0.0));
    }

    #[test]
    fn unlink_with_sync_clears_both_sides_without_moving() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let b = curved(&mut store, v(4.0, 0.0), v(8.0, 0.0));
        store.set_next_segment(a, Some(b), LinkOptions::default()).unwrap();
        let a_shape = store.get(a).unwrap().plain();
        let b_shape = store.get(b).unwrap().plain();

        store.set_next_segment(a, None, LinkOptions::default()).unwrap();

        assert_eq!(store.next(a).unwrap(), None);
        assert_eq!(store.previous(b).unwrap(), None);
        assert_eq!(store.get(a).unwrap().plain(), a_shape);
        assert_eq!(store.get(b).unwrap().plain(), b_shape);
    }

    #[test]
    fn unlink_local_clears_this_side_only() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let b = curved(&mut store, v(4.0, 0.0), v(8.0, 0.0));
        store.set_next_segment(a, Some(b), LinkOptions::default()).unwrap();

        store.set_next_segment(a, None, LinkOptions::local()).unwrap();

        assert_eq!(store.next(a).unwrap(), None);
        assert_eq!(store.previous(b).unwrap(), Some(a));
    }

    #[test]
    fn self_link_is_rejected() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        assert!(store.set_next_segment(a, Some(a), LinkOptions::default()).is_err());
        assert_eq!(store.next(a).unwrap(), None);
    }

    #[test]
    fn link_to_missing_segment_fails() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let b = curved(&mut store, v(4.0, 0.0), v(8.0, 0.0));
        store.remove(b).unwrap();
        assert!(store.set_next_segment(a, Some(b), LinkOptions::default()).is_err());
    }

    #[test]
    fn set_start_propagates_anchor_only() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let b = curved(&mut store, v(4.0, 0.0), v(8.0, 0.0));
        store.set_next_segment(a, Some(b), LinkOptions::default()).unwrap();
        let a_control = store.get(a).unwrap().end_control();

        store.set_start(b, v(5.0, 1.0), true).unwrap();

        assert_eq!(store.get(a).unwrap().end(), v(5.0, 1.0));
        assert_eq!(store.get(a).unwrap().end_control(), a_control);
    }

    #[test]
    fn set_end_without_sync_leaves_neighbour() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let b = curved(&mut store, v(4.0, 0.0), v(8.0, 0.0));
        store.set_next_segment(a, Some(b), LinkOptions::default()).unwrap();

        store.set_end(a, v(3.0, 3.0), false).unwrap();

        assert_eq!(store.get(b).unwrap().start(), v(4.0, 0.0));
    }

    #[test]
    fn move_end_keeps_joint_smooth() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let b = curved(&mut store, v(4.0, 0.0), v(8.0, 0.0));
        store.set_next_segment(a, Some(b), LinkOptions::smooth()).unwrap();

        store.move_end(a, v(4.0, 2.0), true).unwrap();

        let a_seg = store.get(a).unwrap();
        let b_seg = store.get(b).unwrap();
        assert_eq!(a_seg.end(), b_seg.start());
        assert_relative_eq!(
            a_seg.end_direction().unwrap(),
            -b_seg.start_direction().unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn remove_clears_neighbour_links() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let b = curved(&mut store, v(4.0, 0.0), v(8.0, 0.0));
        let c = curved(&mut store, v(8.0, 0.0), v(12.0, 0.0));
        store.set_next_segment(a, Some(b), LinkOptions::default()).unwrap();
        store.set_next_segment(b, Some(c), LinkOptions::default()).unwrap();

        let removed = store.remove(b).unwrap();

        assert_eq!(removed.previous(), None);
        assert_eq!(store.next(a).unwrap(), None);
        assert_eq!(store.previous(c).unwrap(), None);
        assert_eq!(store.len(), 2);
        assert!(!store.contains(b));
    }

    #[test]
    fn append_builds_chain() {
        let mut store = SegmentStore::new();
        let a = store.insert(Segment::new(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(2.0, 0.0, 2.0),
            Vector3::new(3.0, 0.0, 3.0),
        ));
        let b = store
            .append(a, Segment::line(Vector3::zeros(), Vector3::new(6.0, 0.0, 3.0)), LinkOptions::smooth())
            .unwrap();
        let c = store
            .append(b, Segment::line(Vector3::zeros(), Vector3::new(6.0, 4.0, 3.0)), LinkOptions::default())
            .unwrap();

        assert_eq!(store.chain_from(a).unwrap(), vec![a, b, c]);
        assert_eq!(store.head_of(c).unwrap(), a);
        assert_eq!(store.get(b).unwrap().start(), Vector3::new(3.0, 0.0, 3.0));
        assert_eq!(store.get(c).unwrap().start(), Vector3::new(6.0, 0.0, 3.0));
        assert!(!store.is_closed_chain(a).unwrap());
    }

    #[test]
    fn closed_chain_is_detected() {
        let mut store = SegmentStore::new();
        let a = store.insert(Segment::line(v(0.0, 0.0), v(4.0, 0.0)));
        let b = store.append(a, Segment::line(v(0.0, 0.0), v(4.0, 4.0)), LinkOptions::default()).unwrap();
        let c = store.append(b, Segment::line(v(0.0, 0.0), v(0.0, 0.0)), LinkOptions::default()).unwrap();
        store.set_next_segment(c, Some(a), LinkOptions::default()).unwrap();

        assert!(store.is_closed_chain(a).unwrap());
        assert_eq!(store.chain_from(b).unwrap(), vec![b, c, a]);
        assert_eq!(store.head_of(b).unwrap(), b);

        let points = store.approximate_chain(a, 3).unwrap();
        assert_eq!(points.len(), 6);
        assert_eq!(points[0], v(0.0, 0.0));
        assert_eq!(points[2], v(4.0, 0.0));
    }

    #[test]
    fn approximate_open_chain_shares_joints() {
        let mut store = SegmentStore::new();
        let a = store.insert(Segment::line(v(0.0, 0.0), v(10.0, 0.0)));
        store
            .append(a, Segment::line(v(10.0, 0.0), v(10.0, 10.0)), LinkOptions::default())
            .unwrap();

        let points = store.approximate_chain(a, 3).unwrap();

        assert_eq!(
            points,
            vec![v(0.0, 0.0), v(5.0, 0.0), v(10.0, 0.0), v(10.0, 5.0), v(10.0, 10.0)]
        );
    }

    #[test]
    fn subscription_reports_watched_changes_once() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let sub = store.subscribe(a, &Field::GEOMETRY).unwrap();
        assert!(!store.poll(sub).unwrap());

        store.set_end(a, v(5.0, 0.0), true).unwrap();
        assert!(store.poll(sub).unwrap());
        assert!(!store.poll(sub).unwrap());
    }

    #[test]
    fn subscription_ignores_unwatched_fields() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let b = curved(&mut store, v(4.0, 0.0), v(8.0, 0.0));
        let sub = store.subscribe(a, &[Field::Start]).unwrap();

        store.set_next_segment(a, Some(b), LinkOptions::default()).unwrap();
        assert!(!store.poll(sub).unwrap());

        let links = store.subscribe(b, &[Field::Previous]).unwrap();
        store.set_next_segment(a, None, LinkOptions::default()).unwrap();
        assert!(store.poll(links).unwrap());
    }

    #[test]
    fn neighbour_propagation_notifies_neighbour_subscribers() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let b = curved(&mut store, v(4.0, 0.0), v(8.0, 0.0));
        store.set_next_segment(a, Some(b), LinkOptions::default()).unwrap();
        let sub = store.subscribe(a, &Field::GEOMETRY).unwrap();

        store.set_start(b, v(4.0, 1.0), true).unwrap();

        assert!(store.poll(sub).unwrap());
    }

    #[test]
    fn unsubscribe_and_stale_tokens() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let sub = store.subscribe(a, &Field::ALL).unwrap();
        assert!(store.unsubscribe(sub));
        assert!(!store.unsubscribe(sub));
        assert!(store.poll(sub).is_err());

        let other = store.subscribe(a, &Field::ALL).unwrap();
        store.remove(a).unwrap();
        assert!(matches!(
            store.poll(other),
            Err(SweepError::Chain(ChainError::SubscriptionNotFound))
        ));
        assert!(!store.unsubscribe(other));
    }

    #[test]
    fn remove_keeps_subscriptions_of_other_segments() {
        let mut store = SegmentStore::new();
        let a = curved(&mut store, v(0.0, 0.0), v(4.0, 0.0));
        let b = curved(&mut store, v(4.0, 0.0), v(8.0, 0.0));
        let watch_a = store.subscribe(a, &Field::ALL).unwrap();
        let watch_b = store.subscribe(b, &Field::ALL).unwrap();
        store.remove(a).unwrap();
        assert!(!store.unsubscribe(watch_a));
        assert!(!store.poll(watch_b).unwrap());
        store.get_mut(b).unwrap().set_end(v(9.0, 0.0));
        assert!(store.poll(watch_b).unwrap());
    }

    #[test]
    fn approximate_chain_single_point_keeps_open_joints() {
        let mut store = SegmentStore::new();
        let a = store.insert(Segment::line(v(0.0, 0.0), v(4.0, 0.0)));
        store
            .append(a, Segment::line(v(4.0, 0.0), v(8.0, 0.0)), LinkOptions::default())
            .unwrap();
        let points = store.approximate_chain(a, 1).unwrap();
        assert_eq!(points, vec![v(0.0, 0.0), v(4.0, 0.0), v(8.0, 0.0)]);
    }

    #[test]
    fn approximate_chain_single_point_closed_loop_lists_starts() {
        let mut store = SegmentStore::new();
        let a = store.insert(Segment::line(v(0.0, 0.0), v(2.0, 0.0)));
        let b = store
            .append(a, Segment::line(v(2.0, 0.0), v(0.0, 2.0)), LinkOptions::default())
            .unwrap();
        let c = store
            .append(b, Segment::line(v(0.0, 2.0), v(0.0, 0.0)), LinkOptions::default())
            .unwrap();
        store.set_next_segment(c, Some(a), LinkOptions::default()).unwrap();
        assert!(store.is_closed_chain(a).unwrap());
        let points = store.approximate_chain(a, 1).unwrap();
        assert_eq!(points, vec![v(0.0, 0.0), v(2.0, 0.0), v(0.0, 2.0)]);
    }
}
