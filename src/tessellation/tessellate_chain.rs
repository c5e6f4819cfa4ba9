use crate::chain::{SegmentId, SegmentStore};
use crate::error::Result;
use crate::math::CurveVector;

use super::{ApproximationParams, Polyline, PolylineVertex};

/// Tessellates a chain of linked segments into one polyline.
///
/// Each segment is approximated adaptively; the joint between two segments
/// is emitted once. For a closed chain the first vertex is not repeated at
/// the end.
pub struct TessellateChain {
    head: SegmentId,
    params: ApproximationParams,
}

impl TessellateChain {
    /// Creates a new `TessellateChain` operation starting at `head`.
    #[must_use]
    pub fn new(head: SegmentId, params: ApproximationParams) -> Self {
        Self { head, params }
    }

    /// Executes the tessellation, returning a polyline.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid or a segment of the
    /// chain is missing from the store.
    pub fn execute<V: CurveVector>(&self, store: &SegmentStore<V>) -> Result<Polyline<V>> {
        self.params.validate()?;
        let chain = store.chain_from(self.head)?;
        let closed = store.is_closed_chain(self.head)?;

        let mut vertices = Vec::new();
        for (index, id) in chain.iter().enumerate() {
            let nodes = store.get(*id)?.calculate_approximation(&self.params)?;
            let skip_last = closed || index + 1 < chain.len();
            let keep = if skip_last { nodes.len() - 1 } else { nodes.len() };
            vertices.extend(nodes.into_iter().take(keep).map(|node| PolylineVertex {
                point: node.point,
                segment: index,
                t: node.t,
            }));
        }

        tracing::debug!(
            segments = chain.len(),
            vertices = vertices.len(),
            closed,
            "tessellated segment chain"
        );
        Ok(Polyline { vertices, closed })
    }
}
