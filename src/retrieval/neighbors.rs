//! Neighbor expansion of nearest-neighbor hits.
//!
//! Chunks of one document hold consecutive global IDs, so the IDs next to a
//! hit are usually the text right before and after it. Each hit is followed
//! by its unseen neighbors `id - 1` and `id + 1`, in discovery order, until
//! `k` results are collected.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::indexing::GlobalId;

/// One row returned by the vector store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: GlobalId,
    pub distance: f32,
}

/// A hit or a neighbor of one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpandedHit {
    pub id: GlobalId,
    /// `None` for IDs added only as neighbors of a hit
    pub distance: Option<f32>,
}

impl ExpandedHit {
    pub fn is_scored(&self) -> bool {
        self.distance.is_some()
    }
}

/// Expand ranked hits with their numeric neighbors, up to `k` results.
///
/// The output has no duplicates and no negative IDs. It is in discovery
/// order, not sorted by distance.
pub fn expand_neighbors(hits: &[SearchHit], k: usize) -> Vec<ExpandedHit> {
    expand(hits, k, None)
}

/// Like [`expand_neighbors`], also skipping neighbors at or above `limit`.
///
/// `limit` is the first unassigned global ID of the collection.
pub fn expand_neighbors_below(hits: &[SearchHit], k: usize, limit: GlobalId) -> Vec<ExpandedHit> {
    expand(hits, k, Some(limit))
}

fn expand(hits: &[SearchHit], k: usize, limit: Option<GlobalId>) -> Vec<ExpandedHit> {
    let mut results = Vec::with_capacity(k);
    let mut seen = HashSet::with_capacity(k);
    let in_range = |id: GlobalId| id >= 0 && limit.map_or(true, |l| id < l);

    'hits: for hit in hits {
        if results.len() >= k {
            break;
        }
        if hit.id < 0 || !seen.insert(hit.id) {
            continue;
        }
        results.push(ExpandedHit {
            id: hit.id,
            distance: Some(hit.distance),
        });

        for neighbor in [hit.id - 1, hit.id + 1] {
            if results.len() >= k {
                break 'hits;
            }
            if !in_range(neighbor) || !seen.insert(neighbor) {
                continue;
            }
            results.push(ExpandedHit {
                id: neighbor,
                distance: None,
            });
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hits(raw: &[(GlobalId, f32)]) -> Vec<SearchHit> {
        raw.iter()
            .map(|&(id, distance)| SearchHit { id, distance })
            .collect()
    }

    fn pairs(expanded: &[ExpandedHit]) -> Vec<(GlobalId, Option<f32>)> {
        expanded.iter().map(|h| (h.id, h.distance)).collect()
    }

    #[test]
    fn test_stops_at_k() {
        let out = expand_neighbors(&hits(&[(10, 0.1), (20, 0.3)]), 4);
        assert_eq!(
            pairs(&out),
            vec![(10, Some(0.1)), (9, None), (11, None), (20, Some(0.3))]
        );
    }

    #[test]
    fn test_stops_between_neighbors() {
        let out = expand_neighbors(&hits(&[(10, 0.1), (20, 0.3)]), 2);
        assert_eq!(pairs(&out), vec![(10, Some(0.1)), (9, None)]);
    }

    #[test]
    fn test_adjacent_hits_are_not_duplicated() {
        // 6 and 4 are already present as neighbors of 5, so they add nothing.
        let out = expand_neighbors(&hits(&[(5, 0.1), (6, 0.2), (4, 0.3)]), 10);
        assert_eq!(pairs(&out), vec![(5, Some(0.1)), (4, None), (6, None)]);
    }

    #[test]
    fn test_later_hit_adds_only_new_neighbors() {
        let out = expand_neighbors(&hits(&[(5, 0.1), (8, 0.2)]), 10);
        assert_eq!(
            pairs(&out),
            vec![
                (5, Some(0.1)),
                (4, None),
                (6, None),
                (8, Some(0.2)),
                (7, None),
                (9, None)
            ]
        );

        let out = expand_neighbors(&hits(&[(5, 0.1), (7, 0.2)]), 10);
        assert_eq!(
            pairs(&out),
            vec![(5, Some(0.1)), (4, None), (6, None), (7, Some(0.2)), (8, None)]
        );
    }

    #[test]
    fn test_never_negative() {
        let out = expand_neighbors(&hits(&[(0, 0.0), (-3, 0.5), (2, 0.7)]), 10);
        assert_eq!(
            pairs(&out),
            vec![(0, Some(0.0)), (1, None), (2, Some(0.7)), (3, None)]
        );
        assert!(out.iter().all(|h| h.id >= 0));
    }

    #[test]
    fn test_zero_k_and_no_hits() {
        assert!(expand_neighbors(&hits(&[(1, 0.1)]), 0).is_empty());
        assert!(expand_neighbors(&[], 5).is_empty());
    }

    #[test]
    fn test_upper_limit() {
        let out = expand_neighbors_below(&hits(&[(9, 0.1)]), 5, 10);
        assert_eq!(pairs(&out), vec![(9, Some(0.1)), (8, None)]);
        assert!(out[0].is_scored());
        assert!(!out[1].is_scored());
    }

    #[test]
    fn test_fewer_hits_than_k() {
        let out = expand_neighbors(&hits(&[(3, 0.2)]), 8);
        assert_eq!(out.len(), 3);
    }
}
