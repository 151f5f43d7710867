use std::cmp::Ordering;

use serde::Serialize;

use crate::error::{KinshipError, Result};
use crate::graph::types::RelationshipGraph;

/// One entry of a related-notes ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedNote {
    pub id: String,
    pub score: f64,
}

/// The `k` strongest neighbours of `note_id`.
///
/// Ordered by score descending, then newer `created_at` first, then id.
/// `k == 0` yields an empty list; an id missing from the graph is
/// [`KinshipError::NotFound`].
pub fn find_related(
    graph: &RelationshipGraph,
    note_id: &str,
    k: usize,
) -> Result<Vec<RelatedNote>> {
    if !graph.contains(note_id) {
        return Err(KinshipError::not_found(note_id));
    }
    if k == 0 {
        return Ok(Vec::new());
    }

    let mut ranked: Vec<(&str, f64)> = graph.neighbors(note_id).collect();
    ranked.sort_by(|(id_a, w_a), (id_b, w_b)| {
        w_b.partial_cmp(w_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                let created_a = graph.node(id_a).map(|n| n.created_at);
                let created_b = graph.node(id_b).map(|n| n.created_at);
                created_b.cmp(&created_a)
            })
            .then_with(|| id_a.cmp(id_b))
    });

    Ok(ranked
        .into_iter()
        .take(k)
        .map(|(id, score)| RelatedNote {
            id: id.to_string(),
            score,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::{GraphEdge, GraphNode};
    use crate::note::NoteRecord;
    use crate::similarity::ScoreBreakdown;
    use chrono::{TimeZone, Utc};

    fn graph(edges: &[(&str, &str, f64)]) -> RelationshipGraph {
        let day = |d| Utc.with_ymd_and_hms(2024, 5, d, 0, 0, 0).unwrap();
        let mut graph = RelationshipGraph::new(0.3);
        for (i, id) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            let note = NoteRecord::new(*id, "").with_created_at(day(i as u32 + 1));
            graph.add_node(GraphNode::from_note(&note));
        }
        for (a, b, w) in edges {
            graph
                .add_edge(GraphEdge {
                    source: a.to_string(),
                    target: b.to_string(),
                    weight: *w,
                    breakdown: ScoreBreakdown {
                        text: *w,
                        image: None,
                        tag: None,
                    },
                })
                .unwrap();
        }
        graph
    }

    #[test]
    fn test_top_k_by_weight() {
        let graph = graph(&[("a", "b", 0.9), ("a", "c", 0.4)]);
        let related = find_related(&graph, "a", 1).unwrap();
        assert_eq!(
            related,
            vec![RelatedNote {
                id: "b".to_string(),
                score: 0.9
            }]
        );
    }

    #[test]
    fn test_ties_prefer_newer_then_id() {
        // c is newer than b; d and e are newer still but weaker
        let graph = graph(&[("a", "b", 0.5), ("a", "c", 0.5), ("a", "d", 0.4)]);
        let ids: Vec<String> = find_related(&graph, "a", 10)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["c", "b", "d"]);
    }

    #[test]
    fn test_missing_id_is_not_found() {
        let graph = graph(&[]);
        let err = find_related(&graph, "missing-id", 3).unwrap_err();
        assert!(matches!(err, KinshipError::NotFound { ref id } if id == "missing-id"));
    }

    #[test]
    fn test_zero_k_is_empty() {
        let graph = graph(&[("a", "b", 0.9)]);
        assert!(find_related(&graph, "a", 0).unwrap().is_empty());
    }

    #[test]
    fn test_isolated_node_has_no_related() {
        let graph = graph(&[("a", "b", 0.9)]);
        assert!(find_related(&graph, "e", 5).unwrap().is_empty());
    }
}
