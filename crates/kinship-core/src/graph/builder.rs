use crate::error::Result;
use crate::graph::types::{GraphEdge, GraphNode, RelationshipGraph};
use crate::note::NoteRecord;
use crate::similarity::SimilarityScore;

/// Assemble a graph over `notes` from already evaluated pair scores.
///
/// Every note becomes a node. Pairs scoring at or above `edge_threshold`
/// become edges; anything below is dropped. `scores` must not name ids
/// outside `notes`.
pub fn build_from_scores(
    notes: &[NoteRecord],
    scores: &[SimilarityScore],
    edge_threshold: f64,
) -> Result<RelationshipGraph> {
    let mut graph = RelationshipGraph::new(edge_threshold);
    for note in notes {
        graph.add_node(GraphNode::from_note(note));
    }

    for score in scores.iter().filter(|s| s.score >= edge_threshold) {
        graph.add_edge(GraphEdge::from(score.clone()))?;
    }

    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        edge_threshold,
        "relationship graph built"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::ScoreBreakdown;

    fn pair(a: &str, b: &str, score: f64) -> SimilarityScore {
        SimilarityScore {
            a: a.to_string(),
            b: b.to_string(),
            score,
            breakdown: ScoreBreakdown {
                text: score,
                image: None,
                tag: None,
            },
        }
    }

    #[test]
    fn test_edges_at_or_above_threshold() {
        let notes = vec![
            NoteRecord::new("a", ""),
            NoteRecord::new("b", ""),
            NoteRecord::new("c", ""),
        ];
        let scores = vec![pair("a", "b", 0.3), pair("a", "c", 0.29), pair("b", "c", 0.8)];

        let graph = build_from_scores(&notes, &scores, 0.3).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edge_weight("a", "c"), None);
        assert_eq!(graph.edge_threshold, 0.3);
    }

    #[test]
    fn test_empty_corpus() {
        let graph = build_from_scores(&[], &[], 0.3).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_unknown_id_in_scores_is_error() {
        let notes = vec![NoteRecord::new("a", "")];
        assert!(build_from_scores(&notes, &[pair("a", "zz", 0.9)], 0.3).is_err());
    }
}
