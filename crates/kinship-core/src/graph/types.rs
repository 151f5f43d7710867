use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{KinshipError, Result};
use crate::note::NoteRecord;
use crate::similarity::{ScoreBreakdown, SimilarityScore};

/// A note as it appears in the relationship graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
    /// Stop-word-filtered text tokens, used for cluster keywords
    #[serde(skip)]
    pub keywords: Vec<String>,
}

impl GraphNode {
    pub fn from_note(note: &NoteRecord) -> Self {
        GraphNode {
            id: note.id.clone(),
            created_at: note.created_at,
            tags: note.tags.clone(),
            keywords: crate::text::keyword_tokens(&note.text_content),
        }
    }
}

/// An undirected weighted edge; `source` is the smaller id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub weight: f64,
    pub breakdown: ScoreBreakdown,
}

impl From<SimilarityScore> for GraphEdge {
    fn from(score: SimilarityScore) -> Self {
        GraphEdge {
            source: score.a,
            target: score.b,
            weight: score.score,
            breakdown: score.breakdown,
        }
    }
}

/// Undirected weighted graph over one note snapshot.
///
/// No self-loops and at most one edge per unordered pair. Nodes and
/// adjacency are kept in ordered maps so iteration is deterministic.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelationshipGraph {
    pub edge_threshold: f64,
    pub nodes: BTreeMap<String, GraphNode>,
    pub edges: Vec<GraphEdge>,
    #[serde(skip)]
    adjacency: BTreeMap<String, BTreeMap<String, usize>>,
}

impl RelationshipGraph {
    pub fn new(edge_threshold: f64) -> Self {
        RelationshipGraph {
            edge_threshold,
            ..Default::default()
        }
    }

    /// Add a node; returns false if the id is already present
    pub fn add_node(&mut self, node: GraphNode) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.adjacency.entry(node.id.clone()).or_default();
        self.nodes.insert(node.id.clone(), node);
        true
    }

    /// Add an edge between two existing nodes
    pub fn add_edge(&mut self, edge: GraphEdge) -> Result<()> {
        if edge.source == edge.target {
            return Err(KinshipError::invalid_argument(
                "edge",
                format!("self-loop on {}", edge.source),
            ));
        }
        for id in [&edge.source, &edge.target] {
            if !self.nodes.contains_key(id) {
                return Err(KinshipError::not_found(id.clone()));
            }
        }
        if self.edge_weight(&edge.source, &edge.target).is_some() {
            return Err(KinshipError::invalid_argument(
                "edge",
                format!("duplicate edge {} - {}", edge.source, edge.target),
            ));
        }

        let idx = self.edges.len();
        self.adjacency
            .entry(edge.source.clone())
            .or_default()
            .insert(edge.target.clone(), idx);
        self.adjacency
            .entry(edge.target.clone())
            .or_default()
            .insert(edge.source.clone(), idx);
        self.edges.push(edge);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// Neighbours of `id` with edge weights, in id order
    pub fn neighbors<'a>(&'a self, id: &str) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.adjacency.get(id).into_iter().flat_map(move |adj| {
            adj.iter()
                .map(move |(other, &idx)| (other.as_str(), self.edges[idx].weight))
        })
    }

    pub fn degree(&self, id: &str) -> usize {
        self.adjacency.get(id).map_or(0, BTreeMap::len)
    }

    pub fn edge_weight(&self, a: &str, b: &str) -> Option<f64> {
        self.adjacency
            .get(a)
            .and_then(|adj| adj.get(b))
            .map(|&idx| self.edges[idx].weight)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of nodes with no edges
    pub fn isolated(&self) -> BTreeSet<&str> {
        self.nodes
            .keys()
            .filter(|id| self.degree(id) == 0)
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(a: &str, b: &str, weight: f64) -> GraphEdge {
        GraphEdge {
            source: a.to_string(),
            target: b.to_string(),
            weight,
            breakdown: ScoreBreakdown {
                text: weight,
                image: None,
                tag: None,
            },
        }
    }

    fn graph(ids: &[&str]) -> RelationshipGraph {
        let mut graph = RelationshipGraph::new(0.3);
        for id in ids {
            graph.add_node(GraphNode::from_note(&NoteRecord::new(*id, "")));
        }
        graph
    }

    #[test]
    fn test_add_edge_is_undirected() {
        let mut graph = graph(&["a", "b", "c"]);
        graph.add_edge(edge("a", "b", 0.9)).unwrap();

        assert_eq!(graph.edge_weight("a", "b"), Some(0.9));
        assert_eq!(graph.edge_weight("b", "a"), Some(0.9));
        assert_eq!(graph.edge_weight("a", "c"), None);
        assert_eq!(graph.neighbors("b").collect::<Vec<_>>(), vec![("a", 0.9)]);
        assert_eq!(graph.isolated().into_iter().collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn test_rejects_self_loop_and_parallel_edge() {
        let mut graph = graph(&["a", "b"]);
        assert!(graph.add_edge(edge("a", "a", 1.0)).is_err());
        graph.add_edge(edge("a", "b", 0.5)).unwrap();
        assert!(graph.add_edge(edge("b", "a", 0.6)).is_err());
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_rejects_unknown_endpoint() {
        let mut graph = graph(&["a"]);
        let err = graph.add_edge(edge("a", "zz", 0.5)).unwrap_err();
        assert!(matches!(err, KinshipError::NotFound { id } if id == "zz"));
    }

    #[test]
    fn test_duplicate_node_ignored() {
        let mut graph = graph(&["a"]);
        assert!(!graph.add_node(GraphNode::from_note(&NoteRecord::new("a", "other"))));
        assert_eq!(graph.node_count(), 1);
    }
}
