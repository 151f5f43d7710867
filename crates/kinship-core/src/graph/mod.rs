//! Relationship graph over a note snapshot
//!
//! - [`builder`] turns evaluated pair scores into a weighted graph
//! - [`clusters`] partitions the graph into labelled topic clusters
//! - [`related`] ranks a note's strongest neighbours

pub mod builder;
pub mod clusters;
pub mod related;
pub mod types;

pub use builder::build_from_scores;
pub use clusters::{extract_clusters, ClusterLabels, TopicCluster};
pub use related::{find_related, RelatedNote};
pub use types::{GraphEdge, GraphNode, RelationshipGraph};
