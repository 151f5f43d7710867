//! Topic clusters: connected components of the relationship graph
//!
//! Every node lands in exactly one cluster; isolated nodes form singletons.
//! Each cluster is labelled with its members' most frequent tags and text
//! keywords. Frequency ties go to the term observed first when members are
//! visited oldest first.

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::Serialize;

use crate::graph::types::{GraphNode, RelationshipGraph};

/// A named group of related notes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicCluster {
    /// `cluster-N`, numbered in output order
    pub id: String,
    pub name: String,
    /// Member ids, sorted
    pub note_ids: Vec<String>,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
}

impl TopicCluster {
    pub fn len(&self) -> usize {
        self.note_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.note_ids.is_empty()
    }
}

/// How many labels to attach to each cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterLabels {
    pub tags: usize,
    pub keywords: usize,
}

impl Default for ClusterLabels {
    fn default() -> Self {
        ClusterLabels {
            tags: 3,
            keywords: 5,
        }
    }
}

/// Partition `graph` into topic clusters.
///
/// Clusters are ordered by size (largest first), then by smallest member id.
pub fn extract_clusters(graph: &RelationshipGraph, labels: ClusterLabels) -> Vec<TopicCluster> {
    let mut components = connected_components(graph);
    components.sort_by(|x, y| y.len().cmp(&x.len()).then_with(|| x.cmp(y)));

    components
        .into_iter()
        .enumerate()
        .map(|(i, note_ids)| {
            let mut members: Vec<&GraphNode> =
                note_ids.iter().filter_map(|id| graph.node(id)).collect();
            members.sort_by(|x, y| x.created_at.cmp(&y.created_at).then_with(|| x.id.cmp(&y.id)));

            let tags = top_terms(members.iter().map(|n| n.tags.as_slice()), labels.tags);
            let keywords = top_terms(
                members.iter().map(|n| n.keywords.as_slice()),
                labels.keywords,
            );
            let name = tags
                .first()
                .or_else(|| keywords.first())
                .or_else(|| note_ids.first())
                .cloned()
                .unwrap_or_default();

            TopicCluster {
                id: format!("cluster-{}", i + 1),
                name,
                note_ids,
                tags,
                keywords,
            }
        })
        .collect()
}

/// Breadth-first components; each component's ids are sorted
fn connected_components(graph: &RelationshipGraph) -> Vec<Vec<String>> {
    let mut visited: BTreeSet<&str> = BTreeSet::new();
    let mut components = Vec::new();

    for start in graph.nodes.keys() {
        if !visited.insert(start.as_str()) {
            continue;
        }
        let mut component = vec![start.clone()];
        let mut queue: VecDeque<&str> = VecDeque::from([start.as_str()]);
        while let Some(current) = queue.pop_front() {
            for (neighbor, _) in graph.neighbors(current) {
                if visited.insert(neighbor) {
                    component.push(neighbor.to_string());
                    queue.push_back(neighbor);
                }
            }
        }
        component.sort();
        components.push(component);
    }
    components
}

/// Most frequent terms across `lists`, ties by first observation
fn top_terms<'a, I>(lists: I, limit: usize) -> Vec<String>
where
    I: Iterator<Item = &'a [String]>,
{
    if limit == 0 {
        return Vec::new();
    }
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut order = 0;
    for list in lists {
        for term in list {
            let entry = counts.entry(term.as_str()).or_insert_with(|| {
                order += 1;
                (0, order)
            });
            entry.0 += 1;
        }
    }

    let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|(_, (ca, fa)), (_, (cb, fb))| cb.cmp(ca).then_with(|| fa.cmp(fb)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(term, _)| term.to_string())
        .collect()
}
