//! Near-duplicate grouping
//!
//! Pairs at or above the duplicate threshold are merged with union-find.
//! Grouping is transitive: if A~B and B~C pass the threshold, A, B and C
//! share one group even when A~C alone does not.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::note::NoteRecord;
use crate::similarity::SimilarityScore;

/// A set of near-duplicate notes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    /// Member ids, sorted
    pub note_ids: Vec<String>,
    pub earliest_created_at: DateTime<Utc>,
    /// The above-threshold pairs that joined the group
    pub pairs: Vec<SimilarityScore>,
}

impl DuplicateGroup {
    pub fn len(&self) -> usize {
        self.note_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.note_ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.note_ids.binary_search_by(|n| n.as_str().cmp(id)).is_ok()
    }
}

/// Disjoint sets over note indices
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        let mut cur = i;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, i: usize, j: usize) {
        let pi = self.find(i);
        let pj = self.find(j);
        if pi == pj {
            return;
        }
        match self.rank[pi].cmp(&self.rank[pj]) {
            std::cmp::Ordering::Less => self.parent[pi] = pj,
            std::cmp::Ordering::Greater => self.parent[pj] = pi,
            std::cmp::Ordering::Equal => {
                self.parent[pj] = pi;
                self.rank[pi] += 1;
            }
        }
    }
}

/// Group `notes` by the pairs in `scores` that reach `dup_threshold`.
///
/// `scores` may contain pairs below the threshold; they are ignored, as are
/// pairs naming ids outside `notes`. Notes with no above-threshold partner
/// are not reported. Groups are ordered by size (largest first), then by
/// earliest creation time, then by smallest member id.
pub fn group_duplicates(
    notes: &[NoteRecord],
    scores: &[SimilarityScore],
    dup_threshold: f64,
) -> Vec<DuplicateGroup> {
    let index: HashMap<&str, usize> = notes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut uf = UnionFind::new(notes.len());
    let mut matched: Vec<(usize, &SimilarityScore)> = Vec::new();
    for score in scores.iter().filter(|s| s.score >= dup_threshold) {
        if let (Some(&i), Some(&j)) = (index.get(score.a.as_str()), index.get(score.b.as_str())) {
            uf.union(i, j);
            matched.push((i, score));
        }
    }

    let mut members: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..notes.len() {
        members.entry(uf.find(i)).or_default().push(i);
    }
    let mut pairs_by_root: HashMap<usize, Vec<SimilarityScore>> = HashMap::new();
    for (i, score) in matched {
        pairs_by_root
            .entry(uf.find(i))
            .or_default()
            .push(score.clone());
    }

    let mut groups: Vec<DuplicateGroup> = members
        .into_iter()
        .filter(|(_, idxs)| idxs.len() >= 2)
        .map(|(root, idxs)| {
            let mut note_ids: Vec<String> = idxs.iter().map(|&i| notes[i].id.clone()).collect();
            note_ids.sort();
            let earliest_created_at = idxs
                .iter()
                .map(|&i| notes[i].created_at)
                .min()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            let mut pairs = pairs_by_root.remove(&root).unwrap_or_default();
            pairs.sort_by(|x, y| x.a.cmp(&y.a).then_with(|| x.b.cmp(&y.b)));
            DuplicateGroup {
                note_ids,
                earliest_created_at,
                pairs,
            }
        })
        .collect();

    groups.sort_by(|x, y| {
        y.len()
            .cmp(&x.len())
            .then_with(|| x.earliest_created_at.cmp(&y.earliest_created_at))
            .then_with(|| x.note_ids.cmp(&y.note_ids))
    });
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::ScoreBreakdown;
    use chrono::TimeZone;

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

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_transitive_merge() {
        let notes = vec![
            NoteRecord::new("a", ""),
            NoteRecord::new("b", ""),
            NoteRecord::new("c", ""),
        ];
        let scores = vec![pair("a", "b", 0.9), pair("b", "c", 0.9), pair("a", "c", 0.5)];

        let groups = group_duplicates(&notes, &scores, 0.85);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].note_ids, vec!["a", "b", "c"]);
        assert_eq!(groups[0].pairs.len(), 2);
    }

    #[test]
    fn test_singletons_not_emitted() {
        let notes = vec![NoteRecord::new("a", ""), NoteRecord::new("b", "")];
        let groups = group_duplicates(&notes, &[pair("a", "b", 0.84)], 0.85);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let notes = vec![NoteRecord::new("a", ""), NoteRecord::new("b", "")];
        let groups = group_duplicates(&notes, &[pair("a", "b", 0.85)], 0.85);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_ordering_by_size_then_created_at() {
        let notes = vec![
            NoteRecord::new("a", "").with_created_at(at(5)),
            NoteRecord::new("b", "").with_created_at(at(6)),
            NoteRecord::new("c", "").with_created_at(at(2)),
            NoteRecord::new("d", "").with_created_at(at(9)),
            NoteRecord::new("e", "").with_created_at(at(1)),
            NoteRecord::new("f", "").with_created_at(at(3)),
            NoteRecord::new("g", "").with_created_at(at(4)),
        ];
        let scores = vec![
            pair("a", "b", 0.9),
            pair("c", "d", 0.9),
            pair("e", "f", 0.9),
            pair("f", "g", 0.9),
        ];

        let groups = group_duplicates(&notes, &scores, 0.85);
        let ids: Vec<Vec<String>> = groups.iter().map(|g| g.note_ids.clone()).collect();
        assert_eq!(
            ids,
            vec![
                vec!["e".to_string(), "f".to_string(), "g".to_string()],
                vec!["c".to_string(), "d".to_string()],
                vec!["a".to_string(), "b".to_string()],
            ]
        );
        assert_eq!(groups[1].earliest_created_at, at(2));
    }

    #[test]
    fn test_contains() {
        let notes = vec![NoteRecord::new("x", ""), NoteRecord::new("y", "")];
        let groups = group_duplicates(&notes, &[pair("x", "y", 1.0)], 0.5);
        assert!(groups[0].contains("x"));
        assert!(!groups[0].contains("z"));
    }
}
