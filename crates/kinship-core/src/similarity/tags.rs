use std::collections::HashSet;

/// Jaccard similarity of two tag lists, `|A ∩ B| / |A ∪ B|`.
///
/// Returns 0.0 when both lists are empty; callers that need to tell "no tag
/// signal" apart from "no overlap" check [`has_tag_signal`] first.
pub fn tag_similarity(a: &[String], b: &[String]) -> f64 {
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / union as f64
}

/// Whether at least one side of the pair is tagged
pub fn has_tag_signal(a: &[String], b: &[String]) -> bool {
    !a.is_empty() || !b.is_empty()
}
