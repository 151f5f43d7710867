//! Bucketing pre-filter for large corpora
//!
//! Full pairwise evaluation is quadratic. Past a configurable corpus size
//! only pairs that share a bucket are evaluated:
//!
//! - a normalised tag
//! - a rare token (document frequency at most `max_token_df` of the corpus),
//!   subject to a text-length ratio check
//! - one 16-bit band of the perceptual fingerprint
//! - empty text (every empty note is a candidate of every other)
//! - identical text after case and whitespace folding, or an identical
//!   fingerprint
//!
//! Token buckets larger than the frequency cutoff are split by text-length
//! band, and a band still over the cutoff is skipped. Tag and fingerprint
//! band buckets over the cutoff are skipped outright. Exact-match buckets
//! ignore the cutoff: past it their members are chained in order, which is
//! enough for duplicate grouping to join all of them.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::PrefilterConfig;
use crate::similarity::evaluator::PreparedNote;
use crate::similarity::text::normalize_text;
use crate::text::tokenize_with_stemming;

/// Index pairs `(i, j)` with `i < j`, sorted and free of repeats
pub type CandidatePairs = Vec<(usize, usize)>;

/// Largest bucket that still generates pairs for a corpus of `note_count`
pub fn bucket_cutoff(config: &PrefilterConfig, note_count: usize) -> usize {
    let cutoff = (config.max_token_df * note_count as f64).ceil() as usize;
    cutoff.max(2)
}

/// Whether two text lengths are close enough for a token-only match
pub fn lengths_compatible(len_a: usize, len_b: usize, min_ratio: f64) -> bool {
    let (short, long) = if len_a <= len_b {
        (len_a, len_b)
    } else {
        (len_b, len_a)
    };
    if long == 0 {
        return true;
    }
    short as f64 / long as f64 >= min_ratio
}

/// Length band for splitting oversized token buckets.
///
/// Band `k` holds lengths in `[r^-k, r^-(k+1))` for `r = min_ratio`, so two
/// lengths in the same band are at most one ratio step apart.
pub fn length_band(len: usize, min_ratio: f64) -> u32 {
    if len == 0 || min_ratio <= 0.0 {
        return 0;
    }
    if min_ratio >= 1.0 {
        return u32::try_from(len).unwrap_or(u32::MAX);
    }
    let step = (1.0 / min_ratio).ln();
    ((len as f64).ln() / step).floor() as u32 + 1
}

/// Collect candidate pairs for `notes` (indices into the slice)
pub fn candidate_pairs(
    notes: &[PreparedNote<'_>],
    config: &PrefilterConfig,
    stemming: bool,
) -> CandidatePairs {
    let cutoff = bucket_cutoff(config, notes.len());
    let mut pairs: BTreeSet<(usize, usize)> = BTreeSet::new();

    let mut tag_buckets: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut token_buckets: HashMap<String, Vec<usize>> = HashMap::new();
    let mut band_buckets: HashMap<(usize, u16), Vec<usize>> = HashMap::new();
    let mut exact_text: HashMap<String, Vec<usize>> = HashMap::new();
    let mut exact_image: HashMap<u64, Vec<usize>> = HashMap::new();
    let mut empty: Vec<usize> = Vec::new();
    let mut lengths: Vec<usize> = Vec::with_capacity(notes.len());

    for (idx, prepared) in notes.iter().enumerate() {
        let text = prepared.note.text_content.trim();
        lengths.push(text.chars().count());
        if text.is_empty() {
            empty.push(idx);
        } else {
            exact_text.entry(normalize_text(text)).or_default().push(idx);
        }

        for tag in &prepared.note.tags {
            tag_buckets.entry(tag.as_str()).or_default().push(idx);
        }

        let unique: HashSet<String> = tokenize_with_stemming(text, stemming).into_iter().collect();
        for token in unique {
            token_buckets.entry(token).or_default().push(idx);
        }

        if let Some(fp) = prepared.fingerprint {
            exact_image.entry(fp.bits()).or_default().push(idx);
            for (band, value) in fp.bands().into_iter().enumerate() {
                band_buckets.entry((band, value)).or_default().push(idx);
            }
        }
    }

    for members in tag_buckets.values().chain(band_buckets.values()) {
        if members.len() <= cutoff {
            pair_up(members, &mut pairs, |_, _| true);
        }
    }
    let compatible =
        |i: usize, j: usize| lengths_compatible(lengths[i], lengths[j], config.length_ratio);
    for members in token_buckets.values() {
        if members.len() <= cutoff {
            pair_up(members, &mut pairs, compatible);
            continue;
        }
        let mut bands: HashMap<u32, Vec<usize>> = HashMap::new();
        for &idx in members {
            bands
                .entry(length_band(lengths[idx], config.length_ratio))
                .or_default()
                .push(idx);
        }
        for band in bands.values().filter(|band| band.len() <= cutoff) {
            pair_up(band, &mut pairs, compatible);
        }
    }
    pair_up(&empty, &mut pairs, |_, _| true);

    for members in exact_text.values_mut() {
        // Byte-identical texts end up next to each other in the chain
        members.sort_by(|&i, &j| {
            notes[i]
                .note
                .text_content
                .cmp(&notes[j].note.text_content)
                .then(i.cmp(&j))
        });
        pair_exact(members, cutoff, &mut pairs);
    }
    for members in exact_image.values() {
        pair_exact(members, cutoff, &mut pairs);
    }

    tracing::debug!(
        notes = notes.len(),
        cutoff,
        candidates = pairs.len(),
        "pre-filter buckets built"
    );
    pairs.into_iter().collect()
}

fn pair_up<F>(members: &[usize], pairs: &mut BTreeSet<(usize, usize)>, accept: F)
where
    F: Fn(usize, usize) -> bool,
{
    // Members are pushed in index order, so i < j holds
    for (pos, &i) in members.iter().enumerate() {
        for &j in &members[pos + 1..] {
            if i != j && accept(i, j) {
                pairs.insert((i, j));
            }
        }
    }
}

/// Every pair up to the cutoff, a chain of neighbours past it
fn pair_exact(members: &[usize], cutoff: usize, pairs: &mut BTreeSet<(usize, usize)>) {
    if members.len() <= cutoff {
        let mut ordered = members.to_vec();
        ordered.sort_unstable();
        pair_up(&ordered, pairs, |_, _| true);
        return;
    }
    for link in members.windows(2) {
        pairs.insert((link[0].min(link[1]), link[0].max(link[1])));
    }
}
