//! Word selection for a contest run
//!
//! Missed words are favoured by adding extra copies of their IDs to the pool
//! before a single shuffle, then keeping only the first copy of each ID.

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::words::{canonical_form, WordList};

/// Default upper bound for word IDs.
pub const MAX_WORD_ID: usize = 1500;

/// Copies of a word's ID placed in the pool for a given miss count.
pub fn copies_for_attempts(attempts: u32) -> usize {
    match attempts {
        0 => 1,
        1 => 2,
        2 => 3,
        _ => 5,
    }
}

fn range_is_valid(start_id: usize, end_id: usize, max_id: usize) -> bool {
    1 <= start_id && start_id <= end_id && end_id <= max_id
}

/// Pool of IDs in `[start_id, end_id]`, each repeated according to its miss
/// count. IDs with no entry in `words` are left out.
pub fn weighted_pool(
    words: &WordList,
    start_id: usize,
    end_id: usize,
    max_id: usize,
    weights: &HashMap<String, u32>,
) -> Vec<usize> {
    if !range_is_valid(start_id, end_id, max_id) {
        return Vec::new();
    }

    let mut pool = Vec::new();
    for id in start_id..=end_id {
        let Some(entry) = words.get(id) else {
            continue;
        };
        let attempts = weights.get(canonical_form(entry)).copied().unwrap_or(0);
        pool.extend(std::iter::repeat(id).take(copies_for_attempts(attempts)));
    }
    pool
}

/// Pick up to `count` distinct IDs from `[start_id, end_id]`, biased toward
/// frequently missed words.
///
/// Returns fewer than `count` IDs when the range holds fewer words, and an
/// empty vector for an invalid range.
pub fn select<R: Rng + ?Sized>(
    rng: &mut R,
    words: &WordList,
    start_id: usize,
    end_id: usize,
    max_id: usize,
    count: usize,
    weights: &HashMap<String, u32>,
) -> Vec<usize> {
    let mut pool = weighted_pool(words, start_id, end_id, max_id, weights);
    pool.shuffle(rng);

    let mut seen = HashSet::new();
    pool.retain(|id| seen.insert(*id));
    pool.truncate(count);
    pool
}

/// Pick up to `count` distinct IDs from `[start_id, end_id]` uniformly.
///
/// Only the range bounds are checked here; callers that need every ID to
/// index a real entry should pass a range within the list.
pub fn select_unweighted<R: Rng + ?Sized>(
    rng: &mut R,
    start_id: usize,
    end_id: usize,
    max_id: usize,
    count: usize,
) -> Vec<usize> {
    if !range_is_valid(start_id, end_id, max_id) {
        return Vec::new();
    }

    let mut ids: Vec<usize> = (start_id..=end_id).collect();
    ids.shuffle(rng);
    ids.truncate(count);
    ids
}
