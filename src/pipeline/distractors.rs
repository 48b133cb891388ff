// src/pipeline/distractors.rs

//! Question and distractor picking.
//!
//! All randomness comes from the caller's RNG, so a seeded `StdRng` makes the
//! picks reproducible.

use std::collections::{BTreeSet, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;

/// Distinct answers across all usable questions, in sorted order.
pub fn distractor_pool<'a, I>(answers: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    answers
        .into_iter()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Index of the question to keep among `available` candidates, drawn from the
/// first `min(available, best_pool)` of them.
///
/// `available` must be at least 1.
pub fn pick_question_index<R: Rng + ?Sized>(available: usize, best_pool: usize, rng: &mut R) -> usize {
    let bound = available.min(best_pool).max(1);
    rng.gen_range(0..bound)
}

/// Up to `count` distinct distractors for `answer`, drawn from `pool`.
///
/// Candidates equal to the answer, ignoring case, are excluded, and candidates
/// differing only by case count once. Returns fewer than `count` values when
/// the pool runs short.
pub fn pick_distractors<R: Rng + ?Sized>(
    answer: &str,
    pool: &[String],
    count: usize,
    rng: &mut R,
) -> Vec<String> {
    let answer_key = answer.trim().to_lowercase();
    let mut seen = HashSet::new();

    let mut candidates: Vec<String> = pool
        .iter()
        .filter(|candidate| {
            let key = candidate.trim().to_lowercase();
            key != answer_key && seen.insert(key)
        })
        .cloned()
        .collect();

    candidates.shuffle(rng);
    candidates.truncate(count);
    candidates
}
