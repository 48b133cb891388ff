use std::collections::HashSet;

use jobflow::pipeline::coref::{resolve_spans, CorefSpan};
use jobflow::pipeline::distractors::{distractor_pool, pick_distractors, pick_question_index};
use jobflow::pipeline::ParsedSentence;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn pool(values: &[&str]) -> Vec<String> {
    distractor_pool(values.iter().copied())
}

#[test]
fn pool_is_sorted_distinct_and_trimmed() {
    let pool = pool(&["Paris", " Rome ", "Paris", "", "  ", "Berlin"]);
    assert_eq!(pool, vec!["Berlin", "Paris", "Rome"]);
}

#[test]
fn three_distractors_from_a_large_enough_pool() {
    let pool = pool(&["Paris", "Rome", "Berlin", "Madrid", "Lisbon"]);
    let mut rng = StdRng::seed_from_u64(3);

    let picked = pick_distractors("Paris", &pool, 3, &mut rng);

    assert_eq!(picked.len(), 3);
    assert!(!picked.iter().any(|d| d == "Paris"));
    let distinct: HashSet<&String> = picked.iter().collect();
    assert_eq!(distinct.len(), 3);
}

#[test]
fn single_usable_candidate_gives_single_distractor() {
    let pool = pool(&["Paris", "Rome"]);
    let mut rng = StdRng::seed_from_u64(3);

    assert_eq!(pick_distractors("Paris", &pool, 3, &mut rng), vec!["Rome"]);
}

#[test]
fn answer_is_excluded_ignoring_case() {
    let pool = pool(&["paris", "PARIS", "Rome", "rome"]);
    let mut rng = StdRng::seed_from_u64(11);

    let picked = pick_distractors("Paris", &pool, 3, &mut rng);

    assert_eq!(picked.len(), 1);
    assert!(picked[0].eq_ignore_ascii_case("rome"));
}

#[test]
fn same_seed_same_picks() {
    let pool = pool(&["a1", "b2", "c3", "d4", "e5", "f6"]);
    let mut first = StdRng::seed_from_u64(99);
    let mut second = StdRng::seed_from_u64(99);

    assert_eq!(
        pick_distractors("a1", &pool, 3, &mut first),
        pick_distractors("a1", &pool, 3, &mut second)
    );
    assert_eq!(
        pick_question_index(10, 3, &mut first),
        pick_question_index(10, 3, &mut second)
    );
}

#[test]
fn overlapping_spans_earliest_start_wins() {
    let text = "The old man saw him.";
    let spans = vec![
        // "old man" starts inside "The old" and loses to it.
        CorefSpan::new(4, 11, "Tom"),
        CorefSpan::new(0, 7, "Grandpa"),
        CorefSpan::new(16, 19, "Jerry"),
    ];

    assert_eq!(resolve_spans(text, &spans), "Grandpa man saw Jerry.");
}

#[test]
fn earliest_start_wins_even_when_shorter() {
    let text = "abcdefgh";
    let spans = vec![CorefSpan::new(0, 2, "X"), CorefSpan::new(1, 8, "LONG")];
    assert_eq!(resolve_spans(text, &spans), "Xcdefgh");
}

#[test]
fn adjacent_duplicate_and_invalid_spans() {
    let text = "he and she";
    let spans = vec![
        CorefSpan::new(7, 10, "Ann"),
        CorefSpan::new(0, 2, "Bob"),
        CorefSpan::new(0, 2, "Bob"),
        CorefSpan::new(3, 6, "plus"),
        CorefSpan::new(5, 50, "out of range"),
    ];
    assert_eq!(resolve_spans(text, &spans), "Bob plus Ann");
}

#[test]
fn sentence_without_spans_keeps_its_text() {
    let mut sentence = ParsedSentence::new(0, "Nothing to replace.");
    sentence.resolve_coreferences();
    assert_eq!(sentence.resolved, "Nothing to replace.");

    let mut sentence = ParsedSentence::new(1, "It works.")
        .with_coref_spans(vec![CorefSpan::new(0, 2, "The engine")]);
    sentence.resolve_coreferences();
    assert_eq!(sentence.resolved, "The engine works.");
    assert_eq!(sentence.text, "It works.");
}

proptest! {
    #[test]
    fn distractors_are_distinct_and_never_the_answer(
        answers in proptest::collection::vec("[a-z]{1,6}", 0..12),
        answer in "[a-z]{1,6}",
        count in 0usize..6,
        seed in any::<u64>(),
    ) {
        let pool = distractor_pool(answers.iter().map(String::as_str));
        let mut rng = StdRng::seed_from_u64(seed);

        let picked = pick_distractors(&answer, &pool, count, &mut rng);

        let usable = pool.iter().filter(|c| **c != answer).count();
        prop_assert_eq!(picked.len(), count.min(usable));
        prop_assert!(!picked.contains(&answer));
        let distinct: HashSet<&String> = picked.iter().collect();
        prop_assert_eq!(distinct.len(), picked.len());
    }

    #[test]
    fn question_index_stays_within_best_pool(
        available in 1usize..20,
        best in 1usize..6,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let index = pick_question_index(available, best, &mut rng);
        prop_assert!(index < available.min(best));
    }
}
