use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{OptionKey, Question};
use crate::rng::index_from_seed;

/// Answer choices re-keyed after shuffling, plus the slot now holding the
/// correct text. Never persisted: recomputing it from the same inputs gives
/// the same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShuffleResult {
    pub options: BTreeMap<OptionKey, String>,
    pub correct_answer: OptionKey,
}

impl ShuffleResult {
    /// Fallback for a question without usable options.
    #[must_use]
    pub fn degenerate() -> Self {
        Self {
            options: BTreeMap::new(),
            correct_answer: OptionKey::A,
        }
    }

    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.options.is_empty()
    }

    #[must_use]
    pub fn is_correct(&self, key: OptionKey) -> bool {
        self.correct_answer == key
    }

    /// Keys in display order.
    pub fn keys(&self) -> impl Iterator<Item = OptionKey> + '_ {
        self.options.keys().copied()
    }
}

/// Seed for one question's option order: `<base>_<question id>`.
#[must_use]
pub fn question_seed(base: &str, question_id: &str) -> String {
    format!("{base}_{question_id}")
}

/// Fisher–Yates over a copy of `items`. Swap `i` (from the end down to 1)
/// draws from its own seed, `seed` followed by `i`.
#[must_use]
pub fn shuffle_list<T: Clone>(items: &[T], seed: &str) -> Vec<T> {
    let mut shuffled = items.to_vec();
    for i in (1..shuffled.len()).rev() {
        let j = index_from_seed(&format!("{seed}{i}"), i);
        shuffled.swap(i, j);
    }
    shuffled
}

/// Shuffle the A–D choices of one question under `seed`.
///
/// Missing or empty choices are dropped before shuffling and the survivors are
/// re-keyed from `A`. The correct slot is located by the correct choice's text.
#[must_use]
pub fn shuffle_options(
    options: &BTreeMap<OptionKey, String>,
    correct_key: OptionKey,
    seed: &str,
) -> ShuffleResult {
    let mut values: Vec<&str> = OptionKey::ALL
        .iter()
        .filter_map(|key| options.get(key))
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .collect();

    if values.is_empty() {
        return ShuffleResult::degenerate();
    }

    for i in (1..values.len()).rev() {
        let j = index_from_seed(&format!("{seed}options{i}"), i);
        values.swap(i, j);
    }

    let shuffled: BTreeMap<OptionKey, String> = OptionKey::ALL
        .iter()
        .zip(values)
        .map(|(key, value)| (*key, value.to_owned()))
        .collect();

    let correct_answer = options
        .get(&correct_key)
        .and_then(|text| {
            shuffled
                .iter()
                .find(|(_, value)| *value == text)
                .map(|(key, _)| *key)
        })
        .unwrap_or(OptionKey::A);

    ShuffleResult {
        options: shuffled,
        correct_answer,
    }
}

/// Shuffle a question's options with its per-question seed.
#[must_use]
pub fn shuffle_question(question: &Question, base_seed: &str) -> ShuffleResult {
    shuffle_options(
        question.options(),
        question.correct_answer(),
        &question_seed(base_seed, question.id().as_str()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn four_options() -> BTreeMap<OptionKey, String> {
        BTreeMap::from([
            (OptionKey::A, "146.52 MHz".to_string()),
            (OptionKey::B, "223.50 MHz".to_string()),
            (OptionKey::C, "446.00 MHz".to_string()),
            (OptionKey::D, "52.525 MHz".to_string()),
        ])
    }

    #[test]
    fn options_shuffle_is_repeatable() {
        let opts = four_options();
        let first = shuffle_options(&opts, OptionKey::B, "1700000000000_T1A01");
        let second = shuffle_options(&opts, OptionKey::B, "1700000000000_T1A01");
        assert_eq!(first, second);
    }

    #[test]
    fn different_seeds_produce_different_orders() {
        let opts = four_options();
        let orders: BTreeSet<Vec<String>> = (0..24)
            .map(|n| {
                shuffle_options(&opts, OptionKey::A, &format!("seed-{n}"))
                    .options
                    .into_values()
                    .collect()
            })
            .collect();
        assert!(orders.len() > 1, "every seed produced the same order");
    }

    #[test]
    fn correct_text_survives_shuffle() {
        let opts = four_options();
        for key in OptionKey::ALL {
            for n in 0..16 {
                let result = shuffle_options(&opts, key, &format!("s{n}"));
                assert_eq!(result.options[&result.correct_answer], opts[&key]);
            }
        }
    }

    #[test]
    fn empty_options_degrade_to_a() {
        let result = shuffle_options(&BTreeMap::new(), OptionKey::C, "seed");
        assert!(result.is_degenerate());
        assert_eq!(result.correct_answer, OptionKey::A);
        assert!(result.is_correct(OptionKey::A));
        assert!(!result.is_correct(OptionKey::B));
    }

    #[test]
    fn blank_choices_are_dropped_and_rekeyed() {
        let opts = BTreeMap::from([
            (OptionKey::A, "yes".to_string()),
            (OptionKey::B, String::new()),
            (OptionKey::D, "no".to_string()),
        ]);
        let result = shuffle_options(&opts, OptionKey::D, "seed");
        let keys: Vec<OptionKey> = result.keys().collect();
        assert_eq!(keys, vec![OptionKey::A, OptionKey::B]);
        assert_eq!(result.options[&result.correct_answer], "no");
    }

    #[test]
    fn missing_correct_text_falls_back_to_a() {
        let opts = BTreeMap::from([
            (OptionKey::A, "one".to_string()),
            (OptionKey::B, "two".to_string()),
        ]);
        let result = shuffle_options(&opts, OptionKey::D, "seed");
        assert_eq!(result.correct_answer, OptionKey::A);
    }

    #[test]
    fn list_shuffle_is_a_permutation_and_leaves_input_alone() {
        let items: Vec<u32> = (0..40).collect();
        let shuffled = shuffle_list(&items, "1700000000000_exam");
        assert_eq!(items, (0..40).collect::<Vec<_>>());
        let mut sorted = shuffled.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, items);
        assert_eq!(shuffled, shuffle_list(&items, "1700000000000_exam"));
    }

    #[test]
    fn list_shuffle_handles_tiny_inputs() {
        assert!(shuffle_list::<u8>(&[], "seed").is_empty());
        assert_eq!(shuffle_list(&[7], "seed"), vec![7]);
    }

    #[test]
    fn question_seed_joins_with_underscore() {
        assert_eq!(question_seed("123_exam", "T5A01"), "123_exam_T5A01");
    }
}
