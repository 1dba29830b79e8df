use std::collections::BTreeMap;

use ham_core::model::OptionKey;
use ham_core::shuffle::{shuffle_list, shuffle_options};
use proptest::prelude::*;

fn option_key() -> impl Strategy<Value = OptionKey> {
    (0_usize..4).prop_map(|i| OptionKey::from_index(i).unwrap())
}

/// Four distinct, non-empty choices.
fn distinct_options() -> impl Strategy<Value = BTreeMap<OptionKey, String>> {
    prop::collection::btree_set("[a-z0-9 ]{1,12}", 4).prop_map(|texts| {
        OptionKey::ALL.into_iter().zip(texts).collect::<BTreeMap<_, _>>()
    })
}

proptest! {
    #[test]
    fn option_shuffle_is_deterministic(
        options in distinct_options(),
        key in option_key(),
        seed in ".{0,24}",
    ) {
        prop_assert_eq!(
            shuffle_options(&options, key, &seed),
            shuffle_options(&options, key, &seed)
        );
    }

    #[test]
    fn correct_text_is_preserved(
        options in distinct_options(),
        key in option_key(),
        seed in ".{0,24}",
    ) {
        let result = shuffle_options(&options, key, &seed);
        prop_assert_eq!(&result.options[&result.correct_answer], &options[&key]);
    }

    #[test]
    fn option_shuffle_keeps_every_choice(
        options in distinct_options(),
        key in option_key(),
        seed in ".{0,24}",
    ) {
        let result = shuffle_options(&options, key, &seed);
        let mut before: Vec<&String> = options.values().collect();
        let mut after: Vec<&String> = result.options.values().collect();
        before.sort();
        after.sort();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn list_shuffle_is_permutation(
        items in prop::collection::vec(any::<u16>(), 0..64),
        seed in ".{0,24}",
    ) {
        let snapshot = items.clone();
        let shuffled = shuffle_list(&items, &seed);
        prop_assert_eq!(&items, &snapshot);

        let mut a = shuffled;
        let mut b = items;
        a.sort_unstable();
        b.sort_unstable();
        prop_assert_eq!(a, b);
    }
}
