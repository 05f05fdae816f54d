//! Property-based tests for the permission matcher and evaluator.
//!
//! Inputs are drawn from a small segment alphabet so wildcards, repeats and
//! near-misses show up often.

use bale_access::{has_permission, matches_wildcard, GrantedPermissions};
use proptest::prelude::*;

// Strategies for generating test data
fn segment_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "read", "create", ""]).prop_map(str::to_string)
}

fn required_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(segment_strategy(), 1..6).prop_map(|segments| segments.join("."))
}

fn pattern_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![3 => segment_strategy(), 2 => Just("*".to_string())],
        1..6,
    )
    .prop_map(|segments| segments.join("."))
}

fn granted_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop_oneof![required_strategy(), pattern_strategy()], 0..6)
}

/// Straightforward recursive segment matcher used as an oracle.
fn reference_match(required: &[&str], pattern: &[&str]) -> bool {
    match pattern.split_first() {
        None => required.is_empty(),
        Some((&"*", rest)) => (0..=required.len()).any(|skip| reference_match(&required[skip..], rest)),
        Some((segment, rest)) => match required.split_first() {
            Some((head, tail)) => head == segment && reference_match(tail, rest),
            None => false,
        },
    }
}

fn reference(required: &str, pattern: &str) -> bool {
    let required: Vec<&str> = required.split('.').collect();
    let pattern: Vec<&str> = pattern.split('.').collect();
    reference_match(&required, &pattern)
}

// Property: the matcher agrees with the recursive oracle
proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    #[test]
    fn matcher_agrees_with_reference(required in required_strategy(), pattern in pattern_strategy()) {
        prop_assert_eq!(
            matches_wildcard(&required, &pattern),
            reference(&required, &pattern),
            "required={:?} pattern={:?}", required, pattern
        );
    }

    #[test]
    fn every_permission_matches_itself(required in required_strategy()) {
        prop_assert!(matches_wildcard(&required, &required));
        prop_assert!(has_permission(&required, &[required.as_str()]));
    }

    #[test]
    fn global_wildcard_matches_everything(required in required_strategy()) {
        prop_assert!(matches_wildcard(&required, "*"));
    }

    #[test]
    fn trailing_wildcard_covers_extensions(prefix in required_strategy(), suffix in required_strategy()) {
        let pattern = format!("{}.*", prefix);
        let required = format!("{}.{}", prefix, suffix);
        prop_assert!(matches_wildcard(&required, &pattern));
    }
}

// Property: the evaluator is an OR over the granted list
proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn evaluator_is_any_over_patterns(required in required_strategy(), granted in granted_strategy()) {
        let expected = granted.iter().any(|pattern| reference(&required, pattern));
        prop_assert_eq!(has_permission(&required, &granted), expected);
    }

    #[test]
    fn exact_grant_short_circuits(required in required_strategy(), mut granted in granted_strategy()) {
        granted.push(required.clone());
        prop_assert!(has_permission(&required, &granted));
    }

    #[test]
    fn grant_order_does_not_matter(
        required in required_strategy(),
        (granted, shuffled) in granted_strategy()
            .prop_flat_map(|granted| (Just(granted.clone()), Just(granted).prop_shuffle())),
    ) {
        prop_assert_eq!(has_permission(&required, &granted), has_permission(&required, &shuffled));
    }

    #[test]
    fn adding_grants_never_revokes(
        required in required_strategy(),
        granted in granted_strategy(),
        extra in pattern_strategy(),
    ) {
        let before = has_permission(&required, &granted);
        let mut widened = granted;
        widened.push(extra);
        prop_assert!(!before || has_permission(&required, &widened));
    }

    #[test]
    fn granted_set_agrees_with_slice(
        requests in prop::collection::vec(required_strategy(), 1..20),
        granted in granted_strategy(),
        capacity in 0usize..8,
    ) {
        let set = GrantedPermissions::new(granted.clone()).with_decision_cache(capacity);
        // Each request twice so the second lookup can come from the memo.
        for required in requests.iter().chain(requests.iter()) {
            prop_assert_eq!(set.has_permission(required), has_permission(required, &granted));
        }
        prop_assert!(set.cached_decisions() <= capacity);
    }
}
