//! Plurality vote over client-ID sets.
//!
//! Each matched identifier contributes the set of clients it has ever been
//! bound to. The client contained in the most sets wins; ties go to the
//! lowest client number so the outcome never depends on iteration order.

use std::collections::{BTreeMap, BTreeSet};

use clientmerge_core::ClientIdNo;

/// Count, for every candidate, how many of the sets contain it.
pub fn tally<'a, I>(sets: I) -> BTreeMap<ClientIdNo, usize>
where
    I: IntoIterator<Item = &'a BTreeSet<ClientIdNo>>,
{
    let mut counts = BTreeMap::new();
    for set in sets {
        for client_idno in set {
            *counts.entry(*client_idno).or_insert(0) += 1;
        }
    }
    counts
}

/// Winner of the vote, or `None` when every set is empty.
pub fn plurality_winner<'a, I>(sets: I) -> Option<ClientIdNo>
where
    I: IntoIterator<Item = &'a BTreeSet<ClientIdNo>>,
{
    let mut best: Option<(ClientIdNo, usize)> = None;
    // Ascending key order: a later candidate only wins with a strictly higher count.
    for (client_idno, count) in tally(sets) {
        match best {
            Some((_, best_count)) if best_count >= count => {}
            _ => best = Some((client_idno, count)),
        }
    }
    best.map(|(client_idno, _)| client_idno)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(ids: &[u64]) -> BTreeSet<ClientIdNo> {
        ids.iter().copied().map(ClientIdNo::new).collect()
    }

    #[test]
    fn most_shared_client_wins() {
        let sets = [set(&[1000, 1001]), set(&[1000]), set(&[1000])];
        assert_eq!(plurality_winner(&sets), Some(ClientIdNo::new(1000)));

        let counts = tally(&sets);
        assert_eq!(counts[&ClientIdNo::new(1000)], 3);
        assert_eq!(counts[&ClientIdNo::new(1001)], 1);
    }

    #[test]
    fn ties_go_to_the_lowest_number() {
        let sets = [set(&[1005, 1002]), set(&[1002, 1005]), set(&[1007])];
        assert_eq!(plurality_winner(&sets), Some(ClientIdNo::new(1002)));
    }

    #[test]
    fn higher_count_beats_lower_number() {
        let sets = [set(&[1, 9]), set(&[9]), set(&[1, 9])];
        assert_eq!(plurality_winner(&sets), Some(ClientIdNo::new(9)));
    }

    #[test]
    fn empty_input_has_no_winner() {
        let none: [BTreeSet<ClientIdNo>; 0] = [];
        assert_eq!(plurality_winner(&none), None);
        assert_eq!(plurality_winner(&[set(&[]), set(&[])]), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the winner has the top count, and no lower number shares it.
        #[test]
        fn winner_is_lowest_among_top_counts(
            raw in prop::collection::vec(prop::collection::btree_set(1000u64..1012, 0..6), 0..8)
        ) {
            let sets: Vec<BTreeSet<ClientIdNo>> = raw
                .iter()
                .map(|s| s.iter().copied().map(ClientIdNo::new).collect())
                .collect();
            let counts = tally(&sets);

            match plurality_winner(&sets) {
                None => prop_assert!(counts.is_empty()),
                Some(winner) => {
                    let top = counts.values().copied().max().unwrap();
                    prop_assert_eq!(counts[&winner], top);
                    for (id, count) in &counts {
                        if *count == top {
                            prop_assert!(winner <= *id);
                        }
                    }
                }
            }
        }

        /// Property: the order in which identifiers are presented does not matter.
        #[test]
        fn winner_ignores_input_order(
            raw in prop::collection::vec(prop::collection::btree_set(1u64..8, 0..5), 1..8)
        ) {
            let sets: Vec<BTreeSet<ClientIdNo>> = raw
                .iter()
                .map(|s| s.iter().copied().map(ClientIdNo::new).collect())
                .collect();
            let mut reversed = sets.clone();
            reversed.reverse();
            prop_assert_eq!(plurality_winner(&sets), plurality_winner(&reversed));
        }
    }
}
