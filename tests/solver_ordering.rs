/// Tests for the ordering solver
/// Covers determinism, constraint respect, group maximality and cycle
/// detection at the index level, below the dispatcher.
use stagewire::{solve, ConstraintSet, SolveError};

#[test]
fn empty_set_produces_empty_order() {
    let set = ConstraintSet::new(0);

    assert_eq!(solve(&set).unwrap(), Vec::<usize>::new());
}

#[test]
fn unconstrained_items_keep_declaration_order() {
    let set = ConstraintSet::new(4);

    // ties are broken by original index
    assert_eq!(solve(&set).unwrap(), vec![0, 1, 2, 3]);
}

#[test]
fn identical_inputs_yield_identical_orders() {
    let build = || {
        let mut set = ConstraintSet::new(5);
        set.mark_first(3);
        set.mark_last(0);
        set.add_pair(4, 1);
        set
    };

    let first_run = solve(&build()).unwrap();
    let second_run = solve(&build()).unwrap();

    assert_eq!(first_run, second_run);
}

#[test]
fn pairwise_constraints_are_respected() {
    let mut set = ConstraintSet::new(4);
    set.add_pair(2, 0);
    set.add_pair(3, 2);

    let order = solve(&set).unwrap();
    let position = |item: usize| order.iter().position(|&other| other == item).unwrap();

    assert!(position(3) < position(2));
    assert!(position(2) < position(0));
}

#[test]
fn transitive_closure_orders_indirect_pairs() {
    // 0 < 1 and 1 < 2 declared, no direct 0-2 constraint
    let mut set = ConstraintSet::new(3);
    set.add_pair(0, 1);
    set.add_pair(1, 2);

    let order = solve(&set).unwrap();

    assert_eq!(order, vec![0, 1, 2]);
}

#[test]
fn first_group_precedes_last_group() {
    let mut set = ConstraintSet::new(5);
    set.mark_first(4);
    set.mark_last(1);

    let order = solve(&set).unwrap();
    let position = |item: usize| order.iter().position(|&other| other == item).unwrap();

    // every first item before every last item
    assert!(position(4) < position(1));
    // ungrouped items are pulled inside the first/last envelope
    for item in [0, 2, 3] {
        assert!(position(4) < position(item));
        assert!(position(item) < position(1));
    }
}

#[test]
fn direct_cycle_reports_the_offending_pair() {
    let mut set = ConstraintSet::new(2);
    set.add_pair(0, 1);
    set.add_pair(1, 0);

    let result = solve(&set);

    // the second declaration is the one that contradicts
    assert_eq!(
        result,
        Err(SolveError::Contradiction {
            earlier: 1,
            later: 0
        })
    );
}

#[test]
fn transitive_cycle_is_detected() {
    let mut set = ConstraintSet::new(3);
    set.add_pair(0, 1);
    set.add_pair(1, 2);
    set.add_pair(2, 0);

    assert!(matches!(
        solve(&set),
        Err(SolveError::Contradiction { .. })
    ));
}

#[test]
fn self_relation_is_contradictory() {
    let mut set = ConstraintSet::new(2);
    set.add_pair(1, 1);

    assert!(matches!(
        solve(&set),
        Err(SolveError::Contradiction {
            earlier: 1,
            later: 1
        })
    ));
}

#[test]
fn item_marked_both_first_and_last_is_contradictory() {
    let mut set = ConstraintSet::new(2);
    set.mark_first(0);
    set.mark_last(0);

    assert!(matches!(
        solve(&set),
        Err(SolveError::Contradiction { .. })
    ));
}

#[test]
fn explicit_constraint_overrides_group_pull() {
    // item 1 is explicitly before the first-group item 0; the group rule
    // must not force the reverse
    let mut set = ConstraintSet::new(3);
    set.mark_first(0);
    set.add_pair(1, 0);

    let order = solve(&set).unwrap();
    let position = |item: usize| order.iter().position(|&other| other == item).unwrap();

    assert!(position(1) < position(0));
    // the remaining plain item still follows the first group
    assert!(position(0) < position(2));
}

#[test]
#[should_panic(expected = "out of range")]
fn out_of_range_pair_panics() {
    let mut set = ConstraintSet::new(2);
    set.add_pair(0, 5);
}
