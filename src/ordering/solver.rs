use std::collections::VecDeque;

use crate::ordering::{constraint::ConstraintSet, error::SolveError};

/// Turns a set of partial-order constraints into a total order over all items,
/// or reports the first contradictory pair encountered.
///
/// The relation is closed transitively with a worklist before extraction, so a
/// conflict is detected no matter how indirectly it arises. Extraction is
/// Kahn-style with ties broken by smallest original index, which makes the
/// result fully deterministic for identical inputs.
pub fn solve(set: &ConstraintSet) -> Result<Vec<usize>, SolveError> {
    let n = set.count();
    if n == 0 {
        return Ok(Vec::new());
    }

    // before[earlier * n + later] == true: `earlier` must precede `later`
    let mut before = vec![false; n * n];
    let mut worklist: VecDeque<(usize, usize)> = VecDeque::new();

    // seed explicit pairs, then the implicit (first, last) pairs
    for &(earlier, later) in set.pairs() {
        try_add(&mut before, &mut worklist, n, earlier, later)?;
    }
    for &first in set.firsts() {
        for &last in set.lasts() {
            try_add(&mut before, &mut worklist, n, first, last)?;
        }
    }
    propagate(&mut before, &mut worklist, n)?;

    // Pull every ungrouped item after the firsts and before the lasts, unless
    // an explicit constraint already placed it on the other side. This keeps
    // the first/last groups maximal without callers declaring every relation.
    for item in 0..n {
        if set.is_grouped(item) {
            continue;
        }
        for &first in set.firsts() {
            if !before[item * n + first] {
                try_add(&mut before, &mut worklist, n, first, item)?;
            }
        }
        for &last in set.lasts() {
            if !before[last * n + item] {
                try_add(&mut before, &mut worklist, n, item, last)?;
            }
        }
    }
    propagate(&mut before, &mut worklist, n)?;

    // extract items with no unresolved predecessor, smallest index first
    let mut order = Vec::with_capacity(n);
    let mut placed = vec![false; n];
    loop {
        let mut extracted = None;
        for item in 0..n {
            if placed[item] {
                continue;
            }
            let ready = (0..n).all(|other| placed[other] || !before[other * n + item]);
            if ready {
                extracted = Some(item);
                break;
            }
        }
        match extracted {
            Some(item) => {
                placed[item] = true;
                order.push(item);
                if order.len() == n {
                    return Ok(order);
                }
            }
            None => {
                // unreachable with a consistent closed relation
                return Err(SolveError::Incomplete {
                    placed: order.len(),
                    expected: n,
                });
            }
        }
    }
}

/// Records `earlier < later`, failing if the complement is already known.
fn try_add(
    before: &mut [bool],
    worklist: &mut VecDeque<(usize, usize)>,
    n: usize,
    earlier: usize,
    later: usize,
) -> Result<(), SolveError> {
    if earlier == later || before[later * n + earlier] {
        return Err(SolveError::Contradiction { earlier, later });
    }
    if !before[earlier * n + later] {
        before[earlier * n + later] = true;
        worklist.push_back((earlier, later));
    }
    Ok(())
}

/// Transitive closure: for every known a < b, join against b < c and z < a.
fn propagate(
    before: &mut [bool],
    worklist: &mut VecDeque<(usize, usize)>,
    n: usize,
) -> Result<(), SolveError> {
    while let Some((earlier, later)) = worklist.pop_front() {
        for item in 0..n {
            if before[later * n + item] {
                try_add(before, worklist, n, earlier, item)?;
            }
            if before[item * n + earlier] {
                try_add(before, worklist, n, item, later)?;
            }
        }
    }
    Ok(())
}
