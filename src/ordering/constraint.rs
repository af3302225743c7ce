/// Index-level partial-order input for the solver.
///
/// Items are identified by their index in `0..count`; callers (the rank cache)
/// translate listener types to indices before solving. `firsts` and `lasts`
/// are group markers ("run before / after everything not otherwise
/// constrained"), `pairs` are explicit (earlier, later) relations.
#[derive(Clone, Debug, Default)]
pub struct ConstraintSet {
    count: usize,
    firsts: Vec<usize>,
    lasts: Vec<usize>,
    pairs: Vec<(usize, usize)>,
}

impl ConstraintSet {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            firsts: Vec::new(),
            lasts: Vec::new(),
            pairs: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Marks an item as part of the run-first group.
    pub fn mark_first(&mut self, item: usize) {
        assert!(
            item < self.count,
            "constraint item {item} out of range for set of {} items",
            self.count
        );
        if !self.firsts.contains(&item) {
            self.firsts.push(item);
        }
    }

    /// Marks an item as part of the run-last group.
    pub fn mark_last(&mut self, item: usize) {
        assert!(
            item < self.count,
            "constraint item {item} out of range for set of {} items",
            self.count
        );
        if !self.lasts.contains(&item) {
            self.lasts.push(item);
        }
    }

    /// Requires `earlier` to be placed before `later`.
    pub fn add_pair(&mut self, earlier: usize, later: usize) {
        assert!(
            earlier < self.count && later < self.count,
            "constraint pair ({earlier}, {later}) out of range for set of {} items",
            self.count
        );
        self.pairs.push((earlier, later));
    }

    pub(crate) fn firsts(&self) -> &[usize] {
        &self.firsts
    }

    pub(crate) fn lasts(&self) -> &[usize] {
        &self.lasts
    }

    pub(crate) fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub(crate) fn is_grouped(&self, item: usize) -> bool {
        self.firsts.contains(&item) || self.lasts.contains(&item)
    }
}
