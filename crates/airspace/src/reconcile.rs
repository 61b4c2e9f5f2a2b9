use std::ops::Range;

/// What to do with each index when the traffic list goes from `prev` to
/// `next` entries. Indices never move: the shared prefix is reused, the
/// tail is either dropped or appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub remove: Range<usize>,
    pub update: Range<usize>,
    pub create: Range<usize>,
}

pub fn plan(prev: usize, next: usize) -> ReconcilePlan {
    let shared = prev.min(next);
    ReconcilePlan {
        remove: shared..prev,
        update: 0..shared,
        create: shared..next,
    }
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        self.remove.is_empty() && self.update.is_empty() && self.create.is_empty()
    }
}
