use super::arena::CRef;
use super::types::{DecisionLevel, Lit};

/// Where a decision level begins: an index into the trail and one into the
/// LEQ status log, so both can be truncated together on backtrack.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrailSep {
    pub lit: usize,
    pub leq: usize,
}

/// One LEQ status mutation, packed into 32 bits:
/// status_ref:30 | is_true:1 | imply_type_clear:1. Backtracking replays these
/// in reverse to restore the counters.
#[derive(Clone, Copy)]
pub struct LeqStatusModLog(u32);

const LOG_REF_MASK: u32 = (1 << 30) - 1;
const LOG_IS_TRUE: u32 = 1 << 30;
const LOG_IMPLY_CLEAR: u32 = 1 << 31;

impl LeqStatusModLog {
    pub fn new(is_true: bool, status_ref: CRef) -> Self {
        debug_assert!(status_ref.0 < (1 << 30));
        Self(status_ref.0 | ((is_true as u32) * LOG_IS_TRUE))
    }

    #[inline(always)]
    pub fn is_true(&self) -> bool {
        self.0 & LOG_IS_TRUE != 0
    }

    #[inline(always)]
    pub fn imply_type_clear(&self) -> bool {
        self.0 & LOG_IMPLY_CLEAR != 0
    }

    #[inline(always)]
    pub fn status_ref(&self) -> CRef {
        CRef(self.0 & LOG_REF_MASK)
    }

    pub fn set_imply_clear(&mut self) {
        self.0 |= LOG_IMPLY_CLEAR;
    }

    pub fn set_status_ref(&mut self, sref: CRef) {
        debug_assert!(sref.0 < (1 << 30));
        self.0 = (self.0 & !LOG_REF_MASK) | sref.0;
    }

    pub fn with_is_true(&self, is_true: bool) -> Self {
        let mut r = Self(self.0 & !LOG_IS_TRUE);
        r.0 |= (is_true as u32) * LOG_IS_TRUE;
        r
    }
}

// Assignment trail during search and inference.
pub struct AssignmentStack {
    // Assignment trail (either from decision, or propagation)
    pub trail: Vec<Lit>,
    // lvl -> indices where that level's first entry will land
    pub trail_lim: Vec<TrailSep>,
    // Index from which to start propagating
    pub qhead: usize,
    // Log of LEQ status cell mutations, truncated alongside the trail
    pub leq_log: Vec<LeqStatusModLog>,
}

impl AssignmentStack {
    pub fn new() -> Self {
        Self {
            trail: Vec::new(),
            trail_lim: Vec::new(),
            qhead: 0,
            leq_log: Vec::new(),
        }
    }

    // Pushes a lit onto the trail.
    pub fn push(&mut self, l: Lit) {
        self.trail.push(l);
    }

    // Gets the Lit in the trail at the index.
    pub fn get(&self, i: usize) -> Lit {
        self.trail[i]
    }

    pub fn len(&self) -> usize {
        self.trail.len()
    }

    pub fn decision_level(&self) -> DecisionLevel {
        self.trail_lim.len() as DecisionLevel
    }

    pub fn new_decision_level(&mut self) {
        self.trail_lim.push(TrailSep {
            lit: self.trail.len(),
            leq: self.leq_log.len(),
        });
    }

    pub fn sep(&self, level: DecisionLevel) -> TrailSep {
        self.trail_lim[level as usize]
    }

    // Gets the Lit at the propagation head, then advances it, if any remain.
    pub fn next_unpropagated(&mut self) -> Option<Lit> {
        if self.qhead >= self.trail.len() {
            None
        } else {
            let lit = self.trail[self.qhead];
            self.qhead += 1;
            Some(lit)
        }
    }

    // Moves the propagation head to the end, abandoning queued entries.
    pub fn set_qhead_to_trail_head(&mut self) {
        self.qhead = self.trail.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::types::Lit;

    #[test]
    fn levels_track_both_indices() {
        let mut t = AssignmentStack::new();
        t.push(Lit::new(0, false));
        t.leq_log.push(LeqStatusModLog::new(true, CRef(7)));
        t.new_decision_level();
        assert_eq!(t.decision_level(), 1);
        let sep = t.sep(0);
        assert_eq!(sep.lit, 1);
        assert_eq!(sep.leq, 1);
    }

    #[test]
    fn qhead_walks_the_trail() {
        let mut t = AssignmentStack::new();
        t.push(Lit::new(0, false));
        t.push(Lit::new(1, true));
        assert_eq!(t.next_unpropagated(), Some(Lit::new(0, false)));
        assert_eq!(t.next_unpropagated(), Some(Lit::new(1, true)));
        assert_eq!(t.next_unpropagated(), None);
        t.push(Lit::new(2, false));
        t.set_qhead_to_trail_head();
        assert_eq!(t.next_unpropagated(), None);
    }

    #[test]
    fn mod_log_packing() {
        let mut log = LeqStatusModLog::new(true, CRef(123));
        assert!(log.is_true());
        assert!(!log.imply_type_clear());
        assert_eq!(log.status_ref(), CRef(123));
        log.set_imply_clear();
        assert!(log.imply_type_clear());
        let other = log.with_is_true(false);
        assert!(!other.is_true());
        assert!(other.imply_type_clear());
    }
}
