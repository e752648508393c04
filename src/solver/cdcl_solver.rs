use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fxhash::FxHashMap;
use log::{debug, info};
use mut_binary_heap::BinaryHeap;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use super::{
    arena::{CRef, ClauseArena, IMPLY_CONFL, IMPLY_DST, IMPLY_LITS, IMPLY_NONE},
    assignment_trail::{AssignmentStack, LeqStatusModLog},
    config::{SolverConfig, CLA_RESCALE_F, CLA_RESCALE_LIM, VAR_RESCALE_F, VAR_RESCALE_LIM},
    stats::RuntimeStats,
    types::{DecisionLevel, LBool, Lit, SolveStatus, Var, F64, L_UNDEF, V_UNDEF},
    util::vec_to_str,
    watch_list::{LeqWatchList, LeqWatcher, WatchList, Watcher},
};

// Record the reason and decision level for an assignment, if any.
#[derive(Clone, Copy, Debug, Default)]
pub struct Reason {
    // Clause that implied the assignment (None for decisions/assumptions)
    pub cref: Option<CRef>,
    // Decision level of the assignment
    pub dl: DecisionLevel,
}

/// Heap keys: activity first, then smaller variable index on ties.
type ActKey = (F64, Reverse<Var>);

pub struct CDCLSolver {
    ca: ClauseArena,
    /// Problem information: constraint clauses (disjunctions and LEQs), learnt clauses.
    clauses: Vec<CRef>,
    learnts: Vec<CRef>,

    /// Search/inference fields.
    ///
    /// Assignment trail, level separators, propagation head, LEQ status log.
    trail: AssignmentStack,
    /// Watch list for disjunction clauses, keyed by literal.
    watches: WatchList,
    /// Counting watchers for LEQ clauses, keyed by variable.
    leq_watches: LeqWatchList,

    /// Variable/Literal metadata.
    ///
    /// We use separate vectors, as opposed to one struct, to optimize cache accesses if we only
    /// need some subset of the data (which is almost always the case).
    ///
    /// Var -> assignment (if exists)
    assigned: Vec<LBool>,
    /// Var -> saved polarity for phase saving
    polarity: Vec<bool>,
    /// Var -> reason information, needed when walking the implication graph
    reasons: Vec<Reason>,
    /// Var -> whether the variable is eligible as a decision
    decision: Vec<bool>,
    /// Var -> activity, with a keyed max heap for the decision order
    acts: Vec<F64>,
    act_heap: BinaryHeap<Var, ActKey>,

    /// Temporary computation structures, to avoid repeated allocation.
    ///
    /// Var -> already visited in conflict analysis / minimization.
    /// Remember to clear via seen_to_clear!
    seen: Vec<bool>,
    seen_to_clear: Vec<Var>,
    /// Worklist for the recursive minimization probe
    analyze_stack: Vec<Lit>,
    /// Scratch space for antecedent literals of the clause under inspection
    reason_lits: Vec<Lit>,

    /// Solver status: false iff root-level unsatisfiability has been found.
    ok: bool,
    /// Activity increments, multiplicatively decayed.
    var_inc: f64,
    cla_inc: f64,

    /// Assumptions for the current solve call, and its outputs.
    assumptions: Vec<Lit>,
    model: Vec<LBool>,
    conflict: Vec<Lit>,

    /// Learnt-clause budget bookkeeping.
    max_learnts: f64,
    learntsize_adjust_confl: f64,
    learntsize_adjust_cnt: i64,

    /// Bookkeeping for skipping no-op simplifies.
    simp_db_assigns: i64,
    simp_db_props: i64,

    /// Resource constraints; negative means unbounded.
    conflict_budget: i64,
    propagation_budget: i64,
    asynch_interrupt: Arc<AtomicBool>,

    progress_est: f64,

    conf: SolverConfig,
    stats: RuntimeStats,
    rng: SmallRng,
}

impl CDCLSolver {
    pub fn new(conf: SolverConfig) -> Self {
        let rng = SmallRng::seed_from_u64(conf.random_seed);
        Self {
            ca: ClauseArena::new(),
            clauses: vec![],
            learnts: vec![],
            trail: AssignmentStack::new(),
            watches: WatchList::new(),
            leq_watches: LeqWatchList::new(),
            assigned: vec![],
            polarity: vec![],
            reasons: vec![],
            decision: vec![],
            acts: vec![],
            act_heap: BinaryHeap::new(),
            seen: vec![],
            seen_to_clear: vec![],
            analyze_stack: vec![],
            reason_lits: vec![],
            ok: true,
            var_inc: 1.0,
            cla_inc: 1.0,
            assumptions: vec![],
            model: vec![],
            conflict: vec![],
            max_learnts: 0.0,
            learntsize_adjust_confl: 0.0,
            learntsize_adjust_cnt: 0,
            simp_db_assigns: -1,
            simp_db_props: 0,
            conflict_budget: -1,
            propagation_budget: -1,
            asynch_interrupt: Arc::new(AtomicBool::new(false)),
            progress_est: 0.0,
            conf,
            stats: RuntimeStats::default(),
            rng,
        }
    }

    /// Creates a new SAT variable. If `dvar` is cleared, the variable will not
    /// be used as a decision (which changes what a SAT answer means).
    pub fn new_var(&mut self, sign: bool, dvar: bool) -> Var {
        let v = self.n_vars() as Var;
        self.watches.init_var();
        self.leq_watches.init_var();
        self.assigned.push(LBool::Undef);
        self.reasons.push(Reason::default());
        let act = if self.conf.rnd_init_act {
            self.rng.gen::<f64>() * 0.00001
        } else {
            0.0
        };
        self.acts.push(F64::from(act));
        self.seen.push(false);
        self.polarity.push(sign);
        self.decision.push(false);
        self.set_decision_var(v, dvar);
        v
    }

    pub fn new_var_default(&mut self) -> Var {
        self.new_var(false, true)
    }

    fn set_decision_var(&mut self, v: Var, b: bool) {
        if b && !self.decision[v as usize] {
            self.stats.dec_vars += 1;
        } else if !b && self.decision[v as usize] {
            self.stats.dec_vars -= 1;
        }
        self.decision[v as usize] = b;
        self.insert_var_order(v);
    }

    /// Literal/Variable accesses
    ///
    /// Current value of a variable.
    pub fn value(&self, v: Var) -> LBool {
        self.assigned[v as usize]
    }

    /// Current value of a literal.
    pub fn value_lit(&self, l: Lit) -> LBool {
        self.assigned[l.var_idx()] ^ l.sign()
    }

    /// Get DL for this variable's assignment.
    fn level(&self, v: Var) -> DecisionLevel {
        self.reasons[v as usize].dl
    }

    pub fn n_vars(&self) -> usize {
        self.assigned.len()
    }

    pub fn n_clauses(&self) -> usize {
        self.clauses.len()
    }

    pub fn n_learnts(&self) -> usize {
        self.learnts.len()
    }

    pub fn n_assigns(&self) -> usize {
        self.trail.len()
    }

    pub fn decision_level(&self) -> DecisionLevel {
        self.trail.decision_level()
    }

    /// Model from the last Sat answer, one value per variable.
    pub fn model(&self) -> &[LBool] {
        &self.model
    }

    /// Value of a literal under the last model.
    pub fn model_value(&self, l: Lit) -> LBool {
        self.model[l.var_idx()] ^ l.sign()
    }

    /// After an Unsat answer under assumptions: the negations of an
    /// assumption subset sufficient to reproduce the contradiction.
    pub fn conflict(&self) -> &[Lit] {
        &self.conflict
    }

    pub fn stats(&self) -> &RuntimeStats {
        &self.stats
    }

    /// Search progress checkpointed at the last restart. Purely informational.
    pub fn progress(&self) -> f64 {
        self.progress_est
    }

    pub fn okay(&self) -> bool {
        self.ok
    }

    /// Resource control.
    ///
    /// Makes the current search stop at the next safe point; the solver
    /// stays usable and `solve` may be called again after clearing.
    pub fn interrupt(&self) {
        self.asynch_interrupt.store(true, Ordering::Relaxed);
    }

    pub fn clear_interrupt(&self) {
        self.asynch_interrupt.store(false, Ordering::Relaxed);
    }

    /// Shareable handle for setting the interrupt from another thread.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.asynch_interrupt.clone()
    }

    pub fn set_conf_budget(&mut self, x: i64) {
        self.conflict_budget = self.stats.conflicts as i64 + x;
    }

    pub fn set_prop_budget(&mut self, x: i64) {
        self.propagation_budget = self.stats.propagations as i64 + x;
    }

    pub fn budget_off(&mut self) {
        self.conflict_budget = -1;
        self.propagation_budget = -1;
    }

    fn within_budget(&self) -> bool {
        !self.asynch_interrupt.load(Ordering::Relaxed)
            && (self.conflict_budget < 0 || (self.stats.conflicts as i64) < self.conflict_budget)
            && (self.propagation_budget < 0
                || (self.stats.propagations as i64) < self.propagation_budget)
    }

    /// Clause addition
    ///
    /// Adds a disjunction at level 0. Returns false iff the solver is now unsat.
    pub fn add_clause(&mut self, lits: &[Lit]) -> bool {
        self.add_clause_vec(lits.to_vec())
    }

    pub fn add_clause_vec(&mut self, mut ps: Vec<Lit>) -> bool {
        debug_assert!(self.decision_level() == 0);
        if !self.ok {
            return false;
        }

        // Check if the clause is satisfied; remove false/duplicate literals
        ps.sort();
        let mut j = 0;
        let mut p = L_UNDEF;
        for i in 0..ps.len() {
            let v = self.value_lit(ps[i]);
            if v == LBool::True || ps[i] == !p {
                return true;
            }
            if v != LBool::False && ps[i] != p {
                p = ps[i];
                ps[j] = p;
                j += 1;
            }
        }
        ps.truncate(j);

        match ps.len() {
            0 => {
                self.ok = false;
                false
            }
            1 => {
                self.unchecked_enqueue(ps[0], None);
                self.ok = self.propagate().is_none();
                self.ok
            }
            _ => {
                let cr = self.ca.alloc(&ps, false);
                self.clauses.push(cr);
                self.attach_clause(cr);
                true
            }
        }
    }

    /// Adds the reified cardinality constraint `dst <=> (sum lits <= bound)`
    /// at level 0. Returns false iff the solver is now unsat.
    pub fn add_leq_assign(&mut self, lits: &[Lit], bound: i32, dst: Lit) -> bool {
        debug_assert!(self.decision_level() == 0);
        if !self.ok {
            return false;
        }

        let mut ps = lits.to_vec();
        let mut bound = bound;
        self.canonize_leq_clause(&mut ps, &mut bound);

        if let Some(r) = self.try_leq_const_prop(&ps, dst, bound) {
            return r;
        }
        if bound == 0 {
            // We add no watchers on dst, so bound 0 needs plain clauses: dst
            // being true would have to imply every lit false
            let mut with_dst = ps.clone();
            with_dst.push(dst);
            if !self.add_clause_vec(with_dst) {
                return false;
            }
            for i in 0..ps.len() {
                if !self.add_clause(&[!ps[i], !dst]) {
                    return false;
                }
            }
            return true;
        }
        debug_assert!(1 <= bound && (bound as usize) < ps.len());

        if ps.len() == 1 {
            // the constraint collapses to dst == !ps[0]
            let a = dst;
            let b = !ps[0];
            return self.add_clause(&[!a, b]) && self.add_clause(&[!b, a]);
        }

        self.add_leq_and_setup_watchers(&ps, dst, bound as u32);
        true
    }

    /// `dst <=> (sum lits >= bound)`, expressed as a LEQ over negated literals.
    pub fn add_geq_assign(&mut self, lits: &[Lit], bound: i32, dst: Lit) -> bool {
        let negated = lits.iter().map(|&l| !l).collect::<Vec<_>>();
        self.add_leq_assign(&negated, lits.len() as i32 - bound, dst)
    }

    /// Sorts, drops assigned literals (true ones decrement the bound), and
    /// collapses x/!x pairs, each contributing exactly one true literal.
    fn canonize_leq_clause(&self, ps: &mut Vec<Lit>, bound: &mut i32) {
        ps.sort();
        let mut j = 0usize;
        let mut p = L_UNDEF;
        for i in 0..ps.len() {
            let l = ps[i];
            if self.value_lit(l) == LBool::True {
                *bound -= 1;
                continue;
            }
            if self.value_lit(l) == LBool::False {
                continue;
            }
            if l == !p {
                // remove the previous literal
                j -= 1;
                *bound -= 1;
                p = if j > 0 { ps[j - 1] } else { L_UNDEF };
                continue;
            }
            ps[j] = l;
            p = l;
            j += 1;
        }
        ps.truncate(j);
    }

    /// Degenerate cases where the LEQ's truth value is already fixed: a bound
    /// at or above the size forces dst true, a negative bound forces it false.
    fn try_leq_const_prop(&mut self, ps: &[Lit], dst: Lit, bound: i32) -> Option<bool> {
        let val = if ps.len() as i32 <= bound {
            LBool::True
        } else if bound < 0 {
            LBool::False
        } else {
            return None;
        };
        if self.value_lit(dst) == LBool::Undef {
            let unit = if val == LBool::True { dst } else { !dst };
            self.unchecked_enqueue(unit, None);
            self.ok = self.propagate().is_none();
            return Some(self.ok);
        }
        if self.value_lit(dst) == val {
            return Some(true);
        }
        self.ok = false;
        Some(false)
    }

    fn add_leq_and_setup_watchers(&mut self, ps: &[Lit], dst: Lit, bound: u32) {
        let cr = self.ca.alloc_leq(ps, dst, bound);
        self.clauses.push(cr);

        // duplicated lits are naturally handled by adding multiple watchers
        for &p in ps {
            let w = LeqWatcher::new(bound, p.sign(), ps.len() as u32, cr);
            self.leq_watches.add_watcher(p.var(), w);
        }

        self.stats.clauses_literals += ps.len() as u64 + 1;
    }

    /// Attaches a disjunction to the watch lists.
    fn attach_clause(&mut self, cr: CRef) {
        debug_assert!(!self.ca.is_leq(cr));
        debug_assert!(self.ca.size(cr) > 1);
        let c0 = self.ca.lit(cr, 0);
        let c1 = self.ca.lit(cr, 1);
        self.watches.add_watcher(!c0, Watcher::new(cr, c1));
        self.watches.add_watcher(!c1, Watcher::new(cr, c0));
        if self.ca.learnt(cr) {
            self.stats.learnts_literals += self.ca.size(cr) as u64;
        } else {
            self.stats.clauses_literals += self.ca.size(cr) as u64;
        }
    }

    /// Lazy detach: the owning keys get smudged and swept before the clause
    /// is ever collected.
    fn detach_clause(&mut self, cr: CRef) {
        debug_assert!(!self.ca.is_leq(cr));
        debug_assert!(self.ca.size(cr) > 1);
        let c0 = self.ca.lit(cr, 0);
        let c1 = self.ca.lit(cr, 1);
        self.watches.smudge(!c0);
        self.watches.smudge(!c1);
        if self.ca.learnt(cr) {
            self.stats.learnts_literals -= self.ca.size(cr) as u64;
        } else {
            self.stats.clauses_literals -= self.ca.size(cr) as u64;
        }
    }

    fn remove_clause(&mut self, cr: CRef) {
        if self.ca.is_leq(cr) {
            for i in 0..self.ca.size(cr) {
                let v = self.ca.lit(cr, i).var();
                self.leq_watches.smudge(v);
                // don't leave reasons pointing at freed memory
                if self.reasons[v as usize].cref == Some(cr) {
                    self.reasons[v as usize].cref = None;
                }
            }
            let dv = self.ca.leq_dst(cr).var();
            if self.reasons[dv as usize].cref == Some(cr) {
                self.reasons[dv as usize].cref = None;
            }
            self.stats.clauses_literals -= self.ca.size(cr) as u64 + 1;
        } else {
            self.detach_clause(cr);
            if self.locked_disj(cr) {
                self.reasons[self.ca.lit(cr, 0).var_idx()].cref = None;
            }
        }
        self.ca.set_mark(cr, 1);
        self.ca.free(cr);
    }

    /// Whether the disjunction is the reason for its first literal.
    fn locked_disj(&self, cr: CRef) -> bool {
        let c0 = self.ca.lit(cr, 0);
        self.value_lit(c0) == LBool::True && self.reasons[c0.var_idx()].cref == Some(cr)
    }

    fn satisfied(&self, cr: CRef) -> bool {
        if self.ca.is_leq(cr) {
            let vdst = self.value_lit(self.ca.leq_dst(cr));
            if vdst.is_not_undef() {
                let s = self.ca.leq_status(self.ca.leq_status_ref(cr));
                let bound = self.ca.leq_bound(cr);
                let vleq = if s.nr_true() >= bound + 1 {
                    false
                } else if s.nr_false() >= self.ca.size(cr) - bound {
                    true
                } else {
                    return false;
                };
                return vdst.val_is(vleq);
            }
            return false;
        }
        (0..self.ca.size(cr)).any(|i| self.value_lit(self.ca.lit(cr, i)) == LBool::True)
    }

    /// Trail manipulation
    ///
    /// Assign a literal true and push it; `from` is its implying clause.
    fn unchecked_enqueue(&mut self, p: Lit, from: Option<CRef>) {
        debug_assert!(
            self.value_lit(p) == LBool::Undef,
            "lit {p} already assigned {:?}",
            self.value_lit(p)
        );
        self.assigned[p.var_idx()] = LBool::from_sign(!p.sign());
        self.reasons[p.var_idx()] = Reason {
            cref: from,
            dl: self.decision_level(),
        };
        self.trail.push(p);
    }

    /// Unassign everything past `target_size`, without touching the LEQ log.
    /// Used to unroll implications a LEQ clause enqueued before discovering a
    /// conflict inside the same watcher visit.
    fn dequeue_until(&mut self, target_size: usize) {
        for i in target_size..self.trail.len() {
            self.assigned[self.trail.get(i).var_idx()] = LBool::Undef;
        }
        self.trail.trail.truncate(target_size);
    }

    // Backtrack to the given decision level, cleaning up the trail and
    // rewinding LEQ status cells through the log.
    pub fn cancel_until(&mut self, level: DecisionLevel) {
        if self.decision_level() <= level {
            return;
        }
        let sep = self.trail.sep(level);

        debug!(
            "backtracking to DL {level} (trail: {})",
            vec_to_str(&self.trail.trail)
        );

        for c in (sep.lit..self.trail.len()).rev() {
            let lit = self.trail.get(c);
            let x = lit.var_idx();
            self.assigned[x] = LBool::Undef;
            if self.conf.phase_saving > 1
                || (self.conf.phase_saving == 1 && c > self.trail.trail_lim.last().unwrap().lit)
            {
                self.polarity[x] = lit.sign();
            }
            self.insert_var_order(lit.var());
        }

        for i in (sep.leq..self.trail.leq_log.len()).rev() {
            let log = self.trail.leq_log[i];
            let sref = log.status_ref();
            let mut s = self.ca.leq_status(sref);
            s.decr(log.is_true());
            s.clear_imply_type_with(log.imply_type_clear());
            self.ca.set_leq_status(sref, s);
        }

        self.trail.qhead = sep.lit;
        self.trail.trail.truncate(sep.lit);
        self.trail.leq_log.truncate(sep.leq);
        self.trail.trail_lim.truncate(level as usize);
    }

    /// Propagation
    ///
    /// Propagates all enqueued facts; returns the conflicting clause, if any.
    /// The propagation queue is drained even when a conflict is found.
    pub fn propagate(&mut self) -> Option<CRef> {
        let mut confl = None;
        let mut num_props = 0u64;
        self.watches.clean_all(&self.ca);

        while let Some(p) = self.trail.next_unpropagated() {
            num_props += 1;
            confl = self.propagate_disj(p);
            if confl.is_none() {
                confl = self.propagate_leq(p);
            }
        }

        self.stats.propagations += num_props;
        self.simp_db_props -= num_props as i64;
        confl
    }

    fn propagate_disj(&mut self, p: Lit) -> Option<CRef> {
        let mut confl = None;
        let mut watchers = self.watches.take_watchers(p);
        let (mut i, mut j) = (0, 0);
        let n_ws = watchers.len();

        'next_watcher: while i < n_ws {
            let w_i = watchers[i];
            // Try to avoid inspecting the clause
            if self.value_lit(w_i.blocker) == LBool::True {
                watchers[j] = w_i;
                i += 1;
                j += 1;
                continue;
            }

            // Make sure the false literal is in slot 1
            let cr = w_i.cref;
            let false_lit = !p;
            if self.ca.lit(cr, 0) == false_lit {
                self.ca.swap_lits(cr, 0, 1);
            }
            debug_assert!(self.ca.lit(cr, 1) == false_lit);
            i += 1;

            // If the 0th watch is true, the clause is already satisfied
            let first = self.ca.lit(cr, 0);
            let w = Watcher::new(cr, first);
            if first != w_i.blocker && self.value_lit(first) == LBool::True {
                watchers[j] = w;
                j += 1;
                continue;
            }

            // Look for a new watch
            let c_sz = self.ca.size(cr);
            for k in 2..c_sz {
                let ck = self.ca.lit(cr, k);
                if self.value_lit(ck) != LBool::False {
                    self.ca.set_lit(cr, 1, ck);
                    self.ca.set_lit(cr, k, false_lit);
                    self.watches.add_watcher(!ck, w);
                    continue 'next_watcher;
                }
            }

            // Did not find a watch -- clause is unit under assignment
            watchers[j] = w;
            j += 1;
            if self.value_lit(first) == LBool::False {
                debug!("conflict on {first}");
                confl = Some(cr);
                self.trail.set_qhead_to_trail_head();
                // Copy the remaining watches to keep the list intact
                while i < n_ws {
                    watchers[j] = watchers[i];
                    i += 1;
                    j += 1;
                }
            } else {
                self.unchecked_enqueue(first, Some(cr));
            }
        }

        watchers.truncate(j);
        self.watches.set_watchers(p, watchers);
        confl
    }

    /// Counting propagation for the LEQ clauses watching var(new_fact).
    fn propagate_leq(&mut self, new_fact: Lit) -> Option<CRef> {
        let fact_is_true = !new_fact.sign();
        let v = new_fact.var();
        let watcher_size = self.leq_watches.len(v);

        for watcher_idx in 0..watcher_size {
            if watcher_idx % 4 == 0 && watcher_idx + 4 < watcher_size {
                for k in 1..=4 {
                    let sref = self.leq_watches.watcher(v, watcher_idx + k).status_ref();
                    self.ca.prefetch_status(sref);
                }
            }

            let watch = self.leq_watches.watcher(v, watcher_idx);
            let sref = watch.status_ref();
            let mut stat = self.ca.leq_status(sref);
            if stat.imply_type() != IMPLY_NONE {
                // already used for implication, skip this clause
                continue;
            }

            if sref.0 >= (1 << 30) {
                panic!("status ref addr too large");
            }

            let mut mod_log = LeqStatusModLog::new(fact_is_true ^ watch.sign(), sref);
            stat.incr(mod_log.is_true());
            self.ca.set_leq_status(sref, stat);

            let nr_true = stat.nr_true();
            let nr_false = stat.nr_decided() - nr_true;
            let bound_true = watch.bound_true();
            let bound_false = watch.bound_false();

            if nr_true + 1 < bound_true && nr_false + 1 < bound_false {
                // nothing can be implied in this case
                self.trail.leq_log.push(mod_log);
                continue;
            }

            let cref = watch.cref;
            debug_assert!(self.ca.is_leq(cref));
            let dst = self.ca.leq_dst(cref);
            let dst_val = self.value_lit(dst);
            if dst_val.is_not_undef() {
                // the truth value of the LEQ is known; try to imply lits
                if dst_val == LBool::True {
                    if nr_true >= bound_true {
                        // LEQ is false but dst is true
                        self.select_known_lits(cref, true, nr_true);
                        return self.leq_conflict(cref, sref, mod_log, true);
                    } else if nr_true == bound_true - 1 {
                        // all unknown lits must be false
                        if self.select_known_and_imply_unknown(cref, true, nr_true) {
                            self.leq_setup_imply(sref, &mut mod_log, true, IMPLY_LITS);
                        } else {
                            // log the newly found true lit (an unprocessed
                            // entry still in the queue), then conflict
                            let mut s = self.ca.leq_status(sref);
                            s.incr(true);
                            self.ca.set_leq_status(sref, s);
                            self.trail.leq_log.push(mod_log.with_is_true(true));
                            return self.leq_conflict(cref, sref, mod_log, true);
                        }
                    }
                } else {
                    debug_assert!(dst_val == LBool::False);
                    if nr_false >= bound_false {
                        // LEQ is true but dst is false
                        self.select_known_lits(cref, false, nr_false);
                        return self.leq_conflict(cref, sref, mod_log, false);
                    } else if nr_false == bound_false - 1 {
                        // all unknown lits must be true
                        if self.select_known_and_imply_unknown(cref, false, nr_false) {
                            self.leq_setup_imply(sref, &mut mod_log, false, IMPLY_LITS);
                        } else {
                            let mut s = self.ca.leq_status(sref);
                            s.incr(false);
                            self.ca.set_leq_status(sref, s);
                            self.trail.leq_log.push(mod_log.with_is_true(false));
                            return self.leq_conflict(cref, sref, mod_log, false);
                        }
                    }
                }
            } else {
                // dst is unknown, try to imply it
                if nr_true >= bound_true {
                    self.select_known_lits(cref, true, nr_true);
                    self.unchecked_enqueue(!dst, Some(cref));
                    self.leq_setup_imply(sref, &mut mod_log, true, IMPLY_DST);
                } else if nr_false >= bound_false {
                    self.select_known_lits(cref, false, nr_false);
                    self.unchecked_enqueue(dst, Some(cref));
                    self.leq_setup_imply(sref, &mut mod_log, false, IMPLY_DST);
                }
            }

            self.trail.leq_log.push(mod_log);
        }
        None
    }

    fn leq_setup_imply(
        &mut self,
        sref: CRef,
        mod_log: &mut LeqStatusModLog,
        precond_is_true: bool,
        imply_type: u32,
    ) {
        let mut s = self.ca.leq_status(sref);
        s.set_imply(precond_is_true, imply_type);
        self.ca.set_leq_status(sref, s);
        mod_log.set_imply_clear();
    }

    /// Record the conflict in the status cell and log, abandon the queue, and
    /// hand the clause back as the conflicting reason.
    fn leq_conflict(
        &mut self,
        cref: CRef,
        sref: CRef,
        mut mod_log: LeqStatusModLog,
        precond_is_true: bool,
    ) -> Option<CRef> {
        self.leq_setup_imply(sref, &mut mod_log, precond_is_true, IMPLY_CONFL);
        self.trail.leq_log.push(mod_log);
        self.trail.set_qhead_to_trail_head();
        Some(cref)
    }

    /// Partition the clause in place so its first `num` literals are the ones
    /// valued `sel_true`. The reordering persists in the arena; conflict
    /// analysis later reads the antecedent set straight off the prefix.
    fn select_known_lits(&mut self, cr: CRef, sel_true: bool, num: u32) {
        let mut i = 0;
        let mut j = self.ca.size(cr) - 1;
        while i < num {
            if self.value_lit(self.ca.lit(cr, i)).val_is(sel_true) {
                i += 1;
            } else {
                while self.value_lit(self.ca.lit(cr, j)).val_is(!sel_true) {
                    j -= 1;
                    debug_assert!(j > i);
                }
                self.ca.swap_lits(cr, i, j);
                j -= 1;
            }
        }
    }

    /// Like select_known_lits, but every unknown literal gets enqueued with
    /// this clause as its reason. If an extra already-`sel_true` literal turns
    /// up along the way (an unprocessed queue entry), the enqueues are
    /// unrolled and false is returned.
    fn select_known_and_imply_unknown(&mut self, cr: CRef, sel_true: bool, nr_known: u32) -> bool {
        let orig_top = self.trail.len();
        let mut i = 0i64;
        let mut j = self.ca.size(cr) as i64 - 1;
        // c[0..i] are on the known side, c[j+1..] are not
        while i <= j && i <= nr_known as i64 {
            let q = self.ca.lit(cr, i as u32);
            let val = self.value_lit(q);
            if val.is_not_undef() {
                if val.val_is(sel_true) {
                    i += 1;
                    continue;
                }
                // opposite side: shift it right
            } else {
                // unknown, inferred to be on the opposite side
                self.unchecked_enqueue(q ^ sel_true, Some(cr));
            }
            self.ca.swap_lits(cr, i as u32, j as u32);
            j -= 1;
        }
        if i > nr_known as i64 {
            debug_assert!(i == nr_known as i64 + 1);
            self.dequeue_until(orig_top);
            return false;
        }
        debug_assert!(i == j + 1 && i == nr_known as i64);
        true
    }

    /// Conflict analysis
    ///
    /// Walks the implication graph backwards from the conflict to the first
    /// UIP, producing an asserting clause (lit 0) and the backjump level.
    /// Antecedents of a LEQ reason are the partitioned prefix stashed by
    /// propagation, plus dst unless dst itself was the implied literal.
    fn analyze(&mut self, confl_in: CRef) -> (Vec<Lit>, DecisionLevel) {
        let mut path_c = 0i64;
        let mut p = L_UNDEF;
        let mut out_learnt = vec![L_UNDEF]; // room for the asserting literal
        let mut index = self.trail.len() - 1;
        let mut confl = Some(confl_in);

        loop {
            let cr = confl.expect("reason missing below the UIP");

            // Gather this reason's antecedents into scratch
            self.reason_lits.clear();
            if self.ca.is_leq(cr) {
                let status = self.ca.leq_status(self.ca.leq_status_ref(cr));
                debug_assert!(status.imply_type() != IMPLY_NONE);
                let is_true = status.precond_is_true();
                let n = if is_true {
                    status.nr_true()
                } else {
                    status.nr_false()
                };
                for i in 0..n {
                    self.reason_lits.push(self.ca.lit(cr, i) ^ is_true);
                }
                if status.imply_type() != IMPLY_DST {
                    self.reason_lits.push(self.ca.leq_dst(cr) ^ is_true);
                }
            } else {
                if self.ca.learnt(cr) {
                    self.cla_bump_activity(cr);
                }
                // lit 0 is the implied literal, except for the conflict itself
                let start = if p == L_UNDEF { 0 } else { 1 };
                for i in start..self.ca.size(cr) {
                    self.reason_lits.push(self.ca.lit(cr, i));
                }
            }

            for qi in 0..self.reason_lits.len() {
                let q = self.reason_lits[qi];
                if !self.seen[q.var_idx()] && self.level(q.var()) > 0 {
                    self.var_bump_activity(q.var());
                    self.seen[q.var_idx()] = true;
                    if self.level(q.var()) >= self.decision_level() {
                        // Current-level antecedents are counted, not stored;
                        // the trail walk below resolves them in order
                        path_c += 1;
                    } else {
                        out_learnt.push(q);
                    }
                }
            }

            // Select the next literal to look at
            while !self.seen[self.trail.get(index).var_idx()] {
                index -= 1;
            }
            p = self.trail.get(index);
            index = index.saturating_sub(1);
            confl = self.reasons[p.var_idx()].cref;
            self.seen[p.var_idx()] = false;
            path_c -= 1;

            if path_c <= 0 {
                break;
            }
        }
        out_learnt[0] = !p;

        // Minimize the conflict clause
        self.seen_to_clear.clear();
        for l in &out_learnt {
            self.seen_to_clear.push(l.var());
        }
        self.stats.max_literals += out_learnt.len() as u64;

        if self.conf.ccmin_mode == 2 {
            let mut abstract_levels = 0u64;
            for l in &out_learnt[1..] {
                abstract_levels |= self.abstract_level(l.var());
            }
            let mut j = 1;
            for i in 1..out_learnt.len() {
                let l = out_learnt[i];
                if self.reasons[l.var_idx()].cref.is_none()
                    || !self.lit_redundant(l, abstract_levels)
                {
                    out_learnt[j] = l;
                    j += 1;
                }
            }
            out_learnt.truncate(j);
        } else if self.conf.ccmin_mode == 1 {
            let mut j = 1;
            for i in 1..out_learnt.len() {
                let l = out_learnt[i];
                let keep = match self.reasons[l.var_idx()].cref {
                    None => true,
                    Some(cr) => {
                        if self.ca.is_leq(cr) {
                            panic!("ccmin_mode=1 with LEQ reason unimplemented");
                        }
                        let mut any = false;
                        for k in 1..self.ca.size(cr) {
                            let x = self.ca.lit(cr, k);
                            if !self.seen[x.var_idx()] && self.level(x.var()) > 0 {
                                any = true;
                                break;
                            }
                        }
                        any
                    }
                };
                if keep {
                    out_learnt[j] = l;
                    j += 1;
                }
            }
            out_learnt.truncate(j);
        }
        self.stats.tot_literals += out_learnt.len() as u64;

        // Find the backtrack level: the highest among the non-asserting lits,
        // whose literal gets swapped into slot 1
        let out_btlevel = if out_learnt.len() == 1 {
            0
        } else {
            let mut max_i = 1;
            for i in 2..out_learnt.len() {
                if self.level(out_learnt[i].var()) > self.level(out_learnt[max_i].var()) {
                    max_i = i;
                }
            }
            out_learnt.swap(1, max_i);
            self.level(out_learnt[1].var())
        };

        for i in 0..self.seen_to_clear.len() {
            self.seen[self.seen_to_clear[i] as usize] = false;
        }
        self.seen_to_clear.clear();

        debug!(
            "learnt {} (backjump to {})",
            vec_to_str(&out_learnt),
            out_btlevel
        );

        (out_learnt, out_btlevel)
    }

    fn abstract_level(&self, v: Var) -> u64 {
        1u64 << (self.level(v) & 63)
    }

    /// Check if `p` is implied by already-seen literals (possibly through
    /// intermediate reasons). `abstract_levels` aborts walks that reach a
    /// decision level no learnt literal lives on. Seen flags set by a
    /// successful probe persist; a failed probe rolls back to the snapshot.
    fn lit_redundant(&mut self, p: Lit, abstract_levels: u64) -> bool {
        self.analyze_stack.clear();
        self.analyze_stack.push(p);
        let top = self.seen_to_clear.len();

        while let Some(l) = self.analyze_stack.pop() {
            let cr = self.reasons[l.var_idx()]
                .cref
                .expect("redundancy probe hit a decision");

            self.reason_lits.clear();
            if self.ca.is_leq(cr) {
                let status = self.ca.leq_status(self.ca.leq_status_ref(cr));
                debug_assert!(status.imply_type() != IMPLY_NONE);
                let is_true = status.precond_is_true();
                let n = if is_true {
                    status.nr_true()
                } else {
                    status.nr_false()
                };
                for i in 0..n {
                    self.reason_lits.push(self.ca.lit(cr, i) ^ is_true);
                }
                if status.imply_type() != IMPLY_DST {
                    self.reason_lits.push(self.ca.leq_dst(cr) ^ is_true);
                }
            } else {
                for i in 1..self.ca.size(cr) {
                    self.reason_lits.push(self.ca.lit(cr, i));
                }
            }

            for qi in 0..self.reason_lits.len() {
                let q = self.reason_lits[qi];
                if !self.seen[q.var_idx()] && self.level(q.var()) > 0 {
                    if self.reasons[q.var_idx()].cref.is_some()
                        && (self.abstract_level(q.var()) & abstract_levels) != 0
                    {
                        self.seen[q.var_idx()] = true;
                        self.analyze_stack.push(q);
                        self.seen_to_clear.push(q.var());
                    } else {
                        // the walk escaped: q cannot be implied away
                        for i in top..self.seen_to_clear.len() {
                            self.seen[self.seen_to_clear[i] as usize] = false;
                        }
                        self.seen_to_clear.truncate(top);
                        return false;
                    }
                }
            }
        }

        // seen flags stay set: every visited lit is itself redundant and can
        // block later probes
        true
    }

    /// Express the final conflict in terms of the assumptions that forced
    /// `p`; fills `conflict` with their negations.
    fn analyze_final(&mut self, p: Lit) {
        self.conflict.clear();
        self.conflict.push(p);

        if self.decision_level() == 0 {
            return;
        }
        self.seen[p.var_idx()] = true;

        let bottom = self.trail.sep(0).lit;
        for i in (bottom..self.trail.len()).rev() {
            let x = self.trail.get(i);
            let xi = x.var_idx();
            if self.seen[xi] {
                match self.reasons[xi].cref {
                    None => {
                        debug_assert!(self.level(x.var()) > 0);
                        self.conflict.push(!x);
                    }
                    Some(cr) => {
                        if self.ca.is_leq(cr) {
                            panic!("assumption analysis through a LEQ reason unimplemented");
                        }
                        for j in 1..self.ca.size(cr) {
                            let q = self.ca.lit(cr, j);
                            if self.level(q.var()) > 0 {
                                self.seen[q.var_idx()] = true;
                            }
                        }
                    }
                }
                self.seen[xi] = false;
            }
        }

        self.seen[p.var_idx()] = false;
    }

    /// Decision heuristics
    ///
    /// Puts a variable back into the decision order if eligible.
    fn insert_var_order(&mut self, v: Var) {
        if self.decision[v as usize] && !self.act_heap.contains_key(&v) {
            let key = (self.acts[v as usize], Reverse(v));
            self.act_heap.push(v, key);
        }
    }

    fn var_bump_activity(&mut self, v: Var) {
        let idx = v as usize;
        self.acts[idx] = F64::from(self.acts[idx].into_inner() + self.var_inc);
        if self.acts[idx].into_inner() > VAR_RESCALE_LIM {
            debug!("rescaling variable activities");
            for a in &mut self.acts {
                *a = F64::from(a.into_inner() * VAR_RESCALE_F);
            }
            self.var_inc *= VAR_RESCALE_F;
            self.rebuild_order_heap();
        }
        // Update in place if it is sitting in the heap
        if let Some(mut key) = self.act_heap.get_mut(&v) {
            *key = (self.acts[idx], Reverse(v));
        }
    }

    fn var_decay_activity(&mut self) {
        self.var_inc *= 1.0 / self.conf.var_decay;
    }

    fn cla_bump_activity(&mut self, cr: CRef) {
        let act = self.ca.activity(cr) + self.cla_inc as f32;
        self.ca.set_activity(cr, act);
        if act > CLA_RESCALE_LIM {
            debug!("rescaling clause activities");
            for i in 0..self.learnts.len() {
                let l = self.learnts[i];
                let a = self.ca.activity(l);
                self.ca.set_activity(l, a * CLA_RESCALE_F);
            }
            self.cla_inc *= CLA_RESCALE_F as f64;
        }
    }

    fn cla_decay_activity(&mut self) {
        self.cla_inc *= 1.0 / self.conf.clause_decay;
    }

    fn rebuild_order_heap(&mut self) {
        let n = self.n_vars();
        let mut heap = BinaryHeap::with_capacity(n);
        for v in 0..n {
            if self.decision[v] && self.assigned[v] == LBool::Undef {
                heap.push(v as Var, (self.acts[v], Reverse(v as Var)));
            }
        }
        self.act_heap = heap;
    }

    /// Next branching literal, or L_UNDEF when every decision variable is
    /// assigned (the model is complete).
    fn pick_branch_lit(&mut self) -> Lit {
        let mut next = V_UNDEF;

        // Random decision
        if self.conf.random_var_freq > 0.0
            && !self.act_heap.is_empty()
            && self.rng.gen::<f64>() < self.conf.random_var_freq
        {
            next = self.rng.gen_range(0..self.n_vars() as Var);
            if self.value(next) == LBool::Undef && self.decision[next as usize] {
                self.stats.rnd_decisions += 1;
            }
        }

        // Activity based decision
        while next == V_UNDEF || self.value(next) != LBool::Undef || !self.decision[next as usize]
        {
            if self.act_heap.is_empty() {
                next = V_UNDEF;
                break;
            }
            next = self.act_heap.pop_with_key().unwrap().0;
        }

        if next == V_UNDEF {
            L_UNDEF
        } else {
            let pol = if self.conf.rnd_pol {
                self.rng.gen::<bool>()
            } else {
                self.polarity[next as usize]
            };
            Lit::new(next, pol)
        }
    }

    /// Clause database maintenance
    ///
    /// Remove roughly half the learnt clauses, keeping binaries and any
    /// clause locked in as a reason.
    fn reduce_db(&mut self) {
        let extra_lim = self.cla_inc / self.learnts.len() as f64;

        let ca = &self.ca;
        self.learnts.sort_by(|&x, &y| {
            if reduce_db_lt(ca, x, y) {
                CmpOrdering::Less
            } else if reduce_db_lt(ca, y, x) {
                CmpOrdering::Greater
            } else {
                CmpOrdering::Equal
            }
        });

        let n_before = self.learnts.len();
        let half = n_before / 2;
        let mut j = 0;
        for i in 0..self.learnts.len() {
            let cr = self.learnts[i];
            if self.ca.size(cr) > 2
                && !self.locked_disj(cr)
                && (i < half || (self.ca.activity(cr) as f64) < extra_lim)
            {
                self.remove_clause(cr);
            } else {
                self.learnts[j] = cr;
                j += 1;
            }
        }
        self.learnts.truncate(j);
        debug!("reduceDB: {} -> {} learnts", n_before, j);
        self.check_garbage();
    }

    fn remove_satisfied_learnts(&mut self) {
        let mut j = 0;
        for i in 0..self.learnts.len() {
            let cr = self.learnts[i];
            if self.satisfied(cr) {
                self.remove_clause(cr);
            } else {
                self.learnts[j] = cr;
                j += 1;
            }
        }
        self.learnts.truncate(j);
    }

    fn remove_satisfied_clauses(&mut self) {
        let mut j = 0;
        for i in 0..self.clauses.len() {
            let cr = self.clauses[i];
            if self.satisfied(cr) {
                self.remove_clause(cr);
            } else {
                self.clauses[j] = cr;
                j += 1;
            }
        }
        self.clauses.truncate(j);
    }

    /// Simplify the clause database at level 0 by dropping satisfied clauses.
    /// Returns false iff the formula is unsat.
    pub fn simplify(&mut self) -> bool {
        debug_assert!(self.decision_level() == 0);
        if !self.ok || self.propagate().is_some() {
            self.ok = false;
            return false;
        }

        if self.n_assigns() as i64 == self.simp_db_assigns || self.simp_db_props > 0 {
            return true;
        }

        self.remove_satisfied_learnts();
        if self.conf.remove_satisfied {
            self.remove_satisfied_clauses();
            // We never backtrack below level 0, so the log carries no
            // information; its status refs would also dangle across the
            // upcoming collection
            self.trail.leq_log.clear();
            self.leq_watches.clean_all(&self.ca);
        }
        self.check_garbage();
        self.rebuild_order_heap();

        self.simp_db_assigns = self.n_assigns() as i64;
        self.simp_db_props = (self.stats.clauses_literals + self.stats.learnts_literals) as i64;

        true
    }

    /// Search
    ///
    /// Look for a model within `nof_conflicts` conflicts (negative means no
    /// limit). Unknown when the budget runs out.
    fn search(&mut self, nof_conflicts: i64) -> SolveStatus {
        debug_assert!(self.ok);
        let mut conflict_c = 0i64;
        self.stats.starts += 1;

        loop {
            let confl = self.propagate();
            if let Some(confl) = confl {
                // CONFLICT
                self.stats.conflicts += 1;
                conflict_c += 1;
                if self.decision_level() == 0 {
                    return SolveStatus::Unsat;
                }

                let (learnt_clause, backtrack_level) = self.analyze(confl);
                self.cancel_until(backtrack_level);

                if learnt_clause.len() == 1 {
                    self.unchecked_enqueue(learnt_clause[0], None);
                } else {
                    let cr = self.ca.alloc(&learnt_clause, true);
                    self.learnts.push(cr);
                    self.attach_clause(cr);
                    self.cla_bump_activity(cr);
                    self.unchecked_enqueue(learnt_clause[0], Some(cr));
                }

                self.var_decay_activity();
                self.cla_decay_activity();

                self.learntsize_adjust_cnt -= 1;
                if self.learntsize_adjust_cnt == 0 {
                    self.learntsize_adjust_confl *= self.conf.learntsize_adjust_inc;
                    self.learntsize_adjust_cnt = self.learntsize_adjust_confl as i64;
                    self.max_learnts *= self.conf.learntsize_inc;

                    if self.conf.verbosity >= 1 {
                        info!(
                            "conflicts: {:>8} | clauses: {:>8} ({:>8} lits) | limit: {:>8.0} learnts: {:>8} | progress: {:.4}%",
                            self.stats.conflicts,
                            self.n_clauses(),
                            self.stats.clauses_literals,
                            self.max_learnts,
                            self.n_learnts(),
                            self.progress_estimate() * 100.0,
                        );
                    }
                }
            } else {
                // NO CONFLICT
                if (nof_conflicts >= 0 && conflict_c >= nof_conflicts) || !self.within_budget() {
                    // Reached the bound on the number of conflicts
                    self.progress_est = self.progress_estimate();
                    self.cancel_until(0);
                    return SolveStatus::Unknown;
                }

                // Simplify the set of problem clauses
                if self.decision_level() == 0 && !self.simplify() {
                    return SolveStatus::Unsat;
                }

                if self.learnts.len() as f64 - self.n_assigns() as f64 >= self.max_learnts {
                    // Reduce the set of learnt clauses
                    self.reduce_db();
                }

                let mut next = L_UNDEF;
                while (self.decision_level() as usize) < self.assumptions.len() {
                    // Perform user provided assumption
                    let p = self.assumptions[self.decision_level() as usize];
                    if self.value_lit(p) == LBool::True {
                        // Dummy decision level
                        self.trail.new_decision_level();
                    } else if self.value_lit(p) == LBool::False {
                        self.analyze_final(!p);
                        return SolveStatus::Unsat;
                    } else {
                        next = p;
                        break;
                    }
                }

                if next == L_UNDEF {
                    // New variable decision
                    self.stats.decisions += 1;
                    next = self.pick_branch_lit();
                    if next == L_UNDEF {
                        // Model found
                        return SolveStatus::Sat;
                    }
                    debug!("deciding {next}");
                }

                self.trail.new_decision_level();
                self.unchecked_enqueue(next, None);
            }
        }
    }

    fn progress_estimate(&self) -> f64 {
        let mut progress = 0.0;
        let f = 1.0 / self.n_vars() as f64;
        for i in 0..=self.decision_level() {
            let beg = if i == 0 { 0 } else { self.trail.sep(i - 1).lit };
            let end = if i == self.decision_level() {
                self.trail.len()
            } else {
                self.trail.sep(i).lit
            };
            progress += f.powi(i as i32) * (end - beg) as f64;
        }
        progress / self.n_vars() as f64
    }

    /// Main driver: restarts around `search` until an answer or an exhausted
    /// budget. Assumptions hold for this call only.
    pub fn solve(&mut self, assumps: &[Lit]) -> SolveStatus {
        self.model.clear();
        self.conflict.clear();
        self.assumptions = assumps.to_vec();
        if !self.ok {
            return SolveStatus::Unsat;
        }

        // Level-0 unit propagation first
        if !self.simplify() {
            return SolveStatus::Unsat;
        }

        self.stats.solves += 1;
        self.max_learnts = self.n_clauses() as f64 * self.conf.learntsize_factor;
        self.learntsize_adjust_confl = self.conf.learntsize_adjust_start;
        self.learntsize_adjust_cnt = self.learntsize_adjust_confl as i64;
        let mut status = SolveStatus::Unknown;

        if self.conf.verbosity >= 1 {
            info!(
                "solving: {} variables, {} clauses",
                self.n_vars(),
                self.n_clauses()
            );
        }

        let mut curr_restarts = 0u64;
        while status == SolveStatus::Unknown {
            let rest_base = if self.conf.luby_restart {
                luby(self.conf.restart_inc, curr_restarts)
            } else {
                self.conf.restart_inc.powi(curr_restarts as i32)
            };
            status = self.search((rest_base * self.conf.restart_first as f64) as i64);
            if !self.within_budget() {
                break;
            }
            curr_restarts += 1;
        }

        if self.conf.verbosity >= 1 {
            info!(
                "restarts: {}, conflicts: {}, decisions: {} ({} random), propagations: {}, conflict literals: {}",
                self.stats.starts,
                self.stats.conflicts,
                self.stats.decisions,
                self.stats.rnd_decisions,
                self.stats.propagations,
                self.stats.tot_literals,
            );
        }

        if status == SolveStatus::Sat {
            // Extend & copy model
            self.model = self.assigned.clone();
        } else if status == SolveStatus::Unsat && self.conflict.is_empty() {
            self.ok = false;
        }

        self.cancel_until(0);
        status
    }

    /// Garbage collection
    ///
    /// Rewrites every live CRef into a fresh arena: constraint clauses first
    /// (so LEQ clauses stay near the front), then the trail log's status refs
    /// through the forwarding words, then watchers, trail reasons, learnts.
    fn reloc_all(&mut self, to: &mut ClauseArena) {
        // Drop watchers of freed clauses before relocating the rest
        self.watches.clean_all(&self.ca);
        self.leq_watches.clean_all(&self.ca);

        for i in 0..self.clauses.len() {
            let mut cr = self.clauses[i];
            self.ca.reloc(&mut cr, to);
            self.clauses[i] = cr;
        }

        for i in 0..self.trail.leq_log.len() {
            let old_sref = self.trail.leq_log[i].status_ref();
            let new_cr = CRef(self.ca.word(old_sref));
            let new_sref = to.leq_status_ref(new_cr);
            self.trail.leq_log[i].set_status_ref(new_sref);
        }

        for v in 0..self.n_vars() {
            for s in 0..2 {
                let p = Lit::new(v as Var, s != 0);
                let ws = self.watches.get_watchers(p);
                for w in ws.iter_mut() {
                    self.ca.reloc(&mut w.cref, to);
                }
            }
            let lws = self.leq_watches.watchers_mut(v as Var);
            for w in lws.iter_mut() {
                self.ca.reloc(&mut w.cref, to);
            }
        }

        // Reasons are only meaningful for trail variables
        for i in 0..self.trail.len() {
            let vi = self.trail.get(i).var_idx();
            if let Some(r) = self.reasons[vi].cref {
                let mut cr = r;
                self.ca.reloc(&mut cr, to);
                self.reasons[vi].cref = Some(cr);
            }
        }

        for i in 0..self.learnts.len() {
            let mut cr = self.learnts[i];
            self.ca.reloc(&mut cr, to);
            self.learnts[i] = cr;
        }
    }

    pub fn garbage_collect(&mut self) {
        // Size the next region from the estimated utilization to avoid
        // immediate regrowth
        let mut to = ClauseArena::with_capacity(self.ca.len() - self.ca.wasted());
        self.reloc_all(&mut to);
        if self.conf.verbosity >= 2 {
            info!(
                "garbage collection: {} words -> {} words",
                self.ca.len(),
                to.len()
            );
        }
        self.ca = to;
    }

    fn check_garbage(&mut self) {
        if self.ca.garbage_over(self.conf.garbage_frac) {
            self.garbage_collect();
        }
    }

    pub fn wasted(&self) -> u32 {
        self.ca.wasted()
    }

    /// DIMACS output
    ///
    /// Writes the non-satisfied clauses (LEQ clauses in the inequality
    /// extension syntax), with the root-level facts and the assumptions as
    /// unit clauses, compacting variable numbers. Root facts must be kept:
    /// disjunctions apply them through literal pruning, but a LEQ clause
    /// whose dst is already fixed would silently lose the reification.
    pub fn to_dimacs<W: Write>(&self, out: &mut W, assumps: &[Lit]) -> io::Result<()> {
        if !self.ok {
            return write!(out, "p cnf 1 2\n1 0\n-1 0\n");
        }

        let mut map: FxHashMap<Var, Var> = FxHashMap::default();
        let mut max: Var = 0;

        let live = self
            .clauses
            .iter()
            .copied()
            .filter(|&cr| !self.satisfied(cr))
            .collect::<Vec<_>>();

        let root_end = if self.decision_level() == 0 {
            self.trail.len()
        } else {
            self.trail.sep(0).lit
        };

        for &cr in &live {
            for i in 0..self.ca.size(cr) {
                let l = self.ca.lit(cr, i);
                if self.ca.is_leq(cr) || self.value_lit(l) != LBool::False {
                    map_var(&mut map, &mut max, l.var());
                }
            }
            if self.ca.is_leq(cr) {
                map_var(&mut map, &mut max, self.ca.leq_dst(cr).var());
            }
        }
        for i in 0..root_end {
            map_var(&mut map, &mut max, self.trail.get(i).var());
        }
        for &a in assumps {
            map_var(&mut map, &mut max, a.var());
        }

        writeln!(
            out,
            "p cnf {} {}",
            max,
            live.len() + root_end + assumps.len()
        )?;

        for i in 0..root_end {
            writeln!(out, "{} 0", dimacs_lit(&mut map, &mut max, self.trail.get(i)))?;
        }
        for &a in assumps {
            debug_assert!(self.value_lit(a) != LBool::False);
            writeln!(out, "{} 0", dimacs_lit(&mut map, &mut max, a))?;
        }

        for &cr in &live {
            if self.ca.is_leq(cr) {
                for i in 0..self.ca.size(cr) {
                    write!(
                        out,
                        "{} ",
                        dimacs_lit(&mut map, &mut max, self.ca.lit(cr, i))
                    )?;
                }
                writeln!(
                    out,
                    "<= {} # {}",
                    self.ca.leq_bound(cr),
                    dimacs_lit(&mut map, &mut max, self.ca.leq_dst(cr))
                )?;
            } else {
                for i in 0..self.ca.size(cr) {
                    let l = self.ca.lit(cr, i);
                    if self.value_lit(l) != LBool::False {
                        write!(out, "{} ", dimacs_lit(&mut map, &mut max, l))?;
                    }
                }
                writeln!(out, "0")?;
            }
        }
        Ok(())
    }
}

impl Default for CDCLSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

/// The reduceDB order: worst clauses first. Asymmetric on purpose (binary
/// clauses sort as good regardless of activity); ties among binaries are
/// unordered.
fn reduce_db_lt(ca: &ClauseArena, x: CRef, y: CRef) -> bool {
    ca.size(x) > 2 && (ca.size(y) == 2 || ca.activity(x) < ca.activity(y))
}

fn map_var(map: &mut FxHashMap<Var, Var>, max: &mut Var, v: Var) -> Var {
    *map.entry(v).or_insert_with(|| {
        let m = *max;
        *max += 1;
        m
    })
}

fn dimacs_lit(map: &mut FxHashMap<Var, Var>, max: &mut Var, l: Lit) -> String {
    let v = map_var(map, max, l.var()) + 1;
    format!("{}{}", if l.sign() { "-" } else { "" }, v)
}

/*
  Finite subsequences of the Luby-sequence:

  0: 1
  1: 1 1 2
  2: 1 1 2 1 1 2 4
  3: 1 1 2 1 1 2 4 1 1 2 1 1 2 4 8
  ...
 */
pub fn luby(y: f64, mut x: u64) -> f64 {
    // Find the finite subsequence that contains index x, and its size
    let mut size = 1u64;
    let mut seq = 0i32;
    while size < x + 1 {
        seq += 1;
        size = 2 * size + 1;
    }

    while size - 1 != x {
        size = (size - 1) >> 1;
        seq -= 1;
        x %= size;
    }

    y.powi(seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luby_prefix() {
        let got = (0..15).map(|i| luby(2.0, i) as u64).collect::<Vec<_>>();
        assert_eq!(got, vec![1, 1, 2, 1, 1, 2, 4, 1, 1, 2, 1, 1, 2, 4, 8]);
    }

    #[test]
    fn add_clause_canonicalizes() {
        let mut s = CDCLSolver::default();
        let a = s.new_var_default();
        let b = s.new_var_default();
        // tautology: accepted, nothing stored
        assert!(s.add_clause(&[Lit::new(a, false), Lit::new(a, true), Lit::new(b, false)]));
        assert_eq!(s.n_clauses(), 0);
        // duplicate literal collapses into a binary clause
        assert!(s.add_clause(&[Lit::new(a, false), Lit::new(a, false), Lit::new(b, false)]));
        assert_eq!(s.n_clauses(), 1);
    }

    #[test]
    fn unit_propagates_on_add() {
        let mut s = CDCLSolver::default();
        let a = s.new_var_default();
        let b = s.new_var_default();
        assert!(s.add_clause(&[Lit::new(a, false)]));
        assert_eq!(s.value(a), LBool::True);
        assert!(s.add_clause(&[Lit::new(a, true), Lit::new(b, false)]));
        assert_eq!(s.value(b), LBool::True);
    }

    #[test]
    fn leq_pair_collapse() {
        // an x/!x pair always contributes exactly one true literal
        let mut s = CDCLSolver::default();
        let a = s.new_var_default();
        let d = s.new_var_default();
        // a + !a <= 0 can never hold, so dst is forced false
        assert!(s.add_leq_assign(
            &[Lit::new(a, false), Lit::new(a, true)],
            0,
            Lit::new(d, false)
        ));
        assert_eq!(s.value(d), LBool::False);
    }

    #[test]
    fn leq_degenerate_bounds() {
        let mut s = CDCLSolver::default();
        let a = s.new_var_default();
        let b = s.new_var_default();
        let d1 = s.new_var_default();
        let d2 = s.new_var_default();
        // bound >= size: dst forced true
        assert!(s.add_leq_assign(
            &[Lit::new(a, false), Lit::new(b, false)],
            2,
            Lit::new(d1, false)
        ));
        assert_eq!(s.value(d1), LBool::True);
        // negative bound: dst forced false
        assert!(s.add_leq_assign(
            &[Lit::new(a, false), Lit::new(b, false)],
            -1,
            Lit::new(d2, false)
        ));
        assert_eq!(s.value(d2), LBool::False);
    }
}
