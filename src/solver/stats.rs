#[derive(Clone, Debug, Default)]
pub struct RuntimeStats {
    /// Record total (i.e. monotonically increasing) number of:
    /// - solves: number of solve attempts.
    /// - starts: number of (re)starts.
    /// - decisions: number of decisions made.
    /// - rnd_decisions: number of random decisions made.
    /// - propagations: number of propagations made.
    /// - conflicts: number of conflicts that occurred.
    pub solves: u64,
    pub starts: u64,
    pub decisions: u64,
    pub rnd_decisions: u64,
    pub propagations: u64,
    pub conflicts: u64,

    /// Record current values of:
    /// - dec_vars: number of decision-eligible variables
    /// - clauses_literals: lits in constraint clauses (LEQ counts dst too)
    /// - learnts_literals: lits in learnt clauses
    /// - max_literals / tot_literals: learnt lits before/after minimization
    pub dec_vars: u64,
    pub clauses_literals: u64,
    pub learnts_literals: u64,
    pub max_literals: u64,
    pub tot_literals: u64,
}
