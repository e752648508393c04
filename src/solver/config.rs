/// Tunables for the solver, mirroring the classic MiniSat option set plus the
/// garbage collector's threshold. Activity rescale limits are fixed companions
/// of the decay factors rather than options.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// Diagnostic chattiness; the engine stays silent at 0.
    pub verbosity: u32,

    /// The variable activity decay factor.
    pub var_decay: f64,
    /// The clause activity decay factor.
    pub clause_decay: f64,

    /// Frequency with which the decision heuristic tries a random variable.
    pub random_var_freq: f64,
    /// Seed for the solver-owned RNG.
    pub random_seed: u64,
    /// Randomize the polarity of decisions.
    pub rnd_pol: bool,
    /// Jitter initial variable activities.
    pub rnd_init_act: bool,

    /// Conflict clause minimization mode (0=none, 1=basic, 2=deep).
    pub ccmin_mode: u32,
    /// Phase saving level (0=none, 1=limited, 2=full).
    pub phase_saving: u32,

    /// Use the Luby restart sequence rather than geometric restarts.
    pub luby_restart: bool,
    /// The base restart interval, in conflicts.
    pub restart_first: u32,
    /// Restart interval increase factor.
    pub restart_inc: f64,

    /// Fraction of wasted arena memory tolerated before collecting.
    pub garbage_frac: f64,

    /// Whether simplify may drop satisfied constraint clauses.
    pub remove_satisfied: bool,

    /// Initial learnt-clause budget as a fraction of the clause count.
    pub learntsize_factor: f64,
    /// Growth factor applied to the learnt budget at each adjustment.
    pub learntsize_inc: f64,
    /// Conflicts before the first budget adjustment.
    pub learntsize_adjust_start: f64,
    /// Growth factor for the adjustment interval itself.
    pub learntsize_adjust_inc: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,

            var_decay: 0.95,
            clause_decay: 0.999,

            random_var_freq: 0.0,
            random_seed: 92702102,
            rnd_pol: false,
            rnd_init_act: false,

            ccmin_mode: 2,
            phase_saving: 2,

            luby_restart: true,
            restart_first: 100,
            restart_inc: 2.0,

            garbage_frac: 0.20,

            remove_satisfied: true,

            learntsize_factor: 1.0 / 3.0,
            learntsize_inc: 1.1,
            learntsize_adjust_start: 100.0,
            learntsize_adjust_inc: 1.5,
        }
    }
}

/// Variable activities rescale once any crosses this.
pub const VAR_RESCALE_LIM: f64 = 1e100;
pub const VAR_RESCALE_F: f64 = 1e-100;

/// Clause activities are f32s in the arena, so they rescale much earlier.
pub const CLA_RESCALE_LIM: f32 = 1e20;
pub const CLA_RESCALE_F: f32 = 1e-20;
