pub mod dimacs;
pub mod solver;

pub use solver::cdcl_solver::CDCLSolver;
pub use solver::config::SolverConfig;
pub use solver::types::{LBool, Lit, SolveStatus, Var};
