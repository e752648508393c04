use std::fs::File;
use std::io::BufWriter;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use log::info;

use cardsat::dimacs::parser::DimacsParser;
use cardsat::solver::{
    cdcl_solver::CDCLSolver,
    config::SolverConfig,
    types::{LBool, Lit, SolveStatus},
};

#[derive(Parser, Debug)]
#[command(version, about = "CDCL SAT solver with native cardinality constraints", long_about = None)]
pub struct Args {
    /// File path of the DIMACS instance to solve
    pub path: String,

    /// Diagnostic verbosity (0=silent, 1=progress, 2=chatty)
    #[arg(short, long, default_value_t = 0)]
    pub verbosity: u32,

    /// Use geometric restarts instead of the Luby sequence
    #[arg(long)]
    pub no_luby: bool,

    /// Frequency of random variable decisions
    #[arg(long, default_value_t = 0.0)]
    pub rnd_freq: f64,

    /// Seed for the decision RNG
    #[arg(long, default_value_t = 92702102)]
    pub rnd_seed: u64,

    /// Randomize decision polarity
    #[arg(long)]
    pub rnd_pol: bool,

    /// Jitter initial variable activities
    #[arg(long)]
    pub rnd_init_act: bool,

    /// Conflict clause minimization mode (0=none, 1=basic, 2=deep)
    #[arg(long, default_value_t = 2)]
    pub ccmin_mode: u32,

    /// Phase saving level (0=none, 1=limited, 2=full)
    #[arg(long, default_value_t = 2)]
    pub phase_saving: u32,

    /// Wasted-memory fraction tolerated before garbage collection
    #[arg(long, default_value_t = 0.2)]
    pub gc_frac: f64,

    /// Base restart interval, in conflicts
    #[arg(long, default_value_t = 100)]
    pub rfirst: u32,

    /// Restart interval growth factor
    #[arg(long, default_value_t = 2.0)]
    pub rinc: f64,

    /// Variable activity decay factor
    #[arg(long, default_value_t = 0.95)]
    pub var_decay: f64,

    /// Clause activity decay factor
    #[arg(long, default_value_t = 0.999)]
    pub cla_decay: f64,

    /// Keep satisfied constraint clauses during simplification
    #[arg(long)]
    pub no_remove_satisfied: bool,

    /// Stop after this many conflicts (negative = unbounded)
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub conf_budget: i64,

    /// Also write the current instance in DIMACS form to this path
    #[arg(long)]
    pub dimacs: Option<String>,

    /// Suppress the model line on SAT
    #[arg(long)]
    pub no_model: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let conf = SolverConfig {
        verbosity: args.verbosity,
        var_decay: args.var_decay,
        clause_decay: args.cla_decay,
        random_var_freq: args.rnd_freq,
        random_seed: args.rnd_seed,
        rnd_pol: args.rnd_pol,
        rnd_init_act: args.rnd_init_act,
        ccmin_mode: args.ccmin_mode,
        phase_saving: args.phase_saving,
        luby_restart: !args.no_luby,
        restart_first: args.rfirst,
        restart_inc: args.rinc,
        garbage_frac: args.gc_frac,
        remove_satisfied: !args.no_remove_satisfied,
        ..SolverConfig::default()
    };

    let mut solver = CDCLSolver::new(conf);

    let parser = match DimacsParser::open(&args.path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("I/O ERROR: {e:#}");
            return ExitCode::from(1);
        }
    };
    if let Err(e) = parser.parse_into(&mut solver) {
        eprintln!("PARSE ERROR: {e:#}");
        return ExitCode::from(3);
    }

    if args.conf_budget >= 0 {
        solver.set_conf_budget(args.conf_budget);
    }

    info!("starting solve attempt on {}", args.path);
    let start = Instant::now();
    let status = solver.solve(&[]);
    info!("solved in {:#?}", start.elapsed());

    if let Some(path) = &args.dimacs {
        let write = File::create(path).map(BufWriter::new).and_then(|mut w| {
            solver.to_dimacs(&mut w, &[])
        });
        if let Err(e) = write {
            eprintln!("I/O ERROR: {e}");
            return ExitCode::from(1);
        }
    }

    match status {
        SolveStatus::Sat => {
            println!("s SATISFIABLE");
            if !args.no_model {
                let mut line = String::from("v");
                for (v, val) in solver.model().iter().enumerate() {
                    line.push(' ');
                    line.push_str(&Lit::new(v as i32, *val == LBool::False).to_string());
                }
                line.push_str(" 0");
                println!("{line}");
            }
            ExitCode::from(10)
        }
        SolveStatus::Unsat => {
            println!("s UNSATISFIABLE");
            ExitCode::from(20)
        }
        SolveStatus::Unknown => {
            println!("s UNKNOWN");
            ExitCode::from(0)
        }
    }
}
