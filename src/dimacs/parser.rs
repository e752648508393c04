use anyhow::{bail, Context, Result};
use log::{debug, warn};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::solver::cdcl_solver::CDCLSolver;
use crate::solver::types::Lit;

/// DIMACS-CNF reader with the cardinality extension: a constraint line may
/// end in `<=k #d` or `>=k #d` instead of the terminating 0, reifying the
/// bound into destination literal d. Variables are created on demand.
pub struct DimacsParser<R> {
    reader: R,
}

impl DimacsParser<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file =
            File::open(&path).with_context(|| format!("opening {}", path.as_ref().display()))?;
        Ok(Self {
            reader: BufReader::new(file),
        })
    }
}

impl<R: BufRead> DimacsParser<R> {
    pub fn from_reader(reader: R) -> Self {
        Self { reader }
    }

    // Parses the stream, feeding constraints into the solver as they appear.
    pub fn parse_into(self, solver: &mut CDCLSolver) -> Result<()> {
        let mut header: Option<(usize, usize)> = None;
        let mut n_constraints = 0usize;

        for line in self.reader.lines() {
            let line = line.context("reading DIMACS input")?;
            let tokens = line.split_whitespace().collect::<Vec<_>>();
            // Skip blanks and comments
            if tokens.is_empty() || tokens[0].starts_with('c') {
                continue;
            }
            if tokens[0] == "p" {
                if tokens.len() != 4 || tokens[1] != "cnf" {
                    bail!("malformed problem line: {line}");
                }
                let vars = tokens[2].parse::<usize>().context("header variable count")?;
                let clauses = tokens[3].parse::<usize>().context("header clause count")?;
                header = Some((vars, clauses));
                continue;
            }
            n_constraints += 1;
            read_constraint(&tokens, solver).with_context(|| format!("in line: {line}"))?;
        }

        // Header mismatches are advisory; we solve what we actually saw
        match header {
            None => warn!("no problem header line in DIMACS input"),
            Some((vars, clauses)) => {
                if vars != solver.n_vars() {
                    warn!(
                        "DIMACS header mismatch: {} variables declared, {} seen",
                        vars,
                        solver.n_vars()
                    );
                }
                if clauses != n_constraints {
                    warn!(
                        "DIMACS header mismatch: {} clauses declared, {} seen",
                        clauses, n_constraints
                    );
                }
            }
        }
        debug!("parsed {} constraints", n_constraints);

        Ok(())
    }
}

/// One constraint line: either signed literals terminated by 0, or leading
/// literals followed by an inequality tail.
fn read_constraint(tokens: &[&str], solver: &mut CDCLSolver) -> Result<()> {
    let mut lits = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i];

        if tok.starts_with("<=") || tok.starts_with(">=") {
            return read_inequality_tail(tokens, i, &lits, solver);
        }

        let n = tok
            .parse::<i64>()
            .with_context(|| format!("bad literal token {tok:?}"))?;
        if n == 0 {
            if i != tokens.len() - 1 {
                bail!("tokens after clause terminator");
            }
            solver.add_clause_vec(lits);
            return Ok(());
        }
        lits.push(lit_from_dimacs(solver, n));
        i += 1;
    }
    bail!("clause line missing terminator")
}

fn read_inequality_tail(
    tokens: &[&str],
    at: usize,
    lits: &[Lit],
    solver: &mut CDCLSolver,
) -> Result<()> {
    let op = &tokens[at][..2];
    let rest = &tokens[at][2..];

    // The bound may be glued to the operator or stand alone
    let (bound_str, mut next) = if rest.is_empty() {
        let t = *tokens
            .get(at + 1)
            .context("missing bound after inequality operator")?;
        (t, at + 2)
    } else {
        (rest, at + 1)
    };
    let bound = bound_str
        .parse::<i32>()
        .with_context(|| format!("bad inequality bound {bound_str:?}"))?;

    // Likewise for '#' and the destination literal
    let t = *tokens
        .get(next)
        .context("missing '#' in inequality constraint")?;
    let dst_str = if t == "#" {
        next += 1;
        *tokens.get(next).context("missing destination literal")?
    } else if let Some(r) = t.strip_prefix('#') {
        r
    } else {
        bail!("expected '#' in inequality constraint, got {t:?}");
    };
    if next != tokens.len() - 1 {
        bail!("tokens after inequality constraint");
    }
    let dst_n = dst_str
        .parse::<i64>()
        .with_context(|| format!("bad destination literal {dst_str:?}"))?;
    if dst_n == 0 {
        bail!("destination literal cannot be 0");
    }
    let dst = lit_from_dimacs(solver, dst_n);

    if op == "<=" {
        solver.add_leq_assign(lits, bound, dst);
    } else {
        solver.add_geq_assign(lits, bound, dst);
    }
    Ok(())
}

/// 1-based signed DIMACS literal to internal representation, growing the
/// variable table as needed.
fn lit_from_dimacs(solver: &mut CDCLSolver, n: i64) -> Lit {
    let var = (n.unsigned_abs() - 1) as i32;
    while var >= solver.n_vars() as i32 {
        solver.new_var_default();
    }
    Lit::new(var, n < 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::types::{LBool, SolveStatus};
    use std::io::Cursor;

    fn parse(text: &str) -> CDCLSolver {
        let mut s = CDCLSolver::default();
        DimacsParser::from_reader(Cursor::new(text))
            .parse_into(&mut s)
            .unwrap();
        s
    }

    #[test]
    fn parses_plain_cnf() {
        let mut s = parse("c comment\np cnf 3 2\n1 -2 0\n2 3 0\n");
        assert_eq!(s.n_vars(), 3);
        assert_eq!(s.solve(&[]), SolveStatus::Sat);
    }

    #[test]
    fn parses_inequality_lines() {
        let mut s = parse("p cnf 4 2\n1 2 3 <= 1 # 4\n4 0\n");
        assert_eq!(s.n_vars(), 4);
        assert_eq!(s.solve(&[]), SolveStatus::Sat);
        // dst is unit-true, so at most one of 1..3 is true
        let n_true = (0..3)
            .filter(|&v| s.model()[v as usize] == LBool::True)
            .count();
        assert!(n_true <= 1);
    }

    #[test]
    fn parses_glued_inequality() {
        let mut s = parse("p cnf 3 1\n1 2 >=1 #3\n");
        assert_eq!(s.n_vars(), 3);
        assert_eq!(s.solve(&[]), SolveStatus::Sat);
    }

    #[test]
    fn rejects_garbage() {
        let mut s = CDCLSolver::default();
        let r = DimacsParser::from_reader(Cursor::new("p cnf 1 1\n1 x 0\n")).parse_into(&mut s);
        assert!(r.is_err());
    }

    #[test]
    fn rejects_missing_terminator() {
        let mut s = CDCLSolver::default();
        let r = DimacsParser::from_reader(Cursor::new("p cnf 2 1\n1 2\n")).parse_into(&mut s);
        assert!(r.is_err());
    }
}
