use std::io::Cursor;

use cardsat::dimacs::parser::DimacsParser;
use cardsat::{CDCLSolver, LBool, Lit, SolveStatus, SolverConfig};

/// 1-based signed literal, DIMACS style.
fn lit(n: i32) -> Lit {
    assert!(n != 0);
    Lit::new(n.abs() - 1, n < 0)
}

fn ensure_vars(s: &mut CDCLSolver, n: usize) {
    while s.n_vars() < n {
        s.new_var_default();
    }
}

/// Pigeonhole instance built from reified at-most-one constraints: every
/// pigeon sits somewhere, no hole takes two. Unsat iff pigeons > holes.
/// Variable x(i,j) = pigeon i in hole j; one extra var is forced true and
/// reused as every constraint's destination.
fn build_pigeonhole(s: &mut CDCLSolver, pigeons: usize, holes: usize) {
    let x = |i: usize, j: usize| Lit::new((i * holes + j) as i32, false);
    ensure_vars(s, pigeons * holes + 1);
    let top = Lit::new((pigeons * holes) as i32, false);
    assert!(s.add_clause(&[top]));

    for j in 0..holes {
        let column = (0..pigeons).map(|i| x(i, j)).collect::<Vec<_>>();
        assert!(s.add_leq_assign(&column, 1, top));
    }
    for i in 0..pigeons {
        let row = (0..holes).map(|j| x(i, j)).collect::<Vec<_>>();
        assert!(s.add_clause(&row));
    }
}

fn count_true(s: &CDCLSolver, lits: &[Lit]) -> usize {
    lits.iter()
        .filter(|&&l| s.model_value(l) == LBool::True)
        .count()
}

#[test]
fn unit_propagation_chain() {
    let mut s = CDCLSolver::default();
    ensure_vars(&mut s, 3);
    assert!(s.add_clause(&[lit(1)]));
    assert!(s.add_clause(&[lit(-1), lit(2)]));
    assert!(s.add_clause(&[lit(-2), lit(3)]));
    assert_eq!(s.solve(&[]), SolveStatus::Sat);
    assert_eq!(s.model(), &[LBool::True, LBool::True, LBool::True]);
}

#[test]
fn trivial_unsat() {
    let mut s = CDCLSolver::default();
    ensure_vars(&mut s, 1);
    assert!(s.add_clause(&[lit(1)]));
    assert!(!s.add_clause(&[lit(-1)]));
    assert_eq!(s.solve(&[]), SolveStatus::Unsat);
    // soft unsat: everything after keeps answering Unsat without work
    assert!(!s.okay());
    assert!(!s.add_clause(&[lit(1)]));
    assert_eq!(s.solve(&[]), SolveStatus::Unsat);
}

#[test]
fn pigeonhole_three_in_two() {
    let mut s = CDCLSolver::default();
    build_pigeonhole(&mut s, 3, 2);
    assert_eq!(s.solve(&[]), SolveStatus::Unsat);
}

#[test]
fn pigeonhole_three_in_three_is_sat() {
    let mut s = CDCLSolver::default();
    build_pigeonhole(&mut s, 3, 3);
    assert_eq!(s.solve(&[]), SolveStatus::Sat);
    // the model really is a matching
    for i in 0..3 {
        let row = (0..3)
            .map(|j| Lit::new((i * 3 + j) as i32, false))
            .collect::<Vec<_>>();
        assert!(count_true(&s, &row) >= 1);
    }
    for j in 0..3 {
        let col = (0..3)
            .map(|i| Lit::new((i * 3 + j) as i32, false))
            .collect::<Vec<_>>();
        assert!(count_true(&s, &col) <= 1);
    }
}

#[test]
fn pigeonhole_five_in_four_learns_through_leq() {
    // big enough to force real conflict analysis through LEQ reasons
    let mut s = CDCLSolver::default();
    build_pigeonhole(&mut s, 5, 4);
    assert_eq!(s.solve(&[]), SolveStatus::Unsat);
    assert!(s.stats().conflicts > 0);
}

#[test]
fn reified_leq_both_phases() {
    let mut s = CDCLSolver::default();
    ensure_vars(&mut s, 5);
    let xs = [lit(1), lit(2), lit(3), lit(4)];
    assert!(s.add_leq_assign(&xs, 2, lit(5)));

    assert_eq!(s.solve(&[lit(5)]), SolveStatus::Sat);
    assert!(count_true(&s, &xs) <= 2);

    assert_eq!(s.solve(&[lit(-5)]), SolveStatus::Sat);
    assert!(count_true(&s, &xs) >= 3);
}

#[test]
fn geq_via_negation() {
    let mut s = CDCLSolver::default();
    ensure_vars(&mut s, 4);
    let xs = [lit(1), lit(2), lit(3)];
    assert!(s.add_geq_assign(&xs, 2, lit(4)));

    assert_eq!(s.solve(&[lit(4)]), SolveStatus::Sat);
    assert!(count_true(&s, &xs) >= 2);

    assert_eq!(s.solve(&[lit(-4)]), SolveStatus::Sat);
    assert!(count_true(&s, &xs) <= 1);
}

#[test]
fn leq_bound_zero_is_an_equivalence() {
    // bound 0 falls back to plain clauses: dst <=> no lit is true
    let mut s = CDCLSolver::default();
    ensure_vars(&mut s, 3);
    let xs = [lit(1), lit(2)];
    assert!(s.add_leq_assign(&xs, 0, lit(3)));

    assert_eq!(s.solve(&[lit(3)]), SolveStatus::Sat);
    assert_eq!(count_true(&s, &xs), 0);

    assert_eq!(s.solve(&[lit(-3)]), SolveStatus::Sat);
    assert!(count_true(&s, &xs) >= 1);
}

#[test]
fn leq_single_literal_is_a_negation() {
    // one surviving literal collapses to dst == !lit
    let mut s = CDCLSolver::default();
    ensure_vars(&mut s, 2);
    assert!(s.add_leq_assign(&[lit(1)], 0, lit(2)));

    assert_eq!(s.solve(&[lit(2)]), SolveStatus::Sat);
    assert_eq!(s.model_value(lit(1)), LBool::False);

    assert_eq!(s.solve(&[lit(-2)]), SolveStatus::Sat);
    assert_eq!(s.model_value(lit(1)), LBool::True);
}

#[test]
fn tautology_is_a_noop() {
    let mut s = CDCLSolver::default();
    ensure_vars(&mut s, 2);
    assert!(s.add_clause(&[lit(1), lit(-1), lit(2)]));
    assert_eq!(s.n_clauses(), 0);
    assert_eq!(s.n_assigns(), 0);
    assert_eq!(s.solve(&[]), SolveStatus::Sat);
}

#[test]
fn assumption_conflict_core() {
    let mut s = CDCLSolver::default();
    ensure_vars(&mut s, 3);
    assert!(s.add_clause(&[lit(-1), lit(-2)]));
    assert!(s.add_clause(&[lit(-1), lit(-3)]));

    assert_eq!(s.solve(&[lit(1), lit(2)]), SolveStatus::Unsat);
    let core = s.conflict().to_vec();
    assert!(!core.is_empty());
    // the core is a clause over negated assumptions
    for q in &core {
        assert!(*q == lit(-1) || *q == lit(-2));
    }

    // conjoining the named assumptions alone reproduces the contradiction
    let mut fresh = CDCLSolver::default();
    ensure_vars(&mut fresh, 3);
    assert!(fresh.add_clause(&[lit(-1), lit(-2)]));
    assert!(fresh.add_clause(&[lit(-1), lit(-3)]));
    let mut ok = true;
    for q in &core {
        ok = fresh.add_clause(&[!*q]) && ok;
    }
    assert!(!ok || fresh.solve(&[]) == SolveStatus::Unsat);

    // the solver is still usable, and a disjoint assumption is fine
    assert_eq!(s.solve(&[lit(3)]), SolveStatus::Sat);
}

#[test]
fn restart_schedule_does_not_change_verdicts() {
    for luby in [true, false] {
        let conf = SolverConfig {
            luby_restart: luby,
            restart_first: 2, // restart often to actually exercise the schedule
            ..SolverConfig::default()
        };

        let mut unsat = CDCLSolver::new(conf.clone());
        build_pigeonhole(&mut unsat, 4, 3);
        assert_eq!(unsat.solve(&[]), SolveStatus::Unsat);

        let mut sat = CDCLSolver::new(conf);
        build_pigeonhole(&mut sat, 4, 4);
        assert_eq!(sat.solve(&[]), SolveStatus::Sat);
    }
}

#[test]
fn interrupt_returns_unknown_and_is_reusable() {
    let mut s = CDCLSolver::default();
    build_pigeonhole(&mut s, 3, 3);
    s.interrupt();
    assert_eq!(s.solve(&[]), SolveStatus::Unknown);
    s.clear_interrupt();
    assert_eq!(s.solve(&[]), SolveStatus::Sat);
}

#[test]
fn conflict_budget_exhaustion() {
    let mut s = CDCLSolver::default();
    build_pigeonhole(&mut s, 4, 3);
    s.set_conf_budget(0);
    assert_eq!(s.solve(&[]), SolveStatus::Unknown);
    s.budget_off();
    assert_eq!(s.solve(&[]), SolveStatus::Unsat);
}

#[test]
fn garbage_collect_is_transparent() {
    let mut s = CDCLSolver::default();
    build_pigeonhole(&mut s, 3, 3);
    s.garbage_collect();
    assert_eq!(s.wasted(), 0);
    assert_eq!(s.solve(&[]), SolveStatus::Sat);

    let mut u = CDCLSolver::default();
    build_pigeonhole(&mut u, 3, 2);
    u.garbage_collect();
    assert_eq!(u.wasted(), 0);
    assert_eq!(u.solve(&[]), SolveStatus::Unsat);
}

#[test]
fn dimacs_round_trip() {
    for (pigeons, holes, expected) in [(3, 3, SolveStatus::Sat), (3, 2, SolveStatus::Unsat)] {
        let mut orig = CDCLSolver::default();
        build_pigeonhole(&mut orig, pigeons, holes);

        let mut text = Vec::new();
        orig.to_dimacs(&mut text, &[]).unwrap();

        let mut reread = CDCLSolver::default();
        DimacsParser::from_reader(Cursor::new(text))
            .parse_into(&mut reread)
            .unwrap();
        assert_eq!(reread.solve(&[]), expected);
        assert_eq!(orig.solve(&[]), expected);
    }
}

#[test]
fn mixed_cardinality_model_is_sound() {
    let mut s = CDCLSolver::default();
    ensure_vars(&mut s, 8);
    let xs = (1..=6).map(lit).collect::<Vec<_>>();
    // at most 3 of the six, at least 2 of the six, plus some structure
    assert!(s.add_leq_assign(&xs, 3, lit(7)));
    assert!(s.add_geq_assign(&xs, 2, lit(8)));
    assert!(s.add_clause(&[lit(-1), lit(2)]));
    assert!(s.add_clause(&[lit(3), lit(4)]));
    assert!(s.add_clause(&[lit(-5), lit(-6)]));

    assert_eq!(s.solve(&[lit(7), lit(8)]), SolveStatus::Sat);
    let n = count_true(&s, &xs);
    assert!((2..=3).contains(&n));
    assert!(s.model_value(lit(1)) != LBool::True || s.model_value(lit(2)) == LBool::True);
    assert!(
        s.model_value(lit(3)) == LBool::True || s.model_value(lit(4)) == LBool::True
    );
    assert!(
        s.model_value(lit(5)) != LBool::True || s.model_value(lit(6)) != LBool::True
    );
}

#[test]
fn solve_is_repeatable_across_calls() {
    let mut s = CDCLSolver::default();
    build_pigeonhole(&mut s, 4, 4);
    assert_eq!(s.solve(&[]), SolveStatus::Sat);
    assert_eq!(s.solve(&[]), SolveStatus::Sat);

    // pinning one pigeon into one hole stays satisfiable
    assert_eq!(s.solve(&[Lit::new(0, false)]), SolveStatus::Sat);
    assert_eq!(s.model_value(Lit::new(0, false)), LBool::True);
}
