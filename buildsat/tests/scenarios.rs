//! End to end scenarios exercised through the library API.
use proptest::prelude::*;

use buildsat::{CnfFormula, Lit, Solver, Var, Verdict};
use buildsat_formula::test::{pigeon_hole_formula, sat_formula};
use buildsat_formula::{cnf_formula, lits};

#[test]
fn unit_clause_is_sat() {
    let mut solver = Solver::new();
    solver.add_formula(&cnf_formula![1;]).unwrap();

    assert_eq!(solver.solve().ok(), Some(true));
    assert_eq!(solver.model().unwrap(), lits![1].to_vec());
}

#[test]
fn conflicting_units_are_unsat_at_load() {
    let mut solver = Solver::new();
    solver.add_formula(&cnf_formula![1; -1;]).unwrap();

    assert!(solver.is_known_unsat());
    assert_eq!(solver.solve().ok(), Some(false));
}

#[test]
fn pigeon_hole_three_in_two_is_unsat() {
    let mut solver = Solver::new();
    solver.add_formula(&pigeon_hole_formula(2)).unwrap();

    assert_eq!(solver.solve().ok(), Some(false));
}

#[test]
fn simple_formula_has_satisfying_model() {
    let formula = cnf_formula![
        1, 2;
        -2, 3;
    ];

    let mut solver = Solver::new();
    solver.add_formula(&formula).unwrap();

    assert_eq!(solver.solve().ok(), Some(true));

    let model = solver.model().unwrap();
    for clause in formula.iter() {
        assert!(clause.iter().any(|lit| model.contains(lit)));
    }
}

#[test]
fn propagate_selection_reports_forced_literals() {
    let mut solver = Solver::new();
    solver
        .add_formula(&cnf_formula![
            1, 2;
            -1, 3;
        ])
        .unwrap();

    let outcome = solver.propagate_selection(&[], &lits![1]).unwrap();

    assert_eq!(outcome.decided, lits![1, 3].to_vec());
    assert_eq!(outcome.verdict, Verdict::Buildable);
}

#[test]
fn check_selection_flags_contradiction() {
    let mut solver = Solver::new();
    solver
        .add_formula(&cnf_formula![
            -1, -2;
        ])
        .unwrap();

    assert_eq!(solver.check_selection(&[], &lits![1, 2]), Verdict::Invalid);
}

/// Rename every variable of a formula with a rotation and flip some polarities.
fn rename(formula: &CnfFormula, flip: bool) -> CnfFormula {
    let count = formula.var_count();
    let mut renamed = CnfFormula::new();
    renamed.set_var_count(count);
    for clause in formula.iter() {
        let clause: Vec<Lit> = clause
            .iter()
            .map(|lit| {
                let index = (lit.index() + 1) % count;
                Var::from_index(index).lit(lit.is_positive() ^ (flip && index % 2 == 0))
            })
            .collect();
        renamed.add_clause(&clause);
    }
    renamed
}

proptest! {
    #[test]
    fn verdict_is_stable_under_renaming(
        formula in sat_formula(4..20usize, 10..80usize, 0.05..0.2, 0.9..1.0),
        flip in proptest::bool::ANY,
    ) {
        let mut solver = Solver::new();
        solver.add_formula(&formula).unwrap();

        let mut renamed_solver = Solver::new();
        renamed_solver.add_formula(&rename(&formula, flip)).unwrap();

        prop_assert_eq!(solver.solve().ok(), renamed_solver.solve().ok());
    }

    #[test]
    fn repeated_runs_are_identical(
        formula in sat_formula(4..20usize, 10..80usize, 0.05..0.2, 0.9..1.0),
    ) {
        let mut first = Solver::new();
        first.add_formula(&formula).unwrap();
        let first_result = (first.solve().ok(), first.model());

        let mut second = Solver::new();
        second.add_formula(&formula).unwrap();
        let second_result = (second.solve().ok(), second.model());

        prop_assert_eq!(first_result, second_result);
    }
}
