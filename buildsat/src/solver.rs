//! Boolean satisfiability solver for package build selection.
use std::io;

use partial_ref::{IntoPartialRef, IntoPartialRefMut, PartialRef};

use anyhow::Error;
use log::info;
use thiserror::Error;

use buildsat_dimacs::DimacsParser;
use buildsat_formula::{CnfFormula, Lit, Var};

use crate::clause::OutOfMemory;
use crate::context::{ensure_var_count, parts::*, Context};
use crate::eval::{self, Verdict};
use crate::load::load_clause;
use crate::search::search;
use crate::state::SatState;

/// Error raised by the solving and evaluation entry points.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("clause database memory limit exceeded")]
    OutOfMemory,
}

impl From<OutOfMemory> for SolverError {
    fn from(_: OutOfMemory) -> SolverError {
        SolverError::OutOfMemory
    }
}

/// Result of propagating a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagatedSelection {
    /// Root forced literals in ascending variable order.
    pub decided: Vec<Lit>,
    /// `Buildable` or `Incomplete`.
    pub verdict: Verdict,
}

/// A boolean satisfiability solver.
#[derive(Default)]
pub struct Solver {
    ctx: Box<Context>,
}

impl Solver {
    /// Create a new solver.
    pub fn new() -> Solver {
        Solver::default()
    }

    /// Add a formula to the solver.
    pub fn add_formula(&mut self, formula: &CnfFormula) -> Result<(), SolverError> {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ensure_var_count(ctx.borrow(), formula.var_count());
        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause)?;
        }
        Ok(())
    }

    /// Read and add a formula in DIMACS CNF format.
    ///
    /// Using this avoids creating a temporary [`CnfFormula`].
    pub fn add_dimacs_cnf(&mut self, input: impl io::Read) -> Result<(), Error> {
        let parser = DimacsParser::parse_incremental(input, |parser| {
            Ok(self.add_formula(&parser.take_formula())?)
        })?;

        info!(
            "parsed formula with {} variables and {} clauses",
            parser.var_count(),
            parser.clause_count()
        );

        Ok(())
    }

    /// Whether loading the formula already determined unsatisfiability.
    ///
    /// Set by an empty clause or a pair of conflicting unit clauses in the input.
    pub fn is_known_unsat(&self) -> bool {
        let ctx = self.ctx.into_partial_ref();
        ctx.part(SolverStateP).sat_state == SatState::Unsat
    }

    /// Check the satisfiability of the current formula.
    pub fn solve(&mut self) -> Result<bool, SolverError> {
        let mut ctx = self.ctx.into_partial_ref_mut();
        match ctx.part(SolverStateP).sat_state {
            SatState::Sat => Ok(true),
            SatState::Unsat => Ok(false),
            SatState::Unknown => Ok(search(ctx.borrow())?),
        }
    }

    /// Set of literals that satisfy the formula.
    pub fn model(&self) -> Option<Vec<Lit>> {
        let ctx = self.ctx.into_partial_ref();
        if ctx.part(SolverStateP).sat_state != SatState::Sat {
            return None;
        }
        let assignment = ctx.part(AssignmentP);
        Some(
            (0..assignment.var_count())
                .map(|index| {
                    let var = Var::from_index(index);
                    var.lit(assignment.lit_is_false(var.negative()))
                })
                .collect(),
        )
    }

    /// Propagate-mode evaluation of a selection.
    ///
    /// Forces the dead variables false and the selection true, propagates everything and reports
    /// the decided literals together with the buildability verdict.
    pub fn propagate_selection(
        &mut self,
        dead_vars: &[Lit],
        selection: &[Lit],
    ) -> Result<PropagatedSelection, SolverError> {
        let mut ctx = self.ctx.into_partial_ref_mut();

        eval::apply_decisions(ctx.borrow(), dead_vars, selection)?;

        let decided = eval::decided_literals(ctx.borrow());
        let verdict = if eval::buildable(ctx.borrow()) {
            Verdict::Buildable
        } else {
            Verdict::Incomplete
        };

        Ok(PropagatedSelection { decided, verdict })
    }

    /// Status-mode evaluation of a selection.
    pub fn check_selection(&mut self, dead_vars: &[Lit], selection: &[Lit]) -> Verdict {
        let mut ctx = self.ctx.into_partial_ref_mut();

        if !eval::selection_consistent(ctx.borrow(), dead_vars, selection) {
            return Verdict::Invalid;
        }
        if eval::buildable(ctx.borrow()) {
            Verdict::Buildable
        } else {
            Verdict::Incomplete
        }
    }
}
