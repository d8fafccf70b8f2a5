//! Evaluation of package build selections.
//!
//! These are thin wrappers over the propagation core. A selection is a user supplied partial
//! assignment plus a set of dead (forbidden) variables; evaluating it decides whether the
//! selection is buildable as is, incomplete, or outright invalid.
use std::fmt;

use partial_ref::{partial, PartialRef};

use buildsat_formula::{Lit, Var};

use crate::clause::OutOfMemory;
use crate::context::{parts::*, Context};
use crate::prop::{assign, evaluate_clauses, propagate, LitState, Reason};

/// Verdict for a user supplied selection.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Verdict {
    /// The selection is consistent and every remaining variable can default to false.
    Buildable,
    /// The selection is consistent but requires further choices.
    Incomplete,
    /// The selection contradicts the formula or the dead variable set.
    Invalid,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Verdict::Buildable => "BUILDABLE",
            Verdict::Incomplete => "INCOMPLETE",
            Verdict::Invalid => "INVALID",
        };
        write!(f, "{}", name)
    }
}

/// Apply the dead variables and the user selection, propagating each step.
///
/// Dead variables are forced false, then the user literals are forced true in reverse input
/// order, each followed by a propagation round. All consequences become root level assignments.
/// Conflicts are not reported here; the later buildability check operates on whatever state
/// propagation reached.
pub fn apply_decisions(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut ClauseArenaP,
        mut ReasonsP,
        mut ScheduleP,
        mut TrailP,
        mut VmtfP,
        mut WatchlistsP,
    ),
    dead_vars: &[Lit],
    selection: &[Lit],
) -> Result<(), OutOfMemory> {
    for &dead in dead_vars {
        if !ctx.part(AssignmentP).var_is_assigned(dead.var()) {
            assign(ctx.borrow(), !dead, Some(Reason::Unit), true);
        }
    }
    let _ = propagate(ctx.borrow())?;

    for &lit in selection.iter().rev() {
        if !ctx.part(AssignmentP).var_is_assigned(lit.var()) {
            assign(ctx.borrow(), lit, Some(Reason::Unit), true);
            let _ = propagate(ctx.borrow())?;
        }
    }

    Ok(())
}

/// The root forced literals, in ascending variable order.
pub fn decided_literals(ctx: partial!(Context, AssignmentP)) -> Vec<Lit> {
    let assignment = ctx.part(AssignmentP);

    let mut decided = vec![];
    for index in 0..assignment.var_count() {
        let var = Var::from_index(index);
        if assignment.phase(var) && assignment.state(var.negative()) == LitState::Implied {
            decided.push(var.positive());
        } else if assignment.state(var.positive()) == LitState::Implied {
            decided.push(var.negative());
        }
    }
    decided
}

/// Check the user selection literal by literal, in input order.
///
/// A literal that is already falsified, or that names a dead variable with the opposite
/// polarity, makes the selection inconsistent. Every accepted literal is forced true and the
/// clause check is run; a falsified clause also makes the selection inconsistent.
pub fn selection_consistent(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseArenaP,
        mut ReasonsP,
        mut TrailP,
        mut WatchlistsP,
    ),
    dead_vars: &[Lit],
    selection: &[Lit],
) -> bool {
    for &lit in selection {
        if ctx.part(AssignmentP).lit_is_false(lit) {
            return false;
        }
        if dead_vars.contains(&lit) {
            return false;
        }
        if !ctx.part(AssignmentP).var_is_assigned(lit.var()) {
            assign(ctx.borrow(), lit, Some(Reason::Unit), true);
            if !evaluate_clauses(ctx.borrow()) {
                return false;
            }
        }
    }
    true
}

/// Whether the current state can be completed by defaulting open variables to false.
///
/// Every unassigned variable with a false saved phase is tentatively set false; if any such
/// probe immediately falsifies a clause, the selection needs further decisions. The probes
/// accumulate, matching the workflow's "default everything else to off" reading.
pub fn buildable(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseArenaP,
        mut ReasonsP,
        mut TrailP,
        mut WatchlistsP,
    ),
) -> bool {
    let var_count = ctx.part(AssignmentP).var_count();

    for index in 0..var_count {
        let var = Var::from_index(index);
        let assignment = ctx.part(AssignmentP);
        if assignment.var_is_assigned(var) || assignment.phase(var) {
            continue;
        }
        assign(ctx.borrow(), var.negative(), Some(Reason::Unit), false);
        if !evaluate_clauses(ctx.borrow()) {
            return false;
        }
    }
    true
}
