//! Partial assignment, trail and backtracking.
use partial_ref::{partial, PartialRef};

use buildsat_formula::{Lit, Var};

use crate::context::{parts::*, Context};

use super::Reason;

/// Label attached to a literal.
///
/// Every label other than `Unassigned` means the literal is currently false. The `Marked`,
/// `NotImplied` and `Implied` labels drive conflict analysis: `Marked` flags literals of the
/// pending resolvent, `Implied`/`NotImplied` memoize the outcome of the redundancy test. Literals
/// forced at the root level keep the `Implied` label for as long as they stay assigned, which
/// excludes them from bumping and from learned clauses.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LitState {
    Unassigned,
    Assigned,
    Marked,
    NotImplied,
    Implied,
}

impl Default for LitState {
    fn default() -> LitState {
        LitState::Unassigned
    }
}

/// Current partial assignment.
///
/// Holds the per-literal labels and the saved phases. A variable's phase is the value it was last
/// assigned; it survives unassignment and steers future decisions.
#[derive(Default)]
pub struct Assignment {
    states: Vec<LitState>,
    phase: Vec<bool>,
}

impl Assignment {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.states.resize(count * 2, LitState::Unassigned);
        self.phase.resize(count, false);
    }

    /// Number of variables.
    pub fn var_count(&self) -> usize {
        self.phase.len()
    }

    /// Label of a literal.
    pub fn state(&self, lit: Lit) -> LitState {
        self.states[lit.code()]
    }

    /// Attach a label to a literal.
    pub fn set_state(&mut self, lit: Lit, state: LitState) {
        self.states[lit.code()] = state;
    }

    /// Whether the literal is currently false.
    pub fn lit_is_false(&self, lit: Lit) -> bool {
        self.states[lit.code()] != LitState::Unassigned
    }

    /// Whether neither polarity of the literal's variable is assigned.
    pub fn var_is_assigned(&self, var: Var) -> bool {
        self.lit_is_false(var.positive()) || self.lit_is_false(var.negative())
    }

    /// The saved phase of a variable.
    pub fn phase(&self, var: Var) -> bool {
        self.phase[var.index()]
    }

    /// Save the phase of a variable.
    pub fn set_phase(&mut self, var: Var, value: bool) {
        self.phase[var.index()] = value;
    }
}

/// Decision and propagation history.
///
/// The trail stores the falsified literal of every assignment in assignment order. `processed`
/// is the propagation cursor, `forced` the first position that is not forced at the root level.
#[derive(Default)]
pub struct Trail {
    trail: Vec<Lit>,
    processed: usize,
    forced: usize,
}

impl Trail {
    /// Falsified literals in assignment order.
    pub fn lits(&self) -> &[Lit] {
        &self.trail
    }

    /// Number of assignments on the trail.
    pub fn len(&self) -> usize {
        self.trail.len()
    }

    /// Position of the propagation cursor.
    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn set_processed(&mut self, processed: usize) {
        self.processed = processed;
    }

    /// First position that is not a root level assignment.
    pub fn forced(&self) -> usize {
        self.forced
    }

    pub fn set_forced(&mut self, forced: usize) {
        self.forced = forced;
    }

    pub fn push(&mut self, lit: Lit) {
        self.trail.push(lit);
    }

    pub fn pop(&mut self) -> Option<Lit> {
        self.trail.pop()
    }
}

/// Make a literal true.
///
/// Pushes the falsified complement onto the trail, records the reason and saves the phase.
/// Assignments with `forced` set are root level consequences and get the persistent `Implied`
/// label.
pub fn assign(
    mut ctx: partial!(Context, mut AssignmentP, mut ReasonsP, mut TrailP),
    lit: Lit,
    reason: Option<Reason>,
    forced: bool,
) {
    let (assignment, mut ctx) = ctx.split_part_mut(AssignmentP);

    debug_assert!(!assignment.var_is_assigned(lit.var()));

    assignment.set_state(
        !lit,
        if forced {
            LitState::Implied
        } else {
            LitState::Assigned
        },
    );
    assignment.set_phase(lit.var(), lit.is_positive());

    ctx.part_mut(TrailP).push(!lit);
    ctx.part_mut(ReasonsP).set_reason(lit.var(), reason);
}

/// Clear the label of a falsified literal.
///
/// Phase and decision list position are retained.
pub fn unassign(assignment: &mut Assignment, lit: Lit) {
    assignment.set_state(lit, LitState::Unassigned);
}

/// Undo all assignments above the root level and rewind the propagation cursor.
pub fn restart(mut ctx: partial!(Context, mut AssignmentP, mut TrailP)) {
    let (assignment, mut ctx) = ctx.split_part_mut(AssignmentP);
    let trail = ctx.part_mut(TrailP);

    while trail.len() > trail.forced() {
        if let Some(lit) = trail.pop() {
            unassign(assignment, lit);
        }
    }
    let forced = trail.forced();
    trail.set_processed(forced);
}
