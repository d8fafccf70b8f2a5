//! The two-watched-literal propagation walker.
use partial_ref::{partial, PartialRef};

use crate::analyze::analyze;
use crate::clause::{ClauseRef, OutOfMemory, LINK_END};
use crate::context::{parts::*, Context};

use super::assignment::assign;
use super::reasons::Reason;
use super::watch::{cursor_get, cursor_set, WatchCursor};

/// Outcome of running propagation to fixpoint.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Propagation {
    /// No conflict remains; all assignments are processed.
    Fixpoint,
    /// A clause is falsified at the root level, the formula is unsatisfiable.
    RootConflict,
}

/// Propagate all pending assignments.
///
/// Drains the trail from the propagation cursor. Conflicts below the root level are resolved in
/// place: the conflict is analyzed, the learned clause asserted and propagation resumes. A
/// conflict at the root level ends the search with [`Propagation::RootConflict`].
///
/// Runs in forced mode when the first unprocessed assignment has a reason; every assignment made
/// in forced mode is a root level consequence, and the root boundary is advanced at the end.
pub fn propagate(
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
) -> Result<Propagation, OutOfMemory> {
    let mut forced = {
        let trail = ctx.part(TrailP);
        match trail.lits().get(trail.processed()) {
            Some(&lit) => ctx.part(ReasonsP).reason(lit.var()).is_some(),
            None => false,
        }
    };

    loop {
        match walk_assignments(ctx.borrow(), forced, true) {
            Ok(()) => break,
            Err(conflict) => {
                if forced {
                    return Ok(Propagation::RootConflict);
                }
                let lemma = analyze(ctx.borrow(), conflict)?;
                if ctx.part(ClauseArenaP).clause_len(lemma) == 1 {
                    forced = true;
                }
                let asserted = ctx.part(ClauseArenaP).lits(lemma)[0];
                assign(ctx.borrow(), asserted, Some(Reason::Clause(lemma)), forced);
            }
        }
    }

    if forced {
        let processed = ctx.part(TrailP).processed();
        ctx.part_mut(TrailP).set_forced(processed);
    }

    Ok(Propagation::Fixpoint)
}

/// Run the propagation walker without enqueuing new assignments.
///
/// This is the clause check used by the evaluator modes: it walks pending assignments exactly
/// like [`propagate`] but a unit clause is skipped instead of propagated. Returns whether no
/// clause was found falsified.
pub fn evaluate_clauses(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseArenaP,
        mut ReasonsP,
        mut TrailP,
        mut WatchlistsP,
    ),
) -> bool {
    walk_assignments(ctx.borrow(), false, false).is_ok()
}

/// Drain the trail, moving watches and detecting unit and falsified clauses.
///
/// With `enqueue` set, unit clauses assign their remaining literal (marked as root consequence
/// when `forced` is set). Without it they are left alone. Returns the falsified clause on
/// conflict; the walk stops there with the conflicting watch still in place.
fn walk_assignments(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseArenaP,
        mut ReasonsP,
        mut TrailP,
        mut WatchlistsP,
    ),
    forced: bool,
    enqueue: bool,
) -> Result<(), ClauseRef> {
    let (arena, mut ctx) = ctx.split_part_mut(ClauseArenaP);
    let (watchlists, mut ctx) = ctx.split_part_mut(WatchlistsP);

    loop {
        let position = ctx.part(TrailP).processed();
        if position == ctx.part(TrailP).len() {
            return Ok(());
        }
        let lit = ctx.part(TrailP).lits()[position];
        ctx.part_mut(TrailP).set_processed(position + 1);

        let mut cursor = WatchCursor::Head(lit);
        loop {
            let cell = cursor_get(watchlists, arena, cursor);
            if cell == LINK_END {
                break;
            }
            // Clause starts are even-aligned, the cell parity locates the clause.
            let cref = ClauseRef::from_offset(cell & !1);

            // Move the falsified literal into position 1 so the other watched literal is in
            // front.
            {
                let lits = arena.lits_mut(cref);
                if lits[0] == lit {
                    lits.swap(0, 1);
                }
            }

            // Look for a non-false literal to take over this watch.
            let len = arena.clause_len(cref);
            let mut relocated = false;
            for i in 2..len {
                let candidate = arena.lits(cref)[i];
                if !ctx.part(AssignmentP).lit_is_false(candidate) {
                    let lits = arena.lits_mut(cref);
                    lits[1] = candidate;
                    lits[i] = lit;

                    let next = arena.cell(cell);
                    cursor_set(watchlists, arena, cursor, next);
                    arena.set_cell(cell, watchlists.head(candidate));
                    watchlists.set_head(candidate, cell);

                    relocated = true;
                    break;
                }
            }
            if relocated {
                // The cursor now links to the next watch already.
                continue;
            }

            // The clause is unit in its other watched literal, satisfied by it, or falsified.
            let other = arena.lits(cref)[0];
            cursor = WatchCursor::Cell(cell);

            if ctx.part(AssignmentP).lit_is_false(!other) {
                // Satisfied by the other watch, leave the watch in place.
                continue;
            }
            if !ctx.part(AssignmentP).lit_is_false(other) {
                if enqueue {
                    assign(ctx.borrow(), other, Some(Reason::Clause(cref)), forced);
                }
                continue;
            }

            return Err(cref);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use proptest::prelude::*;

    use buildsat_formula::{cnf_formula, test::sat_formula, Lit};

    use crate::context::set_var_count;
    use crate::load::load_clause;
    use crate::prop::assignment::LitState;
    use crate::state::SatState;

    fn load_formula(
        mut ctx: partial!(
            Context,
            mut AssignmentP,
            mut ClauseArenaP,
            mut ReasonsP,
            mut SolverStateP,
            mut TrailP,
            mut VmtfP,
            mut WatchlistsP,
        ),
        formula: &buildsat_formula::CnfFormula,
    ) {
        set_var_count(ctx.borrow(), formula.var_count());
        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause).unwrap();
        }
    }

    #[test]
    fn unit_chain_is_propagated() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![
            1;
            -1, 2;
            -2, -3, 4;
            3;
        ];

        load_formula(ctx.borrow(), &formula);

        assert_eq!(propagate(ctx.borrow()), Ok(Propagation::Fixpoint));

        for lit in &[1, 2, 3, 4] {
            let lit = Lit::from_dimacs(*lit);
            assert_eq!(ctx.part(AssignmentP).state(!lit), LitState::Implied);
        }
        assert_eq!(ctx.part(TrailP).forced(), 4);
    }

    #[test]
    fn root_conflict_is_reported() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![
            1;
            2;
            -1, -2, 3;
            -3, -1, -2;
        ];

        load_formula(ctx.borrow(), &formula);

        assert_eq!(propagate(ctx.borrow()), Ok(Propagation::RootConflict));
    }

    proptest! {
        #[test]
        fn fixpoint_invariants(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut ctx = Context::default();
            let mut ctx = ctx.into_partial_ref_mut();

            load_formula(ctx.borrow(), &formula);
            prop_assume!(ctx.part(SolverStateP).sat_state != SatState::Unsat);

            prop_assert_eq!(propagate(ctx.borrow()), Ok(Propagation::Fixpoint));

            // No clause is falsified and every unit clause has its remaining literal assigned.
            let arena = ctx.part(ClauseArenaP);
            let assignment = ctx.part(AssignmentP);
            for cref in arena.clauses() {
                let lits = arena.lits(cref);
                let false_count = lits.iter().filter(|&&l| assignment.lit_is_false(l)).count();
                prop_assert!(false_count < lits.len());
                if false_count + 1 == lits.len() {
                    let unit = lits.iter().find(|&&l| !assignment.lit_is_false(l)).unwrap();
                    prop_assert!(assignment.lit_is_false(!*unit));
                }
            }
        }
    }
}
