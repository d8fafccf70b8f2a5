//! Learns a new clause by analyzing a conflict.
//!
//! Analysis resolves the falsified clause against the reasons of its literals, walking the trail
//! backwards until the first unique implication point of the current decision level remains. The
//! learned clause is assembled from the marked trail literals, skipping literals that are implied
//! by the rest of the clause (recursive minimization). The asserting literal ends up in position
//! 0, ready to be assigned by the caller after the backjump.
use partial_ref::{partial, PartialRef};

use buildsat_formula::Lit;

use crate::clause::arena::ClauseArena;
use crate::clause::{db, ClauseRef, OutOfMemory};
use crate::context::{parts::*, Context};
use crate::decision::Vmtf;
use crate::prop::assignment::{unassign, Assignment, LitState};
use crate::prop::reasons::{Reason, Reasons};

/// Temporaries for conflict analysis.
#[derive(Default)]
pub struct AnalyzeConflict {
    /// The learned clause, asserting literal first.
    buffer: Vec<Lit>,
    /// Explicit DFS stack for the implication test.
    implied_stack: Vec<ImpliedFrame>,
}

/// One step of the implication DFS: the next reason literal of `cref` to visit.
struct ImpliedFrame {
    lit: Lit,
    cref: ClauseRef,
    pos: usize,
}

/// Analyze a falsified clause and learn the resolvent.
///
/// The trail is rewound to the backjump point and the propagation cursor moved there; the caller
/// asserts the returned clause's first literal. Must not be called for root level conflicts.
pub fn analyze(
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
    conflict: ClauseRef,
) -> Result<ClauseRef, OutOfMemory> {
    ctx.part_mut(ScheduleP).conflicts += 1;

    resolve_to_uip(ctx.borrow(), conflict);
    let lbd = build_clause(ctx.borrow());

    let schedule = ctx.part_mut(ScheduleP);
    schedule.fast -= schedule.fast >> 5;
    schedule.fast += (lbd as u64) << 15;
    schedule.slow -= schedule.slow >> 15;
    schedule.slow += (lbd as u64) << 5;

    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);
    db::add_clause(ctx.borrow(), &analyze.buffer, true)
}

/// Mark the conflict literals and resolve trail literals until the first UIP is the deepest
/// marked literal.
///
/// Pops and unassigns every resolved literal. Marking doubles as bumping: each marked literal's
/// variable moves to the front of the decision list.
fn resolve_to_uip(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut TrailP,
        mut VmtfP,
        ClauseArenaP,
        ReasonsP,
    ),
    conflict: ClauseRef,
) {
    let (assignment, mut ctx) = ctx.split_part_mut(AssignmentP);
    let (vmtf, mut ctx) = ctx.split_part_mut(VmtfP);
    let (trail, mut ctx) = ctx.split_part_mut(TrailP);
    let arena = ctx.part(ClauseArenaP);
    let reasons = ctx.part(ReasonsP);

    for &lit in arena.lits(conflict) {
        bump(assignment, vmtf, lit);
    }

    loop {
        let tail = trail.lits()[trail.len() - 1];
        if reasons.reason(tail.var()).is_none() {
            // The decision itself is the only marked literal left on this level.
            break;
        }
        if assignment.state(tail) == LitState::Marked {
            // The tail is the first UIP unless another marked literal sits between it and the
            // decision below.
            let mut is_uip = true;
            for &below in trail.lits()[..trail.len() - 1].iter().rev() {
                if assignment.state(below) == LitState::Marked {
                    is_uip = false;
                    break;
                }
                if reasons.reason(below.var()).is_none() {
                    break;
                }
            }
            if is_uip {
                break;
            }
            if let Some(Reason::Clause(cref)) = reasons.reason(tail.var()) {
                // Skip position 0, the propagated literal itself.
                for &lit in &arena.lits(cref)[1..] {
                    bump(assignment, vmtf, lit);
                }
            }
        }
        if let Some(lit) = trail.pop() {
            unassign(assignment, lit);
        }
    }
}

/// Sweep the trail tail-to-front, collecting the learned clause and its LBD, then backjump.
///
/// A literal contributes if it is marked and not implied by the remaining marked literals. The
/// LBD counts decisions covered by at least one contributing literal. The backjump point is the
/// position of the deepest decision seen while the clause was still a unit; everything above it
/// is unassigned and the propagation cursor is moved there.
fn build_clause(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut TrailP,
        ClauseArenaP,
        ReasonsP,
    ),
) -> usize {
    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);
    let (assignment, mut ctx) = ctx.split_part_mut(AssignmentP);
    let (trail, mut ctx) = ctx.split_part_mut(TrailP);
    let arena = ctx.part(ClauseArenaP);
    let reasons = ctx.part(ReasonsP);

    analyze.buffer.clear();

    let mut lbd = 0;
    let mut covered = false;
    let mut backjump = trail.len() - 1;

    for position in (trail.forced()..trail.len()).rev() {
        let lit = trail.lits()[position];
        if assignment.state(lit) == LitState::Marked
            && !lit_implied(assignment, reasons, arena, &mut analyze.implied_stack, lit)
        {
            analyze.buffer.push(lit);
            covered = true;
        }
        if reasons.reason(lit.var()).is_none() {
            if covered {
                lbd += 1;
                covered = false;
            }
            if analyze.buffer.len() == 1 {
                backjump = position;
            }
        }
        // Reset marks and memoized labels on the swept range.
        assignment.set_state(lit, LitState::Assigned);
    }

    while trail.len() > backjump {
        if let Some(lit) = trail.pop() {
            unassign(assignment, lit);
        }
    }
    trail.set_processed(backjump);

    lbd
}

/// Mark a literal as part of the pending resolvent and move its variable to the front of the
/// decision list.
///
/// Root level literals keep their `Implied` label and are neither marked nor moved.
fn bump(assignment: &mut Assignment, vmtf: &mut Vmtf, lit: Lit) {
    if assignment.state(lit) == LitState::Implied {
        return;
    }
    assignment.set_state(lit, LitState::Marked);
    vmtf.move_to_front(lit.var());
}

/// Whether a literal is implied by the marked literals.
///
/// A literal is implied when every literal of its reason is marked or recursively implied;
/// decisions are never implied. Results are memoized in the literal labels: `Implied` for a
/// positive answer, `NotImplied` for a negative one. Implied literals are redundant in the
/// learned clause. The test runs as a DFS over the reason graph with an explicit stack holding
/// the chain of open checks, so deep implication chains cannot overflow the call stack.
fn lit_implied(
    assignment: &mut Assignment,
    reasons: &Reasons,
    arena: &ClauseArena,
    stack: &mut Vec<ImpliedFrame>,
    lit: Lit,
) -> bool {
    match assignment.state(lit) {
        LitState::Implied => return true,
        LitState::NotImplied => return false,
        _ => {}
    }
    let cref = match reasons.reason(lit.var()) {
        None => return false,
        // External unit assignments are root forced; they were answered by the memoized state
        // above.
        Some(Reason::Unit) => return false,
        Some(Reason::Clause(cref)) => cref,
    };

    enum Step {
        Finished(Lit),
        Visit(Lit),
    }

    stack.clear();
    stack.push(ImpliedFrame { lit, cref, pos: 1 });

    loop {
        let step = match stack.last_mut() {
            None => return true,
            Some(top) => {
                let lits = arena.lits(top.cref);
                if top.pos == lits.len() {
                    Step::Finished(top.lit)
                } else {
                    top.pos += 1;
                    Step::Visit(lits[top.pos - 1])
                }
            }
        };

        let lit = match step {
            Step::Finished(lit) => {
                stack.pop();
                assignment.set_state(lit, LitState::Implied);
                continue;
            }
            Step::Visit(lit) => lit,
        };

        let expand = match assignment.state(lit) {
            LitState::Marked | LitState::Implied => continue,
            LitState::NotImplied => None,
            _ => match reasons.reason(lit.var()) {
                Some(Reason::Clause(cref)) => Some(cref),
                _ => None,
            },
        };

        match expand {
            Some(cref) => stack.push(ImpliedFrame { lit, cref, pos: 1 }),
            None => {
                // The whole chain of open tests fails along with this literal.
                for frame in stack.drain(..) {
                    assignment.set_state(frame.lit, LitState::NotImplied);
                }
                return false;
            }
        }
    }
}
