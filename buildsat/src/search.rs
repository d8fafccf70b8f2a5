//! The CDCL search loop.
use log::info;

use partial_ref::{partial, PartialRef};

use crate::clause::reduce::reduce_db;
use crate::clause::OutOfMemory;
use crate::context::{parts::*, Context};
use crate::decision::Vmtf;
use crate::prop::{assign, propagate, restart, Propagation};
use crate::state::SatState;

/// Restart scheduling state.
///
/// `fast` and `slow` are fixed point exponential moving averages of the learned clause LBDs with
/// smoothing factors 1/32 and 1/65536. A burst of high-LBD clauses drives `fast` above `slow`,
/// which triggers a restart.
pub struct Schedule {
    pub fast: u64,
    pub slow: u64,
    pub conflicts: u64,
    pub restarts: u64,
}

impl Default for Schedule {
    fn default() -> Schedule {
        Schedule {
            fast: 1 << 24,
            slow: 1 << 24,
            conflicts: 0,
            restarts: 0,
        }
    }
}

/// Run the search until the formula is decided.
///
/// Returns whether the formula is satisfiable; the satisfiability state is recorded in the
/// context. When the search returns true the current assignment is a model.
pub fn search(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut ClauseArenaP,
        mut ReasonsP,
        mut ScheduleP,
        mut SolverStateP,
        mut TrailP,
        mut VmtfP,
        mut WatchlistsP,
        SolverConfigP,
    ),
) -> Result<bool, OutOfMemory> {
    let mut cursor = ctx.part(VmtfP).head();

    loop {
        let old_lemmas = ctx.part(ClauseArenaP).lemma_count();

        match propagate(ctx.borrow())? {
            Propagation::RootConflict => {
                ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
                return Ok(false);
            }
            Propagation::Fixpoint => {}
        }

        if ctx.part(ClauseArenaP).lemma_count() > old_lemmas {
            // The last decision caused a conflict, start over at the front of the list.
            cursor = ctx.part(VmtfP).head();

            let restart_now = {
                let schedule = ctx.part(ScheduleP);
                schedule.fast > (schedule.slow / 100) * 125
            };
            if restart_now {
                {
                    let schedule = ctx.part_mut(ScheduleP);
                    schedule.fast = (schedule.slow / 100) * 125;
                    schedule.restarts += 1;
                }
                restart(ctx.borrow());

                let schedule = ctx.part(ScheduleP);
                info!(
                    "restart {} after {} conflicts, {} lemmas",
                    schedule.restarts,
                    schedule.conflicts,
                    ctx.part(ClauseArenaP).lemma_count()
                );

                if ctx.part(ClauseArenaP).lemma_count() > ctx.part(ClauseArenaP).lemma_limit() {
                    let bound = ctx.part(SolverConfigP).reduce_keep_bound;
                    reduce_db(ctx.borrow(), bound)?;
                }
            }
        }

        // Walk the decision list for an unassigned variable.
        loop {
            if cursor == 0 {
                // Every variable is assigned, the current assignment is a model.
                ctx.part_mut(SolverStateP).sat_state = SatState::Sat;
                return Ok(true);
            }
            if !ctx.part(AssignmentP).var_is_assigned(Vmtf::var_of(cursor)) {
                break;
            }
            cursor = ctx.part(VmtfP).prev_entry(cursor);
        }

        let var = Vmtf::var_of(cursor);
        let lit = var.lit(ctx.part(AssignmentP).phase(var));
        assign(ctx.borrow(), lit, None, false);
    }
}
