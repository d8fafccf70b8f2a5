//! Loading a formula into the solver.
use partial_ref::{partial, PartialRef};

use buildsat_formula::Lit;

use crate::clause::{db, OutOfMemory};
use crate::context::{parts::*, Context};
use crate::prop::{assign, Reason};
use crate::state::SatState;

/// Add a clause of the input formula.
///
/// Literals are taken exactly as written; the first two become the watched literals, which keeps
/// the propagation order reproducible. The empty clause and a unit conflicting with an earlier
/// one make the formula unsatisfiable on the spot; a fresh unit is assigned as a root level
/// consequence with the clause as its reason.
///
/// Does not adjust the solver's variable count. If necessary that has to be done before calling
/// this.
pub fn load_clause(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseArenaP,
        mut ReasonsP,
        mut SolverStateP,
        mut TrailP,
        mut WatchlistsP,
    ),
    lits: &[Lit],
) -> Result<(), OutOfMemory> {
    if ctx.part(SolverStateP).sat_state == SatState::Unsat {
        return Ok(());
    }

    let cref = db::add_clause(ctx.borrow(), lits, false)?;

    match *lits {
        [] => ctx.part_mut(SolverStateP).sat_state = SatState::Unsat,
        [lit] => {
            if ctx.part(AssignmentP).lit_is_false(lit) {
                ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
            } else if !ctx.part(AssignmentP).lit_is_false(!lit) {
                assign(ctx.borrow(), lit, Some(Reason::Clause(cref)), true);
            }
        }
        _ => {}
    }

    Ok(())
}
