//! Adding clauses to the database.
use partial_ref::{partial, PartialRef};

use buildsat_formula::Lit;

use crate::context::{parts::*, Context};
use crate::prop::watch::{watch_clause, Watchlists};

use super::arena::ClauseArena;
use super::{ClauseRef, OutOfMemory};

/// Store a clause and register its watches.
///
/// Clauses of size two or more are watched via their first two literals. Unit and empty clauses
/// are stored unwatched; their effect is applied eagerly by the caller.
pub fn add_clause(
    mut ctx: partial!(Context, mut ClauseArenaP, mut WatchlistsP),
    lits: &[Lit],
    redundant: bool,
) -> Result<ClauseRef, OutOfMemory> {
    let (arena, mut ctx) = ctx.split_part_mut(ClauseArenaP);
    add_clause_raw(arena, ctx.part_mut(WatchlistsP), lits, redundant)
}

/// [`add_clause`] on plain references, shared with the reduction sweep.
pub fn add_clause_raw(
    arena: &mut ClauseArena,
    watchlists: &mut Watchlists,
    lits: &[Lit],
    redundant: bool,
) -> Result<ClauseRef, OutOfMemory> {
    let cref = arena.add_clause(lits, redundant)?;
    if lits.len() >= 2 {
        watch_clause(watchlists, arena, cref);
    }
    Ok(cref)
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use buildsat_formula::{lits, Lit};

    use crate::clause::LINK_END;
    use crate::context::set_var_count;

    /// Count how often each clause occurs on some watch list.
    pub fn watch_counts(
        ctx: partial!(Context, ClauseArenaP, WatchlistsP),
    ) -> std::collections::BTreeMap<ClauseRef, usize> {
        let arena = ctx.part(ClauseArenaP);
        let watchlists = ctx.part(WatchlistsP);

        let mut counts = std::collections::BTreeMap::new();

        for code in 0..watchlists.len() {
            let mut offset = watchlists.head(Lit::from_code(code));
            while offset != LINK_END {
                let cref = ClauseRef::from_offset(offset & !1);
                *counts.entry(cref).or_insert(0) += 1;
                offset = arena.cell(offset);
            }
        }

        counts
    }

    #[test]
    fn watches_per_clause_size() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 5);

        let long = add_clause(ctx.borrow(), &lits![1, 2, 3], false).unwrap();
        let binary = add_clause(ctx.borrow(), &lits![-1, 4], false).unwrap();
        let unit = add_clause(ctx.borrow(), &lits![5], false).unwrap();

        let counts = watch_counts(ctx.borrow());

        assert_eq!(counts.get(&long), Some(&2));
        assert_eq!(counts.get(&binary), Some(&2));
        assert_eq!(counts.get(&unit), None);
    }
}
