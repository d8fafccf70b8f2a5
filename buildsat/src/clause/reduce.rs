//! Clause database reduction.
use partial_ref::{partial, PartialRef};

use buildsat_formula::Lit;

use crate::context::{parts::*, Context};
use crate::prop::watch::WatchCursor;
use crate::prop::Watchlists;

use super::arena::{clause_cells, ClauseArena};
use super::{db, OutOfMemory, LINK_END};

/// Drop the less useful half of the lemma region.
///
/// Raises the lemma limit by the configured growth while it is exceeded, unthreads every lemma
/// watch, truncates the arena to the irredundant region and then re-adds the lemmas worth
/// keeping: those with fewer than `bound` literals satisfied by the saved phases. Lemmas most of
/// whose literals agree with the current phases are cheap to rederive and are dropped.
pub fn reduce_db(
    mut ctx: partial!(
        Context,
        mut ClauseArenaP,
        mut WatchlistsP,
        AssignmentP,
        SolverConfigP,
    ),
    bound: usize,
) -> Result<(), OutOfMemory> {
    let (arena, mut ctx) = ctx.split_part_mut(ClauseArenaP);
    let (watchlists, mut ctx) = ctx.split_part_mut(WatchlistsP);

    let growth = ctx.part(SolverConfigP).lemma_limit_growth;
    while arena.lemma_count() > arena.lemma_limit() {
        let limit = arena.lemma_limit();
        arena.set_lemma_limit(limit + growth);
    }
    arena.set_lemma_count(0);

    unthread_lemma_watches(watchlists, arena);

    // Move the lemma region out of the arena and rescan it.
    let old_region = arena.copy_region(arena.mem_fixed());
    arena.truncate(arena.mem_fixed());

    let assignment = ctx.part(AssignmentP);
    let mut offset = 0;
    while offset + 3 <= old_region.len() {
        let len = old_region[offset + 2] as usize;
        let body = &old_region[offset + 3..offset + 3 + len];

        let satisfied = body
            .iter()
            .filter(|&&code| {
                let lit = Lit::from_code(code as usize);
                assignment.phase(lit.var()) == lit.is_positive()
            })
            .count();

        if satisfied < bound {
            let lits: Vec<Lit> = body
                .iter()
                .map(|&code| Lit::from_code(code as usize))
                .collect();
            db::add_clause_raw(arena, watchlists, &lits, true)?;
        }

        offset += clause_cells(len);
    }

    Ok(())
}

/// Splice every watch that points into the lemma region out of its list.
fn unthread_lemma_watches(watchlists: &mut Watchlists, arena: &mut ClauseArena) {
    let mem_fixed = arena.mem_fixed();

    for code in 0..watchlists.len() {
        let mut cursor = WatchCursor::Head(Lit::from_code(code));
        loop {
            let cell = match cursor {
                WatchCursor::Head(lit) => watchlists.head(lit),
                WatchCursor::Cell(offset) => arena.cell(offset),
            };
            if cell == LINK_END {
                break;
            }
            if (cell as usize) < mem_fixed {
                // An irredundant clause, keep the watch and follow the link.
                cursor = WatchCursor::Cell(cell);
            } else {
                // A lemma, splice its cell out of the list.
                let next = arena.cell(cell);
                match cursor {
                    WatchCursor::Head(lit) => watchlists.set_head(lit, next),
                    WatchCursor::Cell(offset) => arena.set_cell(offset, next),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use buildsat_formula::lits;

    use crate::clause::ClauseRef;
    use crate::context::set_var_count;

    /// Count how often each clause occurs on some watch list.
    fn watch_counts(
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
    fn keeps_hard_lemmas_and_drops_easy_ones() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 6);

        let irredundant = db::add_clause(ctx.borrow(), &lits![1, 2, 3], false).unwrap();

        // Phases: all false. Lemma over negative literals is fully phase-satisfied, the positive
        // one not at all.
        let easy = lits![-1, -2, -3];
        let hard = lits![4, 5, 6];
        db::add_clause(ctx.borrow(), &easy, true).unwrap();
        db::add_clause(ctx.borrow(), &hard, true).unwrap();

        assert_eq!(ctx.part(ClauseArenaP).lemma_count(), 2);

        reduce_db(ctx.borrow(), 2).unwrap();

        assert_eq!(ctx.part(ClauseArenaP).lemma_count(), 1);

        // The irredundant clause and the surviving lemma are each watched twice; no watch points
        // at a deleted clause.
        let counts = watch_counts(ctx.borrow());
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.get(&irredundant), Some(&2));
        for (&cref, &count) in counts.iter() {
            assert_eq!(count, 2);
            let lits = ctx.part(ClauseArenaP).lits(cref).to_vec();
            assert!(lits == lits![1, 2, 3].to_vec() || lits == hard.to_vec());
        }
    }

    #[test]
    fn lemma_limit_grows() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 8);

        let initial_limit = ctx.part(ClauseArenaP).lemma_limit();
        let growth = ctx.part(SolverConfigP).lemma_limit_growth;

        for _ in 0..initial_limit + 1 {
            db::add_clause(ctx.borrow(), &lits![1, 2, 3, 4], true).unwrap();
        }

        reduce_db(ctx.borrow(), 6).unwrap();

        assert_eq!(
            ctx.part(ClauseArenaP).lemma_limit(),
            initial_limit + growth
        );
        // Phases are all false, so every literal is unsatisfied and all lemmas survive.
        assert_eq!(ctx.part(ClauseArenaP).lemma_count(), initial_limit + 1);
    }
}
