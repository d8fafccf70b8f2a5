//! Watchlists threaded through the clause arena.
//!
//! Each clause of size two or more is on exactly two watch lists, one per watched literal. The
//! watched literals are kept in positions 0 and 1 of the clause while it is at rest. A watch list
//! is a singly linked list: the per-literal head stores the arena offset of a link cell, each
//! link cell stores the offset of the next one, and `LINK_END` terminates the list. The two link
//! cells of a clause sit directly in front of it in the arena, so unlinking and relinking a watch
//! is a single cell update.
//!
//! When a literal becomes false its watch list is walked. Clauses that have another non-false
//! literal move their watch there; the remaining clauses are unit or falsified. Backtracking
//! never needs to touch the lists.
use buildsat_formula::Lit;

use crate::clause::arena::{ArenaOffset, ClauseArena};
use crate::clause::{ClauseRef, LINK_END};

/// Heads of the per-literal watch lists.
#[derive(Default)]
pub struct Watchlists {
    first: Vec<ArenaOffset>,
}

impl Watchlists {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.first.resize(count * 2, LINK_END);
    }

    /// Head of the watch list of a literal.
    pub fn head(&self, lit: Lit) -> ArenaOffset {
        self.first[lit.code()]
    }

    /// Replace the head of the watch list of a literal.
    pub fn set_head(&mut self, lit: Lit, offset: ArenaOffset) {
        self.first[lit.code()] = offset;
    }

    /// Number of per-literal lists.
    pub fn len(&self) -> usize {
        self.first.len()
    }
}

/// Position of a watch pointer during a list walk: either a list head or a link cell.
#[derive(Copy, Clone)]
pub enum WatchCursor {
    Head(Lit),
    Cell(ArenaOffset),
}

/// Read the link the cursor points at.
pub fn cursor_get(watchlists: &Watchlists, arena: &ClauseArena, cursor: WatchCursor) -> ArenaOffset {
    match cursor {
        WatchCursor::Head(lit) => watchlists.head(lit),
        WatchCursor::Cell(offset) => arena.cell(offset),
    }
}

/// Overwrite the link the cursor points at, splicing the list.
pub fn cursor_set(
    watchlists: &mut Watchlists,
    arena: &mut ClauseArena,
    cursor: WatchCursor,
    value: ArenaOffset,
) {
    match cursor {
        WatchCursor::Head(lit) => watchlists.set_head(lit, value),
        WatchCursor::Cell(offset) => arena.set_cell(offset, value),
    }
}

/// Start watching a clause via its first two literals.
pub fn watch_clause(watchlists: &mut Watchlists, arena: &mut ClauseArena, cref: ClauseRef) {
    debug_assert!(arena.clause_len(cref) >= 2);
    for slot in 0..2 {
        let cell = cref.offset() + slot;
        let lit = arena.lits(cref)[slot as usize];
        arena.set_cell(cell, watchlists.head(lit));
        watchlists.set_head(lit, cell);
    }
}
