//! Bump allocated clause storage.
use std::slice;

use buildsat_formula::lit::LitIdx;
use buildsat_formula::Lit;

use thiserror::Error;

use crate::config::SolverConfig;

/// Integer type used for offsets into the arena.
pub type ArenaOffset = LitIdx;

/// Sentinel terminating a watch list threaded through the arena.
pub const LINK_END: ArenaOffset = ArenaOffset::max_value();

/// Number of cells preceding the literals of a stored clause.
///
/// These are the two watch link cells followed by the clause length.
const HEADER_LEN: usize = 3;

/// The clause arena would exceed its configured capacity.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Error)]
#[error("clause arena capacity exhausted")]
pub struct OutOfMemory;

/// Compact reference to a clause.
///
/// Holds the arena offset of the clause's first header cell. Clause starts are kept even-aligned,
/// so the parity of a watch link cell's offset identifies the clause it belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct ClauseRef {
    offset: ArenaOffset,
}

impl ClauseRef {
    pub(crate) fn from_offset(offset: ArenaOffset) -> ClauseRef {
        debug_assert!(offset & 1 == 0);
        ClauseRef { offset }
    }

    /// The arena offset of the clause's first header cell.
    pub(crate) fn offset(self) -> ArenaOffset {
        self.offset
    }
}

/// Bump allocator for clause storage.
///
/// Clauses are allocated from a single growable buffer bounded by a configured capacity. Clauses
/// cannot be freed individually; the lemma region is reclaimed wholesale by
/// [`reduce_db`](crate::clause::reduce::reduce_db). The buffer is split into an irredundant
/// prefix ending at `mem_fixed` and a lemma suffix.
///
/// A stored clause occupies `[link_0, link_1, len, lit_0, …, lit_k]` plus a padding cell when
/// needed to keep the next clause start even-aligned. The two link cells thread the clause into
/// the watch lists of two of its literals.
pub struct ClauseArena {
    buffer: Vec<LitIdx>,
    /// End of the irredundant region.
    mem_fixed: usize,
    capacity: usize,
    lemma_count: usize,
    lemma_limit: usize,
}

impl Default for ClauseArena {
    fn default() -> ClauseArena {
        let config = SolverConfig::default();
        ClauseArena {
            buffer: vec![],
            mem_fixed: 0,
            capacity: config.arena_capacity,
            lemma_count: 0,
            lemma_limit: config.lemma_limit,
        }
    }
}

impl ClauseArena {
    /// Allocate and store a new clause.
    ///
    /// Irredundant clauses extend the fixed region and must be added before any lemma. This only
    /// stores the clause; watch registration is handled by
    /// [`db::add_clause`](crate::clause::db::add_clause).
    pub fn add_clause(&mut self, lits: &[Lit], redundant: bool) -> Result<ClauseRef, OutOfMemory> {
        let offset = self.buffer.len();
        debug_assert!(offset & 1 == 0);

        let size = HEADER_LEN + lits.len();
        if offset + size + (size & 1) > self.capacity {
            return Err(OutOfMemory);
        }

        self.buffer.push(LINK_END);
        self.buffer.push(LINK_END);
        self.buffer.push(lits.len() as LitIdx);
        for &lit in lits {
            self.buffer.push(lit.code() as LitIdx);
        }
        if self.buffer.len() & 1 == 1 {
            self.buffer.push(0);
        }

        if redundant {
            self.lemma_count += 1;
        } else {
            debug_assert_eq!(self.mem_fixed, offset);
            self.mem_fixed = self.buffer.len();
        }

        Ok(ClauseRef::from_offset(offset as ArenaOffset))
    }

    /// Number of literals of a clause.
    pub fn clause_len(&self, cref: ClauseRef) -> usize {
        self.buffer[cref.offset() as usize + 2] as usize
    }

    /// The literals of a clause.
    pub fn lits(&self, cref: ClauseRef) -> &[Lit] {
        let start = cref.offset() as usize + HEADER_LEN;
        let len = self.clause_len(cref);
        assert!(start + len <= self.buffer.len(), "ClauseRef out of bounds");
        unsafe {
            // Safe as Lit is repr(transparent) over LitIdx
            let lit_ptr = self.buffer.as_ptr().add(start) as *const Lit;
            slice::from_raw_parts(lit_ptr, len)
        }
    }

    /// Mutable slice of the literals of a clause.
    pub fn lits_mut(&mut self, cref: ClauseRef) -> &mut [Lit] {
        let start = cref.offset() as usize + HEADER_LEN;
        let len = self.clause_len(cref);
        assert!(start + len <= self.buffer.len(), "ClauseRef out of bounds");
        unsafe {
            // Safe as Lit is repr(transparent) over LitIdx
            let lit_ptr = self.buffer.as_mut_ptr().add(start) as *mut Lit;
            slice::from_raw_parts_mut(lit_ptr, len)
        }
    }

    /// Read a raw cell, used for the watch links threaded through the arena.
    pub fn cell(&self, offset: ArenaOffset) -> ArenaOffset {
        self.buffer[offset as usize]
    }

    /// Overwrite a raw cell.
    pub fn set_cell(&mut self, offset: ArenaOffset, value: ArenaOffset) {
        self.buffer[offset as usize] = value;
    }

    /// End of the irredundant region.
    pub fn mem_fixed(&self) -> usize {
        self.mem_fixed
    }

    /// Number of stored lemmas.
    pub fn lemma_count(&self) -> usize {
        self.lemma_count
    }

    /// Current cap on the number of stored lemmas.
    pub fn lemma_limit(&self) -> usize {
        self.lemma_limit
    }

    pub fn set_lemma_count(&mut self, count: usize) {
        self.lemma_count = count;
    }

    pub fn set_lemma_limit(&mut self, limit: usize) {
        self.lemma_limit = limit;
    }

    /// Current buffer size in cells.
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Copy out a region of raw cells, used by the reduction sweep.
    pub fn copy_region(&self, from: usize) -> Vec<LitIdx> {
        self.buffer[from..].to_vec()
    }

    /// Discard everything past the given cell offset.
    pub fn truncate(&mut self, len: usize) {
        debug_assert!(len >= self.mem_fixed);
        self.buffer.truncate(len);
    }

    /// Iterator over all stored clauses in allocation order.
    pub fn clauses<'a>(&'a self) -> impl Iterator<Item = ClauseRef> + 'a {
        let mut offset = 0;
        let buffer = &self.buffer;
        std::iter::from_fn(move || {
            if offset + HEADER_LEN > buffer.len() {
                return None;
            }
            let cref = ClauseRef::from_offset(offset as ArenaOffset);
            let len = buffer[offset + 2] as usize;
            offset += clause_cells(len);
            Some(cref)
        })
    }
}

/// Number of cells a clause with `len` literals occupies, including alignment padding.
pub fn clause_cells(len: usize) -> usize {
    let size = HEADER_LEN + len;
    size + (size & 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    use buildsat_formula::cnf::strategy::*;
    use buildsat_formula::lits;

    use proptest::*;

    #[test]
    fn alignment_and_regions() {
        let mut arena = ClauseArena::default();

        let a = arena.add_clause(&lits![1, 2, 3], false).unwrap();
        let b = arena.add_clause(&lits![-1, -2], false).unwrap();
        let fixed_end = arena.buffer_size();
        let c = arena.add_clause(&lits![3, 1, -2, 4], true).unwrap();

        assert_eq!(a.offset() % 2, 0);
        assert_eq!(b.offset() % 2, 0);
        assert_eq!(c.offset() % 2, 0);

        assert_eq!(arena.mem_fixed(), fixed_end);
        assert_eq!(arena.lemma_count(), 1);
        assert!(c.offset() as usize >= arena.mem_fixed());

        assert_eq!(arena.lits(b), &lits![-1, -2][..]);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut arena = ClauseArena::default();
        arena.capacity = 16;

        assert!(arena.add_clause(&lits![1, 2, 3], false).is_ok());
        assert!(arena.add_clause(&lits![1, 2, 3, 4, 5, 6, 7, 8, 9, 10], true).is_err());
    }

    proptest! {
        #[test]
        fn roundtrip_from_cnf_formula(input in cnf_formula(1..100usize, 0..500, 0..30)) {
            let mut arena = ClauseArena::default();
            let mut crefs = vec![];

            for clause_lits in input.iter() {
                crefs.push(arena.add_clause(clause_lits, false).unwrap());
            }

            for (cref, clause_lits) in crefs.iter().zip(input.iter()) {
                prop_assert_eq!(arena.lits(*cref), clause_lits);
                prop_assert_eq!(arena.clause_len(*cref), clause_lits.len());
            }

            let walked: Vec<_> = arena.clauses().collect();
            prop_assert_eq!(walked, crefs);
        }
    }
}
