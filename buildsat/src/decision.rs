//! The variable-move-to-front decision list.
//!
//! Variables are kept on a doubly linked list. Conflict analysis moves every involved variable to
//! the front; decisions walk the list from the front towards the back via the `prev` links, so
//! recently conflicting variables are tried first. This is much cheaper to maintain than a score
//! based heap and competitive for a solver of this size.
//!
//! List entries are 1-based variable numbers with 0 terminating the list, which leaves slot 0 of
//! both link arrays free as scratch space for relink operations. The `next` link of the current
//! head is only refreshed when the head changes; walks must follow `prev` starting at the head.
use buildsat_formula::lit::LitIdx;
use buildsat_formula::Var;

/// Doubly linked variable-move-to-front list.
pub struct Vmtf {
    next: Vec<LitIdx>,
    prev: Vec<LitIdx>,
    head: LitIdx,
}

impl Default for Vmtf {
    fn default() -> Vmtf {
        Vmtf {
            next: vec![0],
            prev: vec![0],
            head: 0,
        }
    }
}

impl Vmtf {
    /// Update structures for a new variable count.
    ///
    /// New variables are chained on top of the current head in increasing order, so a fresh list
    /// over `n` variables is the identity chain with the head at `n`.
    pub fn set_var_count(&mut self, count: usize) {
        let old = self.prev.len() - 1;
        if count <= old {
            return;
        }
        self.next.resize(count + 1, 0);
        self.prev.resize(count + 1, 0);

        let mut last = self.head;
        for entry in (old + 1)..=count {
            self.prev[entry] = last;
            self.next[last as usize] = entry as LitIdx;
            last = entry as LitIdx;
        }
        self.next[last as usize] = 0;
        self.head = last;
    }

    /// The most recently moved entry, where decision walks start.
    pub fn head(&self) -> LitIdx {
        self.head
    }

    /// The entry preceding the given one in move-to-front order.
    pub fn prev_entry(&self, entry: LitIdx) -> LitIdx {
        self.prev[entry as usize]
    }

    /// The variable of a nonzero list entry.
    pub fn var_of(entry: LitIdx) -> Var {
        debug_assert!(entry != 0);
        Var::from_index(entry as usize - 1)
    }

    /// Unlink a variable and relink it in front of the head.
    pub fn move_to_front(&mut self, var: Var) {
        let entry = (var.index() + 1) as LitIdx;
        if entry == self.head {
            return;
        }
        let prev = self.prev[entry as usize];
        let next = self.next[entry as usize];
        self.prev[next as usize] = prev;
        self.next[prev as usize] = next;

        self.next[self.head as usize] = entry;
        self.prev[entry as usize] = self.head;
        self.head = entry;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    /// Collect the list front-to-back by walking `prev` from the head.
    fn walk(vmtf: &Vmtf) -> Vec<LitIdx> {
        let mut entries = vec![];
        let mut entry = vmtf.head();
        while entry != 0 {
            entries.push(entry);
            entry = vmtf.prev_entry(entry);
        }
        entries
    }

    #[test]
    fn initial_order() {
        let mut vmtf = Vmtf::default();
        vmtf.set_var_count(5);

        assert_eq!(vmtf.head(), 5);
        assert_eq!(walk(&vmtf), vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn move_to_front_reorders() {
        let mut vmtf = Vmtf::default();
        vmtf.set_var_count(5);

        vmtf.move_to_front(Var::from_dimacs(2));
        assert_eq!(walk(&vmtf), vec![2, 5, 4, 3, 1]);

        vmtf.move_to_front(Var::from_dimacs(1));
        assert_eq!(walk(&vmtf), vec![1, 2, 5, 4, 3]);

        // Moving the head is a no-op.
        vmtf.move_to_front(Var::from_dimacs(1));
        assert_eq!(walk(&vmtf), vec![1, 2, 5, 4, 3]);
    }

    proptest! {
        #[test]
        fn stays_a_permutation(count in 1..30usize, moves in proptest::collection::vec(0..30usize, 0..100)) {
            let mut vmtf = Vmtf::default();
            vmtf.set_var_count(count);

            for &index in moves.iter() {
                vmtf.move_to_front(Var::from_index(index % count));

                let mut entries = walk(&vmtf);
                prop_assert_eq!(entries.len(), count);
                entries.sort_unstable();
                let expected: Vec<LitIdx> = (1..=count as LitIdx).collect();
                prop_assert_eq!(entries, expected);
            }
        }
    }
}
