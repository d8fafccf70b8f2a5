//! Solver configuration.

/// Configurable parameters used during solving.
pub struct SolverConfig {
    /// Initial number of redundant clauses kept before a reduction is triggered.
    pub lemma_limit: usize,

    /// Amount the lemma limit grows whenever it is exceeded.
    pub lemma_limit_growth: usize,

    /// A lemma survives a reduction only when fewer than this many of its literals are satisfied
    /// by the saved phases.
    pub reduce_keep_bound: usize,

    /// Capacity of the clause arena in 32-bit cells.
    pub arena_capacity: usize,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig {
            lemma_limit: 2000,
            lemma_limit_growth: 300,
            reduce_keep_bound: 6,
            arena_capacity: 1 << 28,
        }
    }
}
