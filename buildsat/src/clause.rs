//! Clause storage.

pub mod arena;
pub mod db;
pub mod reduce;

pub use arena::{ClauseArena, ClauseRef, OutOfMemory, LINK_END};
