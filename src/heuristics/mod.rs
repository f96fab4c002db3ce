//! Heuristics module for the dispatching problem.
//!
//! This module exports the construction and improvement heuristics.

pub mod construction;
pub mod evolutionary;
pub mod local_search;
pub mod mutation;

pub use construction::*;
pub use evolutionary::*;
pub use local_search::*;
pub use mutation::*;
