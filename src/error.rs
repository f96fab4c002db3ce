//! Error types shared by the dispatching heuristics.
//!
//! All core entry points report failures through [`SolverError`]. The
//! variants fall into three groups: infeasibility detected while building
//! a solution (`NoAvailableZone`), invariant violations reported by the
//! validator (`AssignmentCountMismatch`, `DuplicateOrderAssignment`,
//! `DuplicateExitAssignment`, `ZoneLoadCountMismatch`), and precondition
//! violations (`EmptyZoneSet`). None of them is recoverable: callers
//! discard the offending candidate or abort the run.

/// Failure modes of the assignment engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// No zone has an unconsumed exit left for the given order. The
    /// instance is infeasible for the constructive heuristic family.
    NoAvailableZone { order: usize },
    /// The evaluator received an empty zone-load vector; a malformed
    /// instance reached the core.
    EmptyZoneSet,
    /// The number of assignments differs from the number of orders.
    AssignmentCountMismatch { expected: usize, actual: usize },
    /// An order appears in more than one assignment entry.
    DuplicateOrderAssignment { order: usize },
    /// An exit is consumed by more than one order.
    DuplicateExitAssignment { exit: usize },
    /// The zone-load vector does not cover every zone exactly once.
    ZoneLoadCountMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::NoAvailableZone { order } => {
                write!(
                    f,
                    "no zone with an available exit left for order {} (check instance constraints)",
                    order
                )
            }
            SolverError::EmptyZoneSet => {
                write!(f, "cannot evaluate a solution over an empty zone set")
            }
            SolverError::AssignmentCountMismatch { expected, actual } => {
                write!(
                    f,
                    "number of assignments ({}) does not match the number of orders ({})",
                    actual, expected
                )
            }
            SolverError::DuplicateOrderAssignment { order } => {
                write!(f, "order {} is assigned more than once", order)
            }
            SolverError::DuplicateExitAssignment { exit } => {
                write!(f, "exit {} is assigned to more than one order", exit)
            }
            SolverError::ZoneLoadCountMismatch { expected, actual } => {
                write!(
                    f,
                    "number of zone loads ({}) does not match the number of zones ({})",
                    actual, expected
                )
            }
        }
    }
}

impl std::error::Error for SolverError {}
