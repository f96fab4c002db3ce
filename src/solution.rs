//! Solution representation and evaluation for the dispatching problem.
//!
//! This module provides the data structures for representing, evaluating
//! and validating order-to-exit assignments. A solution maps every order
//! to exactly one exit and keeps the per-zone workloads up to date
//! incrementally as orders are assigned or moved.

use crate::error::SolverError;
use crate::instance::PtlInstance;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One order routed to one exit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Index of the exit consumed by the order
    pub exit: usize,
    /// Zone of that exit, cached from the instance
    pub zone: usize,
    /// Processing time of the order through that exit
    pub processing_time: f64,
}

/// Workload objective of a solution, compared lexicographically: first the
/// makespan (the most loaded zone), then the spread between the most and
/// the least loaded zones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    /// Load of the most loaded zone
    pub w_max: f64,
    /// Difference between the most and the least loaded zones
    pub spread: f64,
}

impl Objective {
    pub fn new(w_max: f64, spread: f64) -> Self {
        Objective { w_max, spread }
    }

    /// Lexicographic comparison key, makespan first
    #[inline]
    pub fn key(&self) -> (OrderedFloat<f64>, OrderedFloat<f64>) {
        (OrderedFloat(self.w_max), OrderedFloat(self.spread))
    }

    /// Lexicographically better: lower makespan, spread breaking ties
    #[inline]
    pub fn better_than(&self, other: &Objective) -> bool {
        self.key() < other.key()
    }

    /// Strict makespan improvement, the acceptance test of the local searches
    #[inline]
    pub fn improves_makespan(&self, other: &Objective) -> bool {
        self.w_max < other.w_max
    }
}

impl std::fmt::Display for Objective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Wmax = {:.2}, spread = {:.2}", self.w_max, self.spread)
    }
}

/// Represents a solution to the dispatching problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Assignment of each order, indexed by order; `None` while unassigned
    pub assignments: Vec<Option<Assignment>>,
    /// Current workload of each zone, indexed by zone
    pub zone_loads: Vec<f64>,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
}

impl Solution {
    /// Create an empty solution sized for the given instance
    pub fn new(instance: &PtlInstance) -> Self {
        Solution {
            assignments: vec![None; instance.num_orders()],
            zone_loads: vec![0.0; instance.num_zones()],
            algorithm: String::new(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Route an order through an exit, replacing its previous assignment if
    /// any. Zone loads are maintained incrementally.
    pub fn assign(&mut self, instance: &PtlInstance, order: usize, exit: usize) {
        if let Some(prev) = self.assignments[order] {
            self.zone_loads[prev.zone] -= prev.processing_time;
        }
        let zone = instance.exits[exit].zone;
        let processing_time = instance.processing_time(order, exit);
        self.zone_loads[zone] += processing_time;
        self.assignments[order] = Some(Assignment {
            exit,
            zone,
            processing_time,
        });
    }

    /// Check if every order has been assigned an exit
    pub fn is_complete(&self, instance: &PtlInstance) -> bool {
        self.assignments.len() == instance.num_orders()
            && self.assignments.iter().all(|a| a.is_some())
    }

    /// Evaluate the workload objective of the solution
    pub fn evaluate(&self) -> Result<Objective, SolverError> {
        if self.zone_loads.is_empty() {
            return Err(SolverError::EmptyZoneSet);
        }

        let mut w_max = f64::NEG_INFINITY;
        let mut w_min = f64::INFINITY;
        for &load in &self.zone_loads {
            w_max = w_max.max(load);
            w_min = w_min.min(load);
        }

        Ok(Objective::new(w_max, w_max - w_min))
    }

    /// Check that the solution is a valid one-to-one assignment for the
    /// instance: every order assigned, no exit consumed twice, and one load
    /// entry per zone.
    pub fn verify(&self, instance: &PtlInstance) -> Result<(), SolverError> {
        if self.assignments.len() != instance.num_orders() {
            return Err(SolverError::AssignmentCountMismatch {
                expected: instance.num_orders(),
                actual: self.assignments.len(),
            });
        }

        let assigned = self.assignments.iter().flatten().count();
        if assigned != instance.num_orders() {
            return Err(SolverError::AssignmentCountMismatch {
                expected: instance.num_orders(),
                actual: assigned,
            });
        }

        let mut used_exits = HashSet::new();
        for a in self.assignments.iter().flatten() {
            if !used_exits.insert(a.exit) {
                return Err(SolverError::DuplicateExitAssignment { exit: a.exit });
            }
        }

        if self.zone_loads.len() != instance.num_zones() {
            return Err(SolverError::ZoneLoadCountMismatch {
                expected: instance.num_zones(),
                actual: self.zone_loads.len(),
            });
        }

        Ok(())
    }

    /// Recompute the cached zones, processing times and zone loads from the
    /// exit assignments, e.g. after deserializing a solution.
    pub fn refresh(&mut self, instance: &PtlInstance) {
        let mut loads = vec![0.0; instance.num_zones()];
        for (order, slot) in self.assignments.iter_mut().enumerate() {
            if let Some(a) = slot {
                a.zone = instance.exits[a.exit].zone;
                a.processing_time = instance.processing_time(order, a.exit);
                loads[a.zone] += a.processing_time;
            }
        }
        self.zone_loads = loads;
    }

    /// Total workload over all zones
    pub fn total_load(&self) -> f64 {
        self.zone_loads.iter().sum()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        match self.evaluate() {
            Ok(objective) => writeln!(f, "  {}", objective)?,
            Err(_) => writeln!(f, "  (no zones)")?,
        }
        let loads: Vec<String> = self.zone_loads.iter().map(|l| format!("{:.2}", l)).collect();
        writeln!(f, "  Zone loads: [{}]", loads.join(", "))?;
        let assigned = self.assignments.iter().flatten().count();
        writeln!(f, "  Assigned: {}/{}", assigned, self.assignments.len())?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        Ok(())
    }
}
