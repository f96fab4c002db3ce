//! Put-to-Light Dispatching Solver Library
//!
//! Heuristics for assigning customer orders to the exits of a put-to-light
//! sorting system so that the classification workload stays balanced
//! across the zones of the warehouse.
//!
//! # Features
//!
//! - Deterministic nearest-exit construction (largest orders first)
//! - Randomized multi-start construction, sequential or parallel
//! - Variable Neighborhood Search with a growing rotation neighborhood
//! - (1+1) evolutionary search over exit swaps
//! - Assignment validation and workload evaluation
//!
//! # Example
//!
//! ```no_run
//! use ptl_dispatch_solver::instance::PtlInstance;
//! use ptl_dispatch_solver::heuristics::construction::{ConstructionHeuristic, RandomizedMultiStart};
//! use ptl_dispatch_solver::heuristics::local_search::{LocalSearch, VariableNeighborhoodSearch};
//!
//! // Load instance
//! let instance = PtlInstance::from_file("instance.json").unwrap();
//!
//! // Construct initial solution
//! let multi_start = RandomizedMultiStart::new(200, 42);
//! let mut solution = multi_start.construct(&instance).unwrap();
//!
//! // Improve with VNS
//! let vns = VariableNeighborhoodSearch::default();
//! vns.improve(&instance, &mut solution).unwrap();
//!
//! let objective = solution.evaluate().unwrap();
//! println!("Makespan: {:.2}", objective.w_max);
//! ```

pub mod benchmark;
pub mod error;
pub mod heuristics;
pub mod instance;
pub mod solution;

pub use error::SolverError;
pub use instance::PtlInstance;
pub use solution::Solution;
