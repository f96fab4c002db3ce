//! Local search improvement for the dispatching problem.
//!
//! The neighborhood moves permute exits between already-assigned orders,
//! so every candidate visited during the search stays a one-to-one
//! assignment. Acceptance is driven by the makespan alone; the spread only
//! breaks ties when picking the best candidate of an iteration.

use crate::error::SolverError;
use crate::heuristics::construction::{ConstructionHeuristic, NearestExitHeuristic};
use crate::heuristics::mutation::Mutation;
use crate::instance::PtlInstance;
use crate::solution::{Objective, Solution};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Trait for local search improvement methods
pub trait LocalSearch {
    fn improve(
        &self,
        instance: &PtlInstance,
        solution: &mut Solution,
    ) -> Result<bool, SolverError>;
    fn name(&self) -> &str;
}

/// Variable Neighborhood Search configuration.
///
/// All counts must be positive for the search to run; if any of them is
/// zero, `improve` returns the start solution untouched.
#[derive(Debug, Clone)]
pub struct VnsConfig {
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Stop after this many consecutive iterations without improvement
    pub max_no_improve: usize,
    /// Candidates drawn per iteration while the search is progressing
    pub initial_neighborhood_size: usize,
    /// Cap on the neighborhood growth during stagnation
    pub max_neighborhood_size: usize,
    /// Number of orders rotated by each candidate move
    pub num_changes: usize,
    /// Random seed
    pub seed: u64,
}

impl Default for VnsConfig {
    fn default() -> Self {
        VnsConfig {
            max_iterations: 1000,
            max_no_improve: 10,
            initial_neighborhood_size: 5,
            max_neighborhood_size: 15,
            num_changes: 3,
            seed: 42,
        }
    }
}

/// Variable Neighborhood Search
///
/// Draws a batch of rotation moves around the incumbent at every iteration
/// and accepts the best candidate only on a strict makespan improvement.
/// The batch grows by one candidate each time an iteration stagnates and
/// falls back to its initial size on every improvement, so the search only
/// widens while it is stuck.
pub struct VariableNeighborhoodSearch {
    config: VnsConfig,
}

impl VariableNeighborhoodSearch {
    pub fn new(config: VnsConfig) -> Self {
        VariableNeighborhoodSearch { config }
    }

    /// Build a nearest-exit start solution and improve it
    pub fn run(&self, instance: &PtlInstance) -> Result<Solution, SolverError> {
        let start = std::time::Instant::now();

        let mut solution = NearestExitHeuristic::new().construct(instance)?;
        self.improve(instance, &mut solution)?;

        solution.algorithm = self.name().to_string();
        solution.computation_time = start.elapsed().as_secs_f64();
        Ok(solution)
    }
}

impl Default for VariableNeighborhoodSearch {
    fn default() -> Self {
        Self::new(VnsConfig::default())
    }
}

impl LocalSearch for VariableNeighborhoodSearch {
    fn improve(
        &self,
        instance: &PtlInstance,
        solution: &mut Solution,
    ) -> Result<bool, SolverError> {
        // Zero anywhere in the counts disables the search
        if self.config.max_iterations == 0
            || self.config.max_no_improve == 0
            || self.config.initial_neighborhood_size == 0
            || self.config.max_neighborhood_size == 0
            || self.config.num_changes == 0
        {
            return Ok(false);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);

        let mut best = solution.clone();
        let mut best_objective = best.evaluate()?;
        let mut neighborhood_size = self.config.initial_neighborhood_size;
        let mut no_improve_count = 0;
        let mut iterations = 0;
        let mut improved_any = false;

        while iterations < self.config.max_iterations
            && no_improve_count < self.config.max_no_improve
        {
            iterations += 1;

            let mut batch_best: Option<(Objective, Solution)> = None;
            for _ in 0..neighborhood_size {
                let mutation = Mutation::random_rotation(
                    instance.num_orders(),
                    self.config.num_changes,
                    &mut rng,
                );
                let candidate = mutation.apply(instance, &best);
                let objective = candidate.evaluate()?;

                let replace = match &batch_best {
                    Some((incumbent, _)) => objective.better_than(incumbent),
                    None => true,
                };
                if replace {
                    batch_best = Some((objective, candidate));
                }
            }

            match batch_best {
                Some((objective, candidate)) if objective.improves_makespan(&best_objective) => {
                    log::debug!(
                        "VNS iteration {}: makespan {:.2} -> {:.2}",
                        iterations,
                        best_objective.w_max,
                        objective.w_max
                    );
                    best = candidate;
                    best_objective = objective;
                    improved_any = true;
                    no_improve_count = 0;
                    neighborhood_size = self.config.initial_neighborhood_size;
                }
                _ => {
                    no_improve_count += 1;
                    if neighborhood_size < self.config.max_neighborhood_size {
                        neighborhood_size += 1;
                    }
                }
            }
        }

        best.iterations = Some(iterations);
        *solution = best;
        Ok(improved_any)
    }

    fn name(&self) -> &str {
        "VNS"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Exit, Order};

    /// Two zones where the greedy construction overloads the zone holding
    /// the far exit; a single exit swap repairs it.
    fn create_test_instance() -> PtlInstance {
        PtlInstance::new(
            "vns-test",
            vec![
                Order::new("O1", 5, 0.0),
                Order::new("O2", 5, 0.0),
                Order::new("O3", 1, 0.0),
                Order::new("O4", 1, 0.0),
            ],
            vec!["A".to_string(), "B".to_string()],
            vec![
                Exit::new("E1", 0, 1.0),
                Exit::new("E2", 0, 10.0),
                Exit::new("E3", 1, 1.0),
                Exit::new("E4", 1, 1.0),
            ],
            1.0,
        )
    }

    fn test_config() -> VnsConfig {
        VnsConfig {
            max_iterations: 1000,
            max_no_improve: 30,
            initial_neighborhood_size: 5,
            max_neighborhood_size: 15,
            num_changes: 2,
            seed: 42,
        }
    }

    #[test]
    fn test_vns_repairs_greedy_construction() {
        let instance = create_test_instance();
        let mut solution = NearestExitHeuristic::new().construct(&instance).unwrap();
        // The greedy build parks O3 at the far exit of an already busy zone
        assert!((solution.evaluate().unwrap().w_max - 30.0).abs() < 1e-9);

        let vns = VariableNeighborhoodSearch::new(test_config());
        let improved = vns.improve(&instance, &mut solution).unwrap();

        assert!(improved);
        assert!(solution.verify(&instance).is_ok());
        // Swapping the big order at the near exit with the small one across
        // zones reaches the balance optimum
        assert!((solution.evaluate().unwrap().w_max - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_vns_never_degrades() {
        let instance = create_test_instance();
        let initial = NearestExitHeuristic::new().construct(&instance).unwrap();
        let before = initial.evaluate().unwrap();

        let mut solution = initial.clone();
        let vns = VariableNeighborhoodSearch::new(test_config());
        let improved = vns.improve(&instance, &mut solution).unwrap();

        let after = solution.evaluate().unwrap();
        assert!(after.w_max <= before.w_max + 1e-9);
        if !improved {
            assert_eq!(solution.assignments, initial.assignments);
        }
    }

    #[test]
    fn test_vns_is_deterministic() {
        let instance = create_test_instance();
        let vns = VariableNeighborhoodSearch::new(test_config());

        let first = vns.run(&instance).unwrap();
        let second = vns.run(&instance).unwrap();

        assert_eq!(first.assignments, second.assignments);
        assert_eq!(first.iterations, second.iterations);
    }

    #[test]
    fn test_vns_stops_on_stagnation() {
        let instance = create_test_instance();
        let mut solution = NearestExitHeuristic::new().construct(&instance).unwrap();

        let config = VnsConfig {
            max_iterations: 100_000,
            max_no_improve: 5,
            ..test_config()
        };
        let vns = VariableNeighborhoodSearch::new(config);
        vns.improve(&instance, &mut solution).unwrap();

        // Far from the iteration cap: the stagnation counter ended the run
        let iterations = solution.iterations.unwrap();
        assert!(iterations < 100_000);
    }

    #[test]
    fn test_vns_zero_budget_is_identity() {
        let instance = create_test_instance();
        let initial = NearestExitHeuristic::new().construct(&instance).unwrap();

        let mut solution = initial.clone();
        let config = VnsConfig {
            max_iterations: 0,
            ..VnsConfig::default()
        };
        let improved = VariableNeighborhoodSearch::new(config)
            .improve(&instance, &mut solution)
            .unwrap();

        assert!(!improved);
        assert_eq!(solution.assignments, initial.assignments);
        assert_eq!(solution.iterations, None);
    }

    #[test]
    fn test_vns_zero_config_counts_are_identity() {
        let instance = create_test_instance();
        let initial = NearestExitHeuristic::new().construct(&instance).unwrap();

        // Each count knob zeroed in turn; none of them may start the search
        let zeroed = [
            VnsConfig {
                max_no_improve: 0,
                ..test_config()
            },
            VnsConfig {
                initial_neighborhood_size: 0,
                ..test_config()
            },
            VnsConfig {
                max_neighborhood_size: 0,
                ..test_config()
            },
            VnsConfig {
                num_changes: 0,
                ..test_config()
            },
        ];

        for config in zeroed {
            let mut solution = initial.clone();
            let improved = VariableNeighborhoodSearch::new(config)
                .improve(&instance, &mut solution)
                .unwrap();

            assert!(!improved);
            assert_eq!(solution.assignments, initial.assignments);
            assert_eq!(solution.iterations, None);
        }
    }

    #[test]
    fn test_vns_run_sets_metadata() {
        let instance = create_test_instance();
        let solution = VariableNeighborhoodSearch::new(test_config())
            .run(&instance)
            .unwrap();

        assert_eq!(solution.algorithm, "VNS");
        assert!(solution.iterations.is_some());
        assert!(solution.verify(&instance).is_ok());
    }
}
