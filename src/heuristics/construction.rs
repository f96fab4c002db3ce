use crate::error::SolverError;
use crate::instance::PtlInstance;
use crate::solution::{Objective, Solution};
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

pub trait ConstructionHeuristic {
    fn construct(&self, instance: &PtlInstance) -> Result<Solution, SolverError>;
    fn name(&self) -> &str;
}

/// Assign the orders of `sequence` one by one: each order goes to the
/// least loaded zone that still has a free exit, through the free exit of
/// that zone with the smallest travel time. Ties fall to the lowest index.
fn construct_with_sequence(
    instance: &PtlInstance,
    sequence: &[usize],
) -> Result<Solution, SolverError> {
    let mut solution = Solution::new(instance);
    let mut free_exits = instance.exits_by_zone();

    for &order in sequence {
        let zone = (0..instance.num_zones())
            .filter(|&z| !free_exits[z].is_empty())
            .min_by_key(|&z| OrderedFloat(solution.zone_loads[z]))
            .ok_or(SolverError::NoAvailableZone { order })?;

        // Pools keep ascending exit indices, so the first minimum wins ties
        let pos = free_exits[zone]
            .iter()
            .enumerate()
            .min_by_key(|(_, &e)| OrderedFloat(instance.exits[e].travel_time))
            .map(|(pos, _)| pos)
            .ok_or(SolverError::NoAvailableZone { order })?;
        let exit = free_exits[zone].remove(pos);

        solution.assign(instance, order, exit);
    }

    Ok(solution)
}

/// Nearest-Exit Heuristic
///
/// Builds an assignment by treating the orders from the largest to the
/// smallest SKU count, sending each one to the least loaded zone and to
/// the closest free exit inside it. Fully deterministic.
pub struct NearestExitHeuristic;

impl NearestExitHeuristic {
    pub fn new() -> Self {
        NearestExitHeuristic
    }
}

impl Default for NearestExitHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for NearestExitHeuristic {
    fn construct(&self, instance: &PtlInstance) -> Result<Solution, SolverError> {
        let start = std::time::Instant::now();

        let mut sequence: Vec<usize> = (0..instance.num_orders()).collect();
        // Stable sort: equal SKU counts keep their instance order
        sequence.sort_by_key(|&i| std::cmp::Reverse(instance.orders[i].sku_count));

        let mut solution = construct_with_sequence(instance, &sequence)?;
        solution.algorithm = self.name().to_string();
        solution.computation_time = start.elapsed().as_secs_f64();
        Ok(solution)
    }

    fn name(&self) -> &str {
        "NearestExit"
    }
}

/// Randomized Multi-Start Construction
///
/// Repeats the nearest-exit construction over independently shuffled order
/// sequences and keeps the lexicographically best result. Trial `t` uses
/// its own generator seeded with `seed + t`, so the outcome only depends
/// on `(trials, seed)` and the parallel and sequential paths return the
/// same solution.
pub struct RandomizedMultiStart {
    /// Number of shuffled construction trials
    pub trials: usize,
    /// Base random seed
    pub seed: u64,
    /// Run the trials on the rayon thread pool
    pub parallel: bool,
}

impl RandomizedMultiStart {
    pub fn new(trials: usize, seed: u64) -> Self {
        RandomizedMultiStart {
            trials,
            seed,
            parallel: false,
        }
    }

    pub fn parallel(trials: usize, seed: u64) -> Self {
        RandomizedMultiStart {
            trials,
            seed,
            parallel: true,
        }
    }

    fn run_trial(&self, instance: &PtlInstance, trial: usize) -> Result<Solution, SolverError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(trial as u64));
        let mut sequence: Vec<usize> = (0..instance.num_orders()).collect();
        sequence.shuffle(&mut rng);
        construct_with_sequence(instance, &sequence)
    }

    /// Keep the best trial by `(objective, trial index)`. Failed trials are
    /// dropped; the first failure is reported only when every trial failed.
    fn select_best(
        results: impl IntoIterator<Item = (usize, Result<Solution, SolverError>)>,
    ) -> Result<Solution, SolverError> {
        let mut best: Option<(Objective, usize, Solution)> = None;
        let mut first_error: Option<SolverError> = None;

        for (trial, result) in results {
            let solution = match result {
                Ok(solution) => solution,
                Err(e) => {
                    log::debug!("construction trial {} discarded: {}", trial, e);
                    first_error.get_or_insert(e);
                    continue;
                }
            };
            let objective = match solution.evaluate() {
                Ok(objective) => objective,
                Err(e) => {
                    log::debug!("construction trial {} discarded: {}", trial, e);
                    first_error.get_or_insert(e);
                    continue;
                }
            };

            let replace = match &best {
                Some((incumbent, best_trial, _)) => {
                    (objective.key(), trial) < (incumbent.key(), *best_trial)
                }
                None => true,
            };
            if replace {
                best = Some((objective, trial, solution));
            }
        }

        match best {
            Some((_, _, solution)) => Ok(solution),
            None => Err(first_error.unwrap_or(SolverError::NoAvailableZone { order: 0 })),
        }
    }
}

impl Default for RandomizedMultiStart {
    fn default() -> Self {
        Self::new(1000, 42)
    }
}

impl ConstructionHeuristic for RandomizedMultiStart {
    fn construct(&self, instance: &PtlInstance) -> Result<Solution, SolverError> {
        let start = std::time::Instant::now();

        if self.trials == 0 {
            return NearestExitHeuristic::new().construct(instance);
        }

        let mut solution = if self.parallel {
            let results: Vec<(usize, Result<Solution, SolverError>)> = (0..self.trials)
                .into_par_iter()
                .map(|t| (t, self.run_trial(instance, t)))
                .collect();
            Self::select_best(results)?
        } else {
            Self::select_best((0..self.trials).map(|t| (t, self.run_trial(instance, t))))?
        };

        solution.algorithm = self.name().to_string();
        solution.computation_time = start.elapsed().as_secs_f64();
        solution.iterations = Some(self.trials);
        Ok(solution)
    }

    fn name(&self) -> &str {
        "MultiStart-NearestExit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Exit, Order};

    fn create_test_instance() -> PtlInstance {
        PtlInstance::new(
            "test",
            vec![Order::new("O1", 1, 0.0), Order::new("O2", 1, 0.0)],
            vec!["A".to_string(), "B".to_string()],
            vec![Exit::new("a", 0, 1.0), Exit::new("b", 1, 1.0)],
            1.0,
        )
    }

    fn larger_instance() -> PtlInstance {
        PtlInstance::new(
            "larger",
            vec![
                Order::new("O1", 2, 1.0),
                Order::new("O2", 5, 2.0),
                Order::new("O3", 5, 1.0),
                Order::new("O4", 1, 0.5),
                Order::new("O5", 3, 1.5),
                Order::new("O6", 4, 2.5),
            ],
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            vec![
                Exit::new("E1", 0, 1.0),
                Exit::new("E2", 0, 4.0),
                Exit::new("E3", 1, 2.0),
                Exit::new("E4", 1, 3.0),
                Exit::new("E5", 2, 1.5),
                Exit::new("E6", 2, 5.0),
            ],
            2.0,
        )
    }

    #[test]
    fn test_nearest_exit_balances_two_orders() {
        let instance = create_test_instance();
        let solution = NearestExitHeuristic::new().construct(&instance).unwrap();

        assert!(solution.verify(&instance).is_ok());
        // One order per zone, each with processing time 2
        assert!((solution.zone_loads[0] - 2.0).abs() < 1e-9);
        assert!((solution.zone_loads[1] - 2.0).abs() < 1e-9);

        let objective = solution.evaluate().unwrap();
        assert!((objective.w_max - 2.0).abs() < 1e-9);
        assert!(objective.spread.abs() < 1e-9);
    }

    #[test]
    fn test_nearest_exit_prefers_big_orders_first() {
        let instance = larger_instance();
        let solution = NearestExitHeuristic::new().construct(&instance).unwrap();

        assert!(solution.verify(&instance).is_ok());
        // O2 (5 SKUs, first among the largest) is treated first: all zones
        // are empty, so it takes zone A and its closest exit E1
        let a = solution.assignments[1].unwrap();
        assert_eq!(a.exit, 0);
        assert_eq!(a.zone, 0);
    }

    #[test]
    fn test_nearest_exit_is_deterministic() {
        let instance = larger_instance();
        let first = NearestExitHeuristic::new().construct(&instance).unwrap();
        let second = NearestExitHeuristic::new().construct(&instance).unwrap();

        assert_eq!(first.assignments, second.assignments);
    }

    #[test]
    fn test_nearest_exit_handles_empty_zone() {
        // Zone B exists but owns no exit; all the work lands in zone A
        let instance = PtlInstance::new(
            "one-sided",
            vec![Order::new("O1", 1, 0.0), Order::new("O2", 2, 0.0)],
            vec!["A".to_string(), "B".to_string()],
            vec![Exit::new("a1", 0, 1.0), Exit::new("a2", 0, 2.0)],
            1.0,
        );

        let solution = NearestExitHeuristic::new().construct(&instance).unwrap();
        assert!(solution.verify(&instance).is_ok());
        assert!(solution.zone_loads[1].abs() < 1e-9);

        // With one working zone the spread equals the makespan
        let objective = solution.evaluate().unwrap();
        assert!((objective.w_max - solution.total_load()).abs() < 1e-9);
        assert!((objective.spread - objective.w_max).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_exit_fails_without_exits() {
        // Two orders competing for a single exit
        let instance = PtlInstance::new(
            "starved",
            vec![Order::new("O1", 1, 0.0), Order::new("O2", 1, 0.0)],
            vec!["A".to_string()],
            vec![Exit::new("a", 0, 1.0)],
            1.0,
        );

        let result = NearestExitHeuristic::new().construct(&instance);
        assert_eq!(
            result.unwrap_err(),
            SolverError::NoAvailableZone { order: 1 }
        );
    }

    #[test]
    fn test_multi_start_is_deterministic() {
        let instance = larger_instance();
        let heuristic = RandomizedMultiStart::new(50, 7);

        let first = heuristic.construct(&instance).unwrap();
        let second = heuristic.construct(&instance).unwrap();
        assert_eq!(first.assignments, second.assignments);
        assert!(first.verify(&instance).is_ok());
    }

    #[test]
    fn test_multi_start_matches_parallel() {
        let instance = larger_instance();
        let sequential = RandomizedMultiStart::new(40, 3).construct(&instance).unwrap();
        let parallel = RandomizedMultiStart::parallel(40, 3).construct(&instance).unwrap();

        assert_eq!(sequential.assignments, parallel.assignments);
    }

    #[test]
    fn test_multi_start_never_degrades_with_more_trials() {
        let instance = larger_instance();
        let few = RandomizedMultiStart::new(5, 11).construct(&instance).unwrap();
        let many = RandomizedMultiStart::new(50, 11).construct(&instance).unwrap();

        let few_obj = few.evaluate().unwrap();
        let many_obj = many.evaluate().unwrap();
        // The first 5 trials are a prefix of the 50, so the best can only improve
        assert!(many_obj.w_max <= few_obj.w_max + 1e-9);
    }

    #[test]
    fn test_multi_start_zero_trials_falls_back() {
        let instance = larger_instance();
        let fallback = RandomizedMultiStart::new(0, 42).construct(&instance).unwrap();
        let deterministic = NearestExitHeuristic::new().construct(&instance).unwrap();

        assert_eq!(fallback.assignments, deterministic.assignments);
    }

    #[test]
    fn test_multi_start_reports_error_when_all_trials_fail() {
        let instance = PtlInstance::new(
            "starved",
            vec![Order::new("O1", 1, 0.0), Order::new("O2", 1, 0.0)],
            vec!["A".to_string()],
            vec![Exit::new("a", 0, 1.0)],
            1.0,
        );

        let result = RandomizedMultiStart::new(4, 42).construct(&instance);
        assert!(matches!(result, Err(SolverError::NoAvailableZone { .. })));
    }
}
