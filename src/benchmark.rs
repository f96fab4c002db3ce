//! Benchmarking and experimentation module for the dispatching heuristics.
//!
//! Provides tools for running the solver family over instance sets,
//! collecting per-run results and exporting CSV summaries and reports.

use crate::error::SolverError;
use crate::heuristics::construction::*;
use crate::heuristics::evolutionary::{OnePlusOneConfig, OnePlusOneEvolution};
use crate::heuristics::local_search::{VariableNeighborhoodSearch, VnsConfig};
use crate::instance::PtlInstance;
use crate::solution::Solution;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Result of running a single algorithm on an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmResult {
    /// Algorithm name
    pub algorithm: String,
    /// Instance name
    pub instance: String,
    /// Number of orders
    pub num_orders: usize,
    /// Number of zones
    pub num_zones: usize,
    /// Makespan (load of the most loaded zone)
    pub makespan: f64,
    /// Spread between the most and least loaded zones
    pub spread: f64,
    /// Whether the assignment passed validation
    pub valid: bool,
    /// Computation time in seconds
    pub time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
    /// Gap to the balance lower bound in percent (if the bound is usable)
    pub gap_to_bound: Option<f64>,
}

/// Aggregated statistics for an algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    /// Algorithm name
    pub algorithm: String,
    /// Number of recorded runs
    pub num_runs: usize,
    /// Number of valid assignments
    pub num_valid: usize,
    /// Average makespan
    pub avg_makespan: f64,
    /// Best makespan
    pub best_makespan: f64,
    /// Worst makespan
    pub worst_makespan: f64,
    /// Standard deviation of the makespan
    pub std_makespan: f64,
    /// Average spread
    pub avg_spread: f64,
    /// Average time
    pub avg_time: f64,
    /// Total time
    pub total_time: f64,
    /// Average gap to the balance lower bound
    pub avg_gap: Option<f64>,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of runs per stochastic algorithm
    pub num_runs: usize,
    /// Trials per multi-start construction
    pub multistart_trials: usize,
    /// Iteration budget of the improvement searches
    pub max_iterations: usize,
    /// Base random seed; run `r` uses `seed + r`
    pub seed: u64,
    /// Run the multi-start trials on the rayon thread pool
    pub parallel: bool,
    /// Output directory
    pub output_dir: String,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            multistart_trials: 1000,
            max_iterations: 1000,
            seed: 42,
            parallel: false,
            output_dir: "results".to_string(),
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<AlgorithmResult>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
        }
    }

    /// Run the whole algorithm family on one instance. The deterministic
    /// construction runs once, the stochastic methods `num_runs` times
    /// with shifted seeds.
    pub fn run_full_benchmark(&mut self, instance: &PtlInstance) -> Result<(), SolverError> {
        let pb = ProgressBar::new((3 * self.config.num_runs + 1) as u64);
        pb.set_style(
            ProgressStyle::with_template("  [{elapsed_precise}] {bar:30} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        pb.set_message("NearestExit");
        let solution = NearestExitHeuristic::new().construct(instance)?;
        self.record(instance, &solution);
        pb.inc(1);

        for run in 0..self.config.num_runs {
            let seed = self.config.seed.wrapping_add(run as u64);

            pb.set_message(format!("MultiStart run {}", run + 1));
            let multi = if self.config.parallel {
                RandomizedMultiStart::parallel(self.config.multistart_trials, seed)
            } else {
                RandomizedMultiStart::new(self.config.multistart_trials, seed)
            };
            let solution = multi.construct(instance)?;
            self.record(instance, &solution);
            pb.inc(1);

            pb.set_message(format!("VNS run {}", run + 1));
            let vns = VariableNeighborhoodSearch::new(VnsConfig {
                max_iterations: self.config.max_iterations,
                seed,
                ..Default::default()
            });
            let solution = vns.run(instance)?;
            self.record(instance, &solution);
            pb.inc(1);

            pb.set_message(format!("(1+1)-EA run {}", run + 1));
            let ea = OnePlusOneEvolution::new(OnePlusOneConfig {
                max_iterations: self.config.max_iterations,
                seed,
            });
            let solution = ea.run(instance)?;
            self.record(instance, &solution);
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(())
    }

    /// Record a result
    fn record(&mut self, instance: &PtlInstance, solution: &Solution) {
        let objective = match solution.evaluate() {
            Ok(objective) => objective,
            Err(e) => {
                log::warn!("skipping unevaluable {} result: {}", solution.algorithm, e);
                return;
            }
        };

        let bound = instance.statistics().load_lower_bound;
        let gap_to_bound = if bound.is_finite() && bound > 0.0 {
            Some((objective.w_max - bound) / bound * 100.0)
        } else {
            None
        };

        self.results.push(AlgorithmResult {
            algorithm: solution.algorithm.clone(),
            instance: instance.name.clone(),
            num_orders: instance.num_orders(),
            num_zones: instance.num_zones(),
            makespan: objective.w_max,
            spread: objective.spread,
            valid: solution.verify(instance).is_ok(),
            time: solution.computation_time,
            iterations: solution.iterations,
            gap_to_bound,
        });
    }

    /// Compute statistics for each algorithm
    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut stats_map: HashMap<String, Vec<&AlgorithmResult>> = HashMap::new();

        for result in &self.results {
            stats_map
                .entry(result.algorithm.clone())
                .or_default()
                .push(result);
        }

        let mut statistics = Vec::new();

        for (algo, results) in stats_map {
            let makespans: Vec<f64> = results.iter().map(|r| r.makespan).collect();
            let times: Vec<f64> = results.iter().map(|r| r.time).collect();
            let gaps: Vec<f64> = results.iter().filter_map(|r| r.gap_to_bound).collect();

            let avg_makespan = makespans.iter().sum::<f64>() / makespans.len() as f64;
            let best_makespan = makespans.iter().cloned().fold(f64::INFINITY, f64::min);
            let worst_makespan = makespans.iter().cloned().fold(0.0, f64::max);

            let variance = makespans
                .iter()
                .map(|m| (m - avg_makespan).powi(2))
                .sum::<f64>()
                / makespans.len() as f64;
            let std_makespan = variance.sqrt();

            let avg_spread =
                results.iter().map(|r| r.spread).sum::<f64>() / results.len() as f64;
            let avg_time = times.iter().sum::<f64>() / times.len() as f64;
            let total_time = times.iter().sum::<f64>();

            let avg_gap = if !gaps.is_empty() {
                Some(gaps.iter().sum::<f64>() / gaps.len() as f64)
            } else {
                None
            };

            statistics.push(AlgorithmStatistics {
                algorithm: algo,
                num_runs: results.len(),
                num_valid: results.iter().filter(|r| r.valid).count(),
                avg_makespan,
                best_makespan,
                worst_makespan,
                std_makespan,
                avg_spread,
                avg_time,
                total_time,
                avg_gap,
            });
        }

        statistics.sort_by(|a, b| {
            a.avg_makespan
                .partial_cmp(&b.avg_makespan)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        let stats = self.compute_statistics();
        for stat in stats {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Write results.csv, statistics.csv and report.txt into the
    /// configured output directory
    pub fn export_all(&self) -> std::io::Result<()> {
        let dir = Path::new(&self.config.output_dir);
        std::fs::create_dir_all(dir)?;
        self.export_to_csv(dir.join("results.csv"))?;
        self.export_statistics_csv(dir.join("statistics.csv"))?;
        std::fs::write(dir.join("report.txt"), self.generate_report())?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("   PTL Dispatching Benchmark Report\n");
        report.push_str(&format!(
            "   generated {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        report.push_str("========================================\n\n");

        let stats = self.compute_statistics();

        report.push_str("Algorithm Performance Summary:\n");
        report.push_str("-".repeat(90).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<22} {:>8} {:>12} {:>12} {:>10} {:>10} {:>10}\n",
            "Algorithm", "Valid", "Avg Wmax", "Best Wmax", "Std", "Avg Gap%", "Avg Time"
        ));
        report.push_str("-".repeat(90).as_str());
        report.push('\n');

        for stat in &stats {
            let gap_str = stat
                .avg_gap
                .map(|g| format!("{:.2}", g))
                .unwrap_or_else(|| "-".to_string());

            report.push_str(&format!(
                "{:<22} {:>8} {:>12.2} {:>12.2} {:>10.2} {:>10} {:>10.4}\n",
                stat.algorithm,
                format!("{}/{}", stat.num_valid, stat.num_runs),
                stat.avg_makespan,
                stat.best_makespan,
                stat.std_makespan,
                gap_str,
                stat.avg_time
            ));
        }

        report.push_str("-".repeat(90).as_str());
        report.push('\n');

        report.push_str("\nBest Makespan per Instance:\n");

        let mut instance_best: HashMap<String, &AlgorithmResult> = HashMap::new();
        for result in &self.results {
            let entry = instance_best
                .entry(result.instance.clone())
                .or_insert(result);
            if result.makespan < entry.makespan {
                *entry = result;
            }
        }

        let mut lines: Vec<_> = instance_best.into_iter().collect();
        lines.sort_by(|a, b| a.0.cmp(&b.0));
        for (instance, best) in lines {
            report.push_str(&format!(
                "  {}: {:.2} ({})\n",
                instance, best.makespan, best.algorithm
            ));
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[AlgorithmResult] {
        &self.results
    }
}

/// Load all JSON instances found in a directory, smallest first
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> Vec<PtlInstance> {
    let mut instances = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return instances,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "json") {
            match PtlInstance::from_file(&path) {
                Ok(instance) => instances.push(instance),
                Err(e) => log::warn!("skipping {}: {}", path.display(), e),
            }
        }
    }

    instances.sort_by(|a, b| {
        a.num_orders()
            .cmp(&b.num_orders())
            .then_with(|| a.name.cmp(&b.name))
    });
    instances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::RandomInstanceConfig;

    fn small_config() -> BenchmarkConfig {
        BenchmarkConfig {
            num_runs: 2,
            multistart_trials: 10,
            max_iterations: 20,
            seed: 42,
            parallel: false,
            output_dir: "results".to_string(),
        }
    }

    #[test]
    fn test_full_benchmark_records_all_runs() {
        let instance = PtlInstance::generate(&RandomInstanceConfig {
            num_orders: 12,
            num_zones: 3,
            ..Default::default()
        });

        let mut benchmark = Benchmark::new(small_config());
        benchmark.run_full_benchmark(&instance).unwrap();

        // One deterministic build plus three algorithms over two runs
        assert_eq!(benchmark.results().len(), 1 + 3 * 2);
        assert!(benchmark.results().iter().all(|r| r.valid));
        assert!(benchmark.results().iter().all(|r| r.makespan > 0.0));
    }

    #[test]
    fn test_statistics_aggregate_per_algorithm() {
        let instance = PtlInstance::generate(&RandomInstanceConfig {
            num_orders: 12,
            num_zones: 3,
            ..Default::default()
        });

        let mut benchmark = Benchmark::new(small_config());
        benchmark.run_full_benchmark(&instance).unwrap();

        let stats = benchmark.compute_statistics();
        assert_eq!(stats.len(), 4);
        for stat in &stats {
            assert!(stat.best_makespan <= stat.avg_makespan + 1e-9);
            assert!(stat.avg_makespan <= stat.worst_makespan + 1e-9);
            assert_eq!(stat.num_valid, stat.num_runs);
        }
        // Sorted by average makespan
        for pair in stats.windows(2) {
            assert!(pair[0].avg_makespan <= pair[1].avg_makespan + 1e-9);
        }
    }

    #[test]
    fn test_csv_export() {
        let instance = PtlInstance::generate(&RandomInstanceConfig {
            num_orders: 8,
            num_zones: 2,
            ..Default::default()
        });

        let mut benchmark = Benchmark::new(BenchmarkConfig {
            num_runs: 1,
            multistart_trials: 5,
            max_iterations: 10,
            ..small_config()
        });
        benchmark.run_full_benchmark(&instance).unwrap();

        let path = std::env::temp_dir().join(format!("ptl_bench_test_{}.csv", std::process::id()));
        benchmark.export_to_csv(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert!(content.contains("NearestExit"));
        assert!(content.contains("VNS"));
        // Header plus one line per result
        assert_eq!(content.lines().count(), 1 + benchmark.results().len());
    }

    #[test]
    fn test_report_contains_summary() {
        let instance = PtlInstance::generate(&RandomInstanceConfig {
            num_orders: 8,
            num_zones: 2,
            ..Default::default()
        });

        let mut benchmark = Benchmark::new(BenchmarkConfig {
            num_runs: 1,
            multistart_trials: 5,
            max_iterations: 10,
            ..small_config()
        });
        benchmark.run_full_benchmark(&instance).unwrap();

        let report = benchmark.generate_report();
        assert!(report.contains("Benchmark Report"));
        assert!(report.contains("Best Makespan per Instance"));
        assert!(report.contains(&instance.name));
    }
}
