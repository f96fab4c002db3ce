//! PTL Dispatching Solver - Command Line Interface
//!
//! Assigns customer orders to put-to-light exits so that the classification
//! workload is balanced across warehouse zones.

use clap::{Parser, Subcommand, ValueEnum};
use ptl_dispatch_solver::benchmark::{load_instances_from_dir, Benchmark, BenchmarkConfig};
use ptl_dispatch_solver::error::SolverError;
use ptl_dispatch_solver::heuristics::construction::*;
use ptl_dispatch_solver::heuristics::evolutionary::{OnePlusOneConfig, OnePlusOneEvolution};
use ptl_dispatch_solver::heuristics::local_search::{VariableNeighborhoodSearch, VnsConfig};
use ptl_dispatch_solver::instance::{PtlInstance, RandomInstanceConfig};
use ptl_dispatch_solver::solution::Solution;

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ptl-dispatch-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Workload balancing solver for put-to-light order dispatching")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single instance with a chosen algorithm
    Solve {
        /// Path to the instance file (JSON)
        #[arg(short, long)]
        instance: PathBuf,

        /// Algorithm to use
        #[arg(short, long, value_enum, default_value = "multi-start")]
        algorithm: Algorithm,

        /// Number of multi-start trials
        #[arg(short, long, default_value = "1000")]
        trials: usize,

        /// Iteration budget for the improvement searches
        #[arg(long, default_value = "1000")]
        iterations: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Run the multi-start trials on the rayon thread pool
        #[arg(short, long)]
        parallel: bool,

        /// Output solution to file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output with the full exit assignment
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run benchmarks on a directory of instances
    Benchmark {
        /// Directory containing instance files
        #[arg(short, long)]
        dir: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of runs per stochastic algorithm
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// Trials per multi-start construction
        #[arg(short, long, default_value = "1000")]
        trials: usize,

        /// Iteration budget for the improvement searches
        #[arg(long, default_value = "1000")]
        iterations: usize,

        /// Base random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Run the multi-start trials on the rayon thread pool
        #[arg(short, long)]
        parallel: bool,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file (JSON)
        #[arg(short, long)]
        instance: PathBuf,
    },

    /// Compare algorithms on an instance
    Compare {
        /// Path to the instance file (JSON)
        #[arg(short, long)]
        instance: PathBuf,

        /// Number of runs per algorithm
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// Trials per multi-start construction
        #[arg(short, long, default_value = "1000")]
        trials: usize,

        /// Iteration budget for the improvement searches
        #[arg(long, default_value = "1000")]
        iterations: usize,

        /// Base random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Write per-run results to a CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a random instance file
    Generate {
        /// Output path for the instance (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// Number of orders (and exits)
        #[arg(short = 'n', long, default_value = "40")]
        orders: usize,

        /// Number of zones
        #[arg(short, long, default_value = "4")]
        zones: usize,

        /// Draw uneven zone layouts instead of a round-robin split
        #[arg(long)]
        heterogeneous: bool,

        /// Maximum SKU count per order
        #[arg(short, long, default_value = "10")]
        max_skus: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
}

/// Available algorithms
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Algorithm {
    /// Deterministic nearest-exit construction
    Nearest,
    /// Randomized multi-start construction
    MultiStart,
    /// Variable neighborhood search over the nearest-exit build
    Vns,
    /// (1+1) evolutionary search over the nearest-exit build
    Evolutionary,
}

/// Per-run record written by the compare command
#[derive(serde::Serialize)]
struct CompareRow {
    algorithm: String,
    run: usize,
    seed: u64,
    makespan: f64,
    spread: f64,
    time: f64,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            instance,
            algorithm,
            trials,
            iterations,
            seed,
            parallel,
            output,
            verbose,
        } => solve_instance(
            &instance,
            algorithm,
            trials,
            iterations,
            seed,
            parallel,
            output,
            verbose,
        ),
        Commands::Benchmark {
            dir,
            output,
            runs,
            trials,
            iterations,
            seed,
            parallel,
        } => run_benchmark(&dir, &output, runs, trials, iterations, seed, parallel),
        Commands::Analyze { instance } => analyze_instance(&instance),
        Commands::Compare {
            instance,
            runs,
            trials,
            iterations,
            seed,
            output,
        } => compare_algorithms(&instance, runs, trials, iterations, seed, output),
        Commands::Generate {
            output,
            orders,
            zones,
            heterogeneous,
            max_skus,
            seed,
        } => generate_instance(&output, orders, zones, heterogeneous, max_skus, seed),
    }
}

fn load_instance(path: &PathBuf) -> PtlInstance {
    match PtlInstance::from_file(path) {
        Ok(instance) => instance,
        Err(e) => {
            eprintln!("Error loading instance: {}", e);
            std::process::exit(1);
        }
    }
}

fn solve_instance(
    path: &PathBuf,
    algorithm: Algorithm,
    trials: usize,
    iterations: usize,
    seed: u64,
    parallel: bool,
    output: Option<PathBuf>,
    verbose: bool,
) {
    let instance = load_instance(path);

    println!("Instance: {}", instance.name);
    println!(
        "  {} orders, {} zones, {} exits",
        instance.num_orders(),
        instance.num_zones(),
        instance.num_exits()
    );
    println!("Solving with {:?}...", algorithm);

    let result = match algorithm {
        Algorithm::Nearest => NearestExitHeuristic::new().construct(&instance),
        Algorithm::MultiStart => {
            let heuristic = if parallel {
                RandomizedMultiStart::parallel(trials, seed)
            } else {
                RandomizedMultiStart::new(trials, seed)
            };
            heuristic.construct(&instance)
        }
        Algorithm::Vns => {
            let config = VnsConfig {
                max_iterations: iterations,
                seed,
                ..Default::default()
            };
            VariableNeighborhoodSearch::new(config).run(&instance)
        }
        Algorithm::Evolutionary => {
            let config = OnePlusOneConfig {
                max_iterations: iterations,
                seed,
            };
            OnePlusOneEvolution::new(config).run(&instance)
        }
    };

    let solution = match result {
        Ok(solution) => solution,
        Err(e) => {
            eprintln!("Error solving instance: {}", e);
            std::process::exit(1);
        }
    };

    print_results(&instance, &solution, verbose);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&solution).expect("Failed to serialize solution");
        std::fs::write(&path, json).expect("Failed to write output file");
        println!("\nSolution written to {}", path.display());
    }
}

fn print_results(instance: &PtlInstance, solution: &Solution, verbose: bool) {
    let objective = match solution.evaluate() {
        Ok(objective) => objective,
        Err(e) => {
            eprintln!("Error evaluating solution: {}", e);
            std::process::exit(1);
        }
    };

    println!("\n========== Results ==========");
    println!("Algorithm: {}", solution.algorithm);
    println!("Makespan (Wmax): {:.2}", objective.w_max);
    println!("Spread (Wmax - Wmin): {:.2}", objective.spread);

    let bound = instance.statistics().load_lower_bound;
    if bound.is_finite() && bound > 0.0 {
        println!(
            "Gap to balance bound: {:.2}%",
            (objective.w_max - bound) / bound * 100.0
        );
    }

    match solution.verify(instance) {
        Ok(()) => println!("Valid: yes"),
        Err(e) => println!("Valid: NO ({})", e),
    }

    println!("Time: {:.4}s", solution.computation_time);
    if let Some(iterations) = solution.iterations {
        println!("Iterations: {}", iterations);
    }

    println!("\nZone loads:");
    for (z, load) in solution.zone_loads.iter().enumerate() {
        println!("  {}: {:.2}", instance.zones[z], load);
    }

    if verbose {
        println!("\nAssignment:");
        for (o, slot) in solution.assignments.iter().enumerate() {
            match slot {
                Some(assignment) => println!(
                    "  {} -> {} ({}, {:.2})",
                    instance.orders[o].label,
                    instance.exits[assignment.exit].label,
                    instance.zones[assignment.zone],
                    assignment.processing_time
                ),
                None => println!("  {} -> unassigned", instance.orders[o].label),
            }
        }
    }
}

fn run_benchmark(
    dir: &PathBuf,
    output: &PathBuf,
    runs: usize,
    trials: usize,
    iterations: usize,
    seed: u64,
    parallel: bool,
) {
    let instances = load_instances_from_dir(dir);
    if instances.is_empty() {
        eprintln!("No instances found in {}", dir.display());
        std::process::exit(1);
    }

    println!("Loaded {} instances from {}", instances.len(), dir.display());

    let config = BenchmarkConfig {
        num_runs: runs,
        multistart_trials: trials,
        max_iterations: iterations,
        seed,
        parallel,
        output_dir: output.display().to_string(),
    };

    let mut benchmark = Benchmark::new(config);

    for (i, instance) in instances.iter().enumerate() {
        println!(
            "[{}/{}] {} ({} orders, {} zones)",
            i + 1,
            instances.len(),
            instance.name,
            instance.num_orders(),
            instance.num_zones()
        );
        if let Err(e) = benchmark.run_full_benchmark(instance) {
            eprintln!("  skipped: {}", e);
        }
    }

    benchmark.export_all().expect("Failed to write result files");

    println!("\n{}", benchmark.generate_report());
    println!("Results written to {}", output.display());
}

fn analyze_instance(path: &PathBuf) {
    let instance = load_instance(path);

    println!("========== Instance Analysis ==========");
    println!("{}", instance.statistics());

    println!("Exits per zone:");
    for (z, zone) in instance.zones.iter().enumerate() {
        let exits = instance.exits_in_zone(z);
        let avg_travel = if exits.is_empty() {
            0.0
        } else {
            exits
                .iter()
                .map(|&e| instance.exits[e].travel_time)
                .sum::<f64>()
                / exits.len() as f64
        };
        println!(
            "  {}: {} exits, avg travel {:.2}",
            zone,
            exits.len(),
            avg_travel
        );
    }

    println!("\nQuick estimates:");
    if let Ok(solution) = NearestExitHeuristic::new().construct(&instance) {
        if let Ok(objective) = solution.evaluate() {
            println!("  NearestExit makespan:     {:.2}", objective.w_max);
        }
    }
    if let Ok(solution) = RandomizedMultiStart::new(200, 42).construct(&instance) {
        if let Ok(objective) = solution.evaluate() {
            println!("  MultiStart(200) makespan: {:.2}", objective.w_max);
        }
    }
}

fn compare_algorithms(
    path: &PathBuf,
    runs: usize,
    trials: usize,
    iterations: usize,
    seed: u64,
    output: Option<PathBuf>,
) {
    let instance = load_instance(path);

    println!(
        "Comparing algorithms on {} ({} orders, {} zones)",
        instance.name,
        instance.num_orders(),
        instance.num_zones()
    );
    println!("{} runs per algorithm\n", runs);

    type Solver = Box<dyn Fn(&PtlInstance, u64) -> Result<Solution, SolverError>>;

    let algorithms: Vec<(&str, Solver)> = vec![
        (
            "NearestExit",
            Box::new(|instance, _seed| NearestExitHeuristic::new().construct(instance)),
        ),
        (
            "MultiStart",
            Box::new(move |instance, seed| {
                RandomizedMultiStart::new(trials, seed).construct(instance)
            }),
        ),
        (
            "VNS",
            Box::new(move |instance, seed| {
                VariableNeighborhoodSearch::new(VnsConfig {
                    max_iterations: iterations,
                    seed,
                    ..Default::default()
                })
                .run(instance)
            }),
        ),
        (
            "(1+1)-EA",
            Box::new(move |instance, seed| {
                OnePlusOneEvolution::new(OnePlusOneConfig {
                    max_iterations: iterations,
                    seed,
                })
                .run(instance)
            }),
        ),
    ];

    let mut rows: Vec<CompareRow> = Vec::new();
    let mut summary: Vec<(String, f64, f64, f64, f64)> = Vec::new();

    for (name, solver) in &algorithms {
        print!("Testing {:<22}", name);
        let _ = std::io::stdout().flush();

        let mut makespans = Vec::new();
        let mut spreads = Vec::new();
        let mut times = Vec::new();

        for run in 0..runs {
            let run_seed = seed.wrapping_add(run as u64);
            let solved = solver(&instance, run_seed).and_then(|solution| {
                let objective = solution.evaluate()?;
                Ok((solution, objective))
            });
            match solved {
                Ok((solution, objective)) => {
                    makespans.push(objective.w_max);
                    spreads.push(objective.spread);
                    times.push(solution.computation_time);
                    rows.push(CompareRow {
                        algorithm: name.to_string(),
                        run,
                        seed: run_seed,
                        makespan: objective.w_max,
                        spread: objective.spread,
                        time: solution.computation_time,
                    });
                }
                Err(e) => eprintln!("\n  run {} failed: {}", run, e),
            }
        }

        if makespans.is_empty() {
            println!(" no successful runs");
            continue;
        }

        let best = makespans.iter().cloned().fold(f64::INFINITY, f64::min);
        let avg = makespans.iter().sum::<f64>() / makespans.len() as f64;
        let avg_spread = spreads.iter().sum::<f64>() / spreads.len() as f64;
        let avg_time = times.iter().sum::<f64>() / times.len() as f64;

        println!(
            " best {:>9.2}  avg {:>9.2}  time {:>8.4}s",
            best, avg, avg_time
        );
        summary.push((name.to_string(), best, avg, avg_spread, avg_time));
    }

    println!("\n========== Summary ==========");
    println!(
        "{:<22} {:>10} {:>10} {:>10} {:>10}",
        "Algorithm", "Best Wmax", "Avg Wmax", "Spread", "Time(s)"
    );
    for (name, best, avg, spread, time) in &summary {
        println!(
            "{:<22} {:>10.2} {:>10.2} {:>10.2} {:>10.4}",
            name, best, avg, spread, time
        );
    }

    if let Some(path) = output {
        let file = File::create(&path).expect("Failed to create output file");
        let mut writer = csv::Writer::from_writer(file);
        for row in &rows {
            writer.serialize(row).expect("Failed to write results");
        }
        writer.flush().expect("Failed to write results");
        println!("\nPer-run results written to {}", path.display());
    }
}

fn generate_instance(
    output: &PathBuf,
    orders: usize,
    zones: usize,
    heterogeneous: bool,
    max_skus: usize,
    seed: u64,
) {
    let config = RandomInstanceConfig {
        num_orders: orders,
        num_zones: zones,
        heterogeneous,
        max_skus,
        seed,
    };

    let instance = PtlInstance::generate(&config);

    if let Err(e) = instance.save(output) {
        eprintln!("Error writing instance: {}", e);
        std::process::exit(1);
    }

    println!("Generated {}", instance.name);
    println!("{}", instance.statistics());
    println!("Written to {}", output.display());
}
