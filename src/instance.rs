//! Module for loading and representing put-to-light dispatching instances.
//!
//! An instance describes one wave of customer orders to classify, the exits
//! of the sorting system grouped into zones, and the travel speed of the
//! operators. Instances are stored as JSON files and can also be generated
//! randomly for benchmarking.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Represents a customer order to classify
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier as given in the instance file
    pub label: String,
    /// Number of SKUs (distinct article references) contained in the order
    pub sku_count: usize,
    /// Fixed classification time of the order, independent of the exit
    pub base_time: f64,
}

impl Order {
    pub fn new(label: impl Into<String>, sku_count: usize, base_time: f64) -> Self {
        Order {
            label: label.into(),
            sku_count,
            base_time,
        }
    }
}

/// Represents an exit of the sorting system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exit {
    /// Exit identifier as given in the instance file
    pub label: String,
    /// Index of the zone this exit belongs to
    pub zone: usize,
    /// One-way travel time between the classification point and the exit
    pub travel_time: f64,
}

impl Exit {
    pub fn new(label: impl Into<String>, zone: usize, travel_time: f64) -> Self {
        Exit {
            label: label.into(),
            zone,
            travel_time,
        }
    }
}

/// Represents a complete put-to-light dispatching instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PtlInstance {
    /// Name of the instance
    pub name: String,
    /// Orders of the wave, one exit must be assigned to each
    pub orders: Vec<Order>,
    /// Zone labels; exits refer to zones by index into this list
    pub zones: Vec<String>,
    /// Exits of the sorting system, exactly one per order
    pub exits: Vec<Exit>,
    /// Walking speed used to convert travel times into processing times
    pub travel_speed: f64,
}

/// On-disk JSON schema. Exits refer to zones by label; indices are
/// resolved at load time.
#[derive(Serialize, Deserialize)]
struct InstanceFile {
    #[serde(default)]
    name: String,
    travel_speed: f64,
    zones: Vec<String>,
    exits: Vec<ExitFile>,
    orders: Vec<OrderFile>,
}

#[derive(Serialize, Deserialize)]
struct ExitFile {
    label: String,
    zone: String,
    travel_time: f64,
}

#[derive(Serialize, Deserialize)]
struct OrderFile {
    label: String,
    sku_count: usize,
    base_time: f64,
}

/// Configuration for the random instance generator
#[derive(Debug, Clone)]
pub struct RandomInstanceConfig {
    /// Number of orders (and therefore of exits)
    pub num_orders: usize,
    /// Number of zones the exits are split into
    pub num_zones: usize,
    /// Heterogeneous layout: uneven exits per zone and per-zone travel offsets
    pub heterogeneous: bool,
    /// Upper bound on the number of SKUs per order
    pub max_skus: usize,
    /// Random seed
    pub seed: u64,
}

impl Default for RandomInstanceConfig {
    fn default() -> Self {
        RandomInstanceConfig {
            num_orders: 40,
            num_zones: 4,
            heterogeneous: false,
            max_skus: 10,
            seed: 42,
        }
    }
}

impl PtlInstance {
    /// Assemble an instance from already-built parts. No validation is
    /// performed here; [`PtlInstance::from_file`] is the checked entry point.
    pub fn new(
        name: impl Into<String>,
        orders: Vec<Order>,
        zones: Vec<String>,
        exits: Vec<Exit>,
        travel_speed: f64,
    ) -> Self {
        PtlInstance {
            name: name.into(),
            orders,
            zones,
            exits,
            travel_speed,
        }
    }

    /// Parse an instance from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let file = File::open(&path).map_err(|e| format!("Cannot open file: {}", e))?;
        let parsed: InstanceFile =
            serde_json::from_reader(file).map_err(|e| format!("Invalid instance file: {}", e))?;

        let fallback = path
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());

        Self::resolve(parsed, &fallback)
    }

    /// Resolve zone labels to indices and validate the parsed file
    fn resolve(parsed: InstanceFile, fallback_name: &str) -> Result<Self, String> {
        if parsed.zones.is_empty() {
            return Err("instance has no zones".to_string());
        }
        if parsed.orders.is_empty() {
            return Err("instance has no orders".to_string());
        }
        if parsed.travel_speed <= 0.0 {
            return Err(format!(
                "travel speed must be positive (got {})",
                parsed.travel_speed
            ));
        }
        if parsed.exits.len() != parsed.orders.len() {
            return Err(format!(
                "number of exits ({}) must match number of orders ({})",
                parsed.exits.len(),
                parsed.orders.len()
            ));
        }
        for (i, zone) in parsed.zones.iter().enumerate() {
            if parsed.zones[..i].contains(zone) {
                return Err(format!("duplicate zone label '{}'", zone));
            }
        }

        let mut exits = Vec::with_capacity(parsed.exits.len());
        for e in &parsed.exits {
            let zone = parsed
                .zones
                .iter()
                .position(|z| *z == e.zone)
                .ok_or_else(|| format!("unknown zone '{}' for exit '{}'", e.zone, e.label))?;
            if e.travel_time < 0.0 {
                return Err(format!("exit '{}' has a negative travel time", e.label));
            }
            exits.push(Exit::new(e.label.clone(), zone, e.travel_time));
        }

        let mut orders = Vec::with_capacity(parsed.orders.len());
        for o in &parsed.orders {
            if o.sku_count == 0 {
                return Err(format!("order '{}' contains no SKUs", o.label));
            }
            if o.base_time < 0.0 {
                return Err(format!("order '{}' has a negative base time", o.label));
            }
            orders.push(Order::new(o.label.clone(), o.sku_count, o.base_time));
        }

        let name = if parsed.name.is_empty() {
            fallback_name.to_string()
        } else {
            parsed.name
        };

        Ok(PtlInstance {
            name,
            orders,
            zones: parsed.zones,
            exits,
            travel_speed: parsed.travel_speed,
        })
    }

    /// Write the instance to a JSON file in the same schema `from_file` reads
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let file = InstanceFile {
            name: self.name.clone(),
            travel_speed: self.travel_speed,
            zones: self.zones.clone(),
            exits: self
                .exits
                .iter()
                .map(|e| ExitFile {
                    label: e.label.clone(),
                    zone: self.zones[e.zone].clone(),
                    travel_time: e.travel_time,
                })
                .collect(),
            orders: self
                .orders
                .iter()
                .map(|o| OrderFile {
                    label: o.label.clone(),
                    sku_count: o.sku_count,
                    base_time: o.base_time,
                })
                .collect(),
        };

        let out = File::create(&path).map_err(|e| format!("Cannot create file: {}", e))?;
        serde_json::to_writer_pretty(out, &file).map_err(|e| format!("Write error: {}", e))
    }

    /// Processing time of an order when classified through a given exit.
    /// The operator walks to the exit and back once per SKU, on top of the
    /// fixed classification time of the order.
    #[inline]
    pub fn processing_time(&self, order: usize, exit: usize) -> f64 {
        let o = &self.orders[order];
        let e = &self.exits[exit];
        o.base_time + o.sku_count as f64 * 2.0 * e.travel_time / self.travel_speed
    }

    /// Cheapest processing time of an order over all exits
    pub fn min_processing_time(&self, order: usize) -> f64 {
        (0..self.exits.len())
            .map(|e| self.processing_time(order, e))
            .fold(f64::INFINITY, f64::min)
    }

    #[inline]
    pub fn num_orders(&self) -> usize {
        self.orders.len()
    }

    #[inline]
    pub fn num_zones(&self) -> usize {
        self.zones.len()
    }

    #[inline]
    pub fn num_exits(&self) -> usize {
        self.exits.len()
    }

    /// Indices of the exits belonging to a zone, in instance order
    pub fn exits_in_zone(&self, zone: usize) -> Vec<usize> {
        self.exits
            .iter()
            .enumerate()
            .filter(|(_, e)| e.zone == zone)
            .map(|(i, _)| i)
            .collect()
    }

    /// Exit indices grouped per zone, in instance order
    pub fn exits_by_zone(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.zones.len()];
        for (i, e) in self.exits.iter().enumerate() {
            groups[e.zone].push(i);
        }
        groups
    }

    /// Generate a random instance. Homogeneous layouts spread the exits
    /// evenly over the zones with the same travel-time profile everywhere;
    /// heterogeneous layouts draw uneven zone sizes and shift whole zones
    /// further away from the classification point.
    pub fn generate(config: &RandomInstanceConfig) -> Self {
        use rand::prelude::*;
        use rand_chacha::ChaCha8Rng;

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let num_zones = config.num_zones.max(1);
        let num_orders = config.num_orders.max(1);
        let max_skus = config.max_skus.max(1);

        let zones: Vec<String> = (1..=num_zones).map(|j| format!("Z{}", j)).collect();

        // Exits per zone: round-robin when homogeneous, one guaranteed exit
        // per zone plus random spill-over when heterogeneous.
        let mut counts = vec![0usize; num_zones];
        if config.heterogeneous && num_orders >= num_zones {
            for c in counts.iter_mut() {
                *c = 1;
            }
            for _ in 0..num_orders - num_zones {
                counts[rng.gen_range(0..num_zones)] += 1;
            }
        } else {
            for i in 0..num_orders {
                counts[i % num_zones] += 1;
            }
        }

        let zone_offsets: Vec<f64> = (0..num_zones)
            .map(|_| {
                if config.heterogeneous {
                    rng.gen_range(0.0..8.0)
                } else {
                    0.0
                }
            })
            .collect();

        let mut exits = Vec::with_capacity(num_orders);
        for (zone, &count) in counts.iter().enumerate() {
            for rank in 0..count {
                let travel = 2.0 + zone_offsets[zone] + 2.0 * rank as f64 + rng.gen_range(0.0..1.0);
                exits.push(Exit::new(format!("E{}", exits.len() + 1), zone, travel));
            }
        }

        let orders: Vec<Order> = (1..=num_orders)
            .map(|i| {
                let sku_count = rng.gen_range(1..=max_skus);
                let base_time: f64 = (0..sku_count).map(|_| rng.gen_range(1.0..3.0)).sum();
                Order::new(format!("O{}", i), sku_count, base_time)
            })
            .collect();

        let name = format!(
            "ptl-{}-{}-{}",
            num_orders,
            if config.heterogeneous { "het" } else { "hom" },
            config.seed
        );

        PtlInstance::new(name, orders, zones, exits, 1.0)
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let total_skus: usize = self.orders.iter().map(|o| o.sku_count).sum();
        let avg_skus = total_skus as f64 / self.orders.len() as f64;

        let avg_travel_time =
            self.exits.iter().map(|e| e.travel_time).sum::<f64>() / self.exits.len() as f64;
        let max_travel_time = self
            .exits
            .iter()
            .map(|e| e.travel_time)
            .fold(0.0, f64::max);

        let counts: Vec<usize> = self.exits_by_zone().iter().map(|g| g.len()).collect();
        let min_exits_per_zone = counts.iter().copied().min().unwrap_or(0);
        let max_exits_per_zone = counts.iter().copied().max().unwrap_or(0);

        // Each order pays at least its cheapest exit; spreading that total
        // perfectly over the zones bounds the best reachable makespan.
        let load_lower_bound = (0..self.orders.len())
            .map(|i| self.min_processing_time(i))
            .sum::<f64>()
            / self.zones.len() as f64;

        InstanceStatistics {
            name: self.name.clone(),
            num_orders: self.orders.len(),
            num_zones: self.zones.len(),
            num_exits: self.exits.len(),
            total_skus,
            avg_skus,
            avg_travel_time,
            max_travel_time,
            min_exits_per_zone,
            max_exits_per_zone,
            load_lower_bound,
        }
    }
}

/// Statistics about a put-to-light instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub num_orders: usize,
    pub num_zones: usize,
    pub num_exits: usize,
    pub total_skus: usize,
    pub avg_skus: f64,
    pub avg_travel_time: f64,
    pub max_travel_time: f64,
    pub min_exits_per_zone: usize,
    pub max_exits_per_zone: usize,
    pub load_lower_bound: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Orders: {}", self.num_orders)?;
        writeln!(
            f,
            "  Zones: {} ({} to {} exits each)",
            self.num_zones, self.min_exits_per_zone, self.max_exits_per_zone
        )?;
        writeln!(f, "  Exits: {}", self.num_exits)?;
        writeln!(f, "  Total SKUs: {} (avg {:.2} per order)", self.total_skus, self.avg_skus)?;
        writeln!(
            f,
            "  Travel time: avg {:.2}, max {:.2}",
            self.avg_travel_time, self.max_travel_time
        )?;
        writeln!(f, "  Makespan lower bound: {:.2}", self.load_lower_bound)
    }
}
