//! Mutation operators over complete assignments.
//!
//! Both operators permute the exits of already-assigned orders, so the
//! one-to-one mapping between orders and exits is preserved by
//! construction. Applying a mutation recomputes the processing times of
//! the touched orders and updates the zone loads incrementally; the input
//! solution is left untouched.

use crate::instance::PtlInstance;
use crate::solution::Solution;
use rand::Rng;

/// A bijection-preserving move over a complete assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Exchange the exits of two orders
    SwapTwo(usize, usize),
    /// Cyclically rotate the exits of the listed orders: each order takes
    /// the exit of its successor in the list. The indices must be
    /// distinct, as [`Mutation::random_rotation`] guarantees; a repeated
    /// order would consume an exit twice and fail validation.
    Rotate(Vec<usize>),
}

impl Mutation {
    /// Draw a swap of two distinct orders. Degenerates to an identity move
    /// when the instance has fewer than two orders.
    pub fn random_swap<R: Rng>(num_orders: usize, rng: &mut R) -> Mutation {
        if num_orders < 2 {
            return Mutation::SwapTwo(0, 0);
        }
        let picked = rand::seq::index::sample(rng, num_orders, 2);
        Mutation::SwapTwo(picked.index(0), picked.index(1))
    }

    /// Draw a rotation over `k` distinct orders, `k` capped at the number
    /// of orders. Rotations need at least two participants, so smaller
    /// requests degenerate to an identity move, as do instances with
    /// fewer than two orders.
    pub fn random_rotation<R: Rng>(num_orders: usize, k: usize, rng: &mut R) -> Mutation {
        if num_orders < 2 || k < 2 {
            return Mutation::Rotate(Vec::new());
        }
        let k = k.min(num_orders);
        Mutation::Rotate(rand::seq::index::sample(rng, num_orders, k).into_vec())
    }

    /// Apply the mutation to a copy of the solution. Orders that are not
    /// yet assigned make the move an identity.
    pub fn apply(&self, instance: &PtlInstance, solution: &Solution) -> Solution {
        let mut mutated = solution.clone();

        match self {
            Mutation::SwapTwo(i, j) => {
                if i == j {
                    return mutated;
                }
                let (a, b) = (solution.assignments[*i], solution.assignments[*j]);
                if let (Some(a), Some(b)) = (a, b) {
                    mutated.assign(instance, *i, b.exit);
                    mutated.assign(instance, *j, a.exit);
                }
            }
            Mutation::Rotate(orders) => {
                if orders.len() < 2 {
                    return mutated;
                }
                let exits: Option<Vec<usize>> = orders
                    .iter()
                    .map(|&o| solution.assignments[o].map(|a| a.exit))
                    .collect();
                if let Some(exits) = exits {
                    for (m, &order) in orders.iter().enumerate() {
                        mutated.assign(instance, order, exits[(m + 1) % exits.len()]);
                    }
                }
            }
        }

        mutated
    }
}
