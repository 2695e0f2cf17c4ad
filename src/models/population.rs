//! Bounded, sorted candidate pools with selection and capacity-enforcing
//! replacement.
//!
//! A [`Population`] is either the feasible pool (sorted descending by
//! fitness) or the infeasible pool (sorted ascending by constraint
//! violations). Parent selection draws from the sorted members by roulette or
//! rank weighting; [`Population::add_and_reduce`] is the canonical insertion
//! path that merges a staged batch of offspring and then evicts back down to
//! capacity, one worst-ranked member at a time.
//!
//! Selection weights:
//!
//! | Pool       | Roulette weight          | Rank weight (N members)     |
//! |------------|--------------------------|-----------------------------|
//! | feasible   | `fitness`                | best N, ..., worst 1        |
//! | infeasible | `1 / violated_constraints` | best N, ..., worst 1      |
//!
//! An infeasible member with zero violations cannot exist by definition, but
//! the inverse weight clamps its divisor anyway rather than dividing by zero.

use super::element::DesignElement;
use super::level::GenericLevel;
use super::params::{ReplacementStrategy, SelectionStrategy};
use rand::Rng;
use std::collections::HashSet;
use tracing::instrument;
use uuid::Uuid;

// Clamp for inverse weights so a zero score never divides by zero.
const MIN_WEIGHT_DIVISOR: f64 = 1e-9;

/// Cumulative weighted draw over `weights`. Falls back to a uniform draw when
/// the total weight is not positive (all-zero scores early in a run).
fn weighted_pick(weights: &[f64], rng: &mut impl Rng) -> usize {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return rng.random_range(0..weights.len());
    }

    let spin = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for (index, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if cumulative >= spin {
            return index;
        }
    }

    // Floating-point accumulation can land a hair short of the total.
    weights.len() - 1
}

/// One of the two FI-2POP pools: a bounded, sorted list of candidates.
#[derive(Clone)]
pub struct Population<E: DesignElement> {
    is_feasible: bool,
    capacity: usize,
    members: Vec<GenericLevel<E>>,
}

impl<E: DesignElement> std::fmt::Debug for Population<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Population")
            .field("is_feasible", &self.is_feasible)
            .field("capacity", &self.capacity)
            .field("size", &self.members.len())
            .finish_non_exhaustive()
    }
}

impl<E: DesignElement> Population<E> {
    pub fn new(is_feasible: bool, capacity: usize) -> Self {
        Self {
            is_feasible,
            capacity,
            members: Vec::with_capacity(capacity),
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.is_feasible
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[GenericLevel<E>] {
        &self.members
    }

    /// Best-ranked member: highest fitness in a feasible pool, fewest
    /// violations in an infeasible one. Assumes the pool is sorted, which
    /// every mutating operation on it maintains.
    pub fn best(&self) -> Option<&GenericLevel<E>> {
        self.members.first()
    }

    pub(crate) fn push(&mut self, member: GenericLevel<E>) {
        self.members.push(member);
    }

    /// Restores the pool's ranking order. Stable, so equal scores keep their
    /// insertion order and runs stay deterministic.
    pub fn sort(&mut self) {
        if self.is_feasible {
            self.members
                .sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        } else {
            self.members
                .sort_by(|a, b| a.violated_constraints.total_cmp(&b.violated_constraints));
        }
    }

    /// Draws `min(len, 2 * max_crossovers)` parents using the configured
    /// strategy. Selection is with replacement: one member may parent several
    /// pairs in the same generation.
    #[instrument(level = "debug", skip(self, rng), fields(is_feasible = self.is_feasible, size = self.members.len()))]
    pub fn select(
        &self,
        max_crossovers: usize,
        strategy: SelectionStrategy,
        rng: &mut impl Rng,
    ) -> Vec<&GenericLevel<E>> {
        let required = (2 * max_crossovers).min(self.members.len());
        let mut selected = Vec::with_capacity(required);
        if required == 0 {
            return selected;
        }

        let weights: Vec<f64> = match strategy {
            SelectionStrategy::Roulette => self
                .members
                .iter()
                .map(|member| self.selection_weight(member))
                .collect(),
            // Rank 1 is the best-ordered member and carries weight N.
            SelectionStrategy::Rank => (0..self.members.len())
                .map(|rank| (self.members.len() - rank) as f64)
                .collect(),
        };

        for _ in 0..required {
            let index = weighted_pick(&weights, rng);
            selected.push(&self.members[index]);
        }

        selected
    }

    /// Merges a staged batch of new members, then evicts one worst-ranked
    /// member at a time until the pool is back at capacity. Returns how many
    /// of the staged members survived the reduction (the batch's integration
    /// count). The pool may transiently exceed its bound inside this call,
    /// never after it.
    #[instrument(level = "debug", skip(self, new_members, rng), fields(is_feasible = self.is_feasible, staged = new_members.len(), size = self.members.len()))]
    pub fn add_and_reduce(
        &mut self,
        new_members: Vec<GenericLevel<E>>,
        strategy: ReplacementStrategy,
        rng: &mut impl Rng,
    ) -> usize {
        let staged: HashSet<Uuid> = new_members.iter().map(GenericLevel::id).collect();

        self.members.extend(new_members);
        self.sort();

        while self.members.len() > self.capacity {
            let victim = self.eviction_index(strategy, rng);
            self.members.remove(victim);
        }

        self.members
            .iter()
            .filter(|member| staged.contains(&member.id))
            .count()
    }

    /// Inserts one member ad hoc. With free capacity the member always gets
    /// in; against a full pool the replacement strategy picks a victim, and
    /// elite variants refuse the insertion when the victim outranks the
    /// newcomer. Not used by the generational loop, which stages batches
    /// through [`Population::add_and_reduce`].
    pub fn insert(
        &mut self,
        member: GenericLevel<E>,
        strategy: ReplacementStrategy,
        rng: &mut impl Rng,
    ) -> bool {
        if self.members.len() < self.capacity {
            self.members.push(member);
            self.sort();
            return true;
        }
        if self.capacity == 0 {
            return false;
        }

        let victim = self.eviction_index(strategy, rng);
        if strategy.is_elite() && !self.outranks(&member, &self.members[victim]) {
            return false;
        }

        self.members[victim] = member;
        self.sort();
        true
    }

    fn selection_weight(&self, member: &GenericLevel<E>) -> f64 {
        if self.is_feasible {
            member.fitness
        } else {
            1.0 / member.violated_constraints.max(MIN_WEIGHT_DIVISOR)
        }
    }

    /// Picks the member to evict from a sorted, over-capacity pool.
    fn eviction_index(&self, strategy: ReplacementStrategy, rng: &mut impl Rng) -> usize {
        match strategy {
            ReplacementStrategy::Random | ReplacementStrategy::RandomElite => {
                rng.random_range(0..self.members.len())
            }
            ReplacementStrategy::Roulette | ReplacementStrategy::RouletteElite => {
                let weights: Vec<f64> = self
                    .members
                    .iter()
                    .map(|member| {
                        if self.is_feasible {
                            1.0 / member.fitness.max(MIN_WEIGHT_DIVISOR)
                        } else {
                            member.violated_constraints
                        }
                    })
                    .collect();
                weighted_pick(&weights, rng)
            }
            ReplacementStrategy::Rank | ReplacementStrategy::RankElite => {
                // Inverse rank: the last-sorted member carries weight N.
                let weights: Vec<f64> =
                    (0..self.members.len()).map(|rank| (rank + 1) as f64).collect();
                weighted_pick(&weights, rng)
            }
            ReplacementStrategy::AbsoluteWorst => self.members.len() - 1,
        }
    }

    fn outranks(&self, challenger: &GenericLevel<E>, incumbent: &GenericLevel<E>) -> bool {
        if self.is_feasible {
            challenger.fitness >= incumbent.fitness
        } else {
            challenger.violated_constraints <= incumbent.violated_constraints
        }
    }
}
