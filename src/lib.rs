//! Feasible/Infeasible Two-Population (FI-2POP) evolutionary search.
//!
//! FI-2POP is a genetic algorithm for constrained optimization problems. It
//! maintains two separately ranked populations: a *feasible* population of
//! candidates that satisfy every constraint, evolved toward higher fitness,
//! and an *infeasible* population of constraint-violating candidates, evolved
//! toward feasibility. Offspring migrate between the two populations as their
//! feasibility status changes, so the constraint-satisfaction search feeds the
//! optimization search and vice versa.
//!
//! A problem domain plugs in by implementing three things:
//!
//! - a [`models::DesignElement`] enum describing the atomic, independently
//!   validated pieces a candidate is assembled from,
//! - a [`models::SpawnEnvironment`] holding the derived representation those
//!   elements are replayed into (an occupancy grid, for example),
//! - an [`engine::EvolutionLayer`] supplying the candidate factory, the
//!   fitness and constraint-violation functions, and the variation operators.
//!
//! [`engine::EvolutionaryAlgorithm::run`] is the single entry point. Runs are
//! deterministic for a given seed: one seeded generator is threaded through
//! every stochastic call, so two runs with identical parameters, callbacks and
//! seed produce identical generation statistics and final populations.

pub mod engine;
pub mod models;

pub use engine::{
    CancellationHandle, EvolutionError, EvolutionLayer, EvolutionaryAlgorithm, RunState,
};
