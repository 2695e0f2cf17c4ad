use serde::Serialize;

/// Per-generation statistics record, emitted once per generation to the
/// registered [`GenerationObserver`]. Purely informational: no engine
/// behavior depends on an observer being present.
///
/// All rates are fractions in `[0, 1]`. Rates whose offspring batch was empty
/// report `0.0` rather than dividing by zero. "Offspring" are split into two
/// streams by their parents' pool: the feasible stream is bred from feasible
/// parents, the infeasible stream from infeasible parents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationStats {
    pub generation: u32,
    /// Fraction of infeasible-stream offspring that ended up feasible.
    pub validation_rate: f64,
    /// Fraction of feasible-stream offspring that ended up infeasible.
    pub invalidation_rate: f64,
    /// Fraction of the staged batch that survived merging into the feasible
    /// pool this generation.
    pub feasible_integration_rate: f64,
    /// Fraction of the staged batch that survived merging into the
    /// infeasible pool this generation.
    pub infeasible_integration_rate: f64,
    /// Mean per-candidate mutation acceptance rate over the feasible stream.
    pub feasible_offspring_acceptance_rate: f64,
    /// Mean per-candidate mutation acceptance rate over the infeasible stream.
    pub infeasible_offspring_acceptance_rate: f64,
    /// Among infeasible-stream offspring whose class survived crossover,
    /// the fraction that mutation pushed into feasibility.
    pub mutation_validation_rate: f64,
    /// Among feasible-stream offspring whose class survived crossover,
    /// the fraction that mutation pushed out of feasibility.
    pub mutation_invalidation_rate: f64,
    /// Mean fitness change attributable to mutation, over feasible-stream
    /// offspring that stayed feasible throughout.
    pub average_fitness_delta: f64,
    /// Best single fitness gain attributable to mutation this generation.
    pub max_fitness_delta: f64,
    /// Mean violation change attributable to mutation, over infeasible-stream
    /// offspring that stayed infeasible throughout.
    pub average_violation_delta: f64,
    /// Best single violation reduction attributable to mutation this
    /// generation (negative values are improvements).
    pub min_violation_delta: f64,
    /// Fitness of the best feasible member after the generation's merges;
    /// `0.0` while the feasible pool is empty.
    pub best_fitness: f64,
    /// Violations of the best infeasible member after the generation's
    /// merges; `0.0` while the infeasible pool is empty.
    pub min_violations: f64,
    pub feasible_size: usize,
    pub infeasible_size: usize,
}

/// Statistics sink for a run. Implementations render plots, log progress or
/// collect the records for later analysis; the engine never reads anything
/// back from them.
pub trait GenerationObserver {
    /// Called once after every completed generation.
    fn end_of_generation(&mut self, _stats: &GenerationStats) {}

    /// Called once when the run finishes, with the final generation count.
    fn execution_finished(&mut self, _final_generation: u32) {}
}
