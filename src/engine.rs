//! The FI-2POP orchestrator.
//!
//! A problem domain implements [`EvolutionLayer`] (candidate factory, scoring
//! functions, variation operators) and hands it to an
//! [`EvolutionaryAlgorithm`], which owns both populations and drives the
//! per-generation migrate/breed/mutate/evaluate/reduce cycle.
//!
//! Each generation runs two symmetric offspring passes. The feasible-stream
//! pass breeds from feasible parents; offspring that fall out of feasibility
//! are staged and merged into the infeasible pool at the end of the pass. The
//! infeasible-stream pass mirrors it: offspring that reach feasibility are
//! staged, and the pass ends by merging all staged feasible candidates into
//! the feasible pool. These merges are the migration mechanism of FI-2POP;
//! existing members never change class because only offspring are mutated.

use crate::models::{
    Crossover, DesignElement, GenericLevel, GenericParameters, GenerationObserver,
    GenerationStats, Mutation, Population, UndersizedPolicy,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::instrument;

/// Where a run currently stands. Observable through
/// [`EvolutionaryAlgorithm::state`] for embedders that poll progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Uninitialized,
    Initializing,
    Generation(u32),
    Finished,
}

/// Cooperative cancellation signal for a running engine, checked once per
/// generation. Cheap to clone and safe to trigger from another thread.
/// Cancellation is sticky: once cancelled, every subsequent run on the same
/// engine stops after initialization.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    flag: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[derive(Debug, thiserror::Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum EvolutionError {
    /// Initialization exhausted its attempt budget before filling both
    /// populations, and the run is configured with
    /// [`UndersizedPolicy::Fail`].
    #[error(
        "initialization filled {feasible}/{required} feasible and {infeasible}/{required} infeasible members"
    )]
    UnderfilledPopulation {
        feasible: usize,
        infeasible: usize,
        required: usize,
    },
}

/// The extension points a concrete problem domain supplies.
///
/// Scores returned by the two `calculate_*` functions are stored on the
/// candidate by the engine. Constraint violation is a continuous,
/// never-failing measure; exactly zero means feasible. Fitness is only ever
/// computed for feasible candidates.
pub trait EvolutionLayer {
    type Element: DesignElement;
    type Mutation: Mutation<Self::Element>;
    type Crossover: Crossover<Self::Element>;

    /// Creates one random initial candidate, optionally informed by the
    /// solution of a previous layer. The returned candidate's environment is
    /// rebuilt by the engine before evaluation.
    fn create_member(
        &mut self,
        previous: Option<&GenericLevel<Self::Element>>,
        rng: &mut impl Rng,
    ) -> GenericLevel<Self::Element>;

    fn calculate_fitness(&mut self, level: &GenericLevel<Self::Element>) -> f64;

    fn calculate_constraint_violations(&mut self, level: &GenericLevel<Self::Element>) -> f64;

    /// Domain-specific early termination, checked once per generation on top
    /// of the hard generation cap.
    fn termination_condition(
        &self,
        _feasible: &Population<Self::Element>,
        _infeasible: &Population<Self::Element>,
    ) -> bool {
        false
    }

    fn mutation(&self) -> &Self::Mutation;

    fn crossover(&self) -> &Self::Crossover;
}

/// Per-stream bookkeeping for one offspring pass.
struct PassMetrics {
    offspring: usize,
    /// Offspring that ended the pass in the other class than their parents.
    crossed: usize,
    /// Offspring whose class survived crossover.
    kept_class: usize,
    /// Offspring whose class survived crossover but not mutation.
    mutation_crossed: usize,
    acceptance_sum: f64,
    delta_sum: f64,
    delta_count: usize,
    best_delta: Option<f64>,
}

impl PassMetrics {
    fn new() -> Self {
        Self {
            offspring: 0,
            crossed: 0,
            kept_class: 0,
            mutation_crossed: 0,
            acceptance_sum: 0.0,
            delta_sum: 0.0,
            delta_count: 0,
            best_delta: None,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}

/// Drives a full FI-2POP run over a domain-supplied [`EvolutionLayer`].
pub struct EvolutionaryAlgorithm<L: EvolutionLayer> {
    params: GenericParameters,
    layer: L,
    feasible: Population<L::Element>,
    infeasible: Population<L::Element>,
    pending_feasible: Vec<GenericLevel<L::Element>>,
    pending_infeasible: Vec<GenericLevel<L::Element>>,
    observer: Option<Box<dyn GenerationObserver>>,
    cancelled: Arc<AtomicBool>,
    state: RunState,
}

impl<L: EvolutionLayer> EvolutionaryAlgorithm<L> {
    pub fn new(params: GenericParameters, layer: L) -> Self {
        let population_size = params.population_size;
        Self {
            params,
            layer,
            feasible: Population::new(true, population_size),
            infeasible: Population::new(false, population_size),
            pending_feasible: Vec::new(),
            pending_infeasible: Vec::new(),
            observer: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            state: RunState::Uninitialized,
        }
    }

    /// Registers the statistics sink receiving one record per generation.
    pub fn set_observer(&mut self, observer: impl GenerationObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn cancellation_handle(&self) -> CancellationHandle {
        CancellationHandle {
            flag: Arc::clone(&self.cancelled),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn layer(&self) -> &L {
        &self.layer
    }

    pub fn feasible(&self) -> &Population<L::Element> {
        &self.feasible
    }

    pub fn infeasible(&self) -> &Population<L::Element> {
        &self.infeasible
    }

    /// Runs the full evolutionary search and returns the best candidate
    /// found: the best feasible member when one exists, otherwise the best
    /// (least-violating) infeasible member, otherwise `None` when even
    /// initialization produced nothing.
    ///
    /// The run is deterministic in `seed`: all stochastic decisions draw from
    /// one generator seeded here. `label` only names the run in logs and
    /// spans. `previous_solution` is handed to every
    /// [`EvolutionLayer::create_member`] call, letting chained generator
    /// layers seed their candidates from an earlier layer's output.
    #[instrument(level = "info", skip(self, previous_solution))]
    pub fn run(
        &mut self,
        seed: u64,
        label: &str,
        previous_solution: Option<GenericLevel<L::Element>>,
    ) -> Result<Option<GenericLevel<L::Element>>, EvolutionError> {
        let mut rng = StdRng::seed_from_u64(seed);

        self.state = RunState::Initializing;
        self.feasible = Population::new(true, self.params.population_size);
        self.infeasible = Population::new(false, self.params.population_size);
        self.pending_feasible.clear();
        self.pending_infeasible.clear();

        self.initialize(previous_solution.as_ref(), &mut rng)?;
        tracing::info!(
            feasible = self.feasible.len(),
            infeasible = self.infeasible.len(),
            "populations initialized"
        );

        let mut generation = 0;
        self.state = RunState::Generation(generation);
        while generation < self.params.max_generations
            && !self
                .layer
                .termination_condition(&self.feasible, &self.infeasible)
        {
            if self.cancelled.load(Ordering::Relaxed) {
                tracing::info!(generation, "run cancelled");
                break;
            }

            let stats = self.run_generation(generation, &mut rng);
            if let Some(observer) = self.observer.as_mut() {
                observer.end_of_generation(&stats);
            }

            generation += 1;
            self.state = RunState::Generation(generation);
        }

        // Offspring staged by the last infeasible-stream pass are still
        // waiting for the next feasible-stream merge; integrate them so
        // nothing is dropped at termination.
        self.flush_pending(&mut rng);

        if let Some(observer) = self.observer.as_mut() {
            observer.execution_finished(generation);
        }
        self.state = RunState::Finished;

        let best = self
            .feasible
            .best()
            .or_else(|| self.infeasible.best())
            .cloned();
        tracing::info!(
            generation,
            found_feasible = !self.feasible.is_empty(),
            "run finished"
        );
        Ok(best)
    }

    /// Fills both pools by repeatedly creating random candidates and routing
    /// them by feasibility. The per-pool attempt budget is enforced as a
    /// combined cap on candidate creations: routing is outcome-driven, so a
    /// strict per-pool counter could spin forever in a domain that only ever
    /// produces one class.
    #[instrument(level = "debug", skip(self, previous, rng))]
    fn initialize(
        &mut self,
        previous: Option<&GenericLevel<L::Element>>,
        rng: &mut StdRng,
    ) -> Result<(), EvolutionError> {
        let target = self.params.population_size;
        let max_attempts = self.params.init_attempt_budget as usize * 2;

        let mut attempts = 0;
        while attempts < max_attempts
            && (self.feasible.len() < target || self.infeasible.len() < target)
        {
            attempts += 1;

            let mut member = self.layer.create_member(previous, rng);
            member.rebuild_environment();

            let violations = self.layer.calculate_constraint_violations(&member);
            member.violated_constraints = violations;

            if member.is_feasible() {
                let fitness = self.layer.calculate_fitness(&member);
                member.fitness = fitness;
                if self.feasible.len() < target {
                    self.feasible.push(member);
                }
            } else if self.infeasible.len() < target {
                self.infeasible.push(member);
            }
        }

        self.feasible.sort();
        self.infeasible.sort();

        if self.feasible.len() < target || self.infeasible.len() < target {
            match self.params.undersized_policy {
                UndersizedPolicy::Proceed => tracing::warn!(
                    feasible = self.feasible.len(),
                    infeasible = self.infeasible.len(),
                    required = target,
                    "proceeding with undersized population"
                ),
                UndersizedPolicy::Fail => {
                    return Err(EvolutionError::UnderfilledPopulation {
                        feasible: self.feasible.len(),
                        infeasible: self.infeasible.len(),
                        required: target,
                    });
                }
            }
        }

        Ok(())
    }

    #[instrument(level = "debug", skip(self, rng))]
    fn run_generation(&mut self, generation: u32, rng: &mut StdRng) -> GenerationStats {
        // Feasible-stream pass: breed from feasible parents, then merge
        // everything staged for the infeasible pool.
        let (children, feasible_metrics) =
            Self::offspring_pass(&mut self.layer, &self.feasible, &self.params, rng);
        self.stage(children);

        let staged = self.pending_infeasible.len();
        let integrated = self.infeasible.add_and_reduce(
            std::mem::take(&mut self.pending_infeasible),
            self.params.insertion_strategy,
            rng,
        );
        let infeasible_integration_rate = ratio(integrated, staged);

        // Infeasible-stream pass, mirrored: merge everything staged for the
        // feasible pool.
        let (children, infeasible_metrics) =
            Self::offspring_pass(&mut self.layer, &self.infeasible, &self.params, rng);
        self.stage(children);

        let staged = self.pending_feasible.len();
        let integrated = self.feasible.add_and_reduce(
            std::mem::take(&mut self.pending_feasible),
            self.params.insertion_strategy,
            rng,
        );
        let feasible_integration_rate = ratio(integrated, staged);

        GenerationStats {
            generation,
            validation_rate: ratio(infeasible_metrics.crossed, infeasible_metrics.offspring),
            invalidation_rate: ratio(feasible_metrics.crossed, feasible_metrics.offspring),
            feasible_integration_rate,
            infeasible_integration_rate,
            feasible_offspring_acceptance_rate: mean(
                feasible_metrics.acceptance_sum,
                feasible_metrics.offspring,
            ),
            infeasible_offspring_acceptance_rate: mean(
                infeasible_metrics.acceptance_sum,
                infeasible_metrics.offspring,
            ),
            mutation_validation_rate: ratio(
                infeasible_metrics.mutation_crossed,
                infeasible_metrics.kept_class,
            ),
            mutation_invalidation_rate: ratio(
                feasible_metrics.mutation_crossed,
                feasible_metrics.kept_class,
            ),
            average_fitness_delta: mean(
                feasible_metrics.delta_sum,
                feasible_metrics.delta_count,
            ),
            max_fitness_delta: feasible_metrics.best_delta.unwrap_or(0.0),
            average_violation_delta: mean(
                infeasible_metrics.delta_sum,
                infeasible_metrics.delta_count,
            ),
            min_violation_delta: infeasible_metrics.best_delta.unwrap_or(0.0),
            best_fitness: self.feasible.best().map(GenericLevel::fitness).unwrap_or(0.0),
            min_violations: self
                .infeasible
                .best()
                .map(GenericLevel::violated_constraints)
                .unwrap_or(0.0),
            feasible_size: self.feasible.len(),
            infeasible_size: self.infeasible.len(),
        }
    }

    /// Breeds one offspring stream from `source`, mutates and evaluates every
    /// child, and reports the pass statistics. Children are returned for
    /// staging by feasibility.
    fn offspring_pass(
        layer: &mut L,
        source: &Population<L::Element>,
        params: &GenericParameters,
        rng: &mut StdRng,
    ) -> (Vec<GenericLevel<L::Element>>, PassMetrics) {
        let source_is_feasible = source.is_feasible();

        let parents = source.select(params.max_crossovers, params.selection_strategy, rng);
        let mut children = Vec::with_capacity(parents.len() / 2);
        for pair in parents.chunks_exact(2) {
            let mut child = layer.crossover().crossover(pair[0], pair[1], rng);
            child.rebuild_environment();
            children.push(child);
        }
        drop(parents);

        let mut metrics = PassMetrics::new();
        metrics.offspring = children.len();

        for child in &mut children {
            // Post-crossover scores become the pre-mutation snapshot.
            let violations = layer.calculate_constraint_violations(child);
            child.violated_constraints = violations;
            child.fitness = if child.is_feasible() {
                layer.calculate_fitness(child)
            } else {
                0.0
            };
            child.snapshot_pre_mutation_scores();
            child.class_changed_in_crossover = child.is_feasible() != source_is_feasible;

            let counters = layer.mutation().apply(child, rng);
            metrics.acceptance_sum += counters.acceptance_rate();

            let violations = layer.calculate_constraint_violations(child);
            child.violated_constraints = violations;
            child.fitness = if child.is_feasible() {
                layer.calculate_fitness(child)
            } else {
                0.0
            };

            let ended_crossed = child.is_feasible() != source_is_feasible;
            if ended_crossed {
                metrics.crossed += 1;
            }

            // Candidates that already switched class during crossover are
            // excluded from the mutation-attributed statistics.
            if child.class_changed_in_crossover {
                continue;
            }
            metrics.kept_class += 1;

            if ended_crossed {
                metrics.mutation_crossed += 1;
                continue;
            }

            let delta = if source_is_feasible {
                child.fitness - child.pre_mutation_fitness
            } else {
                child.violated_constraints - child.pre_mutation_violations
            };
            metrics.delta_sum += delta;
            metrics.delta_count += 1;
            metrics.best_delta = Some(match metrics.best_delta {
                None => delta,
                // Best means largest gain for fitness, largest drop for
                // violations.
                Some(best) if source_is_feasible => best.max(delta),
                Some(best) => best.min(delta),
            });
        }

        (children, metrics)
    }

    fn stage(&mut self, children: Vec<GenericLevel<L::Element>>) {
        for child in children {
            if child.is_feasible() {
                self.pending_feasible.push(child);
            } else {
                self.pending_infeasible.push(child);
            }
        }
    }

    fn flush_pending(&mut self, rng: &mut StdRng) {
        if !self.pending_infeasible.is_empty() {
            self.infeasible.add_and_reduce(
                std::mem::take(&mut self.pending_infeasible),
                self.params.insertion_strategy,
                rng,
            );
        }
        if !self.pending_feasible.is_empty() {
            self.feasible.add_and_reduce(
                std::mem::take(&mut self.pending_feasible),
                self.params.insertion_strategy,
                rng,
            );
        }
    }
}
