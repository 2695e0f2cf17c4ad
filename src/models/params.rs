use serde::{Deserialize, Serialize};

/// Parent-selection strategy used by [`Population::select`](super::Population::select).
///
/// **Roulette** draws parents with probability proportional to a selection
/// weight: raw fitness in a feasible population, inverse violation count in
/// an infeasible one.
///
/// **Rank** weights members by their position in the sorted population
/// instead of their raw score, which keeps selection pressure stable when
/// scores are tightly clustered or wildly scaled. The best-ranked member of
/// an N-member population carries weight N, the worst weight 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionStrategy {
    Roulette,
    Rank,
}

/// Replacement strategy used when inserting into a full population.
///
/// During capacity reduction the strategy picks the eviction victim: `Random`
/// variants draw uniformly, `Roulette` variants draw inversely proportional
/// to quality, `Rank` variants inversely proportional to sorted position, and
/// `AbsoluteWorst` always takes the last-sorted member. The `*Elite` variants
/// additionally gate single-member insertion on the newcomer being at least
/// as good as the member it would replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplacementStrategy {
    Random,
    Roulette,
    Rank,
    AbsoluteWorst,
    RandomElite,
    RouletteElite,
    RankElite,
}

impl ReplacementStrategy {
    pub(crate) fn is_elite(&self) -> bool {
        matches!(
            self,
            ReplacementStrategy::RandomElite
                | ReplacementStrategy::RouletteElite
                | ReplacementStrategy::RankElite
        )
    }
}

/// What to do when initialization cannot fill a population to the configured
/// size within its attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UndersizedPolicy {
    /// Continue with the undersized population and log a warning.
    Proceed,
    /// Abort the run with [`EvolutionError::UnderfilledPopulation`](crate::EvolutionError::UnderfilledPopulation).
    Fail,
}

/// Errors raised by [`GenericParameters::new`].
#[derive(Debug, thiserror::Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum ParameterError {
    #[error("population_size must be greater than zero")]
    ZeroPopulationSize,
    #[error("max_crossovers must be greater than zero")]
    ZeroCrossovers,
}

/// Immutable per-run configuration of the evolutionary engine.
///
/// # Examples
///
/// ```rust
/// use fi2pop::models::{GenericParameters, ReplacementStrategy, SelectionStrategy};
///
/// let params = GenericParameters::new(50, 10, 200)?
///     .with_selection(SelectionStrategy::Rank)
///     .with_insertion(ReplacementStrategy::RandomElite);
///
/// assert_eq!(params.population_size, 50);
/// # Ok::<(), fi2pop::models::ParameterError>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(test, derive(PartialEq))]
pub struct GenericParameters {
    /// Capacity of each population; both pools share the same bound.
    pub population_size: usize,
    /// Number of crossover pairs drawn per population per generation.
    pub max_crossovers: usize,
    /// Hard generation cap, reached when the termination condition never fires.
    pub max_generations: u32,
    /// How parents are drawn for breeding.
    pub selection_strategy: SelectionStrategy,
    /// How offspring are merged into a full population.
    pub insertion_strategy: ReplacementStrategy,
    /// Policy for populations that come up short during initialization.
    pub undersized_policy: UndersizedPolicy,
    /// Candidate-creation attempts granted per population during
    /// initialization.
    pub init_attempt_budget: u32,
}

impl GenericParameters {
    pub fn new(
        population_size: usize,
        max_crossovers: usize,
        max_generations: u32,
    ) -> Result<Self, ParameterError> {
        if population_size == 0 {
            return Err(ParameterError::ZeroPopulationSize);
        }
        if max_crossovers == 0 {
            return Err(ParameterError::ZeroCrossovers);
        }

        Ok(Self {
            population_size,
            max_crossovers,
            max_generations,
            selection_strategy: SelectionStrategy::Rank,
            insertion_strategy: ReplacementStrategy::RandomElite,
            undersized_policy: UndersizedPolicy::Proceed,
            init_attempt_budget: 5000,
        })
    }

    pub fn with_selection(mut self, strategy: SelectionStrategy) -> Self {
        self.selection_strategy = strategy;
        self
    }

    pub fn with_insertion(mut self, strategy: ReplacementStrategy) -> Self {
        self.insertion_strategy = strategy;
        self
    }

    pub fn with_undersized_policy(mut self, policy: UndersizedPolicy) -> Self {
        self.undersized_policy = policy;
        self
    }

    pub fn with_init_attempt_budget(mut self, budget: u32) -> Self {
        self.init_attempt_budget = budget;
        self
    }
}
