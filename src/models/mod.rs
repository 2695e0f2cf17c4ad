mod crossover;
mod element;
mod environment;
mod level;
mod mutation;
mod params;
mod population;
mod stats;

pub use crossover::{Crossover, split_half_merge};
pub use element::{DesignElement, MutationOutcome};
pub use environment::SpawnEnvironment;
pub use level::GenericLevel;
pub use mutation::{Mutation, MutationCounters};
pub use params::{
    GenericParameters, ParameterError, ReplacementStrategy, SelectionStrategy, UndersizedPolicy,
};
pub use population::Population;
pub use stats::{GenerationObserver, GenerationStats};
