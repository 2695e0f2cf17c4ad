use super::element::{DesignElement, MutationOutcome};
use super::level::GenericLevel;
use rand::Rng;

// ============================================================
// MutationCounters
// ============================================================

/// Tally of one candidate's mutation attempts within a single operator
/// invocation. `attempted` counts perturbations that actually changed
/// something (or tried to, structurally); `accepted` counts those that
/// survived their validity check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationCounters {
    attempted: u32,
    accepted: u32,
}

impl MutationCounters {
    /// Records the outcome of one per-element transactional mutation.
    /// `Unchanged` attempts are not counted; they perturbed nothing.
    pub fn record(&mut self, outcome: MutationOutcome) {
        match outcome {
            MutationOutcome::Unchanged => {}
            MutationOutcome::Rejected => self.attempted += 1,
            MutationOutcome::Accepted => {
                self.attempted += 1;
                self.accepted += 1;
            }
        }
    }

    /// Records a whole-candidate structural change (an element added or
    /// removed), which bypasses the per-element transaction.
    pub fn record_structural(&mut self, accepted: bool) {
        self.attempted += 1;
        if accepted {
            self.accepted += 1;
        }
    }

    pub fn attempted(&self) -> u32 {
        self.attempted
    }

    pub fn accepted(&self) -> u32 {
        self.accepted
    }

    /// Accepted fraction of attempted mutations; 0.0 when nothing was
    /// attempted.
    pub fn acceptance_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        f64::from(self.accepted) / f64::from(self.attempted)
    }
}

// ============================================================
// Mutation
// ============================================================

/// Domain-specific mutation operator over a whole candidate.
///
/// `mutate_impl` is free to add, remove and perturb any number of design
/// elements. Per-element changes must go through
/// [`GenericLevel::mutate_element`] (the transactional path) and report their
/// outcome via [`MutationCounters::record`]; whole-candidate additions and
/// removals are reported via [`MutationCounters::record_structural`].
pub trait Mutation<E: DesignElement> {
    fn mutate_impl(
        &self,
        level: &mut GenericLevel<E>,
        counters: &mut MutationCounters,
        rng: &mut impl Rng,
    );

    /// Runs one mutation pass over `level`: fresh counters, `mutate_impl`,
    /// and an environment rebuild if anything was accepted. Rebuilding only
    /// on acceptance is an optimization; an unchanged element set leaves the
    /// environment valid.
    fn apply(&self, level: &mut GenericLevel<E>, rng: &mut impl Rng) -> MutationCounters {
        let mut counters = MutationCounters::default();
        self.mutate_impl(level, &mut counters, rng);

        if counters.accepted() > 0 {
            level.rebuild_environment();
        }

        counters
    }
}
