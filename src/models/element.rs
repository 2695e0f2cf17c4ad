use super::SpawnEnvironment;
use rand::Rng;
use std::fmt::Debug;

/// Outcome of one transactional mutation attempt on a design element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The perturbation left the element untouched.
    Unchanged,
    /// The perturbation produced a locally invalid element and was rolled back.
    Rejected,
    /// The perturbation changed the element and passed its validity check.
    Accepted,
}

/// One atomic, independently validated piece of a candidate solution.
///
/// A problem domain implements this on a closed enum with one variant per
/// element kind (an occupied cell, a wall segment, a room). Each element is
/// owned by exactly one [`GenericLevel`](super::GenericLevel); cloning is the
/// deep copy used when candidates are cloned or crossed over, so an element
/// must never hold shared references into its owner.
///
/// `mutate` and `check_validity` are deliberately split: `mutate` applies a
/// cheap optimistic perturbation without worrying about validity, and
/// [`DesignElement::try_mutation`] wraps the pair into a transaction that
/// rolls invalid results back.
pub trait DesignElement: Clone {
    /// Discriminant identifying the element's kind. Candidates store one
    /// element list per kind; `Ord` keys the storage deterministically.
    type Kind: Copy + Eq + Ord + Debug;

    /// The derived representation this element writes into when spawned.
    type Environment: SpawnEnvironment;

    fn kind(&self) -> Self::Kind;

    /// Writes this element's effect into the environment. Side effect only.
    fn spawn(&self, environment: &mut Self::Environment);

    /// Applies a small random perturbation (shift, resize, toggle, ...).
    /// Returns whether anything actually changed. Implementations are free
    /// to produce locally invalid states; validity is checked afterwards.
    fn mutate(&mut self, rng: &mut impl Rng) -> bool;

    /// Purely local, structural validity check, independent of the rest of
    /// the candidate (e.g. "does this wall stay inside the grid bounds").
    fn check_validity(&self) -> bool;

    /// Transactional mutation: snapshot, attempt, commit or discard.
    ///
    /// Every caller must use this instead of calling [`mutate`] directly.
    /// An element that fails its validity check after the perturbation is
    /// restored from the snapshot, so elements never persist in a locally
    /// invalid state.
    ///
    /// [`mutate`]: DesignElement::mutate
    fn try_mutation(&mut self, rng: &mut impl Rng) -> MutationOutcome {
        let snapshot = self.clone();

        if !self.mutate(rng) {
            return MutationOutcome::Unchanged;
        }

        if self.check_validity() {
            MutationOutcome::Accepted
        } else {
            *self = snapshot;
            MutationOutcome::Rejected
        }
    }
}
