use super::element::{DesignElement, MutationOutcome};
use super::environment::SpawnEnvironment;
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// One candidate solution: an owned collection of design elements keyed by
/// kind, the derived environment they spawn into, and the candidate's scores.
///
/// `violated_constraints == 0.0` makes a candidate feasible; fitness is only
/// meaningful for ranking feasible candidates. Elements are stored in an
/// ordered map so replaying them into the environment is deterministic.
#[derive(Clone)]
pub struct GenericLevel<E: DesignElement> {
    pub(crate) id: Uuid,
    elements: BTreeMap<E::Kind, Vec<E>>,
    environment: E::Environment,
    pub(crate) fitness: f64,
    pub(crate) violated_constraints: f64,
    // Post-crossover scores, captured before mutation for delta statistics.
    pub(crate) pre_mutation_fitness: f64,
    pub(crate) pre_mutation_violations: f64,
    // Set when crossover alone already moved the candidate across the
    // feasibility boundary, so mutation statistics don't count it twice.
    pub(crate) class_changed_in_crossover: bool,
}

// Element and environment types are not required to be Debug, so this stays
// at the bookkeeping fields.
impl<E: DesignElement> fmt::Debug for GenericLevel<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericLevel")
            .field("id", &self.id)
            .field("fitness", &self.fitness)
            .field("violated_constraints", &self.violated_constraints)
            .field("element_count", &self.total_element_count())
            .finish_non_exhaustive()
    }
}

impl<E: DesignElement> GenericLevel<E> {
    pub fn new(environment: E::Environment) -> Self {
        Self {
            id: Uuid::now_v7(),
            elements: BTreeMap::new(),
            environment,
            fitness: 0.0,
            violated_constraints: 0.0,
            pre_mutation_fitness: 0.0,
            pre_mutation_violations: 0.0,
            class_changed_in_crossover: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn violated_constraints(&self) -> f64 {
        self.violated_constraints
    }

    pub fn is_feasible(&self) -> bool {
        self.violated_constraints == 0.0
    }

    pub fn environment(&self) -> &E::Environment {
        &self.environment
    }

    /// Kinds currently present, in storage order.
    pub fn kinds(&self) -> impl Iterator<Item = E::Kind> + '_ {
        self.elements.keys().copied()
    }

    /// Elements of one kind; empty when the kind is absent.
    pub fn elements_of_kind(&self, kind: E::Kind) -> &[E] {
        self.elements.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn kind_count(&self, kind: E::Kind) -> usize {
        self.elements_of_kind(kind).len()
    }

    pub fn total_element_count(&self) -> usize {
        self.elements.values().map(Vec::len).sum()
    }

    /// Adds an element unconditionally.
    pub fn add_element(&mut self, element: E) {
        self.elements.entry(element.kind()).or_default().push(element);
    }

    /// Adds an element only if it passes its own validity check. Returns
    /// whether the element was added. This is the gate that keeps locally
    /// invalid elements out of freshly seeded or mutated candidates.
    pub fn add_checked(&mut self, element: E) -> bool {
        if !element.check_validity() {
            return false;
        }
        self.add_element(element);
        true
    }

    /// Removes and returns the element at `index` within its kind list.
    pub fn remove_element(&mut self, kind: E::Kind, index: usize) -> Option<E> {
        let list = self.elements.get_mut(&kind)?;
        if index >= list.len() {
            return None;
        }
        let element = list.remove(index);
        if list.is_empty() {
            self.elements.remove(&kind);
        }
        Some(element)
    }

    /// Runs one transactional mutation attempt on the element at `index`
    /// within its kind list. `None` when no such element exists.
    pub fn mutate_element(
        &mut self,
        kind: E::Kind,
        index: usize,
        rng: &mut impl Rng,
    ) -> Option<MutationOutcome> {
        let element = self.elements.get_mut(&kind)?.get_mut(index)?;
        Some(element.try_mutation(rng))
    }

    /// Clears the environment, replays every element into it in kind order,
    /// and finalizes it. Restores the invariant that the environment reflects
    /// exactly the current element set.
    pub fn rebuild_environment(&mut self) {
        self.environment.clear();
        for list in self.elements.values() {
            for element in list {
                element.spawn(&mut self.environment);
            }
        }
        self.environment.finalize();
    }

    pub(crate) fn snapshot_pre_mutation_scores(&mut self) {
        self.pre_mutation_fitness = self.fitness;
        self.pre_mutation_violations = self.violated_constraints;
    }
}
