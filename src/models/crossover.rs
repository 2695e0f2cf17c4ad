use super::element::DesignElement;
use super::level::GenericLevel;
use rand::Rng;
use std::collections::BTreeSet;

/// Domain-specific crossover operator combining two parents into one child.
///
/// Implementations assemble the child's element set (usually via
/// [`split_half_merge`]) into a fresh level with a fresh environment. The
/// engine rebuilds and finalizes the child's environment after `crossover`
/// returns, so implementations only need to produce the elements. The child
/// inherits no scores from either parent; fitness and violations are
/// evaluated later.
pub trait Crossover<E: DesignElement> {
    fn crossover(
        &self,
        lhs: &GenericLevel<E>,
        rhs: &GenericLevel<E>,
        rng: &mut impl Rng,
    ) -> GenericLevel<E>;
}

/// Canonical crossover strategy: for each element kind independently, flip a
/// coin for which parent contributes the lower half of its element list and
/// which the upper half, then concatenate deep copies into `child`. The
/// per-kind coin flip avoids a positional bias toward either parent.
pub fn split_half_merge<E: DesignElement>(
    lhs: &GenericLevel<E>,
    rhs: &GenericLevel<E>,
    child: &mut GenericLevel<E>,
    rng: &mut impl Rng,
) {
    let kinds: BTreeSet<E::Kind> = lhs.kinds().chain(rhs.kinds()).collect();

    for kind in kinds {
        let (low, high) = if rng.random_bool(0.5) {
            (lhs, rhs)
        } else {
            (rhs, lhs)
        };

        let low_elements = low.elements_of_kind(kind);
        for element in &low_elements[..low_elements.len() / 2] {
            child.add_element(element.clone());
        }

        let high_elements = high.elements_of_kind(kind);
        for element in &high_elements[high_elements.len() / 2..] {
            child.add_element(element.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpawnEnvironment;
    use rand::{SeedableRng, rngs::StdRng};

    #[derive(Clone, Debug, Default, PartialEq)]
    struct NullEnvironment;

    impl SpawnEnvironment for NullEnvironment {
        fn clear(&mut self) {}
        fn finalize(&mut self) {}
    }

    #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    struct Token(i32);

    impl DesignElement for Token {
        type Kind = ();
        type Environment = NullEnvironment;

        fn kind(&self) {}
        fn spawn(&self, _environment: &mut NullEnvironment) {}

        fn mutate(&mut self, _rng: &mut impl Rng) -> bool {
            false
        }

        fn check_validity(&self) -> bool {
            true
        }
    }

    fn level_with_tokens(values: &[i32]) -> GenericLevel<Token> {
        let mut level = GenericLevel::new(NullEnvironment);
        for &value in values {
            level.add_element(Token(value));
        }
        level
    }

    fn sorted_tokens(level: &GenericLevel<Token>) -> Vec<Token> {
        let mut tokens = level.elements_of_kind(()).to_vec();
        tokens.sort();
        tokens
    }

    #[test]
    fn it_takes_half_from_each_parent() {
        let mut rng = StdRng::seed_from_u64(11);
        let lhs = level_with_tokens(&[1, 2, 3, 4]);
        let rhs = level_with_tokens(&[5, 6, 7, 8]);

        let mut child = GenericLevel::new(NullEnvironment);
        split_half_merge(&lhs, &rhs, &mut child, &mut rng);

        let tokens = child.elements_of_kind(());
        assert_eq!(tokens.len(), 4);

        // Two from one parent's lower half, two from the other's upper half.
        let from_lhs = tokens.iter().filter(|t| t.0 <= 4).count();
        let from_rhs = tokens.iter().filter(|t| t.0 >= 5).count();
        assert_eq!(from_lhs, 2);
        assert_eq!(from_rhs, 2);
    }

    #[test]
    fn crossing_identical_parents_reproduces_the_parent() {
        let mut rng = StdRng::seed_from_u64(29);
        let parent = level_with_tokens(&[1, 2, 3, 4, 5, 6]);
        let twin = parent.clone();

        let mut child = GenericLevel::new(NullEnvironment);
        split_half_merge(&parent, &twin, &mut child, &mut rng);

        // Both halves come from equal lists, so the child's element multiset
        // matches the parent's regardless of the coin flips.
        assert_eq!(sorted_tokens(&child), sorted_tokens(&parent));
    }

    #[test]
    fn it_handles_a_parent_without_the_kind() {
        let mut rng = StdRng::seed_from_u64(5);
        let lhs = level_with_tokens(&[1, 2, 3, 4]);
        let rhs = GenericLevel::new(NullEnvironment);

        let mut child = GenericLevel::new(NullEnvironment);
        split_half_merge(&lhs, &rhs, &mut child, &mut rng);

        // Either lhs's lower half or its upper half, never nothing at all
        // (an empty list contributes an empty half).
        let count = child.elements_of_kind(()).len();
        assert!(count == 2);
    }
}
