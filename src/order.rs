//! Order Sequence Generator.
//!
//! Produces the visitation order for blocks and for rows inside a block: the
//! identity sequence when no random source is supplied, otherwise a uniform
//! permutation. Sequences are consumed once; a new order means a new sequence.

use rand::Rng;
use rand::seq::SliceRandom;

/// A finite, lazily consumed sequence of indices in `0..size`.
#[derive(Clone, Debug)]
pub enum OrderSequence {
    Identity(std::ops::Range<usize>),
    Shuffled(std::vec::IntoIter<usize>),
}

impl OrderSequence {
    /// Build an order over `0..size`.
    ///
    /// With `rng`, the order is a uniform permutation. If the permutation buffer
    /// cannot be allocated, the identity order is returned instead.
    pub fn new<R: Rng + ?Sized>(size: usize, rng: Option<&mut R>) -> Self {
        let Some(rng) = rng else {
            return Self::Identity(0..size);
        };
        let mut perm: Vec<usize> = Vec::new();
        if perm.try_reserve_exact(size).is_err() {
            tracing::debug!(size, "permutation allocation failed; using sequential order");
            return Self::Identity(0..size);
        }
        perm.extend(0..size);
        perm.shuffle(rng);
        Self::Shuffled(perm.into_iter())
    }

    #[must_use]
    pub const fn identity(size: usize) -> Self {
        Self::Identity(0..size)
    }
}

impl Iterator for OrderSequence {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            Self::Identity(r) => r.next(),
            Self::Shuffled(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::Identity(r) => r.size_hint(),
            Self::Shuffled(it) => it.size_hint(),
        }
    }
}

impl ExactSizeIterator for OrderSequence {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn identity_is_increasing() {
        for size in [0usize, 1, 2, 17] {
            let got: Vec<usize> = OrderSequence::new::<StdRng>(size, None).collect();
            assert_eq!(got, (0..size).collect::<Vec<_>>());
        }
    }

    #[test]
    fn shuffled_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        for size in [0usize, 1, 5, 1000] {
            let mut got: Vec<usize> = OrderSequence::new(size, Some(&mut rng)).collect();
            assert_eq!(got.len(), size);
            got.sort_unstable();
            assert_eq!(got, (0..size).collect::<Vec<_>>());
        }
    }

    #[test]
    fn same_seed_same_order() {
        let order = |seed| -> Vec<usize> {
            let mut rng = StdRng::seed_from_u64(seed);
            OrderSequence::new(100, Some(&mut rng)).collect()
        };
        let (a, b, c) = (order(3), order(3), order(4));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
