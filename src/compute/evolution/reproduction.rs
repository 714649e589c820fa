//! Network creation and reproduction.
//!
//! Parents are paired deterministically from the ranking: every child has
//! one parent from the better half and one from the worse half, so the best
//! network contributes to every offspring of its group.

use rand::prelude::*;

use crate::compute::Network;

/// Random number generator wrapper for network initialization and mutation.
pub struct Breeder {
    rng: StdRng,
    mutation_max: f32,
}

impl Breeder {
    /// Create from seed.
    pub fn new(seed: u64, mutation_max: f32) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            mutation_max,
        }
    }

    /// Create with random seed.
    pub fn random(mutation_max: f32) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            mutation_max,
        }
    }

    #[inline]
    pub fn mutation_max(&self) -> f32 {
        self.mutation_max
    }

    /// Network with weights and biases uniform in [-1, 1].
    pub fn random_network(&mut self, topology: &[usize]) -> Network {
        Network::new(topology, &mut self.rng)
    }

    /// Average two parents with bounded mutation.
    pub fn crossover(&mut self, a: &Network, b: &Network) -> Network {
        Network::crossover(a, b, self.mutation_max, &mut self.rng)
    }

    /// Build the next generation of a group from its ranking.
    ///
    /// The whole new generation is returned; the caller swaps it in, which
    /// drops the old networks only after every child exists.
    pub fn reproduce(&mut self, networks: &[Network], ranking: &[usize]) -> Vec<Network> {
        assert_eq!(
            networks.len(),
            ranking.len(),
            "ranking does not cover the group"
        );
        parent_pairs(ranking.len())
            .map(|(better, worse)| {
                self.crossover(&networks[ranking[better]], &networks[ranking[worse]])
            })
            .collect()
    }
}

/// Rank positions of the two parents of every output slot.
///
/// Slot `i` pairs rank `i % half` with rank `i / half`, where `half = n / 2`.
pub fn parent_pairs(n: usize) -> impl Iterator<Item = (usize, usize)> {
    assert!(n >= 2, "reproduction needs at least two networks");
    let half = n / 2;
    (0..n).map(move |i| (i % half, i / half))
}
