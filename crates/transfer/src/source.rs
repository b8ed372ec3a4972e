//! Source sequences for the producer

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// `0..n` in ascending order
pub fn sequential(n: usize) -> Vec<u64> {
    (0..n as u64).collect()
}

/// Uniformly shuffled `0..n`; the same seed always yields the same order
pub fn permutation(n: usize, seed: Option<u64>) -> Vec<u64> {
    let mut values = sequential(n);
    match seed {
        Some(seed) => values.shuffle(&mut StdRng::seed_from_u64(seed)),
        None => values.shuffle(&mut rand::thread_rng()),
    }
    values
}
