//! Random Source - Injectable Modifier Selection
//!
//! Every `rand::RngCore` is a `RandomSource`, so production code passes
//! `thread_rng()` and tests pass a seeded `StdRng` or a fixed stub.

use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SamplingError {
    #[error("Cannot sample {requested} items from a pool of {available}")]
    InsufficientPopulation { requested: usize, available: usize },

    #[error("Cannot choose from an empty pool")]
    EmptyPopulation,
}

/// Source of randomness for template fragment selection.
pub trait RandomSource {
    /// Uniform index in `0..upper`. `upper` is never zero.
    fn index_below(&mut self, upper: usize) -> usize;

    /// `amount` distinct indices from `0..length`. `amount <= length` is guaranteed.
    fn distinct_indices(&mut self, length: usize, amount: usize) -> Vec<usize>;
}

impl<R: Rng> RandomSource for R {
    fn index_below(&mut self, upper: usize) -> usize {
        self.gen_range(0..upper)
    }

    fn distinct_indices(&mut self, length: usize, amount: usize) -> Vec<usize> {
        rand::seq::index::sample(self, length, amount).into_vec()
    }
}

/// Sample `amount` items without replacement.
pub fn sample<'a>(
    rng: &mut dyn RandomSource,
    pool: &'a [String],
    amount: usize,
) -> Result<Vec<&'a str>, SamplingError> {
    if amount > pool.len() {
        return Err(SamplingError::InsufficientPopulation {
            requested: amount,
            available: pool.len(),
        });
    }

    Ok(rng
        .distinct_indices(pool.len(), amount)
        .into_iter()
        .map(|i| pool[i].as_str())
        .collect())
}

/// Sample up to `max` items, clamped to the pool size.
pub fn sample_up_to<'a>(
    rng: &mut dyn RandomSource,
    pool: &'a [String],
    max: usize,
) -> Vec<&'a str> {
    let amount = max.min(pool.len());
    rng.distinct_indices(pool.len(), amount)
        .into_iter()
        .map(|i| pool[i].as_str())
        .collect()
}

/// Pick a single item.
pub fn choose<'a>(rng: &mut dyn RandomSource, pool: &'a [String]) -> Result<&'a str, SamplingError> {
    if pool.is_empty() {
        return Err(SamplingError::EmptyPopulation);
    }
    Ok(pool[rng.index_below(pool.len())].as_str())
}
