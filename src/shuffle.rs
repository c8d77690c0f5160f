//! Shuffling helpers used wherever the engine randomizes order: participant
//! turn order, item sequences, and answer-choice sets.

use rand::rng;
use rand::seq::SliceRandom;

/// Shuffle a slice in place. Slices shorter than two elements are untouched.
pub fn shuffle_in_place<T>(values: &mut [T]) {
    if values.len() > 1 {
        let mut rng = rng();
        values.shuffle(&mut rng);
    }
}

/// Return a shuffled copy of `values`.
pub fn shuffled<T: Clone>(values: &[T]) -> Vec<T> {
    let mut out = values.to_vec();
    shuffle_in_place(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn shuffle_preserves_elements() {
        let original: Vec<u32> = (0..32).collect();
        let mut values = original.clone();
        shuffle_in_place(&mut values);

        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, original);
    }

    #[test]
    fn shuffle_produces_distinct_orders_over_trials() {
        let original: Vec<u32> = (0..10).collect();
        let orders: HashSet<Vec<u32>> = (0..64).map(|_| shuffled(&original)).collect();
        assert!(orders.len() > 1, "64 shuffles of 10 elements never varied");
    }

    #[test]
    fn short_slices_are_untouched() {
        let mut single = vec![7];
        shuffle_in_place(&mut single);
        assert_eq!(single, vec![7]);

        let mut empty: Vec<u8> = Vec::new();
        shuffle_in_place(&mut empty);
        assert!(empty.is_empty());
    }
}
