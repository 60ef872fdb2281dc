//! Seeded shuffles for the train/evaluation split and plot sampling.
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Deterministic RNG for a fixed seed; `None` seeds from OS entropy.
pub fn rng_from_seed(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Number of evaluation rows for `n` rows: `ceil(test_fraction * n)`.
pub fn evaluation_size(n: usize, test_fraction: f64) -> usize {
    ((test_fraction * n as f64).ceil() as usize).min(n)
}

/// Row indices of the training and evaluation partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub eval: Vec<usize>,
}

/// Shuffle `0..n` and hand the first `ceil(test_fraction * n)` indices to
/// evaluation, the rest to training.
pub fn train_test_split(n: usize, test_fraction: f64, seed: Option<u64>) -> Split {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = rng_from_seed(seed);
    indices.shuffle(&mut rng);
    let n_eval = evaluation_size(n, test_fraction);
    let train = indices.split_off(n_eval);
    Split {
        train,
        eval: indices,
    }
}

/// Up to `k` values drawn without replacement, in draw order.
pub fn sample_without_replacement(values: &[f64], k: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    values
        .choose_multiple(&mut rng, k.min(values.len()))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_cover_all_rows_once() {
        for n in [1usize, 2, 3, 10, 97, 1000] {
            let split = train_test_split(n, 0.3, Some(42));
            assert_eq!(split.train.len() + split.eval.len(), n);
            let mut all: Vec<usize> = split.train.iter().chain(&split.eval).copied().collect();
            all.sort_unstable();
            assert_eq!(all, (0..n).collect::<Vec<_>>());
            let expected = 0.3 * n as f64;
            assert!((split.eval.len() as f64 - expected).abs() <= 1.0);
        }
    }

    #[test]
    fn three_rows_give_one_eval_row() {
        let split = train_test_split(3, 0.3, Some(1));
        assert_eq!(split.eval.len(), 1);
        assert_eq!(split.train.len(), 2);
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let a = train_test_split(500, 0.3, Some(42));
        let b = train_test_split(500, 0.3, Some(42));
        assert_eq!(a, b);
        let c = train_test_split(500, 0.3, Some(43));
        assert_ne!(a, c);
    }

    #[test]
    fn sampling_caps_at_len() {
        let values: Vec<f64> = (0..10).map(|v| v as f64).collect();
        assert_eq!(sample_without_replacement(&values, 100, 7).len(), 10);
        let s = sample_without_replacement(&values, 4, 7);
        assert_eq!(s.len(), 4);
        let mut dedup = s.clone();
        dedup.sort_by(f64::total_cmp);
        dedup.dedup();
        assert_eq!(dedup.len(), 4);
    }
}
