//! Seeded train/test partitioning and k-fold assignment
//!
//! All functions work on row indices so callers can partition feature
//! matrices, label vectors and tables consistently.

use crate::errors::{Result, TrainerError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

/// Row indices of the two partitions, each sorted ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl Split {
    fn sorted(mut train: Vec<usize>, mut test: Vec<usize>) -> Self {
        train.sort_unstable();
        test.sort_unstable();
        Self { train, test }
    }
}

fn check_fraction(test_fraction: f64) -> Result<()> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrainerError::Config(format!(
            "test fraction must lie in (0, 1), got {test_fraction}"
        )));
    }
    Ok(())
}

/// Shuffled split of `0..n`; the test side holds `ceil(n · fraction)` rows
/// but never the whole dataset
pub fn train_test_split(n: usize, test_fraction: f64, rng: &mut StdRng) -> Result<Split> {
    check_fraction(test_fraction)?;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);

    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    let n_test = n_test.min(n.saturating_sub(1));
    let train = indices.split_off(n_test);
    Ok(Split::sorted(train, indices))
}

fn group_by_class(labels: &[usize]) -> BTreeMap<usize, Vec<usize>> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (row, label) in labels.iter().enumerate() {
        groups.entry(*label).or_default().push(row);
    }
    groups
}

/// Per-class split preserving label proportions
///
/// Every class keeps at least one training row; a class with a single row
/// goes entirely to the training side.
pub fn stratified_split(labels: &[usize], test_fraction: f64, rng: &mut StdRng) -> Result<Split> {
    check_fraction(test_fraction)?;
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for (_, mut rows) in group_by_class(labels) {
        rows.shuffle(rng);
        let n = rows.len();
        let n_test = (((n as f64) * test_fraction).round() as usize).min(n - 1);
        train.extend_from_slice(&rows[n_test..]);
        test.extend_from_slice(&rows[..n_test]);
    }
    Ok(Split::sorted(train, test))
}

/// `k` stratified folds; fold `i` is the test side of the `i`-th split
///
/// Rows of each class are shuffled and dealt round-robin, continuing the deal
/// across classes so fold sizes differ by at most one.
pub fn stratified_k_folds(labels: &[usize], k: usize, rng: &mut StdRng) -> Result<Vec<Split>> {
    if k < 2 || k > labels.len() {
        return Err(TrainerError::Config(format!(
            "cannot build {k} folds over {} rows",
            labels.len()
        )));
    }

    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];
    let mut next = 0;
    for (_, mut rows) in group_by_class(labels) {
        rows.shuffle(rng);
        for row in rows {
            folds[next % k].push(row);
            next += 1;
        }
    }

    Ok((0..k)
        .map(|i| {
            let train = folds
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .flat_map(|(_, fold)| fold.iter().copied())
                .collect();
            Split::sorted(train, folds[i].clone())
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn plain_split_is_a_partition() {
        let split = train_test_split(10, 0.2, &mut rng()).unwrap();
        assert_eq!(split.test.len(), 2);
        assert_eq!(split.train.len(), 8);
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn split_is_seeded() {
        let a = train_test_split(50, 0.2, &mut rng()).unwrap();
        let b = train_test_split(50, 0.2, &mut rng()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_fraction_is_rejected() {
        assert!(train_test_split(10, 0.0, &mut rng()).is_err());
        assert!(stratified_split(&[0, 1], 1.0, &mut rng()).is_err());
    }

    #[test]
    fn stratified_split_keeps_proportions() {
        let labels: Vec<usize> = (0..100).map(|i| usize::from(i % 4 == 0)).collect();
        let split = stratified_split(&labels, 0.2, &mut rng()).unwrap();
        let positives = split.test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(split.test.len(), 20);
        assert_eq!(positives, 5);
    }

    #[test]
    fn singleton_class_goes_to_training() {
        let labels = [0, 0, 0, 0, 0, 1];
        let split = stratified_split(&labels, 0.2, &mut rng()).unwrap();
        assert!(split.train.contains(&5));
        assert!(!split.test.contains(&5));
    }

    #[test]
    fn folds_cover_every_row_once() {
        let labels: Vec<usize> = (0..23).map(|i| i % 3).collect();
        let folds = stratified_k_folds(&labels, 5, &mut rng()).unwrap();
        assert_eq!(folds.len(), 5);

        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..23).collect::<Vec<_>>());
        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), 23);
            assert!((4..=5).contains(&fold.test.len()));
        }
    }

    #[test]
    fn too_many_folds_is_an_error() {
        assert!(stratified_k_folds(&[0, 1, 0], 4, &mut rng()).is_err());
        assert!(stratified_k_folds(&[0, 1, 0], 1, &mut rng()).is_err());
    }
}
