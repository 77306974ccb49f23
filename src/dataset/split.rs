//! Seeded stratified train/test split.

use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::dataset::{DatasetSplit, Label, LabeledMessage};
use crate::error::{Result, SpamError};

/// Split `messages` into train and test sets, preserving the label ratio.
///
/// The test set holds `round(n * test_fraction)` messages (at least one and
/// at most `n - 1`), shared between the labels in proportion to their size.
/// All randomness comes from one RNG seeded with `seed`, so the same input and
/// seed always produce the same split.
///
/// # Errors
///
/// - [`SpamError::InvalidFraction`] if `test_fraction` is not in `(0, 1)`.
/// - [`SpamError::EmptyDataset`] if the input is empty or one label has no
///   messages.
pub fn split(messages: &[LabeledMessage], test_fraction: f64, seed: u64) -> Result<DatasetSplit> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SpamError::InvalidFraction(test_fraction));
    }

    let mut partitions: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (i, message) in messages.iter().enumerate() {
        partitions[message.label.index()].push(i);
    }
    for label in Label::ALL {
        if partitions[label.index()].is_empty() {
            return Err(SpamError::empty_dataset(format!(
                "no {label} messages to stratify on ({} messages total)",
                messages.len()
            )));
        }
    }

    let n = messages.len();
    let n_test = ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1);
    let sizes = [partitions[0].len(), partitions[1].len()];
    let test_counts = allocate(n_test, sizes);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_idx = Vec::with_capacity(n - n_test);
    let mut test_idx = Vec::with_capacity(n_test);

    for (partition, k) in partitions.iter_mut().zip(test_counts) {
        partition.shuffle(&mut rng);
        test_idx.extend_from_slice(&partition[..k]);
        train_idx.extend_from_slice(&partition[k..]);
    }

    train_idx.shuffle(&mut rng);
    test_idx.shuffle(&mut rng);

    debug!(
        "Split {n} messages into {} train / {} test (test per class: ham={}, spam={})",
        train_idx.len(),
        test_idx.len(),
        test_counts[0],
        test_counts[1]
    );

    Ok(DatasetSplit {
        train: train_idx.iter().map(|&i| messages[i].clone()).collect(),
        test: test_idx.iter().map(|&i| messages[i].clone()).collect(),
    })
}

/// Share `total` test slots between two partitions by largest remainder.
/// Ties go to the lower label index.
fn allocate(total: usize, sizes: [usize; 2]) -> [usize; 2] {
    let n: usize = sizes.iter().sum();
    let ideal = sizes.map(|size| total as f64 * size as f64 / n as f64);
    let mut counts = ideal.map(|x| x.floor() as usize);

    let mut remaining = total - counts.iter().sum::<usize>();
    let mut order = [0usize, 1];
    order.sort_by(|&a, &b| {
        let frac_a = ideal[a] - ideal[a].floor();
        let frac_b = ideal[b] - ideal[b].floor();
        frac_b.total_cmp(&frac_a).then(a.cmp(&b))
    });

    for i in order {
        if remaining == 0 {
            break;
        }
        if counts[i] < sizes[i] {
            counts[i] += 1;
            remaining -= 1;
        }
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::class_counts;

    fn corpus(n_ham: usize, n_spam: usize) -> Vec<LabeledMessage> {
        let mut messages = Vec::new();
        for i in 0..n_ham {
            messages.push(LabeledMessage::new(format!("ham message {i}"), Label::Ham));
        }
        for i in 0..n_spam {
            messages.push(LabeledMessage::new(format!("spam message {i}"), Label::Spam));
        }
        messages
    }

    #[test]
    fn test_split_sizes_are_stratified() {
        let messages = corpus(80, 20);
        let split = split(&messages, 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        assert_eq!(class_counts(&split.test), [16, 4]);
        assert_eq!(class_counts(&split.train), [64, 16]);
    }

    #[test]
    fn test_split_is_a_partition() {
        let messages = corpus(37, 11);
        let split = split(&messages, 0.3, 7).unwrap();

        let mut seen: Vec<String> = split
            .train
            .iter()
            .chain(split.test.iter())
            .map(|m| m.text.clone())
            .collect();
        seen.sort();
        let mut expected: Vec<String> = messages.iter().map(|m| m.text.clone()).collect();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_split_is_deterministic() {
        let messages = corpus(50, 13);
        let a = split(&messages, 0.25, 99).unwrap();
        let b = split(&messages, 0.25, 99).unwrap();
        assert_eq!(a, b);

        let c = split(&messages, 0.25, 100).unwrap();
        assert_ne!(a.test, c.test);
    }

    #[test]
    fn test_invalid_fraction() {
        let messages = corpus(5, 5);
        for fraction in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            assert!(matches!(
                split(&messages, fraction, 1),
                Err(SpamError::InvalidFraction(_))
            ));
        }
    }

    #[test]
    fn test_single_class_is_empty_dataset() {
        let messages = corpus(10, 0);
        assert!(matches!(
            split(&messages, 0.2, 1),
            Err(SpamError::EmptyDataset(_))
        ));
        assert!(matches!(split(&[], 0.2, 1), Err(SpamError::EmptyDataset(_))));
    }

    #[test]
    fn test_tiny_corpus_keeps_both_sides_non_empty() {
        let messages = corpus(1, 1);
        let split = split(&messages, 0.01, 3).unwrap();
        assert_eq!(split.test.len(), 1);
        assert_eq!(split.train.len(), 1);
    }

    #[test]
    fn test_allocate_largest_remainder() {
        assert_eq!(allocate(3, [5, 5]), [2, 1]);
        assert_eq!(allocate(10, [90, 10]), [9, 1]);
        assert_eq!(allocate(2, [1, 9]), [0, 2]);
    }
}
