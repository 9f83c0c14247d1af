//! Property-based tests using proptest.
//!
//! Split invariants checked over arbitrary label vectors and fold counts.

use loco_cv::{
    CrossValidator, FeatureMatrix, FixedLabels, Fold, KFold, LabelOrder, LocoSplitter, SplitError,
};
use ndarray::Array2;
use proptest::prelude::*;
use std::collections::HashSet;

fn matrix(n: usize) -> FeatureMatrix {
    FeatureMatrix::unlabeled(Array2::from_shape_fn((n, 2), |(i, j)| (i + j) as f64)).unwrap()
}

fn labels_strategy() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(0u8..6, 1..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn loco_test_sets_cover_rows_once(labels in labels_strategy()) {
        let n = labels.len();
        let distinct: HashSet<u8> = labels.iter().copied().collect();
        let splitter = LocoSplitter::new(FixedLabels::new(labels.clone()));

        match splitter.split(&matrix(n), None) {
            Ok(splits) => {
                let folds: Vec<Fold> = splits.collect();
                prop_assert_eq!(folds.len(), distinct.len());

                let mut counts = vec![0usize; n];
                for fold in &folds {
                    for &i in &fold.test {
                        counts[i] += 1;
                    }
                }
                prop_assert!(counts.iter().all(|&c| c == 1));
            }
            Err(SplitError::InsufficientClusters { found }) => {
                prop_assert_eq!(found, 1);
                prop_assert_eq!(distinct.len(), 1);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn loco_train_is_complement_of_test(labels in labels_strategy()) {
        let n = labels.len();
        let splitter = LocoSplitter::new(FixedLabels::new(labels.clone()));

        if let Ok(splits) = splitter.split(&matrix(n), None) {
            for fold in splits {
                let test: HashSet<usize> = fold.test.iter().copied().collect();
                let expected: Vec<usize> = (0..n).filter(|i| !test.contains(i)).collect();
                prop_assert_eq!(&fold.train, &expected);

                // the held-out rows are exactly one label's rows
                let held_out: HashSet<u8> = fold.test.iter().map(|&i| labels[i]).collect();
                prop_assert_eq!(held_out.len(), 1);
            }
        }
    }

    #[test]
    fn loco_order_does_not_change_fold_set(labels in labels_strategy()) {
        let n = labels.len();
        let first_seen = LocoSplitter::new(FixedLabels::new(labels.clone()));
        let sorted = LocoSplitter::new(FixedLabels::new(labels.clone()))
            .label_order(LabelOrder::Sorted);

        if let (Ok(a), Ok(b)) = (first_seen.split(&matrix(n), None), sorted.split(&matrix(n), None)) {
            let mut a: Vec<Fold> = a.collect();
            let mut b: Vec<Fold> = b.collect();
            a.sort_by(|x, y| x.test.cmp(&y.test));
            b.sort_by(|x, y| x.test.cmp(&y.test));
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn n_splits_matches_split_length(labels in labels_strategy()) {
        let n = labels.len();
        let splitter = LocoSplitter::new(FixedLabels::new(labels));
        let expected = splitter.n_splits(&matrix(n), None).unwrap();
        if let Ok(splits) = splitter.split(&matrix(n), None) {
            prop_assert_eq!(splits.count(), expected);
        }
    }

    #[test]
    fn kfold_sizes_differ_by_at_most_one(n in 2usize..60, k in 2usize..10, seed in any::<u64>()) {
        prop_assume!(k <= n);
        let folds: Vec<Fold> = KFold::new(k)
            .with_random_state(seed)
            .split(&matrix(n), None)
            .unwrap()
            .collect();

        prop_assert_eq!(folds.len(), k);
        let sizes: Vec<usize> = folds.iter().map(|f| f.test.len()).collect();
        let max = *sizes.iter().max().unwrap();
        let min = *sizes.iter().min().unwrap();
        prop_assert!(max - min <= 1);
        prop_assert_eq!(sizes.iter().sum::<usize>(), n);
    }
}
