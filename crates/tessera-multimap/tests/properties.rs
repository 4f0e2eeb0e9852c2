//! Property-based tests for facade laws
//!
//!  - Set size equals the number of distinct values added
//!  - List replace followed by sub_list returns the same values
//!  - Rotating one way then the other restores the list
//!  - Inclusive score counts are never below exclusive ones

use proptest::prelude::*;
use std::collections::BTreeSet;
use tessera_core::{Bucket, SortedSetAddArgs};
use tessera_grid::{Grid, GridConfig};
use tessera_multimap::{ListCache, SetCache, SortedSetCache};

fn grid() -> Grid<String, Bucket<String>> {
    Grid::new(GridConfig::builder().nodes(2).build())
}

fn values_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-e]{1,2}", 0..15)
}

// ============================================================================
// Set and list
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn set_size_is_distinct_count(values in values_strategy()) {
        let size = tokio_test::block_on(async {
            let grid = grid();
            let set = SetCache::new(grid.nodes()[0].clone());
            let key = "s".to_string();
            for v in &values {
                set.add(&key, v.clone()).await.unwrap();
            }
            set.size(&key).await.unwrap()
        });
        let distinct: BTreeSet<&String> = values.iter().collect();
        prop_assert_eq!(size, distinct.len());
    }

    #[test]
    fn replace_then_sub_list_round_trips(values in values_strategy()) {
        let (read, present) = tokio_test::block_on(async {
            let grid = grid();
            let list = ListCache::new(grid.nodes()[1].clone());
            let key = "l".to_string();
            list.replace(&key, vec!["old".to_string()]).await.unwrap();
            list.replace(&key, values.clone()).await.unwrap();
            (
                list.sub_list(&key, 0, -1).await.unwrap(),
                list.contains_key(&key).await.unwrap(),
            )
        });
        prop_assert_eq!(&read, &values);
        prop_assert_eq!(present, !values.is_empty());
    }

    #[test]
    fn rotation_is_reversible(values in prop::collection::vec("[a-e]{1,2}", 1..15)) {
        let restored = tokio_test::block_on(async {
            let grid = grid();
            let list = ListCache::new(grid.nodes()[0].clone());
            let key = "l".to_string();
            list.replace(&key, values.clone()).await.unwrap();
            list.rotate(&key, false).await.unwrap();
            list.rotate(&key, true).await.unwrap();
            list.sub_list(&key, 0, -1).await.unwrap()
        });
        prop_assert_eq!(restored, values);
    }
}

// ============================================================================
// Sorted set
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn inclusive_count_covers_exclusive(
        scores in prop::collection::vec(0i32..10, 0..12),
        min in 0i32..10,
        span in 0i32..5,
    ) {
        let (inclusive, exclusive) = tokio_test::block_on(async {
            let grid = grid();
            let cache = SortedSetCache::new(grid.nodes()[0].clone());
            let key = "z".to_string();
            let values: Vec<String> = (0..scores.len()).map(|i| format!("v{i}")).collect();
            let scores: Vec<f64> = scores.iter().map(|s| *s as f64).collect();
            cache
                .add_many(&key, &scores, &values, SortedSetAddArgs::default())
                .await
                .unwrap();
            let (lo, hi) = (Some(min as f64), Some((min + span) as f64));
            (
                cache.count(&key, lo, true, hi, true).await.unwrap(),
                cache.count(&key, lo, false, hi, false).await.unwrap(),
            )
        });
        prop_assert!(inclusive >= exclusive);
    }
}
