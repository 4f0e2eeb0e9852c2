//! Facades running inside transactions and under concurrent writers.

use std::time::Duration;
use tessera_core::{Bucket, SortedSetAddArgs};
use tessera_grid::{
    Grid, GridConfig, GridError, IsolationLevel, LockingMode, TransactionOptions,
};
use tessera_multimap::{ListCache, MultimapError, PairCache, SetCache, SortedSetCache};

fn grid() -> Grid<String, Bucket<String>> {
    Grid::new(
        GridConfig::builder()
            .nodes(3)
            .owners(2)
            .lock_timeout(Duration::from_millis(50))
            .build(),
    )
}

#[tokio::test]
async fn test_commit_publishes_every_bucket() {
    let grid = grid();
    let node = grid.nodes()[0].clone();
    let observer = ListCache::new(grid.nodes()[2].clone());

    let tx = node.begin(TransactionOptions::default());
    let list = ListCache::new(&tx);
    let pairs = PairCache::new(&tx);
    list.offer_last(&"l".into(), "a".into()).await.unwrap();
    list.offer_last(&"l".into(), "b".into()).await.unwrap();
    pairs
        .set(&"p".into(), vec![("f".to_string(), "v".to_string())])
        .await
        .unwrap();

    assert_eq!(list.size(&"l".into()).await.unwrap(), 2);
    assert_eq!(observer.size(&"l".into()).await.unwrap(), 0);

    tx.commit().await.unwrap();
    assert_eq!(observer.sub_list(&"l".into(), 0, -1).await.unwrap(), vec!["a", "b"]);
    let pairs = PairCache::new(grid.nodes()[1].clone());
    assert_eq!(pairs.get_field(&"p".into(), &"f".into()).await.unwrap(), Some("v".into()));
}

#[tokio::test]
async fn test_rollback_reverts_bucket_mutations() {
    let grid = grid();
    let node = grid.nodes()[1].clone();
    let set = SetCache::new(node.clone());
    set.add(&"s".into(), "kept".into()).await.unwrap();

    let tx = node.begin(TransactionOptions::default());
    {
        let staged = SetCache::new(&tx);
        staged.add(&"s".into(), "dropped".into()).await.unwrap();
        assert_eq!(staged.remove(&"s".into(), &["kept".to_string()]).await.unwrap(), 1);
        assert_eq!(staged.size(&"s".into()).await.unwrap(), 1);
    }
    tx.rollback();

    assert_eq!(set.get(&"s".into()).await.unwrap().into_iter().collect::<Vec<_>>(), vec!["kept"]);
}

#[tokio::test]
async fn test_optimistic_conflict_on_sorted_set() {
    let grid = grid();
    let node = grid.nodes()[0].clone();
    let outside = SortedSetCache::new(grid.nodes()[2].clone());
    let key = "board".to_string();
    let args = SortedSetAddArgs::default();
    outside.add_many(&key, &[1.0], &["a".to_string()], args).await.unwrap();

    let options = TransactionOptions::new(IsolationLevel::RepeatableRead, LockingMode::Optimistic);
    let tx = node.begin(options);
    let inside = SortedSetCache::new(&tx);
    inside.increment_score(&key, "a".into(), 5.0, args).await.unwrap();

    outside.increment_score(&key, "a".into(), 1.0, args).await.unwrap();
    let err = tx.commit().await.unwrap_err();
    assert!(matches!(err, GridError::WriteConflict(_)));
    assert_eq!(outside.score(&key, &"a".into()).await.unwrap(), Some(2.0));
}

#[tokio::test]
async fn test_pessimistic_lock_times_out_other_writers() {
    let grid = grid();
    let node = grid.nodes()[0].clone();
    let key = "queue".to_string();

    let options = TransactionOptions::new(IsolationLevel::ReadCommitted, LockingMode::Pessimistic);
    let tx = node.begin(options);
    ListCache::new(&tx).offer_last(&key, "first".into()).await.unwrap();

    let other = ListCache::new(grid.nodes()[1].clone());
    let err = other.offer_last(&key, "second".into()).await.unwrap_err();
    assert!(matches!(err, MultimapError::Grid(GridError::LockTimeout { .. })));

    tx.commit().await.unwrap();
    other.offer_last(&key, "second".into()).await.unwrap();
    assert_eq!(other.sub_list(&key, 0, -1).await.unwrap(), vec!["first", "second"]);
}

#[tokio::test]
async fn test_concurrent_offers_from_every_member_converge() {
    let grid = Grid::new(GridConfig::builder().nodes(4).owners(2).near_cache(true).build());
    let key = "log".to_string();

    let mut tasks = Vec::new();
    for (i, node) in grid.nodes().into_iter().enumerate() {
        let key = key.clone();
        tasks.push(tokio::spawn(async move {
            let list = ListCache::new(node);
            for j in 0..25 {
                list.offer_last(&key, format!("{i}-{j}")).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let mut views = Vec::new();
    for node in grid.nodes() {
        views.push(ListCache::new(node).sub_list(&key, 0, -1).await.unwrap());
    }
    assert_eq!(views[0].len(), 100);
    assert!(views.iter().all(|view| view == &views[0]));
}

#[tokio::test]
async fn test_concurrent_score_increments_are_atomic() {
    let grid: Grid<String, Bucket<String>> = Grid::new(GridConfig::builder().nodes(3).build());
    let key = "hits".to_string();

    let mut tasks = Vec::new();
    for node in grid.nodes() {
        let key = key.clone();
        tasks.push(tokio::spawn(async move {
            let cache = SortedSetCache::new(node);
            for _ in 0..20 {
                cache
                    .increment_score(&key, "page".into(), 1.0, SortedSetAddArgs::default())
                    .await
                    .unwrap();
            }
        }));
    }
    futures::future::join_all(tasks).await;

    let cache = SortedSetCache::new(grid.nodes()[0].clone());
    assert_eq!(cache.score(&key, &"page".into()).await.unwrap(), Some(60.0));
}
