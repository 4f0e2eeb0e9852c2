//! Typed reads and updates of one bucket kind over an [`AtomicMap`].

use crate::error::{require_non_null, MultimapError, Result};
use tessera_core::error::ERR_KEY_CAN_T_BE_NULL;
use tessera_core::{Bucket, BucketVariant, Element, Nullable};
use tessera_grid::{AtomicMap, GridKey, Write};

/// What an edit wants stored.
pub(crate) enum Change<B> {
    Keep,
    Replace(B),
}

pub(crate) fn check_key<K: Nullable>(key: &K) -> Result<()> {
    require_non_null(key, ERR_KEY_CAN_T_BE_NULL)
}

fn wrong_kind<V: Element, B: BucketVariant<V>>(found: &Bucket<V>) -> MultimapError {
    MultimapError::WrongBucketKind {
        expected: B::KIND,
        found: found.kind(),
    }
}

/// Reads `key` as a `B`, failing if it holds another kind.
pub(crate) async fn read<K, V, S, B>(store: &S, key: &K) -> Result<Option<B>>
where
    K: GridKey,
    V: Element,
    S: AtomicMap<K, Bucket<V>>,
    B: BucketVariant<V>,
{
    match store.get(key).await? {
        None => Ok(None),
        Some(bucket) => match B::from_bucket(&bucket) {
            Some(typed) => Ok(Some(typed.clone())),
            None => Err(wrong_kind::<V, B>(&bucket)),
        },
    }
}

/// Applies `f` to the `B` stored under `key` in one atomic step.
///
/// An error from `f` or a kind mismatch leaves the entry untouched. A
/// replacement that is empty removes the key.
pub(crate) async fn update<K, V, S, B, R, F>(store: &S, key: &K, f: F) -> Result<R>
where
    K: GridKey,
    V: Element,
    S: AtomicMap<K, Bucket<V>>,
    B: BucketVariant<V>,
    R: Send + 'static,
    F: Fn(Option<&B>) -> Result<(Change<B>, R)> + Send + Sync + 'static,
{
    store
        .atomic_update(key, move |current: Option<&Bucket<V>>| {
            let typed = match current {
                None => None,
                Some(bucket) => match B::from_bucket(bucket) {
                    Some(typed) => Some(typed),
                    None => return (Write::Unchanged, Err(wrong_kind::<V, B>(bucket))),
                },
            };
            match f(typed) {
                Err(err) => (Write::Unchanged, Err(err)),
                Ok((Change::Keep, out)) => (Write::Unchanged, Ok(out)),
                Ok((Change::Replace(next), out)) => {
                    let empty = next.is_empty();
                    if empty && current.is_none() {
                        (Write::Unchanged, Ok(out))
                    } else {
                        (Write::put_or_remove(next.into_bucket(), empty), Ok(out))
                    }
                }
            }
        })
        .await?
}

/// Runs `op` on a private copy of `current` (or an empty bucket).
///
/// `op` reports whether it changed the copy; an unchanged copy is not written.
pub(crate) fn modify<B, R>(
    current: Option<&B>,
    op: impl FnOnce(&mut B) -> Result<(bool, R)>,
) -> Result<(Change<B>, R)>
where
    B: Clone + Default,
{
    let mut next = current.cloned().unwrap_or_default();
    let (changed, out) = op(&mut next)?;
    let change = if changed { Change::Replace(next) } else { Change::Keep };
    Ok((change, out))
}
