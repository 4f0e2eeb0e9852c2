//! The closed set of bucket kinds a key can hold.

use crate::element::Element;
use crate::pair::PairBucket;
use crate::sequence::SequenceBucket;
use crate::set::SetBucket;
use crate::sorted_set::SortedSetBucket;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BucketKind {
    SortedSet,
    Sequence,
    Set,
    Pair,
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BucketKind::SortedSet => "sorted set",
            BucketKind::Sequence => "sequence",
            BucketKind::Set => "set",
            BucketKind::Pair => "pair",
        };
        f.write_str(name)
    }
}

/// A value stored under one key. A key keeps the same kind for its lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "V: Element + Serialize",
    deserialize = "V: Element + Deserialize<'de>"
))]
pub enum Bucket<V: Element> {
    SortedSet(SortedSetBucket<V>),
    Sequence(SequenceBucket<V>),
    Set(SetBucket<V>),
    Pair(PairBucket<V, V>),
}

impl<V: Element> Bucket<V> {
    pub fn kind(&self) -> BucketKind {
        match self {
            Bucket::SortedSet(_) => BucketKind::SortedSet,
            Bucket::Sequence(_) => BucketKind::Sequence,
            Bucket::Set(_) => BucketKind::Set,
            Bucket::Pair(_) => BucketKind::Pair,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Bucket::SortedSet(b) => b.len(),
            Bucket::Sequence(b) => b.len(),
            Bucket::Set(b) => b.len(),
            Bucket::Pair(b) => b.len(),
        }
    }

    /// An empty bucket is never stored; its key is removed instead.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_variant<B: BucketVariant<V>>(&self) -> Option<&B> {
        B::from_bucket(self)
    }
}

/// Typed access to one arm of [`Bucket`].
pub trait BucketVariant<V: Element>: Clone + Default + Send + Sync + 'static {
    const KIND: BucketKind;

    fn from_bucket(bucket: &Bucket<V>) -> Option<&Self>;

    fn into_bucket(self) -> Bucket<V>;

    fn is_empty(&self) -> bool;
}

macro_rules! bucket_variant {
    ($arm:ident, $ty:ty) => {
        impl<V: Element> BucketVariant<V> for $ty {
            const KIND: BucketKind = BucketKind::$arm;

            fn from_bucket(bucket: &Bucket<V>) -> Option<&Self> {
                match bucket {
                    Bucket::$arm(inner) => Some(inner),
                    _ => None,
                }
            }

            fn into_bucket(self) -> Bucket<V> {
                Bucket::$arm(self)
            }

            fn is_empty(&self) -> bool {
                <$ty>::is_empty(self)
            }
        }
    };
}

bucket_variant!(SortedSet, SortedSetBucket<V>);
bucket_variant!(Sequence, SequenceBucket<V>);
bucket_variant!(Set, SetBucket<V>);
bucket_variant!(Pair, PairBucket<V, V>);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scored::ScoredValue;

    #[test]
    fn test_kind_and_variant_access() {
        let mut list = SequenceBucket::new();
        list.offer_last("a".to_string());
        let bucket = list.clone().into_bucket();
        assert_eq!(bucket.kind(), BucketKind::Sequence);
        assert_eq!(bucket.as_variant::<SequenceBucket<String>>(), Some(&list));
        assert!(bucket.as_variant::<SetBucket<String>>().is_none());
        assert!(!bucket.is_empty());
    }

    #[test]
    fn test_bucket_serde_round_trip() {
        let sorted: SortedSetBucket<String> =
            vec![ScoredValue::new(1.5, "a".to_string())].into();
        let bucket = Bucket::SortedSet(sorted);
        let json = serde_json::to_string(&bucket).unwrap();
        let back: Bucket<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bucket);
    }
}
