//! Element contract shared by every bucket kind.
//!
//! Buckets never hold a null element. Statically typed values are never null;
//! `Option<T>` is the carrier for dynamically typed data and reports `None` as null
//! so the facades can reject it before touching the grid.

use std::fmt::Debug;
use std::sync::Arc;

/// A value that may represent "null".
pub trait Nullable {
    fn is_null(&self) -> bool {
        false
    }
}

macro_rules! never_null {
    ($($ty:ty),* $(,)?) => {
        $(impl Nullable for $ty {})*
    };
}

never_null!(
    String, &str, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize,
);

impl<T> Nullable for Vec<T> {}

impl<T: Nullable> Nullable for Option<T> {
    fn is_null(&self) -> bool {
        match self {
            Some(inner) => inner.is_null(),
            None => true,
        }
    }
}

impl<T: Nullable + ?Sized> Nullable for Box<T> {
    fn is_null(&self) -> bool {
        (**self).is_null()
    }
}

impl<T: Nullable + ?Sized> Nullable for Arc<T> {
    fn is_null(&self) -> bool {
        (**self).is_null()
    }
}

impl<A: Nullable, B: Nullable> Nullable for (A, B) {
    fn is_null(&self) -> bool {
        self.0.is_null() || self.1.is_null()
    }
}

/// Anything that can live inside a bucket.
pub trait Element: Ord + Clone + Debug + Send + Sync + Nullable + 'static {}

impl<T> Element for T where T: Ord + Clone + Debug + Send + Sync + Nullable + 'static {}
