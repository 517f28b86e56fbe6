// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Weak, unordered, hash-bucketed registry of shared elements.

use alloc::rc::{Rc, Weak};
use core::fmt;
use core::hash::{BuildHasher, Hash};

use hashbrown::{DefaultHashBuilder, HashMap};
use smallvec::SmallVec;

/// Inline capacity of a bucket.
///
/// Distinct live elements rarely share a hash, so one slot plus a spare for
/// a not-yet-culled dead entry covers the common case without allocating.
const INLINE_BUCKET: usize = 2;

type Bucket<T> = SmallVec<[Weak<T>; INLINE_BUCKET]>;

/// An unordered collection that holds its elements without extending their lifetime.
///
/// Elements are shared through [`Rc`] and recorded as [`Weak`] references,
/// bucketed by their [`Hash`]. Membership is decided by [`Eq`] on the live
/// element, so two distinct elements whose hashes collide live side by side
/// in the same bucket and are removed independently.
///
/// Dead entries (whose last strong owner elsewhere has been dropped) are never
/// observed: [`contains`](Self::contains) and [`iter`](Self::iter) skip them.
/// They are culled lazily, only when [`insert`](Self::insert) or
/// [`remove`](Self::remove) touch the same bucket. There is no background sweep.
///
/// `T` may be unsized, so a registry of trait objects works as long as the
/// trait object type implements `Hash` and `Eq`.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use understory_tooltip::WeakRegistry;
///
/// let mut registry = WeakRegistry::new();
/// let a = Rc::new("a");
/// let b = Rc::new("b");
///
/// assert!(registry.insert(&a));
/// assert!(!registry.insert(&Rc::new("a")), "equal elements are not duplicated");
/// assert!(registry.insert(&b));
///
/// drop(b);
/// let live: Vec<_> = registry.iter().collect();
/// assert_eq!(live, vec![a.clone()]);
/// ```
pub struct WeakRegistry<T: ?Sized> {
    buckets: HashMap<u64, Bucket<T>>,
    hasher: DefaultHashBuilder,
}

impl<T: ?Sized> Default for WeakRegistry<T> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
            hasher: DefaultHashBuilder::default(),
        }
    }
}

impl<T: ?Sized> WeakRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a one-shot iterator over the live elements.
    ///
    /// The order is unspecified. Iteration does not cull dead entries.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            buckets: self.buckets.values(),
            current: core::slice::Iter::default(),
        }
    }

    /// Returns the number of live elements.
    ///
    /// This walks every bucket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns `true` if no live element is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Forgets every element, live or dead.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

impl<T: ?Sized + Hash + Eq> WeakRegistry<T> {
    /// Records `value` unless an equal live element is already present.
    ///
    /// Dead entries in the target bucket are culled first.
    /// Returns `true` if the element was newly recorded.
    pub fn insert(&mut self, value: &Rc<T>) -> bool {
        let hash = self.hasher.hash_one(&**value);
        let bucket = self.buckets.entry(hash).or_default();
        bucket.retain(|entry| entry.strong_count() > 0);
        if bucket
            .iter()
            .filter_map(Weak::upgrade)
            .any(|existing| *existing == **value)
        {
            return false;
        }
        bucket.push(Rc::downgrade(value));
        true
    }

    /// Removes the live element equal to `value`.
    ///
    /// Dead entries in the target bucket are culled, and the bucket is dropped
    /// once empty. Returns `true` if a live element was removed.
    pub fn remove(&mut self, value: &T) -> bool {
        let hash = self.hasher.hash_one(value);
        let Some(bucket) = self.buckets.get_mut(&hash) else {
            return false;
        };
        let before = bucket.len();
        let mut culled = 0;
        bucket.retain(|entry| match entry.upgrade() {
            Some(existing) => *existing != *value,
            None => {
                culled += 1;
                false
            }
        });
        let removed = before - culled != bucket.len();
        if bucket.is_empty() {
            self.buckets.remove(&hash);
        }
        removed
    }

    /// Returns `true` if a live element equal to `value` is recorded.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        let hash = self.hasher.hash_one(value);
        self.buckets.get(&hash).is_some_and(|bucket| {
            bucket
                .iter()
                .filter_map(Weak::upgrade)
                .any(|existing| *existing == *value)
        })
    }
}

impl<T: ?Sized + Hash + Eq> FromIterator<Rc<T>> for WeakRegistry<T> {
    fn from_iter<I: IntoIterator<Item = Rc<T>>>(iter: I) -> Self {
        let mut registry = Self::new();
        for value in iter {
            registry.insert(&value);
        }
        registry
    }
}

impl<T: ?Sized> fmt::Debug for WeakRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRegistry")
            .field("buckets", &self.buckets.len())
            .field("live", &self.len())
            .finish_non_exhaustive()
    }
}

/// Iterator over the live elements of a [`WeakRegistry`].
///
/// Produced by [`WeakRegistry::iter`]. Each element is upgraded to a fresh
/// strong reference; dead entries are skipped.
pub struct Iter<'a, T: ?Sized> {
    buckets: hashbrown::hash_map::Values<'a, u64, Bucket<T>>,
    current: core::slice::Iter<'a, Weak<T>>,
}

impl<T: ?Sized> Iterator for Iter<'_, T> {
    type Item = Rc<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            for entry in self.current.by_ref() {
                if let Some(value) = entry.upgrade() {
                    return Some(value);
                }
            }
            self.current = self.buckets.next()?.iter();
        }
    }
}

impl<T: ?Sized> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use core::hash::Hasher;

    /// Every value hashes the same, so all of them share one bucket.
    #[derive(Debug, PartialEq, Eq)]
    struct Collide(u32);

    impl Hash for Collide {
        fn hash<H: Hasher>(&self, state: &mut H) {
            0_u8.hash(state);
        }
    }

    #[test]
    fn insert_is_idempotent_by_equality() {
        let mut registry = WeakRegistry::new();
        let a = Rc::new(7_u32);
        let a_again = Rc::new(7_u32);

        assert!(registry.insert(&a));
        assert!(!registry.insert(&a));
        assert!(!registry.insert(&a_again));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&7));
    }

    #[test]
    fn released_elements_are_never_observed() {
        let mut registry = WeakRegistry::new();
        let a = Rc::new(1_u32);
        let b = Rc::new(2_u32);
        registry.insert(&a);
        registry.insert(&b);

        drop(b);
        assert!(!registry.contains(&2));
        let live: Vec<_> = registry.iter().map(|v| *v).collect();
        assert_eq!(live, [1]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn removing_a_released_element_is_a_noop() {
        let mut registry = WeakRegistry::new();
        let a = Rc::new(1_u32);
        let b = Rc::new(2_u32);
        registry.insert(&a);
        registry.insert(&b);
        drop(b);

        assert!(!registry.remove(&2));
        assert!(registry.contains(&1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn colliding_hashes_coexist_and_are_removed_independently() {
        let mut registry = WeakRegistry::new();
        let a = Rc::new(Collide(1));
        let b = Rc::new(Collide(2));

        assert!(registry.insert(&a));
        assert!(registry.insert(&b));
        assert_eq!(registry.buckets.len(), 1);
        assert_eq!(registry.len(), 2);

        assert!(registry.remove(&Collide(1)));
        assert!(!registry.contains(&Collide(1)));
        assert!(registry.contains(&Collide(2)));

        assert!(registry.remove(&Collide(2)));
        assert!(registry.is_empty());
        assert!(registry.buckets.is_empty(), "empty bucket should be dropped");
    }

    #[test]
    fn insert_culls_dead_entries_in_the_same_bucket() {
        let mut registry = WeakRegistry::new();
        let a = Rc::new(Collide(1));
        registry.insert(&a);
        drop(a);
        assert_eq!(registry.buckets.values().map(SmallVec::len).sum::<usize>(), 1);

        let b = Rc::new(Collide(2));
        registry.insert(&b);
        assert_eq!(registry.buckets.values().map(SmallVec::len).sum::<usize>(), 1);
    }

    #[test]
    fn iteration_does_not_cull() {
        let mut registry = WeakRegistry::new();
        let a = Rc::new(Collide(1));
        let b = Rc::new(Collide(2));
        registry.insert(&a);
        registry.insert(&b);
        drop(a);

        assert_eq!(registry.iter().count(), 1);
        assert_eq!(registry.buckets.values().map(SmallVec::len).sum::<usize>(), 2);
    }

    #[test]
    fn iterator_is_one_shot() {
        let mut registry = WeakRegistry::new();
        let values: Vec<_> = (0..4_u32).map(Rc::new).collect();
        for value in &values {
            registry.insert(value);
        }

        let mut iter = registry.iter();
        assert_eq!(iter.by_ref().count(), 4);
        assert!(iter.next().is_none());
        assert_eq!(registry.iter().count(), 4);
    }

    trait Named {
        fn name(&self) -> &str;
    }

    struct N(&'static str);

    impl Named for N {
        fn name(&self) -> &str {
            self.0
        }
    }

    impl PartialEq for dyn Named {
        fn eq(&self, other: &Self) -> bool {
            core::ptr::addr_eq(self as *const Self, other as *const Self)
        }
    }

    impl Eq for dyn Named {}

    impl Hash for dyn Named {
        fn hash<H: Hasher>(&self, state: &mut H) {
            (self as *const Self).cast::<()>().hash(state);
        }
    }

    #[test]
    fn trait_objects_by_identity() {
        let mut registry: WeakRegistry<dyn Named> = WeakRegistry::new();
        let a: Rc<dyn Named> = Rc::new(N("same"));
        let b: Rc<dyn Named> = Rc::new(N("same"));
        assert!(registry.insert(&a));
        assert!(registry.insert(&b), "distinct objects are distinct members");
        assert_eq!(registry.len(), 2);
        assert!(registry.iter().all(|n| n.name() == "same"));

        assert!(registry.remove(&*a));
        assert!(registry.contains(&*b));
    }
}
