use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use bytes::Bytes;

use crate::key::{max_cmp, next_key, KeyRange};
use crate::lock::{Lock, LockId};

/// Ordering key for lower endpoints. The derived `Option` ordering already
/// puts the absent endpoint before every real key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct MinKey(Option<Bytes>);

/// Ordering key for upper endpoints; the absent endpoint sorts after every
/// real key.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MaxKey(Option<Bytes>);

impl Ord for MaxKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        max_cmp(self.0.as_ref(), other.0.as_ref())
    }
}

impl PartialOrd for MaxKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// # Lock Index
///
/// Two parallel ordered maps over the same population of lock records, one
/// keyed by lower endpoint and one by upper endpoint. Slicing each around a
/// query range retrieves every record whose range could overlap or touch the
/// query in `O(log n + k)`. The record id tie-breaks both orderings, so any
/// number of records with equal endpoints coexist.
///
/// Both maps hold exactly the same records at all times.
#[derive(Debug, Default)]
pub(crate) struct LockIndex {
    by_min: BTreeMap<(MinKey, LockId), Arc<Lock>>,
    by_max: BTreeMap<(MaxKey, LockId), Arc<Lock>>,
}

impl LockIndex {
    fn min_entry(lock: &Lock) -> (MinKey, LockId) {
        (MinKey(lock.range().min().cloned()), lock.id())
    }

    fn max_entry(lock: &Lock) -> (MaxKey, LockId) {
        (MaxKey(lock.range().max().cloned()), lock.id())
    }

    pub(crate) fn insert(&mut self, lock: Arc<Lock>) {
        let min_prev = self.by_min.insert(Self::min_entry(&lock), Arc::clone(&lock));
        let max_prev = self.by_max.insert(Self::max_entry(&lock), lock);
        debug_assert!(min_prev.is_none() && max_prev.is_none());
    }

    pub(crate) fn remove(&mut self, lock: &Lock) {
        let min_prev = self.by_min.remove(&Self::min_entry(lock));
        let max_prev = self.by_max.remove(&Self::max_entry(lock));
        debug_assert!(min_prev.is_some() && max_prev.is_some());
    }

    pub(crate) fn len(&self) -> usize {
        debug_assert_eq!(self.by_min.len(), self.by_max.len());
        self.by_min.len()
    }

    /// All records, ordered by lower endpoint.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<Lock>> {
        self.by_min.values()
    }

    /// Every record whose range overlaps `range` or meets it at an endpoint.
    ///
    /// The by-min slice keeps records starting at or below the queried upper
    /// bound; of those, a record qualifies when it also belongs to the
    /// by-max slice of records ending at or above the queried lower bound.
    /// Endpoint-equal records are deliberately kept: they cannot conflict
    /// with the query, but the caller merges them when the owner matches.
    pub(crate) fn overlapping(&self, range: &KeyRange) -> Vec<Arc<Lock>> {
        let head = match range.max() {
            // `min <= max` is the same cut as `min < next_key(max)`.
            Some(max) => Bound::Excluded((MinKey(Some(next_key(max))), LockId::ZERO)),
            None => Bound::Unbounded,
        };
        self.by_min
            .range((Bound::Unbounded, head))
            .map(|(_, other)| other)
            .filter(|other| self.in_max_tail(range.min(), other))
            .map(Arc::clone)
            .collect()
    }

    /// Membership test against the by-max slice of records whose upper
    /// endpoint reaches `min` or beyond.
    fn in_max_tail(&self, min: Option<&Bytes>, other: &Arc<Lock>) -> bool {
        let entry = Self::max_entry(other);
        if let Some(min) = min {
            if entry.0 < MaxKey(Some(min.clone())) {
                return false;
            }
        }
        self.by_max.contains_key(&entry)
    }

    #[cfg(test)]
    pub(crate) fn min_ids(&self) -> Vec<LockId> {
        self.by_min.keys().map(|(_, id)| *id).collect()
    }

    #[cfg(test)]
    pub(crate) fn max_ids(&self) -> Vec<LockId> {
        self.by_max.keys().map(|(_, id)| *id).collect()
    }
}
