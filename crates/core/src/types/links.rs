//! Soft-delete set replacement.
//!
//! Link tables (product/tag, product/size) never lose rows: replacing a set
//! deactivates links that were dropped, reactivates links that come back and
//! inserts links that never existed.

use std::collections::{BTreeMap, BTreeSet};

/// The writes needed to make exactly `submitted` the active link set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkChanges<K> {
    /// Active links missing from the submitted set.
    pub deactivate: Vec<K>,
    /// Inactive links present in the submitted set.
    pub reactivate: Vec<K>,
    /// Submitted keys with no row at all.
    pub insert: Vec<K>,
}

impl<K: Ord + Copy> LinkChanges<K> {
    /// Diff the stored links (`(key, is_active)`) against the submitted keys.
    ///
    /// Duplicate submitted keys count once. Output vectors are sorted.
    ///
    /// ```
    /// use tienda_core::LinkChanges;
    ///
    /// let current = [(1, true), (2, false), (3, true)];
    /// let changes = LinkChanges::compute(&current, &[2, 3, 4]);
    /// assert_eq!(changes.deactivate, vec![1]);
    /// assert_eq!(changes.reactivate, vec![2]);
    /// assert_eq!(changes.insert, vec![4]);
    /// ```
    #[must_use]
    pub fn compute(current: &[(K, bool)], submitted: &[K]) -> Self {
        let stored: BTreeMap<K, bool> = current.iter().copied().collect();
        let wanted: BTreeSet<K> = submitted.iter().copied().collect();

        let deactivate = stored
            .iter()
            .filter(|(key, active)| **active && !wanted.contains(key))
            .map(|(key, _)| *key)
            .collect();

        let mut reactivate = Vec::new();
        let mut insert = Vec::new();
        for key in wanted {
            match stored.get(&key) {
                Some(true) => {}
                Some(false) => reactivate.push(key),
                None => insert.push(key),
            }
        }

        Self {
            deactivate,
            reactivate,
            insert,
        }
    }

    /// Whether the stored links already match.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deactivate.is_empty() && self.reactivate.is_empty() && self.insert.is_empty()
    }
}
