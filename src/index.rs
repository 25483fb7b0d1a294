//! A map from keys to the versions at which the key's value last changed, and
//! onward to the `(value, multiplicity)` pairs that changed there.
//!
//! This is the structure that operators such as [`Join`](crate::operators::join)
//! and [`Reduce`](crate::operators::reduce) use to avoid rescanning the whole
//! history of a collection on every scheduling pass: the key/value structure
//! of the data is exploited directly instead of treating every batch as an
//! opaque set of records.

use crate::collection::Collection;
use crate::order::{Antichain, Version};
use fnv::FnvHashMap;
use std::hash::Hash;

/// A difference-collection trace indexed by key, and then by the version at
/// which each key's values changed.
#[derive(Debug)]
pub struct Index<K, V> {
    inner: FnvHashMap<K, FnvHashMap<Version, Vec<(V, isize)>>>,
    compaction_frontier: Option<Antichain>,
}

impl<K, V> Default for Index<K, V> {
    fn default() -> Self {
        Index { inner: FnvHashMap::default(), compaction_frontier: None }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Index<K, V> {
    /// An empty index with no compaction frontier set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Panics if `requested_version` is not at or above the compaction
    /// frontier: data below the frontier may already have been rewritten or
    /// consolidated away, so reading or writing at or below it would observe
    /// an inconsistent view.
    fn validate_version(&self, requested_version: &Version) {
        if let Some(frontier) = &self.compaction_frontier {
            assert!(
                frontier.less_equal_version(requested_version),
                "version {requested_version:?} is not at or above the compaction frontier"
            );
        }
    }

    fn validate_frontier(&self, requested_frontier: &Antichain) {
        if let Some(frontier) = &self.compaction_frontier {
            assert!(
                frontier.less_equal(requested_frontier),
                "frontier {requested_frontier:?} does not advance past the compaction frontier"
            );
        }
    }

    /// All `(value, multiplicity)` pairs recorded for `key` at a version
    /// `<= requested_version`, accumulated across every such version.
    ///
    /// # Panics
    /// Panics if `requested_version` is below the compaction frontier.
    pub fn reconstruct_at(&self, key: &K, requested_version: &Version) -> Vec<(V, isize)> {
        self.validate_version(requested_version);
        let mut out = Vec::new();
        if let Some(versions) = self.inner.get(key) {
            for (version, values) in versions {
                if version.less_equal(requested_version) {
                    out.extend(values.iter().cloned());
                }
            }
        }
        out
    }

    /// Every version at which `key` has a recorded entry.
    pub fn versions(&self, key: &K) -> Vec<Version> {
        self.inner.get(key).map(|versions| versions.keys().cloned().collect()).unwrap_or_default()
    }

    /// Records `value` for `key` at `version`.
    ///
    /// # Panics
    /// Panics if `version` is below the compaction frontier.
    pub fn add_value(&mut self, key: K, version: Version, value: (V, isize)) {
        self.validate_version(&version);
        self.inner.entry(key).or_default().entry(version).or_default().push(value);
    }

    /// Merges every entry of `other` into `self`.
    pub fn append(&mut self, other: Index<K, V>) {
        for (key, versions) in other.inner {
            let entry = self.inner.entry(key).or_default();
            for (version, mut values) in versions {
                entry.entry(version).or_default().append(&mut values);
            }
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Index<K, V> {
    /// The delta-join primitive: for every key present in both indexes, joins
    /// each version/value pair of `self` against each version/value pair of
    /// `other`, producing one `Collection` of joined records per resulting
    /// version (the join of the two contributing versions).
    ///
    /// Only pairs of entries actually present in the two indexes are visited,
    /// which is what makes this a genuine delta join rather than a full
    /// recomputation: each side only needs to hold the entries newer than
    /// what it has already joined against.
    pub fn join<V2: Clone>(&self, other: &Index<K, V2>) -> Vec<(Version, Collection<(K, (V, V2))>)> {
        let mut collections: FnvHashMap<Version, Vec<((K, (V, V2)), isize)>> = FnvHashMap::default();

        for (key, versions) in &self.inner {
            let Some(other_versions) = other.inner.get(key) else { continue };
            for (version1, data1) in versions {
                for (version2, data2) in other_versions {
                    for (val1, mul1) in data1 {
                        for (val2, mul2) in data2 {
                            let result_version = version1.join(version2);
                            collections.entry(result_version).or_default().push((
                                (key.clone(), (val1.clone(), val2.clone())),
                                mul1 * mul2,
                            ));
                        }
                    }
                }
            }
        }

        collections
            .into_iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(version, entries)| (version, Collection::from_entries(entries)))
            .collect()
    }
}

impl<K: Eq + Hash + Clone, V: Eq + Hash + Clone> Index<K, V> {
    /// Rewrites every version not at or above `compaction_frontier` to its
    /// image under [`Version::advance_by`], consolidating entries that land
    /// on the same rewritten version afterward. Restricting `keys` limits the
    /// work to those keys only; an empty slice compacts every key.
    ///
    /// The compaction frontier can only move forward: each call must pass a
    /// frontier at or above the previous one.
    ///
    /// # Panics
    /// Panics if `compaction_frontier` is below the current compaction
    /// frontier, or (via [`Self::validate_frontier`]) regresses it.
    pub fn compact(&mut self, compaction_frontier: Antichain, keys: &[K]) {
        self.validate_frontier(&compaction_frontier);

        let target_keys: Vec<K> =
            if keys.is_empty() { self.inner.keys().cloned().collect() } else { keys.to_vec() };

        for key in target_keys {
            let Some(versions) = self.inner.get_mut(&key) else { continue };

            let to_compact: Vec<Version> = versions
                .keys()
                .filter(|version| !compaction_frontier.less_equal_version(version))
                .cloned()
                .collect();

            let mut touched = std::collections::HashSet::new();
            for version in to_compact {
                let values = versions.remove(&version).unwrap();
                let new_version = version.advance_by(&compaction_frontier);
                versions.entry(new_version.clone()).or_default().extend(values);
                touched.insert(new_version);
            }

            for version in touched {
                let values = versions.remove(&version).unwrap();
                let mut consolidated: FnvHashMap<V, isize> = FnvHashMap::default();
                for (value, multiplicity) in values {
                    *consolidated.entry(value).or_insert(0) += multiplicity;
                }
                let entries: Vec<(V, isize)> =
                    consolidated.into_iter().filter(|(_, m)| *m != 0).collect();
                versions.insert(version, entries);
            }
        }

        self.compaction_frontier = Some(compaction_frontier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(coords: &[usize]) -> Version {
        Version::new(coords.iter().copied())
    }

    #[test]
    fn reconstruct_at_accumulates_versions_at_or_below() {
        let mut index: Index<&str, i64> = Index::new();
        index.add_value("k", v(&[0]), (1, 1));
        index.add_value("k", v(&[1]), (2, 1));
        index.add_value("k", v(&[2]), (3, 1));

        let mut result = index.reconstruct_at(&"k", &v(&[1]));
        result.sort();
        assert_eq!(result, vec![(1, 1), (2, 1)]);
    }

    #[test]
    fn join_only_visits_shared_keys() {
        let mut left: Index<&str, i64> = Index::new();
        left.add_value("k1", v(&[0]), (1, 1));
        left.add_value("k2", v(&[0]), (9, 1));

        let mut right: Index<&str, i64> = Index::new();
        right.add_value("k1", v(&[0]), (10, 2));

        let joined = left.join(&right);
        assert_eq!(joined.len(), 1);
        let (version, collection) = &joined[0];
        assert_eq!(*version, v(&[0]));
        assert_eq!(collection.entries(), &[(("k1", (1, 10)), 2)]);
    }

    #[test]
    fn compact_rewrites_and_consolidates() {
        let mut index: Index<&str, i64> = Index::new();
        index.add_value("k", v(&[0]), (1, 1));
        index.add_value("k", v(&[1]), (1, -1));
        index.add_value("k", v(&[2]), (2, 1));

        index.compact(Antichain::new([v(&[1])]), &[]);

        let mut versions = index.versions(&"k");
        versions.sort();
        assert_eq!(versions, vec![v(&[1]), v(&[2])]);
        assert!(index.reconstruct_at(&"k", &v(&[1])).is_empty());
        assert_eq!(index.reconstruct_at(&"k", &v(&[2])), vec![(2, 1)]);
    }

    #[test]
    #[should_panic(expected = "does not advance past the compaction frontier")]
    fn compact_rejects_frontier_regression() {
        let mut index: Index<&str, i64> = Index::new();
        index.add_value("k", v(&[2]), (1, 1));
        index.compact(Antichain::new([v(&[2])]), &[]);
        index.compact(Antichain::new([v(&[1])]), &[]);
    }

    #[test]
    #[should_panic(expected = "is not at or above the compaction frontier")]
    fn add_value_below_compaction_frontier_panics() {
        let mut index: Index<&str, i64> = Index::new();
        index.add_value("k", v(&[2]), (1, 1));
        index.compact(Antichain::new([v(&[2])]), &[]);
        index.add_value("k", v(&[1]), (2, 1));
    }
}
