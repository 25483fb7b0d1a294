//! Multisets of records with signed-integer multiplicities, and the algebra
//! of operations over them that preserve differential semantics under
//! composition: `concat`, `negate`, `map`, `filter`, `consolidate`, `join`,
//! and `reduce` (with `count`/`sum`/`min`/`max`/`distinct` as specializations
//! of `reduce`).
//!
//! A multiplicity of zero is equivalent to absence. Two collections are
//! logically equal if, after [`Collection::consolidate`], they are identical.

use std::collections::HashMap;
use std::hash::Hash;

/// A multiset of records of type `D`, represented as a bag of `(record,
/// multiplicity)` pairs. Multiple entries for the same record are permitted;
/// call [`Collection::consolidate`] to combine them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Collection<D> {
    inner: Vec<(D, isize)>,
}

impl<D> Default for Collection<D> {
    fn default() -> Self {
        Collection { inner: Vec::new() }
    }
}

impl<D> Collection<D> {
    /// An empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection directly from its `(record, multiplicity)` pairs.
    pub fn from_entries(entries: Vec<(D, isize)>) -> Self {
        Collection { inner: entries }
    }

    /// Appends `other`'s entries into `self` in place, without consolidating.
    pub fn extend(&mut self, other: Collection<D>) {
        self.inner.extend(other.inner);
    }

    /// The raw `(record, multiplicity)` entries, in no particular order.
    pub fn entries(&self) -> &[(D, isize)] {
        &self.inner
    }

    /// Consumes the collection, yielding its raw entries.
    pub fn into_entries(self) -> Vec<(D, isize)> {
        self.inner
    }

    /// True if the collection holds no entries at all (not even zero-weighted ones).
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Bag union: every entry of `self` and `other`, with no summing.
    pub fn concat(mut self, other: Collection<D>) -> Collection<D> {
        self.inner.extend(other.inner);
        self
    }

    /// Negates every multiplicity.
    pub fn negate(self) -> Collection<D> {
        Collection { inner: self.inner.into_iter().map(|(d, m)| (d, -m)).collect() }
    }

    /// Applies `f` to every record, preserving multiplicities.
    pub fn map<D2>(self, f: impl Fn(D) -> D2) -> Collection<D2> {
        Collection { inner: self.inner.into_iter().map(|(d, m)| (f(d), m)).collect() }
    }

    /// Retains only the entries whose record satisfies `p`.
    pub fn filter(self, p: impl Fn(&D) -> bool) -> Collection<D> {
        Collection { inner: self.inner.into_iter().filter(|(d, _)| p(d)).collect() }
    }
}

impl<D: Eq + Hash + Ord + Clone> Collection<D> {
    /// Groups by record, sums multiplicities, drops entries that sum to
    /// zero, and sorts the remainder by the host's total order on records.
    pub fn consolidate(self) -> Collection<D> {
        let mut consolidated: HashMap<D, isize> = HashMap::new();
        for (d, m) in self.inner {
            *consolidated.entry(d).or_insert(0) += m;
        }
        let mut entries: Vec<(D, isize)> =
            consolidated.into_iter().filter(|(_, m)| *m != 0).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Collection { inner: entries }
    }
}

impl<K: Eq + Hash + Clone, V> Collection<(K, V)> {
    /// For every `((k, v1), m1)` in `self` and `((k, v2), m2)` in `other` with
    /// equal keys, emits `((k, (v1, v2)), m1 * m2)`. Not consolidated.
    pub fn join<V2: Clone>(self, other: &Collection<(K, V2)>) -> Collection<(K, (V, V2))>
    where
        V: Clone,
    {
        let mut by_key: HashMap<K, Vec<(V2, isize)>> = HashMap::new();
        for ((k, v), m) in other.inner.iter() {
            by_key.entry(k.clone()).or_default().push((v.clone(), *m));
        }

        let mut out = Vec::new();
        for ((k1, v1), m1) in self.inner {
            if let Some(right) = by_key.get(&k1) {
                for (v2, m2) in right {
                    out.push(((k1.clone(), (v1.clone(), v2.clone())), m1 * m2));
                }
            }
        }
        Collection { inner: out }
    }

    /// Groups entries by key and passes each key's `[(value, multiplicity)]`
    /// list to `f`, which returns the key's new `[(value, multiplicity)]`
    /// list; results are re-wrapped as `((key, value), multiplicity)`.
    pub fn reduce<V2>(self, f: impl Fn(&[(V, isize)]) -> Vec<(V2, isize)>) -> Collection<(K, V2)> {
        let mut by_key: HashMap<K, Vec<(V, isize)>> = HashMap::new();
        for ((k, v), m) in self.inner {
            by_key.entry(k).or_default().push((v, m));
        }

        let mut out = Vec::new();
        for (key, values) in by_key {
            for (value, mult) in f(&values) {
                out.push(((key.clone(), value), mult));
            }
        }
        Collection { inner: out }
    }

    /// Per key, the sum of multiplicities, with multiplicity 1.
    pub fn count(self) -> Collection<(K, isize)> {
        self.reduce(|values| vec![(values.iter().map(|(_, m)| m).sum(), 1)])
    }
}

impl<K: Eq + Hash + Clone> Collection<(K, isize)> {
    /// Per key, `sum(value * multiplicity)`, with multiplicity 1.
    pub fn sum(self) -> Collection<(K, isize)> {
        self.reduce(|values| vec![(values.iter().map(|(v, m)| v * m).sum(), 1)])
    }
}

impl<K: Eq + Hash + Clone, V: Ord + Clone> Collection<(K, V)> {
    /// Per key, the minimum value, with multiplicity 1.
    ///
    /// # Panics
    /// Panics if any contributing multiplicity is non-positive.
    pub fn min(self) -> Collection<(K, V)> {
        self.reduce(|values| {
            let mut out = values[0].0.clone();
            for (val, mult) in values {
                assert!(*mult > 0, "min requires positive multiplicities, found {mult}");
                if *val < out {
                    out = val.clone();
                }
            }
            vec![(out, 1)]
        })
    }

    /// Per key, the maximum value, with multiplicity 1.
    ///
    /// # Panics
    /// Panics if any contributing multiplicity is non-positive.
    pub fn max(self) -> Collection<(K, V)> {
        self.reduce(|values| {
            let mut out = values[0].0.clone();
            for (val, mult) in values {
                assert!(*mult > 0, "max requires positive multiplicities, found {mult}");
                if *val > out {
                    out = val.clone();
                }
            }
            vec![(out, 1)]
        })
    }
}

impl<K: Eq + Hash + Clone, V: Eq + Hash + Clone> Collection<(K, V)> {
    /// Per key, each distinct value with positive consolidated multiplicity,
    /// emitted once with multiplicity 1.
    ///
    /// # Panics
    /// Panics if, after internal consolidation, any value has negative multiplicity.
    pub fn distinct(self) -> Collection<(K, V)> {
        self.reduce(|values| {
            let mut consolidated: HashMap<V, isize> = HashMap::new();
            for (val, mult) in values {
                *consolidated.entry(val.clone()).or_insert(0) += mult;
            }
            for mult in consolidated.values() {
                assert!(*mult >= 0, "distinct requires non-negative multiplicities, found {mult}");
            }
            consolidated.into_iter().filter(|(_, m)| *m > 0).map(|(v, _)| (v, 1)).collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(entries: Vec<(i64, isize)>) -> Collection<i64> {
        Collection::from_entries(entries)
    }

    #[test]
    fn concat_then_consolidate_cancels_negate() {
        let a = collection(vec![(1, 2), (2, 1)]);
        let result = a.clone().concat(a.negate()).consolidate();
        assert!(result.is_empty());
    }

    #[test]
    fn map_commutes_with_consolidate() {
        let a = collection(vec![(1, 1), (1, 1), (2, -1)]);
        let via_map_then_consolidate = a.clone().map(|x| x % 2).consolidate();
        let via_consolidate_then_map = a.consolidate().map(|x| x % 2).consolidate();
        assert_eq!(via_map_then_consolidate, via_consolidate_then_map);
    }

    #[test]
    fn filter_commutes_with_negate() {
        let a = collection(vec![(1, 2), (2, 3), (3, -1)]);
        let lhs = a.clone().negate().filter(|x| x % 2 == 1).consolidate();
        let rhs = a.filter(|x| x % 2 == 1).negate().consolidate();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn join_is_commutative_up_to_reordering() {
        let a: Collection<(&str, i64)> = collection_pairs(vec![(("k", 1), 2)]);
        let b: Collection<(&str, i64)> = collection_pairs(vec![(("k", 2), 3)]);

        let ab = a.clone().join(&b).map(|(k, (v1, v2))| (k, (v1, v2)));
        let ba = b.join(&a).map(|(k, (v2, v1))| (k, (v1, v2)));
        assert_eq!(ab.consolidate(), ba.consolidate());
    }

    fn collection_pairs<K: Clone, V: Clone>(entries: Vec<((K, V), isize)>) -> Collection<(K, V)> {
        Collection::from_entries(entries)
    }

    #[test]
    fn distinct_drops_duplicates_and_negatives() {
        let a = collection_pairs(vec![
            (("k", "x"), 3),
            (("k", "y"), -2),
            (("k", "y"), 2),
            (("k", "z"), 1),
        ]);
        let mut result = a.distinct().into_entries();
        result.sort();
        assert_eq!(result, vec![(("k", "x"), 1), (("k", "z"), 1)]);
    }

    #[test]
    #[should_panic(expected = "distinct requires non-negative multiplicities")]
    fn distinct_rejects_negative_consolidated_multiplicity() {
        let a = collection_pairs(vec![(("k", "x"), -1)]);
        let _ = a.distinct();
    }

    #[test]
    fn count_sums_multiplicities_per_key() {
        let a = collection_pairs(vec![(("k1", "a"), 2), (("k1", "b"), 3), (("k2", "a"), 5)]);
        let mut result = a.count().into_entries();
        result.sort();
        assert_eq!(result, vec![(("k1", 5), 1), (("k2", 5), 1)]);
    }
}
