//! Generic group-by-key reduction, plus the derived `count`, `sum`, `min`,
//! `max`, and `distinct` operators built on top of it.
//!
//! Unlike the stateless operators in [`crate::operators::linear`], `Reduce`
//! must remember, for every key, every value ever seen at every still-open
//! version (`index`) and the value it last emitted for that key (`index_out`)
//! so that it can emit the *difference* rather than recomputing and
//! re-sending the whole output every time new input arrives.

use crate::index::Index;
use crate::message::Message;
use crate::operator::{RunnableOperator, UnaryOperator};
use crate::order::{Antichain, Version};
use fnv::FnvHashMap;
use std::collections::HashSet;
use std::hash::Hash;

/// Groups incoming `(key, value)` records by key and, for every version at
/// which a key's contributing values are fully known, calls `f` on that
/// key's accumulated `[(value, multiplicity)]` list and emits the delta
/// between `f`'s result and what was previously emitted for that key.
pub struct Reduce<K, V, V2, F> {
    base: UnaryOperator<(K, V), (K, V2)>,
    index: Index<K, V>,
    index_out: Index<K, V2>,
    keys_todo: FnvHashMap<Version, HashSet<K>>,
    f: F,
}

impl<K, V, V2, F> Reduce<K, V, V2, F>
where
    K: Eq + Hash + Clone,
    V: Clone,
    V2: Clone,
{
    pub fn new(
        input: crate::stream::StreamReader<(K, V)>,
        output: crate::stream::Writer<(K, V2)>,
        f: F,
        initial_frontier: Antichain,
    ) -> Self {
        Reduce {
            base: UnaryOperator::new(input, output, initial_frontier),
            index: Index::new(),
            index_out: Index::new(),
            keys_todo: FnvHashMap::default(),
            f,
        }
    }
}

fn subtract_values<V2: Eq + Hash + Clone>(
    first: &[(V2, isize)],
    second: &[(V2, isize)],
) -> Vec<(V2, isize)> {
    let mut result: FnvHashMap<V2, isize> = FnvHashMap::default();
    for (value, multiplicity) in first {
        *result.entry(value.clone()).or_insert(0) += multiplicity;
    }
    for (value, multiplicity) in second {
        *result.entry(value.clone()).or_insert(0) -= multiplicity;
    }
    result.into_iter().filter(|(_, m)| *m != 0).collect()
}

impl<K, V, V2, F> RunnableOperator for Reduce<K, V, V2, F>
where
    K: Eq + Hash + Clone,
    V: Clone,
    V2: Eq + Hash + Clone,
    F: Fn(&[(V, isize)]) -> Vec<(V2, isize)>,
{
    fn step(&mut self) {
        for message in self.base.input_messages() {
            match message {
                Message::Data(version, collection) => {
                    for ((key, value), multiplicity) in collection.into_entries() {
                        self.index.add_value(key.clone(), version.clone(), (value, multiplicity));
                        self.keys_todo.entry(version.clone()).or_default().insert(key.clone());
                        for other_version in self.index.versions(&key) {
                            let joined = version.join(&other_version);
                            self.keys_todo.entry(joined).or_default().insert(key.clone());
                        }
                    }
                }
                Message::Frontier(frontier) => self.base.set_input_frontier(frontier),
            }
        }

        let mut finished_versions: Vec<Version> = self
            .keys_todo
            .keys()
            .filter(|version| !self.base.input_frontier.less_equal_version(version))
            .cloned()
            .collect();
        finished_versions.sort();

        for version in finished_versions {
            let keys = self.keys_todo.remove(&version).unwrap();
            let mut result = Vec::new();
            for key in keys {
                let current = self.index.reconstruct_at(&key, &version);
                let current_out = self.index_out.reconstruct_at(&key, &version);
                let computed = (self.f)(&current);
                let delta = subtract_values(&computed, &current_out);
                for (value, multiplicity) in delta {
                    result.push(((key.clone(), value.clone()), multiplicity));
                    self.index_out.add_value(key.clone(), version.clone(), (value, multiplicity));
                }
            }
            if !result.is_empty() {
                self.base.output.send_data(version, crate::collection::Collection::from_entries(result));
            }
        }

        let advanced = self.base.output_frontier.less_than(&self.base.input_frontier);
        self.base.advance_output_frontier(self.base.input_frontier.clone());
        if advanced {
            self.index.compact(self.base.output_frontier.clone(), &[]);
            self.index_out.compact(self.base.output_frontier.clone(), &[]);
        }
    }

    fn pending_work(&self) -> bool {
        self.base.pending_work() || !self.keys_todo.is_empty()
    }
}

/// Per key, the sum of the multiplicities of its values.
pub fn count<K, V>(
    input: crate::stream::StreamReader<(K, V)>,
    output: crate::stream::Writer<(K, isize)>,
    initial_frontier: Antichain,
) -> Reduce<K, V, isize, impl Fn(&[(V, isize)]) -> Vec<(isize, isize)>>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    Reduce::new(input, output, |values: &[(V, isize)]| vec![(values.iter().map(|(_, m)| m).sum(), 1)], initial_frontier)
}

/// Per key, the sum of `value * multiplicity` across its values.
pub fn sum<K>(
    input: crate::stream::StreamReader<(K, isize)>,
    output: crate::stream::Writer<(K, isize)>,
    initial_frontier: Antichain,
) -> Reduce<K, isize, isize, impl Fn(&[(isize, isize)]) -> Vec<(isize, isize)>>
where
    K: Eq + Hash + Clone,
{
    Reduce::new(
        input,
        output,
        |values: &[(isize, isize)]| vec![(values.iter().map(|(v, m)| v * m).sum(), 1)],
        initial_frontier,
    )
}

/// Per key, the minimum value among its positively-multiplied values.
///
/// # Panics
/// Panics (once scheduled) if any contributing multiplicity is non-positive.
pub fn min<K, V>(
    input: crate::stream::StreamReader<(K, V)>,
    output: crate::stream::Writer<(K, V)>,
    initial_frontier: Antichain,
) -> Reduce<K, V, V, impl Fn(&[(V, isize)]) -> Vec<(V, isize)>>
where
    K: Eq + Hash + Clone,
    V: Ord + Clone,
{
    Reduce::new(
        input,
        output,
        |values: &[(V, isize)]| {
            let mut out = values[0].0.clone();
            for (value, multiplicity) in values {
                assert!(*multiplicity > 0, "min requires positive multiplicities, found {multiplicity}");
                if *value < out {
                    out = value.clone();
                }
            }
            vec![(out, 1)]
        },
        initial_frontier,
    )
}

/// Per key, the maximum value among its positively-multiplied values.
///
/// # Panics
/// Panics (once scheduled) if any contributing multiplicity is non-positive.
pub fn max<K, V>(
    input: crate::stream::StreamReader<(K, V)>,
    output: crate::stream::Writer<(K, V)>,
    initial_frontier: Antichain,
) -> Reduce<K, V, V, impl Fn(&[(V, isize)]) -> Vec<(V, isize)>>
where
    K: Eq + Hash + Clone,
    V: Ord + Clone,
{
    Reduce::new(
        input,
        output,
        |values: &[(V, isize)]| {
            let mut out = values[0].0.clone();
            for (value, multiplicity) in values {
                assert!(*multiplicity > 0, "max requires positive multiplicities, found {multiplicity}");
                if *value > out {
                    out = value.clone();
                }
            }
            vec![(out, 1)]
        },
        initial_frontier,
    )
}

/// Per key, each distinct value with positive consolidated multiplicity,
/// emitted once with multiplicity 1.
///
/// # Panics
/// Panics (once scheduled) if, after consolidation, any value has negative multiplicity.
pub fn distinct<K, V>(
    input: crate::stream::StreamReader<(K, V)>,
    output: crate::stream::Writer<(K, V)>,
    initial_frontier: Antichain,
) -> Reduce<K, V, V, impl Fn(&[(V, isize)]) -> Vec<(V, isize)>>
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
{
    Reduce::new(
        input,
        output,
        |values: &[(V, isize)]| {
            let mut consolidated: FnvHashMap<V, isize> = FnvHashMap::default();
            for (value, multiplicity) in values {
                *consolidated.entry(value.clone()).or_insert(0) += multiplicity;
            }
            for multiplicity in consolidated.values() {
                assert!(*multiplicity >= 0, "distinct requires non-negative multiplicities, found {multiplicity}");
            }
            consolidated.into_iter().filter(|(_, m)| *m > 0).map(|(v, _)| (v, 1)).collect()
        },
        initial_frontier,
    )
}
