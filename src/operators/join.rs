//! A delta join: maintains one [`Index`] per input and, on every scheduling
//! pass, joins only the newly arrived data (`delta`) against the other
//! side's full accumulated index, so the cost of a pass is proportional to
//! what changed rather than to the size of either input.

use crate::collection::Collection;
use crate::index::Index;
use crate::message::Message;
use crate::operator::{BinaryOperator, RunnableOperator};
use crate::order::{Antichain, Version};
use fnv::FnvHashMap;
use std::hash::Hash;

pub struct Join<K, V1, V2> {
    base: BinaryOperator<(K, V1), (K, V2), (K, (V1, V2))>,
    index_a: Index<K, V1>,
    index_b: Index<K, V2>,
}

impl<K: Eq + Hash + Clone, V1: Clone, V2: Clone> Join<K, V1, V2> {
    pub fn new(
        input_a: crate::stream::StreamReader<(K, V1)>,
        input_b: crate::stream::StreamReader<(K, V2)>,
        output: crate::stream::Writer<(K, (V1, V2))>,
        initial_frontier: Antichain,
    ) -> Self {
        Join {
            base: BinaryOperator::new(input_a, input_b, output, initial_frontier),
            index_a: Index::new(),
            index_b: Index::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V1: Eq + Hash + Clone, V2: Eq + Hash + Clone> RunnableOperator
    for Join<K, V1, V2>
{
    fn step(&mut self) {
        let mut delta_a: Index<K, V1> = Index::new();
        let mut delta_b: Index<K, V2> = Index::new();

        for message in self.base.input_a_messages() {
            match message {
                Message::Data(version, collection) => {
                    for ((key, value), multiplicity) in collection.into_entries() {
                        delta_a.add_value(key, version.clone(), (value, multiplicity));
                    }
                }
                Message::Frontier(frontier) => self.base.set_input_a_frontier(frontier),
            }
        }
        for message in self.base.input_b_messages() {
            match message {
                Message::Data(version, collection) => {
                    for ((key, value), multiplicity) in collection.into_entries() {
                        delta_b.add_value(key, version.clone(), (value, multiplicity));
                    }
                }
                Message::Frontier(frontier) => self.base.set_input_b_frontier(frontier),
            }
        }

        let mut results: FnvHashMap<Version, Collection<(K, (V1, V2))>> = FnvHashMap::default();
        for (version, collection) in delta_a.join(&self.index_b) {
            results.entry(version).or_default().extend(collection);
        }
        self.index_a.append(delta_a);

        for (version, collection) in self.index_a.join(&delta_b) {
            results.entry(version).or_default().extend(collection);
        }

        for (version, collection) in results {
            self.base.output.send_data(version, collection);
        }
        self.index_b.append(delta_b);

        let input_frontier = self.base.combined_input_frontier();
        let advanced = self.base.output_frontier.less_than(&input_frontier);
        self.base.advance_output_frontier(input_frontier);
        if advanced {
            self.index_a.compact(self.base.output_frontier.clone(), &[]);
            self.index_b.compact(self.base.output_frontier.clone(), &[]);
        }
    }

    fn pending_work(&self) -> bool {
        self.base.pending_work()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamWriter;

    #[test]
    fn join_multiplies_matching_keys() {
        let writer_a: StreamWriter<(&str, i64)> = StreamWriter::new();
        let reader_a = writer_a.new_reader();
        let writer_b: StreamWriter<(&str, i64)> = StreamWriter::new();
        let reader_b = writer_b.new_reader();
        let output = StreamWriter::shared();
        let output_reader = output.new_reader();

        let mut op = Join::new(reader_a, reader_b, output, Antichain::new([Version::from(0)]));

        writer_a.send_data(Version::from(0), Collection::from_entries(vec![(("k", 1), 2)]));
        writer_b.send_data(Version::from(0), Collection::from_entries(vec![(("k", 10), 3)]));
        op.step();

        let messages = output_reader.drain();
        let mut total = Collection::new();
        for message in messages {
            if let Message::Data(_, collection) = message {
                total.extend(collection);
            }
        }
        assert_eq!(total.entries(), &[(("k", (1, 10)), 6)]);
    }

    #[test]
    fn join_compacts_indexes_on_frontier_advance() {
        let writer_a: StreamWriter<(&str, i64)> = StreamWriter::new();
        let reader_a = writer_a.new_reader();
        let writer_b: StreamWriter<(&str, i64)> = StreamWriter::new();
        let reader_b = writer_b.new_reader();
        let output = StreamWriter::shared();
        let _output_reader = output.new_reader();

        let mut op = Join::new(reader_a, reader_b, output, Antichain::new([Version::from(0)]));
        writer_a.send_data(Version::from(0), Collection::from_entries(vec![(("k", 1), 1)]));
        writer_b.send_data(Version::from(0), Collection::from_entries(vec![(("k", 2), 1)]));
        writer_a.send_frontier(Antichain::new([Version::from(1)]));
        writer_b.send_frontier(Antichain::new([Version::from(1)]));
        op.step();

        assert_eq!(op.index_a.versions(&"k"), vec![Version::from(1)]);
        assert_eq!(op.index_b.versions(&"k"), vec![Version::from(1)]);
    }
}
