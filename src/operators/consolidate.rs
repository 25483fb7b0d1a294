//! Buffers every batch by version until the input frontier passes it, then
//! emits one consolidated batch per version instead of the original stream
//! of partial updates.

use crate::collection::Collection;
use crate::message::Message;
use crate::operator::{RunnableOperator, UnaryOperator};
use crate::order::{Antichain, Version};
use fnv::FnvHashMap;
use std::hash::Hash;

pub struct Consolidate<D> {
    base: UnaryOperator<D, D>,
    buffered: FnvHashMap<Version, Collection<D>>,
}

impl<D: Clone> Consolidate<D> {
    pub fn new(
        input: crate::stream::StreamReader<D>,
        output: crate::stream::Writer<D>,
        initial_frontier: Antichain,
    ) -> Self {
        Consolidate { base: UnaryOperator::new(input, output, initial_frontier), buffered: FnvHashMap::default() }
    }
}

impl<D: Eq + Hash + Ord + Clone> RunnableOperator for Consolidate<D> {
    fn step(&mut self) {
        for message in self.base.input_messages() {
            match message {
                Message::Data(version, collection) => {
                    self.buffered.entry(version).or_default().extend(collection);
                }
                Message::Frontier(frontier) => self.base.set_input_frontier(frontier),
            }
        }

        let finished: Vec<Version> = self
            .buffered
            .keys()
            .filter(|version| !self.base.input_frontier.less_equal_version(version))
            .cloned()
            .collect();
        for version in finished {
            let collection = self.buffered.remove(&version).unwrap().consolidate();
            self.base.output.send_data(version, collection);
        }

        self.base.advance_output_frontier(self.base.input_frontier.clone());
    }

    fn pending_work(&self) -> bool {
        self.base.pending_work() || !self.buffered.is_empty()
    }
}
