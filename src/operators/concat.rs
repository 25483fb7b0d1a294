//! Bag union of two streams: every record from either input is forwarded
//! unchanged, at the version it arrived at.

use crate::message::Message;
use crate::operator::{BinaryOperator, RunnableOperator};
use crate::order::Antichain;
use crate::stream::{StreamReader, Writer};

pub struct Concat<D> {
    base: BinaryOperator<D, D, D>,
}

impl<D: Clone> Concat<D> {
    pub fn new(
        input_a: StreamReader<D>,
        input_b: StreamReader<D>,
        output: Writer<D>,
        initial_frontier: Antichain,
    ) -> Self {
        Concat { base: BinaryOperator::new(input_a, input_b, output, initial_frontier) }
    }
}

impl<D: Clone> RunnableOperator for Concat<D> {
    fn step(&mut self) {
        for message in self.base.input_a_messages() {
            match message {
                Message::Data(version, collection) => self.base.output.send_data(version, collection),
                Message::Frontier(frontier) => self.base.set_input_a_frontier(frontier),
            }
        }
        for message in self.base.input_b_messages() {
            match message {
                Message::Data(version, collection) => self.base.output.send_data(version, collection),
                Message::Frontier(frontier) => self.base.set_input_b_frontier(frontier),
            }
        }
        self.base.advance_output_frontier(self.base.combined_input_frontier());
    }

    fn pending_work(&self) -> bool {
        self.base.pending_work()
    }
}
