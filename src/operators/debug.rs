//! Passes every message through unchanged, logging each batch and frontier
//! notification as it goes. Useful for inspecting an otherwise-opaque
//! subgraph during development.

use crate::message::Message;
use crate::operator::{RunnableOperator, UnaryOperator};
use crate::order::Antichain;
use crate::stream::{StreamReader, Writer};
use std::fmt::Debug as FmtDebug;

pub struct Debug<D> {
    base: UnaryOperator<D, D>,
    name: String,
}

impl<D: Clone> Debug<D> {
    pub fn new(
        input: StreamReader<D>,
        output: Writer<D>,
        name: impl Into<String>,
        initial_frontier: Antichain,
    ) -> Self {
        Debug { base: UnaryOperator::new(input, output, initial_frontier), name: name.into() }
    }
}

impl<D: FmtDebug + Clone> RunnableOperator for Debug<D> {
    fn step(&mut self) {
        for message in self.base.input_messages() {
            match message {
                Message::Data(version, collection) => {
                    log::debug!(
                        "debug {}: data at version {:?}: {:?}",
                        self.name,
                        version,
                        collection.entries()
                    );
                    self.base.output.send_data(version, collection);
                }
                Message::Frontier(frontier) => {
                    self.base.set_input_frontier(frontier);
                    log::debug!("debug {}: frontier {:?}", self.name, self.base.input_frontier);
                    self.base.advance_output_frontier(self.base.input_frontier.clone());
                }
            }
        }
    }

    fn pending_work(&self) -> bool {
        self.base.pending_work()
    }
}
