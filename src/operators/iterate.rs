//! The three operators that implement nested iteration scopes: [`Ingress`]
//! enters a scope by appending a loop coordinate, [`Egress`] leaves one by
//! dropping it, and [`Feedback`] routes a scope's result back to its own
//! input one loop step later, deciding when old loop iterations can be
//! considered permanently closed.

use crate::config::IterationConfig;
use crate::message::Message;
use crate::operator::{RunnableOperator, UnaryOperator};
use crate::order::{Antichain, Version};
use crate::stream::{StreamReader, Writer};
use std::collections::HashSet;

/// Brings a collection from an outer scope into a nested one by appending a
/// `0` loop coordinate to every version, and emits the compensating negative
/// image one loop step later so the record does not persist into the
/// iteration's second round unless re-derived there.
pub struct Ingress<D> {
    base: UnaryOperator<D, D>,
}

impl<D: Clone> Ingress<D> {
    pub fn new(input: StreamReader<D>, output: Writer<D>, initial_frontier: Antichain) -> Self {
        Ingress { base: UnaryOperator::new(input, output, initial_frontier) }
    }
}

impl<D: Clone> RunnableOperator for Ingress<D> {
    fn step(&mut self) {
        for message in self.base.input_messages() {
            match message {
                Message::Data(version, collection) => {
                    let entered = version.extend();
                    self.base.output.send_data(entered.clone(), collection.clone());
                    self.base.output.send_data(entered.apply_step(1), collection.negate());
                }
                Message::Frontier(frontier) => self.base.set_input_frontier(frontier.extend()),
            }
        }
        self.base.advance_output_frontier(self.base.input_frontier.clone());
    }

    fn pending_work(&self) -> bool {
        self.base.pending_work()
    }
}

/// Leaves a nested scope by dropping its innermost (loop) coordinate.
pub struct Egress<D> {
    base: UnaryOperator<D, D>,
}

impl<D: Clone> Egress<D> {
    pub fn new(input: StreamReader<D>, output: Writer<D>, initial_frontier: Antichain) -> Self {
        Egress { base: UnaryOperator::new(input, output, initial_frontier) }
    }
}

impl<D: Clone> RunnableOperator for Egress<D> {
    fn step(&mut self) {
        for message in self.base.input_messages() {
            match message {
                Message::Data(version, collection) => {
                    self.base.output.send_data(version.truncate(), collection);
                }
                Message::Frontier(frontier) => self.base.set_input_frontier(frontier.truncate()),
            }
        }
        self.base.advance_output_frontier(self.base.input_frontier.clone());
    }

    fn pending_work(&self) -> bool {
        self.base.pending_work()
    }
}

/// Routes an iteration body's result back to its own input, advancing the
/// loop coordinate by `step` on every round, and retires old loop iterations
/// from its output frontier once no version still carrying unretired data
/// could possibly precede them.
pub struct Feedback<D> {
    base: UnaryOperator<D, D>,
    step: usize,
    config: IterationConfig,
    versions_with_data: HashSet<Version>,
}

impl<D: Clone> Feedback<D> {
    pub fn new(
        input: StreamReader<D>,
        step: usize,
        output: Writer<D>,
        config: IterationConfig,
        initial_frontier: Antichain,
    ) -> Self {
        Feedback {
            base: UnaryOperator::new(input, output, initial_frontier),
            step,
            config,
            versions_with_data: HashSet::new(),
        }
    }
}

impl<D: Clone> RunnableOperator for Feedback<D> {
    fn step(&mut self) {
        for message in self.base.input_messages() {
            match message {
                Message::Data(version, collection) => {
                    let stepped = version.apply_step(self.step);
                    self.base.output.send_data(stepped.clone(), collection);
                    self.versions_with_data.insert(stepped);
                }
                Message::Frontier(frontier) => self.base.set_input_frontier(frontier),
            }
        }

        let mut elements: Vec<Version> = self.base.input_frontier.apply_step(self.step).elements().to_vec();
        elements.sort();

        let mut candidate: HashSet<Version> = HashSet::new();
        if let Some(last) = elements.last() {
            candidate.insert(last.clone());
        }
        for element in &elements {
            let past_limit = self.config.iteration_limit.is_some_and(|limit| {
                element.coords().last().copied().unwrap_or(0) >= limit
            });
            let to_remove: Vec<Version> =
                self.versions_with_data.iter().filter(|v| v.less_than(element)).cloned().collect();
            if !to_remove.is_empty() || past_limit {
                candidate.insert(element.clone());
                for removed in to_remove {
                    self.versions_with_data.remove(&removed);
                }
            }
        }

        // Bound how much in-flight loop history is kept around even when no
        // natural retirement has happened yet, so a non-converging loop does
        // not grow this set without limit.
        if self.versions_with_data.len() > self.config.feedback_tolerance {
            if let Some(last) = elements.last() {
                let stale: Vec<Version> =
                    self.versions_with_data.iter().filter(|v| v.less_than(last)).cloned().collect();
                for removed in stale {
                    self.versions_with_data.remove(&removed);
                }
            }
        }

        self.base.advance_output_frontier(Antichain::new(candidate));
    }

    fn pending_work(&self) -> bool {
        self.base.pending_work() || !self.versions_with_data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::stream::StreamWriter;

    #[test]
    fn ingress_doubles_and_negates_at_next_step() {
        let writer: StreamWriter<i64> = StreamWriter::new();
        let reader = writer.new_reader();
        let output = StreamWriter::shared();
        let output_reader = output.new_reader();
        let mut op = Ingress::new(reader, output, Antichain::new([Version::from(0).extend()]));

        writer.send_data(Version::from(0), Collection::from_entries(vec![(1, 1)]));
        op.step();

        let messages = output_reader.drain();
        assert_eq!(messages.len(), 2);
        match (&messages[0], &messages[1]) {
            (Message::Data(v0, c0), Message::Data(v1, c1)) => {
                assert_eq!(*v0, Version::from(0).extend());
                assert_eq!(*v1, Version::from(0).extend().apply_step(1));
                assert_eq!(c0.entries(), &[(1, 1)]);
                assert_eq!(c1.entries(), &[(1, -1)]);
            }
            _ => panic!("expected two data messages"),
        }
    }

    #[test]
    fn egress_truncates_versions() {
        let writer: StreamWriter<i64> = StreamWriter::new();
        let reader = writer.new_reader();
        let output = StreamWriter::shared();
        let output_reader = output.new_reader();
        let mut op = Egress::new(reader, output, Antichain::new([Version::from(0)]));

        writer.send_data(Version::from(0).extend(), Collection::from_entries(vec![(1, 1)]));
        op.step();

        let messages = output_reader.drain();
        match &messages[0] {
            Message::Data(version, _) => assert_eq!(*version, Version::from(0)),
            _ => panic!("expected data message"),
        }
    }

    #[test]
    fn feedback_applies_step_to_every_version() {
        let writer: StreamWriter<i64> = StreamWriter::new();
        let reader = writer.new_reader();
        let output = StreamWriter::shared();
        let output_reader = output.new_reader();
        let mut op = Feedback::new(
            reader,
            1,
            output,
            IterationConfig::default(),
            Antichain::new([Version::from(0).extend()]),
        );

        writer.send_data(Version::from(0).extend(), Collection::from_entries(vec![(1, 1)]));
        op.step();

        let messages = output_reader.drain();
        match &messages[0] {
            Message::Data(version, _) => assert_eq!(*version, Version::from(0).extend().apply_step(1)),
            _ => panic!("expected data message"),
        }
    }
}
