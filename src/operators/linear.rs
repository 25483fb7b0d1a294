//! The three operators whose per-batch work is a pure function of that batch
//! alone, with no cross-version state: `map`, `filter`, and `negate`.

use crate::message::Message;
use crate::operator::{RunnableOperator, UnaryOperator};
use crate::order::Antichain;
use crate::stream::{StreamReader, Writer};

/// Applies `f` to every record of every incoming batch, forwarding the
/// result at the same version.
pub struct Map<In, Out, F> {
    base: UnaryOperator<In, Out>,
    f: F,
}

impl<In, Out: Clone, F: Fn(In) -> Out> Map<In, Out, F> {
    pub fn new(input: StreamReader<In>, output: Writer<Out>, f: F, initial_frontier: Antichain) -> Self {
        Map { base: UnaryOperator::new(input, output, initial_frontier), f }
    }
}

impl<In, Out: Clone, F: Fn(In) -> Out> RunnableOperator for Map<In, Out, F> {
    fn step(&mut self) {
        for message in self.base.input_messages() {
            match message {
                Message::Data(version, collection) => {
                    let mapped = collection.map(&self.f);
                    self.base.output.send_data(version, mapped);
                }
                Message::Frontier(frontier) => self.base.set_input_frontier(frontier),
            }
        }
        self.base.advance_output_frontier(self.base.input_frontier.clone());
    }

    fn pending_work(&self) -> bool {
        self.base.pending_work()
    }
}

/// Retains only the records of every incoming batch that satisfy `p`.
pub struct Filter<In, F> {
    base: UnaryOperator<In, In>,
    p: F,
}

impl<In: Clone, F: Fn(&In) -> bool> Filter<In, F> {
    pub fn new(input: StreamReader<In>, output: Writer<In>, p: F, initial_frontier: Antichain) -> Self {
        Filter { base: UnaryOperator::new(input, output, initial_frontier), p }
    }
}

impl<In: Clone, F: Fn(&In) -> bool> RunnableOperator for Filter<In, F> {
    fn step(&mut self) {
        for message in self.base.input_messages() {
            match message {
                Message::Data(version, collection) => {
                    let filtered = collection.filter(&self.p);
                    self.base.output.send_data(version, filtered);
                }
                Message::Frontier(frontier) => self.base.set_input_frontier(frontier),
            }
        }
        self.base.advance_output_frontier(self.base.input_frontier.clone());
    }

    fn pending_work(&self) -> bool {
        self.base.pending_work()
    }
}

/// Negates the multiplicity of every record of every incoming batch.
pub struct Negate<In> {
    base: UnaryOperator<In, In>,
}

impl<In: Clone> Negate<In> {
    pub fn new(input: StreamReader<In>, output: Writer<In>, initial_frontier: Antichain) -> Self {
        Negate { base: UnaryOperator::new(input, output, initial_frontier) }
    }
}

impl<In: Clone> RunnableOperator for Negate<In> {
    fn step(&mut self) {
        for message in self.base.input_messages() {
            match message {
                Message::Data(version, collection) => {
                    self.base.output.send_data(version, collection.negate());
                }
                Message::Frontier(frontier) => self.base.set_input_frontier(frontier),
            }
        }
        self.base.advance_output_frontier(self.base.input_frontier.clone());
    }

    fn pending_work(&self) -> bool {
        self.base.pending_work()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::order::Version;
    use crate::stream::StreamWriter;

    #[test]
    fn map_forwards_transformed_batches() {
        let writer: StreamWriter<i64> = StreamWriter::new();
        let reader = writer.new_reader();
        let output = StreamWriter::shared();
        let output_reader = output.new_reader();
        let mut op = Map::new(reader, output, |x: i64| x + 1, Antichain::new([Version::from(0)]));

        writer.send_data(Version::from(0), Collection::from_entries(vec![(1, 1)]));
        op.step();

        let messages = output_reader.drain();
        match &messages[0] {
            Message::Data(_, collection) => assert_eq!(collection.entries(), &[(2, 1)]),
            _ => panic!("expected data message"),
        }
    }

    #[test]
    fn filter_drops_frontier_regressions() {
        let writer: StreamWriter<i64> = StreamWriter::new();
        let reader = writer.new_reader();
        let output = StreamWriter::shared();
        let _output_reader = output.new_reader();
        let mut op =
            Filter::new(reader, output, |x: &i64| *x % 2 == 0, Antichain::new([Version::from(1)]));

        writer.send_frontier(Antichain::new([Version::from(0)]));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| op.step()));
        assert!(result.is_err());
    }
}
