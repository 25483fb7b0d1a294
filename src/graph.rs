//! The dataflow graph builder: a fluent API over [`StreamHandle`] for wiring
//! operators together, backed by a [`Graph`] that owns the resulting
//! operator list and the stack of nested scope frontiers `enter`/`leave`
//! push and pop.

use crate::collection::Collection;
use crate::config::IterationConfig;
use crate::operator::RunnableOperator;
use crate::operators::{self, Concat, Consolidate, Debug, Egress, Feedback, Filter, Ingress, Join, Map, Negate};
use crate::order::{Antichain, Version};
use crate::stream::{StreamWriter, Writer};
use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

struct GraphInner {
    operators: Vec<Box<dyn RunnableOperator>>,
    frontier_stack: Vec<Antichain>,
    config: IterationConfig,
}

/// Owns every operator built through [`StreamHandle`] and the nested-scope
/// frontier stack those operators are constructed against.
#[derive(Clone)]
pub struct Graph {
    inner: Rc<RefCell<GraphInner>>,
}

impl Graph {
    /// A graph whose outermost scope starts at `initial_frontier`, using the
    /// default [`IterationConfig`].
    pub fn new(initial_frontier: Antichain) -> Self {
        Self::with_config(initial_frontier, IterationConfig::default())
    }

    /// As [`Graph::new`], but with an explicit [`IterationConfig`] governing
    /// every `iterate` scope built on this graph.
    pub fn with_config(initial_frontier: Antichain, config: IterationConfig) -> Self {
        Graph {
            inner: Rc::new(RefCell::new(GraphInner {
                operators: Vec::new(),
                frontier_stack: vec![initial_frontier],
                config,
            })),
        }
    }

    /// Creates an input stream with no operator upstream of it: the caller
    /// drives it directly via [`StreamHandle::send_data`] /
    /// [`StreamHandle::send_frontier`].
    pub fn new_input<D: Clone + 'static>(&self) -> StreamHandle<D> {
        StreamHandle { writer: StreamWriter::shared(), graph: self.clone() }
    }

    /// Runs every operator once, in the order they were added.
    pub fn step(&self) {
        for operator in self.inner.borrow_mut().operators.iter_mut() {
            operator.step();
        }
    }

    fn frontier(&self) -> Antichain {
        self.inner.borrow().frontier_stack.last().expect("frontier stack is never empty").clone()
    }

    fn push_frontier(&self, frontier: Antichain) {
        self.inner.borrow_mut().frontier_stack.push(frontier);
    }

    fn pop_frontier(&self) {
        self.inner.borrow_mut().frontier_stack.pop().expect("popped past the outermost scope");
    }

    fn config(&self) -> IterationConfig {
        self.inner.borrow().config
    }

    fn new_writer<D: Clone + 'static>(&self) -> Writer<D> {
        StreamWriter::shared()
    }

    fn add_operator(&self, operator: Box<dyn RunnableOperator>) {
        self.inner.borrow_mut().operators.push(operator);
    }
}

/// A handle to one edge of the dataflow graph: both a source (via
/// [`StreamHandle::send_data`]/[`send_frontier`](StreamHandle::send_frontier)
/// for inputs) and a fluent builder for the operators that can consume it.
pub struct StreamHandle<D> {
    writer: Writer<D>,
    graph: Graph,
}

impl<D> Clone for StreamHandle<D> {
    fn clone(&self) -> Self {
        StreamHandle { writer: Rc::clone(&self.writer), graph: self.graph.clone() }
    }
}

impl<D: Clone + 'static> StreamHandle<D> {
    /// Sends a batch of data at `version` directly on this stream. Only
    /// meaningful on a stream with no operator feeding it (see
    /// [`Graph::new_input`]).
    pub fn send_data(&self, version: Version, collection: Collection<D>) {
        self.writer.send_data(version, collection);
    }

    /// Sends a frontier notification directly on this stream.
    pub fn send_frontier(&self, frontier: Antichain) {
        self.writer.send_frontier(frontier);
    }

    /// Attaches a new reader to this stream, receiving a copy of every
    /// message sent on it from this point on. Used to observe the result of
    /// a pipeline from outside the graph that built it.
    pub fn subscribe(&self) -> crate::stream::StreamReader<D> {
        self.writer.new_reader()
    }

    /// Applies `f` to every record.
    pub fn map<D2: Clone + 'static>(&self, f: impl Fn(D) -> D2 + 'static) -> StreamHandle<D2> {
        let reader = self.writer.new_reader();
        let output = self.graph.new_writer::<D2>();
        let op = Map::new(reader, Rc::clone(&output), f, self.graph.frontier());
        self.graph.add_operator(Box::new(op));
        StreamHandle { writer: output, graph: self.graph.clone() }
    }

    /// Retains only the records satisfying `p`.
    pub fn filter(&self, p: impl Fn(&D) -> bool + 'static) -> StreamHandle<D> {
        let reader = self.writer.new_reader();
        let output = self.graph.new_writer::<D>();
        let op = Filter::new(reader, Rc::clone(&output), p, self.graph.frontier());
        self.graph.add_operator(Box::new(op));
        StreamHandle { writer: output, graph: self.graph.clone() }
    }

    /// Negates every multiplicity.
    pub fn negate(&self) -> StreamHandle<D> {
        let reader = self.writer.new_reader();
        let output = self.graph.new_writer::<D>();
        let op = Negate::new(reader, Rc::clone(&output), self.graph.frontier());
        self.graph.add_operator(Box::new(op));
        StreamHandle { writer: output, graph: self.graph.clone() }
    }

    /// Logs every batch and frontier notification under `name`, forwarding
    /// them unchanged.
    pub fn debug(&self, name: impl Into<String>) -> StreamHandle<D>
    where
        D: std::fmt::Debug,
    {
        let reader = self.writer.new_reader();
        let output = self.graph.new_writer::<D>();
        let op = Debug::new(reader, Rc::clone(&output), name, self.graph.frontier());
        self.graph.add_operator(Box::new(op));
        StreamHandle { writer: output, graph: self.graph.clone() }
    }

    /// Buffers and consolidates each version's batch before forwarding it.
    pub fn consolidate(&self) -> StreamHandle<D>
    where
        D: Eq + Hash + Ord,
    {
        let reader = self.writer.new_reader();
        let output = self.graph.new_writer::<D>();
        let op = Consolidate::new(reader, Rc::clone(&output), self.graph.frontier());
        self.graph.add_operator(Box::new(op));
        StreamHandle { writer: output, graph: self.graph.clone() }
    }

    /// Bag union with `other`.
    pub fn concat(&self, other: &StreamHandle<D>) -> StreamHandle<D> {
        let reader_a = self.writer.new_reader();
        let reader_b = other.writer.new_reader();
        let output = self.graph.new_writer::<D>();
        let op = Concat::new(reader_a, reader_b, Rc::clone(&output), self.graph.frontier());
        self.graph.add_operator(Box::new(op));
        StreamHandle { writer: output, graph: self.graph.clone() }
    }

    /// Enters a nested iteration scope: extends every version with a fresh
    /// loop coordinate.
    fn enter(&self) -> StreamHandle<D> {
        let new_frontier = self.graph.frontier().extend();
        self.graph.push_frontier(new_frontier);
        let reader = self.writer.new_reader();
        let output = self.graph.new_writer::<D>();
        let op = Ingress::new(reader, Rc::clone(&output), self.graph.frontier());
        self.graph.add_operator(Box::new(op));
        StreamHandle { writer: output, graph: self.graph.clone() }
    }

    /// Leaves the current iteration scope: drops the innermost loop
    /// coordinate from every version.
    fn leave(&self) -> StreamHandle<D> {
        self.graph.pop_frontier();
        let reader = self.writer.new_reader();
        let output = self.graph.new_writer::<D>();
        let op = Egress::new(reader, Rc::clone(&output), self.graph.frontier());
        self.graph.add_operator(Box::new(op));
        StreamHandle { writer: output, graph: self.graph.clone() }
    }

    /// Runs `body` inside a nested iteration scope, feeding its result back
    /// into its own input one loop step later until the body's output
    /// frontier converges, then leaves the scope.
    pub fn iterate(&self, body: impl FnOnce(StreamHandle<D>) -> StreamHandle<D>) -> StreamHandle<D> {
        let feedback_writer = self.graph.new_writer::<D>();
        let feedback_input = StreamHandle { writer: Rc::clone(&feedback_writer), graph: self.graph.clone() };

        let entered = self.enter().concat(&feedback_input);
        let result = body(entered);

        let feedback_reader = result.writer.new_reader();
        let feedback_op = Feedback::new(
            feedback_reader,
            1,
            feedback_writer,
            self.graph.config(),
            self.graph.frontier(),
        );
        self.graph.add_operator(Box::new(feedback_op));

        result.leave()
    }
}

impl<K: Eq + Hash + Clone + 'static, V: Clone + 'static> StreamHandle<(K, V)> {
    /// Keyed join against `other`: for every pair of records sharing a key,
    /// emits `(key, (value, other_value))` with multiplicity `m1 * m2`.
    pub fn join<V2: Eq + Hash + Clone + 'static>(
        &self,
        other: &StreamHandle<(K, V2)>,
    ) -> StreamHandle<(K, (V, V2))>
    where
        V: Eq + Hash,
    {
        let reader_a = self.writer.new_reader();
        let reader_b = other.writer.new_reader();
        let output = self.graph.new_writer::<(K, (V, V2))>();
        let op = Join::new(reader_a, reader_b, Rc::clone(&output), self.graph.frontier());
        self.graph.add_operator(Box::new(op));
        StreamHandle { writer: output, graph: self.graph.clone() }
    }

    /// Per key, the sum of the multiplicities of its values.
    pub fn count(&self) -> StreamHandle<(K, isize)> {
        let reader = self.writer.new_reader();
        let output = self.graph.new_writer::<(K, isize)>();
        let op = operators::reduce::count(reader, Rc::clone(&output), self.graph.frontier());
        self.graph.add_operator(Box::new(op));
        StreamHandle { writer: output, graph: self.graph.clone() }
    }

    /// Per key, the minimum value among its positively-multiplied values.
    pub fn min(&self) -> StreamHandle<(K, V)>
    where
        V: Ord + Hash,
    {
        let reader = self.writer.new_reader();
        let output = self.graph.new_writer::<(K, V)>();
        let op = operators::reduce::min(reader, Rc::clone(&output), self.graph.frontier());
        self.graph.add_operator(Box::new(op));
        StreamHandle { writer: output, graph: self.graph.clone() }
    }

    /// Per key, the maximum value among its positively-multiplied values.
    pub fn max(&self) -> StreamHandle<(K, V)>
    where
        V: Ord + Hash,
    {
        let reader = self.writer.new_reader();
        let output = self.graph.new_writer::<(K, V)>();
        let op = operators::reduce::max(reader, Rc::clone(&output), self.graph.frontier());
        self.graph.add_operator(Box::new(op));
        StreamHandle { writer: output, graph: self.graph.clone() }
    }

    /// Per key, each distinct value with positive consolidated multiplicity.
    pub fn distinct(&self) -> StreamHandle<(K, V)>
    where
        V: Eq + Hash,
    {
        let reader = self.writer.new_reader();
        let output = self.graph.new_writer::<(K, V)>();
        let op = operators::reduce::distinct(reader, Rc::clone(&output), self.graph.frontier());
        self.graph.add_operator(Box::new(op));
        StreamHandle { writer: output, graph: self.graph.clone() }
    }
}

impl<K: Eq + Hash + Clone + 'static> StreamHandle<(K, isize)> {
    /// Per key, the sum of `value * multiplicity` across its values.
    pub fn sum(&self) -> StreamHandle<(K, isize)> {
        let reader = self.writer.new_reader();
        let output = self.graph.new_writer::<(K, isize)>();
        let op = operators::reduce::sum(reader, Rc::clone(&output), self.graph.frontier());
        self.graph.add_operator(Box::new(op));
        StreamHandle { writer: output, graph: self.graph.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn map_filter_negate_concat_end_to_end() {
        let graph = Graph::new(Antichain::new([Version::new([0, 0])]));
        let input = graph.new_input::<i64>();
        let transformed = input.map(|x| x + 5).filter(|x| x % 2 == 0);
        let final_output = input.negate().concat(&transformed);
        let reader = final_output.writer.new_reader();

        for i in 0..3 {
            input.send_data(Version::new([0, i]), Collection::from_entries(vec![(i as i64, 1)]));
            input.send_frontier(Antichain::new([Version::new([i, 0]), Version::new([0, i])]));
            graph.step();
            reader.drain();
        }
    }

    #[test]
    fn join_then_count() {
        let graph = Graph::new(Antichain::new([Version::new([0, 0])]));
        let input_a = graph.new_input::<(i64, i64)>();
        let input_b = graph.new_input::<(i64, i64)>();
        let output = input_a.join(&input_b).count();
        let reader = output.writer.new_reader();

        input_a.send_data(Version::new([0, 0]), Collection::from_entries(vec![((1, 0), 2)]));
        input_a.send_frontier(Antichain::new([Version::new([1, 0]), Version::new([0, 0])]));
        input_b.send_data(Version::new([0, 0]), Collection::from_entries(vec![((1, 2), 2)]));
        input_b.send_frontier(Antichain::new([Version::new([0, 0]), Version::new([0, 0])]));
        graph.step();

        let messages = reader.drain();
        let mut total = Collection::new();
        for message in messages {
            if let Message::Data(_, collection) = message {
                total.extend(collection);
            }
        }
        assert_eq!(total.consolidate().entries(), &[((1, 4), 1)]);
    }

    #[test]
    fn iterate_computes_a_geometric_series() {
        let graph = Graph::new(Antichain::new([Version::from(0)]));
        let input = graph.new_input::<i64>();
        let output = input
            .iterate(|collection| {
                collection
                    .map(|x| x + x)
                    .concat(&collection)
                    .filter(|x| *x <= 100)
                    .map(|x| (x, ()))
                    .distinct()
                    .map(|(x, ())| x)
                    .consolidate()
            })
            .debug("geometric series");
        let reader = output.writer.new_reader();

        input.send_data(Version::from(0), Collection::from_entries(vec![(1, 1)]));
        input.send_frontier(Antichain::new([Version::from(1)]));

        for _ in 0..10 {
            graph.step();
        }

        let mut values: Vec<i64> = Vec::new();
        for message in reader.drain() {
            if let Message::Data(_, collection) = message {
                values.extend(collection.entries().iter().map(|(v, _)| *v));
            }
        }
        values.sort_unstable();
        values.dedup();
        for v in &values {
            assert!(*v <= 100);
        }
    }
}
