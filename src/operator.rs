//! The operator scheduling interface, and the shared unary/binary input
//! bookkeeping that every concrete operator in [`crate::operators`] builds on.

use crate::message::Message;
use crate::order::Antichain;
use crate::stream::{StreamReader, Writer};

/// The small virtual interface the graph scheduler dispatches through: every
/// operator is polled once per [`crate::graph::Graph::step`] call regardless
/// of whether it has pending work, mirroring the reference scheduler's
/// unconditional per-pass sweep.
pub trait RunnableOperator {
    /// Drains available input, does one pass of work, and forwards any
    /// resulting data or frontier advance to its output(s).
    fn step(&mut self);

    /// True if this operator has buffered input or otherwise has work left
    /// to do that a future `step` could act on.
    fn pending_work(&self) -> bool;
}

/// Shared state for an operator with a single input stream.
pub struct UnaryOperator<In, Out> {
    pub(crate) input: StreamReader<In>,
    pub(crate) output: Writer<Out>,
    pub(crate) input_frontier: Antichain,
    pub(crate) output_frontier: Antichain,
}

impl<In, Out: Clone> UnaryOperator<In, Out> {
    pub fn new(input: StreamReader<In>, output: Writer<Out>, initial_frontier: Antichain) -> Self {
        UnaryOperator {
            input,
            output,
            input_frontier: initial_frontier.clone(),
            output_frontier: initial_frontier,
        }
    }

    pub fn input_messages(&self) -> Vec<Message<In>> {
        self.input.drain()
    }

    pub fn pending_work(&self) -> bool {
        !self.input.is_empty()
    }

    /// Accepts a [`Message::Frontier`] carrying `frontier`: asserts it does
    /// not regress the currently tracked input frontier, then adopts it.
    ///
    /// # Panics
    /// Panics if `frontier` is not `>=` the current input frontier.
    pub fn set_input_frontier(&mut self, frontier: Antichain) {
        assert!(
            self.input_frontier.less_equal(&frontier),
            "input frontier regressed: {:?} is not <= {:?}",
            self.input_frontier,
            frontier
        );
        self.input_frontier = frontier;
    }

    /// If `candidate` strictly advances the output frontier, adopts it and
    /// forwards the new frontier downstream.
    ///
    /// # Panics
    /// Panics if `candidate` is not `>=` the current output frontier.
    pub fn advance_output_frontier(&mut self, candidate: Antichain) {
        assert!(
            self.output_frontier.less_equal(&candidate),
            "output frontier regressed: {:?} is not <= {:?}",
            self.output_frontier,
            candidate
        );
        if self.output_frontier.less_than(&candidate) {
            self.output_frontier = candidate;
            self.output.send_frontier(self.output_frontier.clone());
        }
    }
}

/// Shared state for an operator with two input streams.
pub struct BinaryOperator<A, B, Out> {
    pub(crate) input_a: StreamReader<A>,
    pub(crate) input_b: StreamReader<B>,
    pub(crate) output: Writer<Out>,
    pub(crate) input_a_frontier: Antichain,
    pub(crate) input_b_frontier: Antichain,
    pub(crate) output_frontier: Antichain,
}

impl<A, B, Out: Clone> BinaryOperator<A, B, Out> {
    pub fn new(
        input_a: StreamReader<A>,
        input_b: StreamReader<B>,
        output: Writer<Out>,
        initial_frontier: Antichain,
    ) -> Self {
        BinaryOperator {
            input_a,
            input_b,
            output,
            input_a_frontier: initial_frontier.clone(),
            input_b_frontier: initial_frontier.clone(),
            output_frontier: initial_frontier,
        }
    }

    pub fn input_a_messages(&self) -> Vec<Message<A>> {
        self.input_a.drain()
    }

    pub fn input_b_messages(&self) -> Vec<Message<B>> {
        self.input_b.drain()
    }

    pub fn pending_work(&self) -> bool {
        !self.input_a.is_empty() || !self.input_b.is_empty()
    }

    /// # Panics
    /// Panics if `frontier` is not `>=` the current input-a frontier.
    pub fn set_input_a_frontier(&mut self, frontier: Antichain) {
        assert!(
            self.input_a_frontier.less_equal(&frontier),
            "input-a frontier regressed: {:?} is not <= {:?}",
            self.input_a_frontier,
            frontier
        );
        self.input_a_frontier = frontier;
    }

    /// # Panics
    /// Panics if `frontier` is not `>=` the current input-b frontier.
    pub fn set_input_b_frontier(&mut self, frontier: Antichain) {
        assert!(
            self.input_b_frontier.less_equal(&frontier),
            "input-b frontier regressed: {:?} is not <= {:?}",
            self.input_b_frontier,
            frontier
        );
        self.input_b_frontier = frontier;
    }

    /// The meet of the two input frontiers: data may still arrive at any
    /// version not `>=` some element of this combined frontier.
    pub fn combined_input_frontier(&self) -> Antichain {
        self.input_a_frontier.meet(&self.input_b_frontier)
    }

    /// # Panics
    /// Panics if `candidate` is not `>=` the current output frontier.
    pub fn advance_output_frontier(&mut self, candidate: Antichain) {
        assert!(
            self.output_frontier.less_equal(&candidate),
            "output frontier regressed: {:?} is not <= {:?}",
            self.output_frontier,
            candidate
        );
        if self.output_frontier.less_than(&candidate) {
            self.output_frontier = candidate;
            self.output.send_frontier(self.output_frontier.clone());
        }
    }
}
