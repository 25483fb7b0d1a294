//! Single-writer, multi-reader fan-out queues connecting operators.
//!
//! A [`StreamWriter`] is the write end of an edge in the dataflow graph; each
//! call to [`StreamWriter::new_reader`] attaches another independent FIFO
//! queue that receives a copy of every subsequent message. This is how a
//! single operator's output can feed more than one downstream operator.
//! Writers are shared (via [`Writer`]) between the operator that produces
//! data and the graph builder, which may attach further readers to the same
//! writer well after the producing operator was constructed.

use crate::message::Message;
use crate::order::{Antichain, Version};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

type Queue<D> = Rc<RefCell<VecDeque<Message<D>>>>;

/// A [`StreamWriter`] shared between its producing operator and whatever
/// downstream consumers are attached to it, possibly after construction.
pub type Writer<D> = Rc<StreamWriter<D>>;

/// The read end of a stream edge.
pub struct StreamReader<D> {
    queue: Queue<D>,
}

impl<D> StreamReader<D> {
    /// Removes and returns every message currently queued, in the order they
    /// were sent.
    pub fn drain(&self) -> Vec<Message<D>> {
        self.queue.borrow_mut().drain(..).collect()
    }

    /// True if no message is currently queued.
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

/// The write end of a stream edge.
pub struct StreamWriter<D> {
    queues: RefCell<Vec<Queue<D>>>,
}

impl<D> Default for StreamWriter<D> {
    fn default() -> Self {
        StreamWriter { queues: RefCell::new(Vec::new()) }
    }
}

impl<D: Clone> StreamWriter<D> {
    /// A writer with no readers yet attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// A writer wrapped ready to be shared between its operator and the
    /// graph builder.
    pub fn shared() -> Writer<D> {
        Rc::new(Self::new())
    }

    /// Attaches a new reader that will receive a copy of every message sent
    /// from this point on.
    pub fn new_reader(&self) -> StreamReader<D> {
        let queue = Rc::new(RefCell::new(VecDeque::new()));
        self.queues.borrow_mut().push(Rc::clone(&queue));
        StreamReader { queue }
    }

    /// Sends a batch of data at `version` to every attached reader.
    ///
    /// # Panics
    /// Panics if no reader has ever been attached: a stream with no
    /// consumers should never be asked to carry data.
    pub fn send_data(&self, version: Version, collection: crate::collection::Collection<D>) {
        let queues = self.queues.borrow();
        assert!(!queues.is_empty(), "cannot send data on a stream with no readers");
        for queue in queues.iter() {
            queue.borrow_mut().push_back(Message::Data(version.clone(), collection.clone()));
        }
    }

    /// Sends a frontier notification to every attached reader.
    ///
    /// # Panics
    /// Panics if no reader has ever been attached.
    pub fn send_frontier(&self, frontier: Antichain) {
        let queues = self.queues.borrow();
        assert!(!queues.is_empty(), "cannot send a frontier on a stream with no readers");
        for queue in queues.iter() {
            queue.borrow_mut().push_back(Message::Frontier(frontier.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;

    #[test]
    fn fan_out_delivers_to_every_reader_in_order() {
        let writer: StreamWriter<i64> = StreamWriter::new();
        let reader_a = writer.new_reader();
        let reader_b = writer.new_reader();

        writer.send_data(Version::from(0), Collection::from_entries(vec![(1, 1)]));
        writer.send_frontier(Antichain::new([Version::from(1)]));

        for reader in [&reader_a, &reader_b] {
            let messages = reader.drain();
            assert_eq!(messages.len(), 2);
            assert!(matches!(messages[0], Message::Data(_, _)));
            assert!(matches!(messages[1], Message::Frontier(_)));
        }
    }

    #[test]
    fn drain_empties_the_queue() {
        let writer: StreamWriter<i64> = StreamWriter::new();
        let reader = writer.new_reader();
        writer.send_data(Version::from(0), Collection::from_entries(vec![(1, 1)]));
        assert!(!reader.is_empty());
        reader.drain();
        assert!(reader.is_empty());
    }
}
