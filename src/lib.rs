//! An incremental, iterative dataflow engine over difference collections.
//!
//! A [`Collection`](collection::Collection) is a multiset of records, each
//! paired with a signed multiplicity. Collections evolve over a partially
//! ordered [`Version`](order::Version) domain rather than a single linear
//! timeline, which is what lets nested iterative scopes (see
//! [`StreamHandle::iterate`](graph::StreamHandle::iterate)) share the same
//! dataflow machinery as the outermost, non-iterative one.
//!
//! Build a dataflow with [`graph::Graph`] and its fluent
//! [`graph::StreamHandle`] API, feed it data through
//! [`StreamHandle::send_data`](graph::StreamHandle::send_data), and drive it
//! forward with repeated calls to [`graph::Graph::step`].

pub mod collection;
pub mod config;
pub mod graph;
pub mod index;
pub mod message;
pub mod operator;
pub mod operators;
pub mod order;
pub mod stream;

pub use collection::Collection;
pub use config::IterationConfig;
pub use graph::{Graph, StreamHandle};
pub use order::{Antichain, Version};
