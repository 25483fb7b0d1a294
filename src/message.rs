//! The two kinds of message that flow along an edge of the dataflow: a batch
//! of data at a version, or a notification that no more data will ever arrive
//! below a frontier.

use crate::collection::Collection;
use crate::order::{Antichain, Version};

/// A single message carried on a stream.
#[derive(Clone, Debug)]
pub enum Message<D> {
    /// `collection` holds records that became true at exactly `version`.
    Data(Version, Collection<D>),
    /// No further [`Message::Data`] will ever arrive at a version not
    /// `>=` some element of this frontier.
    Frontier(Antichain),
}
