//! `distinct` applied to a stream with repeated and later-retracted values
//! stays idempotent: re-running it over its own output changes nothing.

use differential::message::Message;
use differential::{Antichain, Collection, Graph, Version};

#[test]
fn distinct_is_idempotent_and_drops_retracted_values() {
    let graph = Graph::new(Antichain::new([Version::from(0)]));
    let input = graph.new_input::<(&str, i64)>();

    let once = input.distinct();
    let twice = once.distinct();
    let reader = twice.subscribe();

    input.send_data(
        Version::from(0),
        Collection::from_entries(vec![(("k", 1), 1), (("k", 1), 1), (("k", 2), 1), (("k", 2), -1)]),
    );
    input.send_frontier(Antichain::new([Version::from(1)]));
    graph.step();

    let mut seen = Collection::new();
    for message in reader.drain() {
        if let Message::Data(_, collection) = message {
            seen.extend(collection);
        }
    }
    assert_eq!(seen.consolidate().entries(), &[(("k", 1), 1)]);
}
