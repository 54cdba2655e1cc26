pub mod anthropic_streaming_buffer;
pub mod sse;
pub mod sse_chunk_processor;
pub mod sse_simulator;

/// Model name reported in `message_start` when none is known yet.
pub const UNKNOWN_MODEL: &str = "unknown";

/// Checks the block lifecycle ordering of a complete event sequence.
#[cfg(test)]
pub(crate) fn assert_well_formed(events: &[crate::apis::anthropic::MessagesStreamEvent]) {
    use crate::apis::anthropic::MessagesStreamEvent;
    use std::collections::BTreeMap;

    assert!(
        matches!(events.first(), Some(MessagesStreamEvent::MessageStart { .. })),
        "stream must open with message_start: {:?}",
        events.first()
    );
    assert!(
        matches!(events.last(), Some(MessagesStreamEvent::MessageStop)),
        "stream must end with message_stop: {:?}",
        events.last()
    );

    let count = |name: &str| events.iter().filter(|e| e.event_type() == name).count();
    assert_eq!(count("message_start"), 1);
    assert_eq!(count("message_stop"), 1);
    assert!(count("message_delta") <= 1);

    // index -> stopped
    let mut blocks: BTreeMap<u32, bool> = BTreeMap::new();
    for event in events {
        match event {
            MessagesStreamEvent::ContentBlockStart { index, .. } => {
                assert!(
                    blocks.insert(*index, false).is_none(),
                    "block {} started twice",
                    index
                );
            }
            MessagesStreamEvent::ContentBlockDelta { index, .. } => {
                assert_eq!(
                    blocks.get(index),
                    Some(&false),
                    "delta for block {} outside its start/stop",
                    index
                );
            }
            MessagesStreamEvent::ContentBlockStop { index } => {
                assert_eq!(
                    blocks.insert(*index, true),
                    Some(false),
                    "stop for block {} without an open start",
                    index
                );
            }
            MessagesStreamEvent::MessageDelta { .. } => {
                assert!(
                    blocks.values().all(|stopped| *stopped),
                    "message_delta before every block stopped"
                );
            }
            _ => {}
        }
    }
    assert!(blocks.values().all(|stopped| *stopped));
}
