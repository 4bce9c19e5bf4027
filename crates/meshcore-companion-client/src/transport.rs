//! Transport seam and the receive pipeline.

use std::future::Future;
use std::sync::Arc;

use meshcore_companion_protocol::{Event, FrameReassembler, PacketReader};
use parking_lot::Mutex;
use tracing::trace;

use crate::dispatcher::EventDispatcher;
use crate::error::TransportError;

/// A byte link to a companion radio.
///
/// Implementations deliver every received chunk, in arrival order, to the
/// [`FeedHandle`] given to [`connect`](Transport::connect).
pub trait Transport: Send + Sync + 'static {
    /// Open the link and start feeding received bytes.
    fn connect(&self, feed: FeedHandle) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Queue one unframed command payload. Failures are logged, not returned.
    fn send(&self, payload: &[u8]);

    /// Close the link. Idempotent.
    fn disconnect(&self);
}

struct Pipeline {
    reassembler: FrameReassembler,
    reader: PacketReader,
}

/// Entry point for received bytes: reassembles frames, decodes them and
/// publishes the resulting events.
#[derive(Clone)]
pub struct FeedHandle {
    pipeline: Arc<Mutex<Pipeline>>,
    dispatcher: EventDispatcher,
}

impl FeedHandle {
    pub fn new(dispatcher: EventDispatcher, max_frame_len: usize) -> Self {
        FeedHandle {
            pipeline: Arc::new(Mutex::new(Pipeline {
                reassembler: FrameReassembler::with_max_frame_len(max_frame_len),
                reader: PacketReader::new(),
            })),
            dispatcher,
        }
    }

    /// Feed one received chunk. Never suspends.
    pub fn feed(&self, chunk: &[u8]) {
        trace!(len = chunk.len(), bytes = %hex::encode(chunk), "received chunk");
        let events: Vec<Event> = {
            let mut guard = self.pipeline.lock();
            let Pipeline { reassembler, reader } = &mut *guard;
            reassembler
                .push(chunk)
                .iter()
                .filter_map(|frame| reader.decode(frame))
                .collect()
        };
        for event in events {
            self.dispatcher.publish(event);
        }
    }

    /// Drop any partial frame and staged contacts, e.g. after a reconnect.
    pub fn reset(&self) {
        let mut guard = self.pipeline.lock();
        guard.reassembler.reset();
        guard.reader = PacketReader::new();
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshcore_companion_protocol::{
        encode_frame_with_marker, AttributeFilter, EventKind, EventPayload, FRAME_MARKER_INBOUND,
    };

    #[test]
    fn test_feed_publishes_decoded_events() {
        let dispatcher = EventDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        dispatcher.subscribe(None, AttributeFilter::any(), move |e| s.lock().push(e.clone()));

        let feed = FeedHandle::new(dispatcher, 1024);
        let mut stream = encode_frame_with_marker(FRAME_MARKER_INBOUND, &[0x0c, 0x10, 0x0e]);
        stream.extend(encode_frame_with_marker(FRAME_MARKER_INBOUND, &[0x0a]));
        let (a, b) = stream.split_at(4);
        feed.feed(a);
        assert!(seen.lock().is_empty());
        feed.feed(b);

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].payload, EventPayload::Battery(3600));
        assert_eq!(seen[1].kind(), EventKind::NoMoreMsgs);
    }

    #[test]
    fn test_reset_discards_partial_frame() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(Mutex::new(0usize));
        let c = Arc::clone(&count);
        dispatcher.subscribe(None, AttributeFilter::any(), move |_| *c.lock() += 1);

        let feed = FeedHandle::new(dispatcher, 1024);
        let frame = encode_frame_with_marker(FRAME_MARKER_INBOUND, &[0x0c, 0x10, 0x0e]);
        feed.feed(&frame[..4]);
        feed.reset();
        feed.feed(&frame);
        assert_eq!(*count.lock(), 1);
    }
}
