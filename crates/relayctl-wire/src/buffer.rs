use std::collections::VecDeque;

use tracing::trace;

use crate::error::{Result, WireError};
use crate::frame::TAIL;

/// Reassembles tail-delimited messages from arbitrarily chunked reads.
///
/// The wire protocol has no length field, so receivers must delimit the
/// byte stream on the fixed 2-byte [`TAIL`]. This buffer accepts chunks of
/// any size (down to single bytes) and tracks how many complete messages
/// are queued, including the case where a tail pair straddles two chunks.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    bytes: VecDeque<u8>,
    complete_messages: usize,
}

impl StreamBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear buffered bytes and the completed-message count, keeping the
    /// allocation.
    pub fn reset(&mut self) {
        self.bytes.clear();
        self.complete_messages = 0;
    }

    /// Whether at least one complete message can be dequeued.
    pub fn is_message_ready(&self) -> bool {
        self.complete_messages > 0
    }

    /// Append a chunk, counting the tail pairs it completes.
    pub fn feed(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        // A tail pair may straddle the boundary with the previous chunk.
        if let Some(&last) = self.bytes.back() {
            if [last, chunk[0]] == TAIL {
                self.complete_messages += 1;
            }
        }
        self.complete_messages += chunk.windows(2).filter(|pair| *pair == TAIL).count();
        self.bytes.extend(chunk);
        trace!(
            fed = chunk.len(),
            buffered = self.bytes.len(),
            ready = self.complete_messages,
            "buffer fed"
        );
    }

    /// Dequeue one complete message, including its tail bytes.
    pub fn get_message(&mut self) -> Result<Vec<u8>> {
        if !self.is_message_ready() {
            return Err(WireError::IncompleteMessage);
        }
        let mut message = Vec::new();
        while let Some(byte) = self.bytes.pop_front() {
            message.push(byte);
            if message.len() >= 2 && message[message.len() - 2..] == TAIL {
                break;
            }
        }
        self.complete_messages -= 1;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_message() {
        let mut buffer = StreamBuffer::new();
        assert!(!buffer.is_message_ready());
        buffer.feed(&[1, 2, 3, 0x00, 0x7E]);
        assert!(buffer.is_message_ready());
        assert_eq!(buffer.get_message().unwrap(), vec![1, 2, 3, 0x00, 0x7E]);
        assert!(!buffer.is_message_ready());
    }

    #[test]
    fn one_byte_feeds() {
        let mut buffer = StreamBuffer::new();
        for byte in [1u8, 2, 3, 0x00] {
            buffer.feed(&[byte]);
            assert!(!buffer.is_message_ready());
        }
        buffer.feed(&[0x7E]);
        assert!(buffer.is_message_ready());
        assert_eq!(buffer.get_message().unwrap(), vec![1, 2, 3, 0x00, 0x7E]);
    }

    #[test]
    fn chunk_size_independence() {
        let message = [9u8, 8, 7, 6, 5, 0x00, 0x7E];
        let mut whole = StreamBuffer::new();
        whole.feed(&message);

        let mut chunked = StreamBuffer::new();
        for chunk in message.chunks(2) {
            chunked.feed(chunk);
        }

        assert_eq!(whole.get_message().unwrap(), chunked.get_message().unwrap());
    }

    #[test]
    fn tail_fed_together() {
        let mut buffer = StreamBuffer::new();
        buffer.feed(&[1, 2, 3]);
        assert!(!buffer.is_message_ready());
        buffer.feed(&[0x00, 0x7E]);
        assert!(buffer.is_message_ready());
    }

    #[test]
    fn tail_split_across_chunks() {
        let mut buffer = StreamBuffer::new();
        buffer.feed(&[1, 2, 3, 0x00]);
        assert!(!buffer.is_message_ready());
        buffer.feed(&[0x7E]);
        assert!(buffer.is_message_ready());
        assert_eq!(buffer.get_message().unwrap(), vec![1, 2, 3, 0x00, 0x7E]);
    }

    #[test]
    fn multiple_messages_queue_in_order() {
        let mut buffer = StreamBuffer::new();
        buffer.feed(&[1, 0x00, 0x7E, 2, 0x00, 0x7E]);
        assert_eq!(buffer.get_message().unwrap(), vec![1, 0x00, 0x7E]);
        assert_eq!(buffer.get_message().unwrap(), vec![2, 0x00, 0x7E]);
        assert!(!buffer.is_message_ready());
    }

    #[test]
    fn incomplete_message_is_an_error() {
        let mut buffer = StreamBuffer::new();
        buffer.feed(&[1, 2, 3, 0x00]);
        let err = buffer.get_message().unwrap_err();
        assert!(matches!(err, WireError::IncompleteMessage));
    }

    #[test]
    fn empty_buffer_is_an_error() {
        let mut buffer = StreamBuffer::new();
        assert!(matches!(
            buffer.get_message().unwrap_err(),
            WireError::IncompleteMessage
        ));
    }

    #[test]
    fn reset_discards_partial_data() {
        let mut buffer = StreamBuffer::new();
        buffer.feed(&[1, 2, 0x00, 0x7E, 9, 9]);
        buffer.reset();
        assert!(!buffer.is_message_ready());
        buffer.feed(&[5, 0x00, 0x7E]);
        assert_eq!(buffer.get_message().unwrap(), vec![5, 0x00, 0x7E]);
    }

    #[test]
    fn empty_feed_is_a_no_op() {
        let mut buffer = StreamBuffer::new();
        buffer.feed(&[0x00]);
        buffer.feed(&[]);
        assert!(!buffer.is_message_ready());
        buffer.feed(&[0x7E]);
        assert!(buffer.is_message_ready());
    }

    #[test]
    fn ping_frame_roundtrips_through_buffer() {
        use crate::command::Command;
        use crate::frame::{encode_frame, frame_body};
        use bytes::BytesMut;

        let mut wire = BytesMut::new();
        encode_frame(&Command::Ping, 3, &mut wire);

        let mut buffer = StreamBuffer::new();
        for chunk in wire.chunks(3) {
            buffer.feed(chunk);
        }
        let message = buffer.get_message().unwrap();
        assert_eq!(message, wire.to_vec());
        assert_eq!(frame_body(&message).unwrap(), Command::Ping.body().as_ref());
    }
}
