//! Scripted mock transport for tests.
//!
//! Plays back a queue of canned reply frames and records every request
//! written, so protocol exchanges can be exercised without hardware. An
//! exhausted queue behaves like a quiet link (empty reads), matching the
//! ad-hoc drain termination signal.
//!
//! The mock is a cloneable handle over shared state: tests keep one
//! clone for inspection after moving the other into a session.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::Result;
use crate::transport::Transport;

#[derive(Debug, Default)]
struct Inner {
    replies: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    reads: usize,
}

/// Transport double that replays scripted frames.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MockTransport {
    /// Empty mock; every read reports no data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock primed with reply frames, returned in order.
    pub fn with_replies<I, B>(replies: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        let mock = Self::new();
        for reply in replies {
            mock.push_reply(reply);
        }
        mock
    }

    /// Queue one more reply frame.
    pub fn push_reply(&self, reply: impl Into<Vec<u8>>) {
        self.lock().replies.push_back(reply.into());
    }

    /// Every frame written so far, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().writes.clone()
    }

    /// Number of reads performed so far.
    pub fn reads(&self) -> usize {
        self.lock().reads
    }

    /// Replies still queued.
    pub fn remaining(&self) -> usize {
        self.lock().replies.len()
    }

    #[allow(clippy::unwrap_used)]
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Test double: a poisoned lock only follows a panicking test.
        self.inner.lock().unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.lock().writes.push(buf.to_vec());
        Ok(())
    }

    async fn read_until(&mut self, _delimiter: u8) -> Result<Vec<u8>> {
        let mut inner = self.lock();
        inner.reads += 1;
        Ok(inner.replies.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_in_order() {
        let mut mock =
            MockTransport::with_replies([b"!GFw1|2|3\r".to_vec(), b"!GSN42\r".to_vec()]);
        mock.write_all(b"?GFw|\r").await.unwrap();

        assert_eq!(mock.read_until(b'\r').await.unwrap(), b"!GFw1|2|3\r");
        assert_eq!(mock.read_until(b'\r').await.unwrap(), b"!GSN42\r");
        // Exhausted queue behaves like a quiet link.
        assert!(mock.read_until(b'\r').await.unwrap().is_empty());

        assert_eq!(mock.writes(), vec![b"?GFw|\r".to_vec()]);
        assert_eq!(mock.reads(), 3);
    }

    #[tokio::test]
    async fn test_mock_clone_shares_state() {
        let mock = MockTransport::new();
        let mut moved = mock.clone();
        moved.write_all(b"?MTA|\r").await.unwrap();
        assert_eq!(mock.writes(), vec![b"?MTA|\r".to_vec()]);
    }
}
