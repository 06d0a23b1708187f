//! In-memory `Transport` test double with programmable faults.
//!
//! Lets unit tests of the retry loop, resume inspector, and progress tracker
//! exercise mid-stream errors, short responses, and permanent failures
//! without a real socket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{HeadInfo, RangeStream, Transport};

/// A fault to inject on a given (0-based) attempt at a given byte range.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Fail the whole request before any bytes are sent.
    FailImmediately,
    /// Emit `bytes` bytes of the real body, then end the stream early (as if
    /// the connection dropped).
    TruncateAfter(usize),
}

#[derive(Default)]
struct State {
    /// Attempt counter per segment, keyed by `(start, end_inclusive)`.
    attempts: HashMap<(u64, u64), usize>,
}

/// Serves a single in-memory object and records every `get_range` call so
/// tests can assert on request shape (ranges requested, retry counts).
pub struct MockTransport {
    body: Vec<u8>,
    /// Faults keyed by `(range, attempt_index)`; the Nth attempt at a given
    /// range is faulted according to this table, if present.
    faults: Mutex<HashMap<(u64, u64, usize), Fault>>,
    state: Mutex<State>,
    head_calls: AtomicUsize,
}

impl MockTransport {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            faults: Mutex::new(HashMap::new()),
            state: Mutex::new(State::default()),
            head_calls: AtomicUsize::new(0),
        }
    }

    /// Injects `fault` on the `attempt_index`-th (0-based) request for the
    /// given inclusive byte range.
    pub fn with_fault(self, start: u64, end_inclusive: u64, attempt_index: usize, fault: Fault) -> Self {
        self.faults
            .lock()
            .unwrap()
            .insert((start, end_inclusive, attempt_index), fault);
        self
    }

    pub fn head_call_count(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn head(&self, _bucket: &str, _key: &str) -> anyhow::Result<HeadInfo> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        Ok(HeadInfo {
            content_length: self.body.len() as u64,
        })
    }

    async fn get_range(
        &self,
        _bucket: &str,
        _key: &str,
        start: u64,
        end_inclusive: u64,
    ) -> anyhow::Result<RangeStream> {
        let attempt = {
            let mut state = self.state.lock().unwrap();
            let counter = state.attempts.entry((start, end_inclusive)).or_insert(0);
            let this_attempt = *counter;
            *counter += 1;
            this_attempt
        };

        let fault = self
            .faults
            .lock()
            .unwrap()
            .get(&(start, end_inclusive, attempt))
            .cloned();

        let end = (end_inclusive + 1).min(self.body.len() as u64) as usize;
        let start_usize = start as usize;
        let full_slice = if start_usize < end {
            self.body[start_usize..end].to_vec()
        } else {
            Vec::new()
        };

        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let content_length = Some(full_slice.len() as u64);

        match fault {
            Some(Fault::FailImmediately) => {
                let _ = tx.send(Err(anyhow::anyhow!("mock: connection reset"))).await;
            }
            Some(Fault::TruncateAfter(n)) => {
                let n = n.min(full_slice.len());
                if n > 0 {
                    let _ = tx.send(Ok(full_slice[..n].to_vec())).await;
                }
                // No error sent: stream simply ends short, as an EOF would.
            }
            None => {
                if !full_slice.is_empty() {
                    let _ = tx.send(Ok(full_slice)).await;
                }
            }
        }

        Ok(RangeStream {
            content_length,
            chunks: rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_requested_range() {
        let t = MockTransport::new((0u8..=255).collect());
        let mut stream = t.get_range("b", "k", 10, 19).await.unwrap();
        let mut got = Vec::new();
        while let Some(chunk) = stream.chunks.recv().await {
            got.extend(chunk.unwrap());
        }
        assert_eq!(got, (10u8..=19).collect::<Vec<_>>());
        assert_eq!(stream.content_length, Some(10));
    }

    #[tokio::test]
    async fn truncate_fault_ends_stream_early() {
        let t = MockTransport::new(vec![0u8; 100])
            .with_fault(0, 99, 0, Fault::TruncateAfter(40));
        let mut stream = t.get_range("b", "k", 0, 99).await.unwrap();
        let mut got = Vec::new();
        while let Some(chunk) = stream.chunks.recv().await {
            got.extend(chunk.unwrap());
        }
        assert_eq!(got.len(), 40);
    }

    #[tokio::test]
    async fn fault_only_applies_to_its_attempt_index() {
        let t = MockTransport::new(vec![1u8; 10]).with_fault(0, 9, 0, Fault::FailImmediately);
        let mut first = t.get_range("b", "k", 0, 9).await.unwrap();
        let first_err = first.chunks.recv().await.unwrap();
        assert!(first_err.is_err());

        let mut second = t.get_range("b", "k", 0, 9).await.unwrap();
        let mut got = Vec::new();
        while let Some(chunk) = second.chunks.recv().await {
            got.extend(chunk.unwrap());
        }
        assert_eq!(got, vec![1u8; 10]);
    }
}
