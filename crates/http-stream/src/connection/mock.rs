//! Recording transport for the unit tests of this crate.

use std::io;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::future::{self, Ready};

use crate::connection::Transport;

/// Records every segment it is asked to write. Clones share the record, so a test
/// keeps one clone while the stream owns the other.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    segments: Vec<Vec<u8>>,
    attempts: usize,
    flushes: usize,
    fail_from: Option<usize>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every write attempt from the `n`th one on (zero based) fails, like a peer
    /// that went away.
    pub(crate) fn failing_from(n: usize) -> Self {
        let transport = Self::new();
        transport.state.lock().unwrap().fail_from = Some(n);
        transport
    }

    pub(crate) fn segments(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().segments.clone()
    }

    /// All segments written so far, concatenated
    pub(crate) fn bytes(&self) -> Vec<u8> {
        self.segments().concat()
    }

    pub(crate) fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempts
    }

    pub(crate) fn flushes(&self) -> usize {
        self.state.lock().unwrap().flushes
    }

    fn record(&self, buf: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        let attempt = state.attempts;
        state.attempts += 1;

        if state.fail_from.is_some_and(|n| attempt >= n) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock transport closed"));
        }

        state.segments.push(buf.to_vec());
        Ok(())
    }
}

impl Transport for MockTransport {
    type Pending = Ready<io::Result<()>>;

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.record(buf)
    }

    fn start_write(&mut self, buf: Bytes) -> Self::Pending {
        future::ready(self.record(&buf))
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.state.lock().unwrap().flushes += 1;
        Ok(())
    }
}
