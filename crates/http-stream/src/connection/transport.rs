//! The byte sink underneath a response body stream.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::trace;

/// An ordered, raw byte sink such as a TCP or TLS stream.
///
/// Segments written through one transport must reach the peer in the order they
/// were issued. A transport never retries: a failed write is reported once and the
/// connection layer decides what happens next.
pub trait Transport: Send {
    /// An in-flight write started by [`Transport::start_write`], resolving once the
    /// segment has been written.
    type Pending: Future<Output = io::Result<()>> + Send;

    /// Writes the whole segment, returning once it has been handed to the transport
    fn write_all(&mut self, buf: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Starts writing `buf` without waiting for it to finish
    fn start_write(&mut self, buf: Bytes) -> Self::Pending;

    /// Pushes bytes buffered by the transport to the peer
    fn flush(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

/// [`Transport`] over any tokio [`AsyncWrite`].
///
/// The writer is shared with the tasks spawned by [`Transport::start_write`], so
/// started writes make progress even while nobody awaits their handle.
#[derive(Debug)]
pub struct IoTransport<W> {
    writer: Arc<Mutex<W>>,
}

impl<W> IoTransport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(writer: W) -> Self {
        Self { writer: Arc::new(Mutex::new(writer)) }
    }

    /// Returns the writer, or `self` back while a started write still holds it
    pub fn into_inner(self) -> Result<W, Self> {
        Arc::try_unwrap(self.writer).map(Mutex::into_inner).map_err(|writer| Self { writer })
    }
}

impl<W> Transport for IoTransport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    type Pending = WriteHandle;

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(buf).await
    }

    fn start_write(&mut self, buf: Bytes) -> WriteHandle {
        let writer = Arc::clone(&self.writer);
        trace!(len = buf.len(), "spawn transport write");
        let task = tokio::spawn(async move {
            let mut writer = writer.lock().await;
            writer.write_all(&buf).await
        });
        WriteHandle { task }
    }

    async fn flush(&mut self) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.flush().await
    }
}

/// Handle of a write spawned by [`IoTransport`].
///
/// Dropping the handle detaches the write, it is not cancelled.
#[derive(Debug)]
pub struct WriteHandle {
    task: JoinHandle<io::Result<()>>,
}

impl Future for WriteHandle {
    type Output = io::Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(Pin::new(&mut self.task).poll(cx)) {
            Ok(result) => Poll::Ready(result),
            Err(join_error) => Poll::Ready(Err(io::Error::other(join_error))),
        }
    }
}
