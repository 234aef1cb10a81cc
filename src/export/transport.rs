//! Bounded byte transport between the download and upload tasks
//!
//! The writer half is an [`AsyncWrite`] fed by the formatter; the reader half
//! is an [`AsyncRead`] handed to the uploader. They are joined by a one-slot
//! channel of chunks, so the producer can never get more than one chunk ahead
//! of the consumer no matter how large the table is.
//!
//! Closing semantics:
//! - `shutdown` on the writer ends the stream cleanly (reader sees EOF)
//! - dropping the writer without `shutdown` aborts the stream (reader sees
//!   `BrokenPipe`), so a failed or cancelled export never looks complete
//! - dropping the reader makes further writes fail with `BrokenPipe`

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, ready};

use bytes::{Buf, Bytes};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::mpsc;
use tokio_util::sync::PollSender;

/// Number of chunks that may sit between the writer and the reader.
const PIPE_DEPTH: usize = 1;

/// Create a connected writer/reader pair
pub fn pipe() -> (TransportWriter, TransportReader) {
    let (tx, rx) = mpsc::channel(PIPE_DEPTH);
    let aborted = Arc::new(AtomicBool::new(false));

    let writer = TransportWriter {
        tx: PollSender::new(tx),
        aborted: aborted.clone(),
        finished: false,
    };
    let reader = TransportReader {
        rx,
        chunk: Bytes::new(),
        aborted,
    };

    (writer, reader)
}

fn broken_pipe(message: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, message)
}

/// Producer half of the transport
pub struct TransportWriter {
    tx: PollSender<Bytes>,
    aborted: Arc<AtomicBool>,
    finished: bool,
}

impl AsyncWrite for TransportWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.finished {
            return Poll::Ready(Err(broken_pipe("transport already shut down")));
        }
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        ready!(self.tx.poll_reserve(cx)).map_err(|_| broken_pipe("transport reader closed"))?;
        self.tx
            .send_item(Bytes::copy_from_slice(buf))
            .map_err(|_| broken_pipe("transport reader closed"))?;

        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        // Every accepted write is already in the channel.
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.finished = true;
        self.tx.close();
        Poll::Ready(Ok(()))
    }
}

impl Drop for TransportWriter {
    fn drop(&mut self) {
        if !self.finished {
            // Must be visible before the sender is dropped and the reader sees the end.
            self.aborted.store(true, Ordering::SeqCst);
        }
    }
}

/// Consumer half of the transport
pub struct TransportReader {
    rx: mpsc::Receiver<Bytes>,
    chunk: Bytes,
    aborted: Arc<AtomicBool>,
}

impl AsyncRead for TransportReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            if !self.chunk.is_empty() {
                let n = self.chunk.len().min(buf.remaining());
                buf.put_slice(&self.chunk[..n]);
                self.chunk.advance(n);
                return Poll::Ready(Ok(()));
            }

            match ready!(self.rx.poll_recv(cx)) {
                Some(chunk) => self.chunk = chunk,
                None if self.aborted.load(Ordering::SeqCst) => {
                    return Poll::Ready(Err(broken_pipe("transport aborted by producer")));
                }
                None => return Poll::Ready(Ok(())),
            }
        }
    }
}
