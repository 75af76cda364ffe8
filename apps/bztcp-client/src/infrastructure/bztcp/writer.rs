//! Frame Writer
//!
//! Single-writer wrapper around the outbound half of a transport. The
//! keep-alive prober and callers of `Session::send` share one `FrameWriter`;
//! the async mutex keeps whole lines from interleaving on the wire.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::SinkExt;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::codec::FramedWrite;

use super::codec::{LineCodec, Message};
use super::error::{ClientError, Result};

/// Bound on each step of [`FrameWriter::close`].
///
/// A peer that stops reading can hold a flush open forever; past this bound
/// unsent bytes are dropped and the transport is shut down regardless.
pub const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Serialized writer for protocol lines.
#[derive(Debug)]
pub struct FrameWriter<W> {
    sink: Mutex<FramedWrite<W, LineCodec>>,
    closed: AtomicBool,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wrap the write half of a transport.
    pub fn new(inner: W) -> Self {
        Self::with_codec(inner, LineCodec::new())
    }

    /// Wrap the write half of a transport with an explicit codec.
    pub fn with_codec(inner: W, codec: LineCodec) -> Self {
        Self {
            sink: Mutex::new(FramedWrite::new(inner, codec)),
            closed: AtomicBool::new(false),
        }
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Write one message and flush it.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionClosed` after [`close`](Self::close), or the
    /// underlying I/O error.
    pub async fn send_message(&self, msg: &Message) -> Result<()> {
        let mut sink = self.sink.lock().await;
        if self.is_closed() {
            return Err(ClientError::ConnectionClosed);
        }
        sink.send(msg).await
    }

    /// Write a status-only line.
    ///
    /// # Errors
    ///
    /// See [`send_message`](Self::send_message).
    pub async fn send_status(&self, status: &str) -> Result<()> {
        self.send_message(&Message::new(status)).await
    }

    /// Write a line whose payload is `body` encoded as JSON.
    ///
    /// # Errors
    ///
    /// Returns `Decode` if `body` cannot be serialized, otherwise see
    /// [`send_message`](Self::send_message).
    pub async fn send_json<T: Serialize + ?Sized>(&self, status: &str, body: &T) -> Result<()> {
        let msg = Message::with_json(status, body)?;
        self.send_message(&msg).await
    }

    /// Flush and shut down the write half.
    ///
    /// Only the first call reaches the transport; later calls return `Ok(())`.
    /// Taking the lock, flushing and shutting down are each bounded by
    /// [`CLOSE_GRACE`]. A flush that stalls discards whatever is still
    /// buffered and shuts the transport down directly.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while shutting down, or `TimedOut` if the
    /// writer stayed busy or the shutdown itself stalled.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let Ok(mut sink) = tokio::time::timeout(CLOSE_GRACE, self.sink.lock()).await else {
            return Err(timed_out("writer busy"));
        };

        if let Ok(result) =
            tokio::time::timeout(CLOSE_GRACE, SinkExt::<Message>::close(&mut *sink)).await
        {
            return result;
        }

        let pending = sink.write_buffer().len();
        sink.write_buffer_mut().clear();
        tracing::debug!(pending, "Flush stalled on close, dropping unsent bytes");

        match tokio::time::timeout(CLOSE_GRACE, sink.get_mut().shutdown()).await {
            Ok(result) => result.map_err(ClientError::from),
            Err(_) => Err(timed_out("shutdown stalled")),
        }
    }
}

fn timed_out(reason: &'static str) -> ClientError {
    ClientError::Transport(io::Error::new(io::ErrorKind::TimedOut, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, duplex};

    #[tokio::test]
    async fn writes_whole_lines() {
        let (client, mut server) = duplex(1024);
        let writer = FrameWriter::new(client);

        writer.send_status("READY").await.unwrap();
        writer
            .send_json("PING", &serde_json::json!({"pingTime": "t"}))
            .await
            .unwrap();
        drop(writer);

        let mut out = String::new();
        server.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "READY=BZEOT\r\nPING: {\"pingTime\":\"t\"}=BZEOT\r\n");
    }

    #[tokio::test]
    async fn concurrent_senders_do_not_interleave() {
        let (client, mut server) = duplex(64 * 1024);
        let writer = Arc::new(FrameWriter::new(client));

        let mut tasks = Vec::new();
        for i in 0..16 {
            let writer = Arc::clone(&writer);
            tasks.push(tokio::spawn(async move {
                let body = serde_json::json!({ "n": i, "pad": "x".repeat(200) });
                writer.send_json("PING", &body).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        writer.close().await.unwrap();

        let mut out = String::new();
        server.read_to_string(&mut out).await.unwrap();
        let lines: Vec<&str> = out.split_terminator("=BZEOT\r\n").collect();
        assert_eq!(lines.len(), 16);
        for line in lines {
            let msg = Message::decode(format!("{line}=BZEOT\r\n").as_bytes()).unwrap();
            assert_eq!(msg.status, "PING");
            assert!(msg.json::<serde_json::Value>().is_ok());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn close_gives_up_on_a_stalled_flush() {
        let (client, mut server) = duplex(16);
        let writer = Arc::new(FrameWriter::new(client));

        // The peer never reads, so this line cannot be flushed.
        let stalled = {
            let writer = Arc::clone(&writer);
            tokio::spawn(async move {
                let body = serde_json::json!({ "pad": "x".repeat(64) });
                writer.send_json("PING", &body).await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!stalled.is_finished());
        stalled.abort();
        let _ = stalled.await;

        tokio::time::timeout(3 * CLOSE_GRACE, writer.close())
            .await
            .expect("close did not return")
            .unwrap();
        assert!(writer.is_closed());

        // Only the bytes that fit before the stall ever reach the peer.
        let mut out = Vec::new();
        server.read_to_end(&mut out).await.unwrap();
        assert_eq!(out.len(), 16);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_blocks_sends() {
        let (client, mut server) = duplex(1024);
        let writer = FrameWriter::new(client);

        writer.close().await.unwrap();
        writer.close().await.unwrap();
        assert!(writer.is_closed());

        let err = writer.send_status("PING").await.unwrap_err();
        assert!(matches!(err, ClientError::ConnectionClosed));

        let mut out = Vec::new();
        server.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
    }
}
