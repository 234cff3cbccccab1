//! Stream Collector
//!
//! Drains one diagnostic stream in arrival order. Memory is bounded by the
//! configured cap: bytes past the cap are counted and dropped, and the
//! captured text gets a truncation notice.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::warn;

const READ_CHUNK_SIZE: usize = 8192;

/// Appended to captured text once the cap has been hit.
pub const TRUNCATION_NOTICE: &str = "\n[galley] output truncated (capture limit reached)\n";

/// Everything captured from one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedStream {
    pub text: String,
    pub truncated: bool,
    /// Bytes seen on the stream, including dropped ones.
    pub total_bytes: u64,
}

/// Growing buffer with a hard byte cap.
#[derive(Debug)]
struct CappedBuffer {
    bytes: Vec<u8>,
    limit: usize,
    total: u64,
    truncated: bool,
}

impl CappedBuffer {
    fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
            total: 0,
            truncated: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        self.total += chunk.len() as u64;
        let room = self.limit.saturating_sub(self.bytes.len());
        if chunk.len() > room {
            self.bytes.extend_from_slice(&chunk[..room]);
            self.truncated = true;
        } else {
            self.bytes.extend_from_slice(chunk);
        }
    }

    fn snapshot(&self) -> CapturedStream {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.truncated {
            text.push_str(TRUNCATION_NOTICE);
        }
        CapturedStream {
            text,
            truncated: self.truncated,
            total_bytes: self.total,
        }
    }
}

/// Capture buffer shared between a draining task and its owner.
///
/// The owner can snapshot at any time, so bytes already read survive even
/// when the draining task is aborted before EOF.
#[derive(Debug, Clone)]
pub struct StreamCapture {
    inner: Arc<Mutex<CappedBuffer>>,
}

impl StreamCapture {
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CappedBuffer::new(limit))),
        }
    }

    fn push(&self, chunk: &[u8]) {
        self.lock().push(chunk);
    }

    /// Everything read so far.
    pub fn snapshot(&self) -> CapturedStream {
        self.lock().snapshot()
    }

    fn lock(&self) -> MutexGuard<'_, CappedBuffer> {
        // Poisoned only by a panicking push; the bytes are still readable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read `reader` to EOF into `capture`.
///
/// A read error ends collection; whatever arrived before it is kept.
pub async fn drain_into<R>(mut reader: R, capture: StreamCapture)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => capture.push(&chunk[..n]),
            Err(e) => {
                warn!("Worker stream read failed, keeping partial output: {}", e);
                break;
            }
        }
    }
}

/// Read `reader` to EOF, keeping at most `limit` bytes.
pub async fn collect_stream<R>(reader: R, limit: usize) -> CapturedStream
where
    R: AsyncRead + Unpin,
{
    let capture = StreamCapture::new(limit);
    drain_into(reader, capture.clone()).await;
    capture.snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collects_in_arrival_order() {
        let (mut tx, rx) = tokio::io::duplex(16);
        let writer = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            for part in ["first ", "second ", "third"] {
                tx.write_all(part.as_bytes()).await.unwrap();
            }
        });

        let captured = collect_stream(rx, 1024).await;
        writer.await.unwrap();

        assert_eq!(captured.text, "first second third");
        assert!(!captured.truncated);
        assert_eq!(captured.total_bytes, 18);
    }

    #[tokio::test]
    async fn test_cap_truncates_and_counts() {
        let data = vec![b'x'; 100];
        let captured = collect_stream(&data[..], 10).await;

        assert!(captured.truncated);
        assert_eq!(captured.total_bytes, 100);
        assert!(captured.text.starts_with("xxxxxxxxxx\n"));
        assert!(captured.text.ends_with(TRUNCATION_NOTICE));
    }

    #[tokio::test]
    async fn test_exact_limit_is_not_truncated() {
        let captured = collect_stream(&b"12345"[..], 5).await;
        assert_eq!(captured.text, "12345");
        assert!(!captured.truncated);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_lossy() {
        let captured = collect_stream(&[0x66, 0xff, 0x6f][..], 64).await;
        assert_eq!(captured.text, "f\u{fffd}o");
    }

    #[tokio::test]
    async fn test_snapshot_sees_bytes_while_stream_open() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let capture = StreamCapture::new(1024);
        let task = tokio::spawn(drain_into(rx, capture.clone()));

        use tokio::io::AsyncWriteExt;
        tx.write_all(b"Missing column: Imma\n").await.unwrap();

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        while capture.snapshot().text.is_empty() && tokio::time::Instant::now() < deadline {
            tokio::task::yield_now().await;
        }
        // writer still open: the drain has not finished
        assert!(!task.is_finished());
        task.abort();

        assert_eq!(capture.snapshot().text, "Missing column: Imma\n");
        drop(tx);
    }
}
