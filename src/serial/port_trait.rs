//! Trait abstraction for the line transport to enable testing
//!
//! The link is split into a read half ([`LineSource`]) owned by the line
//! reader task and a write half ([`LineSink`]) owned by the command channel.

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};

use super::framing::LineFramer;

/// Outcome of one blocking line read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    /// A newline-terminated line or a timeout-truncated chunk
    Line(String),
    /// The read timeout elapsed with nothing buffered
    Idle,
    /// The peer closed the stream
    Eof,
}

/// Read half of the line transport
#[async_trait]
pub trait LineSource: Send {
    /// Wait for the next line, bounded by the transport's read timeout
    async fn read_line(&mut self) -> io::Result<LineRead>;
}

/// Write half of the line transport
#[async_trait]
pub trait LineSink: Send {
    /// Write all data to the link
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;
}

/// [`LineSource`] over any async byte stream (serial read half, pipes, test mocks)
pub struct AsyncLineSource<R> {
    reader: R,
    framer: LineFramer,
    read_timeout: Duration,
}

impl<R> AsyncLineSource<R> {
    /// Wrap a byte stream with the given per-read timeout
    pub fn new(reader: R, read_timeout: Duration) -> Self {
        Self {
            reader,
            framer: LineFramer::new(),
            read_timeout,
        }
    }

    /// Configured read timeout
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

#[async_trait]
impl<R> LineSource for AsyncLineSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_line(&mut self) -> io::Result<LineRead> {
        let deadline = Instant::now() + self.read_timeout;

        loop {
            if let Some(line) = self.framer.next_line() {
                return Ok(LineRead::Line(line));
            }

            // read_buf is cancel safe, so a timeout never loses buffered bytes
            match timeout_at(deadline, self.reader.read_buf(self.framer.buffer_mut())).await {
                Err(_elapsed) => {
                    return Ok(self.framer.take_partial().map_or(LineRead::Idle, LineRead::Line));
                }
                Ok(Ok(0)) => {
                    return Ok(self.framer.take_partial().map_or(LineRead::Eof, LineRead::Line));
                }
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => return Err(e),
            }
        }
    }
}

/// [`LineSink`] over any async byte stream
pub struct AsyncLineSink<W> {
    writer: W,
}

impl<W> AsyncLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W> LineSink for AsyncLineSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.writer.flush().await
    }
}
