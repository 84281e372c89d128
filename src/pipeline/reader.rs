//! # Line Reader
//!
//! Background task that pulls lines off the serial link and queues them for
//! the dispatcher.
//!
//! The reader owns the read half of the link. It loops until asked to stop,
//! the stream ends, or a read fails; failures end the task quietly and are
//! left for the owner to discover through [`LineReader::exit`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::serial::port_trait::{LineRead, LineSource};

/// Create the ingress queue shared by one reader and one dispatcher
pub fn ingress_queue() -> (IngressProducer, IngressQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (IngressProducer { tx }, IngressQueue { rx })
}

/// Producer end of the ingress queue, owned by the line reader
#[derive(Debug)]
pub struct IngressProducer {
    tx: mpsc::UnboundedSender<String>,
}

impl IngressProducer {
    /// Queue one raw line; returns `false` once the consumer is gone
    pub fn push(&self, line: String) -> bool {
        self.tx.send(line).is_ok()
    }
}

/// Consumer end of the ingress queue, owned by the dispatcher
#[derive(Debug)]
pub struct IngressQueue {
    rx: mpsc::UnboundedReceiver<String>,
}

impl IngressQueue {
    /// Take every line queued so far, oldest first
    pub fn drain(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.rx.try_recv() {
            lines.push(line);
        }
        lines
    }
}

/// Why the reader task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderExit {
    /// [`LineReader::stop`] was honoured
    Stopped,
    /// The device closed the stream
    EndOfStream,
    /// A read failed; carries the transport's message
    TransportError(String),
    /// The dispatcher dropped its end of the queue
    QueueClosed,
}

impl ReaderExit {
    /// Whether the link ended on its own rather than by request
    pub fn is_link_failure(&self) -> bool {
        matches!(self, ReaderExit::EndOfStream | ReaderExit::TransportError(_))
    }
}

#[derive(Debug, Default)]
struct ReaderState {
    stop: AtomicBool,
    exit: Mutex<Option<ReaderExit>>,
}

/// Handle to the running reader task
///
/// Stopping is advisory: the flag is checked before each read, so an
/// in-flight read finishes (bounded by the transport's read timeout) first.
///
/// # Examples
///
/// ```no_run
/// use smartroom_link::config::SerialConfig;
/// use smartroom_link::pipeline::reader::{ingress_queue, LineReader};
/// use smartroom_link::serial::BoardSerial;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let (source, _sink) = BoardSerial::open(&SerialConfig::default())?.into_split();
///     let (producer, mut queue) = ingress_queue();
///     let reader = LineReader::spawn(source, producer);
///
///     tokio::time::sleep(std::time::Duration::from_secs(1)).await;
///     for line in queue.drain() {
///         print!("{}", line);
///     }
///
///     reader.shutdown().await;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct LineReader {
    state: Arc<ReaderState>,
    handle: Option<JoinHandle<ReaderExit>>,
}

impl LineReader {
    /// Spawn the reader task on the current tokio runtime
    pub fn spawn<S>(source: S, queue: IngressProducer) -> Self
    where
        S: LineSource + 'static,
    {
        let state = Arc::new(ReaderState::default());
        let handle = tokio::spawn(run(source, queue, Arc::clone(&state)));
        debug!("Line reader started");

        Self {
            state,
            handle: Some(handle),
        }
    }

    /// Request the loop to exit before its next read; idempotent
    pub fn stop(&self) {
        if !self.state.stop.swap(true, Ordering::SeqCst) {
            debug!("Line reader stop requested");
        }
    }

    /// Whether the task is still looping
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Exit reason, once the task has ended
    pub fn exit(&self) -> Option<ReaderExit> {
        self.state.exit.lock().clone()
    }

    /// Stop the task and wait until it has fully ended
    pub async fn shutdown(mut self) -> ReaderExit {
        self.stop();

        if let Some(handle) = self.handle.take() {
            match handle.await {
                Ok(exit) => exit,
                Err(e) => ReaderExit::TransportError(format!("reader task failed: {}", e)),
            }
        } else {
            self.exit().unwrap_or(ReaderExit::Stopped)
        }
    }
}

impl Drop for LineReader {
    fn drop(&mut self) {
        self.state.stop.store(true, Ordering::SeqCst);
    }
}

async fn run<S: LineSource>(mut source: S, queue: IngressProducer, state: Arc<ReaderState>) -> ReaderExit {
    let exit = loop {
        if state.stop.load(Ordering::SeqCst) {
            break ReaderExit::Stopped;
        }

        match source.read_line().await {
            Ok(LineRead::Line(line)) => {
                trace!("RX: {:?}", line);
                if !queue.push(line) {
                    break ReaderExit::QueueClosed;
                }
            }
            Ok(LineRead::Idle) => continue,
            Ok(LineRead::Eof) => break ReaderExit::EndOfStream,
            Err(e) => {
                warn!("Serial read failed: {}", e);
                break ReaderExit::TransportError(e.to_string());
            }
        }
    };

    debug!("Line reader finished: {:?}", exit);
    *state.exit.lock() = Some(exit.clone());
    exit
}
