//! # Dispatcher
//!
//! Periodic consumer of the ingress queue.
//!
//! Each tick drains every queued line. Lines arriving during the startup
//! stabilization window are dropped; the rest are either forwarded verbatim
//! to the raw-line sink or decoded and fanned out to the live state, the
//! history window and (while recording) the CSV sink.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error};

use super::history::HistoryBuffer;
use super::reader::IngressQueue;
use crate::error::Result;
use crate::protocol::decoder::{classify_line, decode_payload};
use crate::protocol::telemetry::{LineKind, NightHours, TelemetryRecord};
use crate::telemetry::CsvSink;

/// Default dispatcher tick period (50 ms)
pub const DEFAULT_TICK: Duration = Duration::from_millis(50);

/// Default startup window during which lines are discarded (2 s)
pub const DEFAULT_STABILIZATION: Duration = Duration::from_secs(2);

/// Receiver of non-telemetry lines (device log output)
///
/// Lines always arrive newline-terminated.
#[cfg_attr(test, mockall::automock)]
pub trait RawLineSink {
    fn raw_line(&mut self, line: &str);
}

impl RawLineSink for Vec<String> {
    fn raw_line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Counts from one dispatcher tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    /// Lines taken off the queue
    pub drained: usize,
    /// Lines dropped inside the stabilization window
    pub discarded: usize,
    /// Lines forwarded to the raw-line sink
    pub raw: usize,
    /// Telemetry records decoded and fanned out
    pub records: usize,
}

/// Consumer side of one connection's pipeline
#[derive(Debug)]
pub struct Dispatcher {
    queue: IngressQueue,
    connected_at: Instant,
    stabilization: Duration,
    live: Option<TelemetryRecord>,
    night_hours: NightHours,
    history: HistoryBuffer,
    recorder: CsvSink,
}

impl Dispatcher {
    /// Create a dispatcher for a connection opened at `connected_at`
    pub fn new(
        queue: IngressQueue,
        history: HistoryBuffer,
        connected_at: Instant,
        stabilization: Duration,
    ) -> Self {
        Self {
            queue,
            connected_at,
            stabilization,
            live: None,
            night_hours: NightHours::default(),
            history,
            recorder: CsvSink::new(),
        }
    }

    /// Run one tick at the current time
    pub fn tick(&mut self, raw: &mut dyn RawLineSink) -> TickSummary {
        self.tick_at(Instant::now(), raw)
    }

    /// Run one tick as if at `now`
    ///
    /// # Arguments
    ///
    /// * `now` - Time used for the stabilization check
    /// * `raw` - Receiver of non-telemetry lines
    ///
    /// # Returns
    ///
    /// * `TickSummary` - What happened to the drained lines
    pub fn tick_at(&mut self, now: Instant, raw: &mut dyn RawLineSink) -> TickSummary {
        let mut summary = TickSummary::default();
        let stabilizing = self.is_stabilizing_at(now);

        for line in self.queue.drain() {
            summary.drained += 1;

            if stabilizing {
                summary.discarded += 1;
                continue;
            }

            match classify_line(&line) {
                LineKind::Raw => {
                    if line.ends_with('\n') {
                        raw.raw_line(&line);
                    } else {
                        raw.raw_line(&format!("{}\n", line));
                    }
                    summary.raw += 1;
                }
                LineKind::Telemetry(payload) => {
                    let record = decode_payload(payload);
                    self.accept(record);
                    summary.records += 1;
                }
            }
        }

        if summary.drained > 0 {
            debug!(
                "Dispatched {} lines ({} discarded, {} raw, {} records)",
                summary.drained, summary.discarded, summary.raw, summary.records
            );
        }
        summary
    }

    fn accept(&mut self, record: TelemetryRecord) {
        self.history.append_record(&record);

        if self.recorder.is_open() {
            if let Err(e) = self.recorder.write(&record) {
                error!("CSV write failed, recording stopped: {}", e);
                self.recorder.stop();
            }
        }

        self.night_hours.update(&record);
        self.live = Some(record);
    }

    /// Whether lines processed at `now` are still being discarded
    pub fn is_stabilizing_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.connected_at) < self.stabilization
    }

    /// Most recent decoded record
    pub fn live(&self) -> Option<&TelemetryRecord> {
        self.live.as_ref()
    }

    /// Night window hours, carried over records that omit them
    pub fn night_hours(&self) -> NightHours {
        self.night_hours
    }

    /// Handle to the history window
    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Start recording decoded records to `path`
    pub fn start_recording<P: AsRef<std::path::Path>>(&mut self, path: P) -> Result<()> {
        self.recorder.start(path)
    }

    /// Stop recording; a no-op when not recording
    pub fn stop_recording(&mut self) {
        self.recorder.stop();
    }

    pub fn recorder(&self) -> &CsvSink {
        &self.recorder
    }
}
