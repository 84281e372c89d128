//! # History Buffer
//!
//! Fixed-capacity rolling window of recent samples feeding the live chart.
//!
//! The dispatcher appends one sample per decoded record; the chart cadence
//! takes snapshots from another task. Both sides go through one short lock,
//! so a snapshot never observes a half-written sample.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::protocol::telemetry::TelemetryRecord;

/// Default number of samples kept for charting
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// One charted point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySample {
    /// Insert position, strictly increasing for the life of the buffer
    pub sequence_index: u64,
    /// Temperature in °C (NaN when missing)
    pub temperature_c: f64,
    /// Relative humidity in % (NaN when missing)
    pub humidity_pct: f64,
    /// Raw LDR reading (-1 when missing)
    pub light_raw: f64,
}

impl HistorySample {
    /// Sample carrying a record's charted channels; the index is assigned on append
    pub fn from_record(record: &TelemetryRecord) -> Self {
        Self {
            sequence_index: 0,
            temperature_c: record.temperature_c,
            humidity_pct: record.humidity_pct,
            light_raw: record.light_raw as f64,
        }
    }
}

/// Ring storage: `head` is the next slot to write, `len` the filled count
#[derive(Debug)]
struct Ring {
    slots: Vec<HistorySample>,
    capacity: usize,
    head: usize,
    len: usize,
    inserted: u64,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            head: 0,
            len: 0,
            inserted: 0,
        }
    }

    fn push(&mut self, mut sample: HistorySample) -> u64 {
        sample.sequence_index = self.inserted;

        if self.slots.len() < self.capacity {
            self.slots.push(sample);
        } else {
            self.slots[self.head] = sample;
        }

        self.head = (self.head + 1) % self.capacity;
        self.len = (self.len + 1).min(self.capacity);
        self.inserted += 1;
        sample.sequence_index
    }

    fn oldest_first(&self) -> impl Iterator<Item = HistorySample> + '_ {
        let start = if self.len < self.capacity { 0 } else { self.head };
        (0..self.len).map(move |i| self.slots[(start + i) % self.capacity])
    }

    fn latest(&self) -> Option<HistorySample> {
        if self.len == 0 {
            return None;
        }
        let last = (self.head + self.capacity - 1) % self.capacity;
        Some(self.slots[last])
    }
}

/// Shared handle to the rolling sample window
///
/// Cloning the handle shares the same window.
///
/// # Examples
///
/// ```
/// use smartroom_link::pipeline::history::{HistoryBuffer, HistorySample};
///
/// let history = HistoryBuffer::new(2);
/// for t in [20.0, 21.0, 22.0] {
///     history.append(HistorySample {
///         sequence_index: 0,
///         temperature_c: t,
///         humidity_pct: 40.0,
///         light_raw: 500.0,
///     });
/// }
///
/// let snapshot = history.snapshot();
/// assert_eq!(snapshot.len(), 2);
/// assert_eq!(snapshot[0].temperature_c, 21.0);
/// assert_eq!(snapshot[1].sequence_index, 2);
/// ```
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    inner: Arc<Mutex<Ring>>,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryBuffer {
    /// Create an empty window; a zero capacity is raised to one
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Ring::new(capacity.max(1)))),
        }
    }

    /// Append a sample, evicting the oldest one when full
    ///
    /// # Returns
    ///
    /// * `u64` - Sequence index assigned to the sample
    pub fn append(&self, sample: HistorySample) -> u64 {
        self.inner.lock().push(sample)
    }

    /// Append the charted channels of a decoded record
    pub fn append_record(&self, record: &TelemetryRecord) -> u64 {
        self.append(HistorySample::from_record(record))
    }

    /// Copy of the window, oldest first
    pub fn snapshot(&self) -> Vec<HistorySample> {
        self.inner.lock().oldest_first().collect()
    }

    /// Most recently appended sample
    pub fn latest(&self) -> Option<HistorySample> {
        self.inner.lock().latest()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Number of samples ever appended
    pub fn total_inserted(&self) -> u64 {
        self.inner.lock().inserted
    }
}
