//! # CSV Telemetry Sink
//!
//! Append-only CSV log of every decoded record while recording is enabled.

use chrono::{Local, NaiveDateTime};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Result, SmartRoomError};
use crate::protocol::encoder::format_reading;
use crate::protocol::telemetry::{TelemetryRecord, CSV_HEADER};

/// Format of the host timestamp in the first column
pub const PC_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Open recording session
struct CsvSession {
    path: PathBuf,
    writer: csv::Writer<Box<dyn Write + Send>>,
    header_written: bool,
    rows: u64,
}

/// CSV recorder with at most one open file
///
/// # Examples
///
/// ```no_run
/// use smartroom_link::protocol::decoder::decode_line;
/// use smartroom_link::telemetry::CsvSink;
///
/// let mut sink = CsvSink::new();
/// sink.start("room.csv")?;
/// if let Some(record) = decode_line("DATA,t=21.5,h=44") {
///     sink.write(&record)?;
/// }
/// sink.stop();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Default)]
pub struct CsvSink {
    session: Option<CsvSession>,
}

impl std::fmt::Debug for CsvSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSink")
            .field("path", &self.path())
            .field("rows", &self.rows_written())
            .finish()
    }
}

impl CsvSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` for appending, closing any previous recording first
    ///
    /// The 11-column header is written only when the file is new or empty,
    /// so re-opening an existing log never duplicates it or truncates rows.
    ///
    /// # Errors
    ///
    /// Returns [`SmartRoomError::Recording`] if the file cannot be opened and
    /// [`SmartRoomError::Csv`] if the header cannot be written
    pub fn start<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.stop();

        let path = path.as_ref().to_path_buf();
        let has_content = fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SmartRoomError::Recording(format!("Failed to open {}: {}", path.display(), e)))?;

        let mut writer = csv_writer(Box::new(file));
        if !has_content {
            writer.write_record(CSV_HEADER)?;
            writer.flush()?;
        }

        info!("Recording telemetry to {}", path.display());
        self.session = Some(CsvSession {
            path,
            writer,
            header_written: !has_content,
            rows: 0,
        });
        Ok(())
    }

    /// Start a session over an arbitrary writer, without a header
    #[cfg(test)]
    pub(crate) fn start_with_writer<P: AsRef<Path>>(&mut self, path: P, writer: Box<dyn Write + Send>) {
        self.stop();
        self.session = Some(CsvSession {
            path: path.as_ref().to_path_buf(),
            writer: csv_writer(writer),
            header_written: false,
            rows: 0,
        });
    }

    /// Append one row stamped with the current local time
    ///
    /// # Errors
    ///
    /// Returns [`SmartRoomError::Recording`] when no recording is open, or the
    /// underlying CSV/I/O error when the row cannot be written
    pub fn write(&mut self, record: &TelemetryRecord) -> Result<()> {
        self.write_at(Local::now().naive_local(), record)
    }

    /// Append one row with an explicit host timestamp; flushed before returning
    pub fn write_at(&mut self, pc_timestamp: NaiveDateTime, record: &TelemetryRecord) -> Result<()> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| SmartRoomError::Recording("no recording in progress".to_string()))?;

        session.writer.write_record(csv_row(pc_timestamp, record))?;
        session.writer.flush()?;
        session.rows += 1;
        Ok(())
    }

    /// Close the current file; a no-op when not recording
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.writer.flush() {
                warn!("Failed to flush {}: {}", session.path.display(), e);
            }
            info!(
                "Stopped recording to {} ({} rows)",
                session.path.display(),
                session.rows
            );
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Path of the open recording
    pub fn path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.path.as_path())
    }

    /// Rows written by the open recording
    pub fn rows_written(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.rows)
    }

    /// Whether the open recording had to write the header itself
    pub fn header_written(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.header_written)
    }
}

fn csv_writer(inner: Box<dyn Write + Send>) -> csv::Writer<Box<dyn Write + Send>> {
    csv::WriterBuilder::new().has_headers(false).from_writer(inner)
}

/// Column values in [`CSV_HEADER`] order
fn csv_row(pc_timestamp: NaiveDateTime, record: &TelemetryRecord) -> [String; 11] {
    [
        pc_timestamp.format(PC_TIMESTAMP_FORMAT).to_string(),
        record.device_time.clone(),
        format_reading(record.temperature_c),
        format_reading(record.humidity_pct),
        record.light_raw.to_string(),
        u8::from(record.led_on).to_string(),
        u8::from(record.buzzer_on).to_string(),
        record.mode.clone(),
        record.interval_ms.to_string(),
        record.night_start_hour.to_string(),
        record.night_end_hour.to_string(),
    ]
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decoder::decode_line;
    use chrono::NaiveDate;
    use super::mocks::FailingFlush;
    use std::fs::File;
    use tempfile::tempdir;

    const HEADER_LINE: &str =
        "pc_timestamp,device_time,temp_c,hum_pct,ldr,led,buzz,mode,interval,night_start,night_end";

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(10, 21, 4)
            .unwrap()
    }

    fn full_record() -> TelemetryRecord {
        decode_line("DATA,t=21.5,h=44,ldr=612,time=10:21:03,mode=AUTO,led=1,buzz=0,int=1000,nst=22,nend=6")
            .unwrap()
    }

    fn count_headers(contents: &str) -> usize {
        contents.lines().filter(|l| *l == HEADER_LINE).count()
    }

    #[test]
    fn test_new_file_gets_header_then_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("room.csv");

        let mut sink = CsvSink::new();
        sink.start(&path).unwrap();
        assert!(sink.is_open());
        assert!(sink.header_written());
        sink.write_at(timestamp(), &full_record()).unwrap();
        sink.stop();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], HEADER_LINE);
        assert_eq!(
            lines[1],
            "2024-05-17 10:21:04,10:21:03,21.5,44.0,612,1,0,AUTO,1000,22,6"
        );
        assert!(contents.ends_with('\n'));
    }

    #[test]
    fn test_sentinels_are_written_as_is() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.csv");

        let mut sink = CsvSink::new();
        sink.start(&path).unwrap();
        sink.write_at(timestamp(), &decode_line("DATA,t=abc,mode=MANUAL").unwrap()).unwrap();
        sink.stop();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents.lines().nth(1).unwrap(),
            "2024-05-17 10:21:04,--:--:--,nan,nan,-1,0,0,MANUAL,0,-1,-1"
        );
    }

    #[test]
    fn test_reopening_existing_file_appends_without_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("room.csv");

        let mut sink = CsvSink::new();
        sink.start(&path).unwrap();
        sink.write_at(timestamp(), &full_record()).unwrap();
        sink.stop();

        sink.start(&path).unwrap();
        assert!(!sink.header_written());
        sink.write_at(timestamp(), &full_record()).unwrap();
        sink.stop();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(count_headers(&contents), 1);
        assert_eq!(contents.lines().count(), 3, "Prior rows must survive re-open");
    }

    #[test]
    fn test_empty_existing_file_gets_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        File::create(&path).unwrap();

        let mut sink = CsvSink::new();
        sink.start(&path).unwrap();
        sink.stop();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().collect::<Vec<_>>(), vec![HEADER_LINE]);
    }

    #[test]
    fn test_foreign_content_is_preserved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.csv");
        fs::write(&path, "existing,row\n").unwrap();

        let mut sink = CsvSink::new();
        sink.start(&path).unwrap();
        sink.write_at(timestamp(), &full_record()).unwrap();
        sink.stop();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("existing,row\n"));
        assert_eq!(count_headers(&contents), 0);
    }

    #[test]
    fn test_rows_flushed_before_stop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("live.csv");

        let mut sink = CsvSink::new();
        sink.start(&path).unwrap();
        sink.write_at(timestamp(), &full_record()).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2, "Row must be on disk while still recording");
        assert_eq!(sink.rows_written(), 1);
    }

    #[test]
    fn test_start_while_open_switches_files() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.csv");
        let second = dir.path().join("b.csv");

        let mut sink = CsvSink::new();
        sink.start(&first).unwrap();
        sink.write_at(timestamp(), &full_record()).unwrap();
        sink.start(&second).unwrap();
        sink.write_at(timestamp(), &full_record()).unwrap();
        assert_eq!(sink.path(), Some(second.as_path()));
        sink.stop();

        assert_eq!(fs::read_to_string(&first).unwrap().lines().count(), 2);
        assert_eq!(fs::read_to_string(&second).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_stop_when_not_started_is_noop() {
        let mut sink = CsvSink::new();
        sink.stop();
        sink.stop();
        assert!(!sink.is_open());
        assert_eq!(sink.path(), None);
    }

    #[test]
    fn test_write_without_session_fails() {
        let mut sink = CsvSink::new();
        match sink.write(&full_record()) {
            Err(SmartRoomError::Recording(_)) => {}
            other => panic!("Expected Recording error, got: {:?}", other),
        }
    }

    #[test]
    fn test_start_on_unwritable_path_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("room.csv");

        let mut sink = CsvSink::new();
        match sink.start(&path) {
            Err(SmartRoomError::Recording(msg)) => assert!(msg.contains("Failed to open")),
            other => panic!("Expected Recording error, got: {:?}", other),
        }
        assert!(!sink.is_open());
    }

    #[test]
    fn test_text_fields_with_commas_are_quoted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quoted.csv");

        let mut record = full_record();
        record.mode = "A,B".to_string();

        let mut sink = CsvSink::new();
        sink.start(&path).unwrap();
        sink.write_at(timestamp(), &record).unwrap();
        sink.stop();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains(",\"A,B\","));
    }

    #[test]
    fn test_write_failure_mid_session_is_reported() {
        let mut sink = CsvSink::new();
        sink.start_with_writer("full.csv", Box::new(FailingFlush));
        assert!(sink.is_open());

        match sink.write_at(timestamp(), &full_record()) {
            Err(SmartRoomError::Io(e)) => assert!(e.to_string().contains("disk full")),
            other => panic!("Expected Io error, got: {:?}", other),
        }
        assert_eq!(sink.rows_written(), 0);

        sink.stop();
        assert!(!sink.is_open());
    }
}
