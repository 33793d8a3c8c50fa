//! CSV Mirror - on-disk copy of the history log
//!
//! The whole log is rewritten after every appending pipeline run: written
//! to a sibling temp file, then renamed over the target so readers never
//! see a half-written file.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, NaiveDateTime, TimeZone};

use crate::constants::TIMESTAMP_FORMAT;
use crate::logic::history::{Delivery, LogRecord};
use crate::logic::labels::LabelKind;

pub const CSV_HEADER: &str = "ts,temperature,humidity,light,raw_light,edge_label,label,command";
const COLUMN_COUNT: usize = 8;

pub struct CsvMirror {
    path: PathBuf,
}

impl CsvMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file with `records`
    pub fn write_snapshot<'a>(&self, records: impl IntoIterator<Item = &'a LogRecord>) -> io::Result<usize> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.temp_path();
        let count = {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            let count = write_csv(&mut writer, records)?;
            writer.flush()?;
            count
        };

        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(count)
    }

    /// Best-effort snapshot; failures are logged and swallowed
    pub fn mirror<'a>(&self, records: impl IntoIterator<Item = &'a LogRecord>) {
        match self.write_snapshot(records) {
            Ok(count) => log::debug!("Mirrored {} records to {}", count, self.path.display()),
            Err(e) => log::warn!("CSV mirror write to {} failed: {}", self.path.display(), e),
        }
    }

    /// Read records back. A missing file is an empty history; rows that do
    /// not parse are skipped.
    pub fn load(&self, offset: FixedOffset) -> io::Result<Vec<LogRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() || (line_no == 0 && line.starts_with("ts,")) {
                continue;
            }
            match parse_row(line, offset, records.len() as u64 + 1) {
                Some(record) => records.push(record),
                None => {
                    skipped += 1;
                    log::debug!("Skipping CSV line {}: {:?}", line_no + 1, line);
                }
            }
        }

        if skipped > 0 {
            log::warn!("Skipped {} unreadable rows in {}", skipped, self.path.display());
        }
        Ok(records)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

// ============================================================================
// FORMAT
// ============================================================================

/// Write header and rows, returns the row count
pub fn write_csv<'a, W: Write>(
    writer: &mut W,
    records: impl IntoIterator<Item = &'a LogRecord>,
) -> io::Result<usize> {
    writeln!(writer, "{}", CSV_HEADER)?;

    let mut count = 0;
    for record in records {
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{}",
            record.timestamp.format(TIMESTAMP_FORMAT),
            number_cell(record.temperature),
            number_cell(record.humidity),
            number_cell(record.light),
            number_cell(record.raw_light),
            quote(record.edge_label.as_deref().unwrap_or("")),
            record.label.as_str(),
            quote(&record.command),
        )?;
        count += 1;
    }
    Ok(count)
}

/// Render the log as a CSV document
pub fn to_csv_string<'a>(records: impl IntoIterator<Item = &'a LogRecord>) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_csv(&mut buf, records);
    String::from_utf8_lossy(&buf).into_owned()
}

fn number_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn quote(field: &str) -> String {
    let field = field.replace(['\r', '\n'], " ");
    if field.contains([',', '"']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field
    }
}

/// Split one line, honoring double-quoted cells
fn split_row(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => cells.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }
    cells.push(cell);
    cells
}

fn parse_row(line: &str, offset: FixedOffset, seq: u64) -> Option<LogRecord> {
    let cells = split_row(line);
    if cells.len() != COLUMN_COUNT {
        return None;
    }

    let naive = NaiveDateTime::parse_from_str(cells[0].trim(), TIMESTAMP_FORMAT).ok()?;
    let timestamp = offset.from_local_datetime(&naive).single()?;

    let number = |cell: &str| -> Option<Option<f64>> {
        let cell = cell.trim();
        if cell.is_empty() {
            return Some(None);
        }
        cell.parse::<f64>().ok().filter(|v| v.is_finite()).map(Some)
    };

    let label = LabelKind::from_name(cells[6].trim()).unwrap_or(LabelKind::Unknown);
    let edge_label = Some(cells[5].trim().to_string()).filter(|s| !s.is_empty());

    Some(LogRecord {
        seq,
        timestamp,
        temperature: number(&cells[1])?,
        humidity: number(&cells[2])?,
        light: number(&cells[3])?,
        raw_light: number(&cells[4])?,
        edge_label,
        label,
        raw_prediction: None,
        confidence: None,
        command: cells[7].trim().to_string(),
        delivery: Delivery::Restored,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn record(seq: u64, edge_label: Option<&str>, temperature: Option<f64>) -> LogRecord {
        LogRecord {
            seq,
            timestamp: tz().with_ymd_and_hms(2024, 5, 1, 12, 0, seq as u32).unwrap(),
            temperature,
            humidity: Some(60.5),
            light: Some(3000.0),
            raw_light: None,
            edge_label: edge_label.map(str::to_string),
            label: LabelKind::Caution,
            raw_prediction: Some("2".to_string()),
            confidence: Some(0.8),
            command: "LED_KUNING".to_string(),
            delivery: Delivery::Sent,
        }
    }

    #[test]
    fn test_snapshot_format() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = CsvMirror::new(dir.path().join("data.csv"));
        let records = vec![record(1, Some("Waspada"), Some(30.0)), record(2, None, None)];

        assert_eq!(mirror.write_snapshot(&records).unwrap(), 2);

        let content = fs::read_to_string(mirror.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "2024-05-01 12:00:01,30,60.5,3000,,Waspada,caution,LED_KUNING");
        assert_eq!(lines[2], "2024-05-01 12:00:02,,60.5,3000,,,caution,LED_KUNING");
        assert!(!dir.path().join("data.csv.tmp").exists());
    }

    #[test]
    fn test_snapshot_replaces_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = CsvMirror::new(dir.path().join("data.csv"));
        mirror.write_snapshot(&vec![record(1, None, Some(1.0)), record(2, None, Some(2.0))]).unwrap();
        mirror.write_snapshot(&vec![record(3, None, Some(3.0))]).unwrap();

        let content = fs::read_to_string(mirror.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_load_restores_records() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = CsvMirror::new(dir.path().join("data.csv"));
        mirror
            .write_snapshot(&vec![record(1, Some("Tidak, Aman \"x\""), Some(30.0)), record(2, None, None)])
            .unwrap();

        let loaded = mirror.load(tz()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].edge_label.as_deref(), Some("Tidak, Aman \"x\""));
        assert_eq!(loaded[0].temperature, Some(30.0));
        assert_eq!(loaded[0].label, LabelKind::Caution);
        assert_eq!(loaded[0].delivery, Delivery::Restored);
        assert_eq!(loaded[0].timestamp, record(1, None, None).timestamp);
        assert_eq!(loaded[1].temperature, None);
        assert_eq!(loaded[1].seq, 2);
    }

    #[test]
    fn test_load_skips_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(
            &path,
            format!(
                "{}\n2024-05-01 12:00:00,25,50,100,,,safe,LED_HIJAU\nnot a row\n\
                 yesterday,25,50,100,,,safe,LED_HIJAU\n2024-05-01 12:00:05,abc,50,100,,,safe,X\n",
                CSV_HEADER
            ),
        )
        .unwrap();

        let loaded = CsvMirror::new(&path).load(tz()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].label, LabelKind::Safe);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = CsvMirror::new(dir.path().join("none.csv")).load(tz()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_mirror_swallows_errors() {
        let dir = tempfile::tempdir().unwrap();
        // Target is a directory, rename fails
        let mirror = CsvMirror::new(dir.path());
        mirror.mirror(&vec![record(1, None, None)]);
    }

    #[test]
    fn test_split_row_quotes() {
        assert_eq!(split_row("a,\"b,c\",\"d\"\"e\""), vec!["a", "b,c", "d\"e"]);
        assert_eq!(split_row(",,"), vec!["", "", ""]);
    }
}
