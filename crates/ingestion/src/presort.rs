//! Chronological presort of raw recordings
//!
//! Stable sort of the data rows by parsed timestamp. The file is only
//! rewritten when it is out of order, through a temp sibling and a rename.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use contracts::{parse_timestamp, MergeError, StreamDescriptor, Timestamp};
use csv::{StringRecord, WriterBuilder};
use tracing::{debug, info, instrument};

use crate::lines::{line_tracking_reader, record_start_line};

/// What `sort_file` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOutcome {
    AlreadySorted { rows: usize },
    Rewritten { rows: usize },
}

/// Sort one recording in place by its timestamp column.
#[instrument(
    name = "presort",
    skip(descriptor),
    fields(stream = %descriptor.name, path = %path.display())
)]
pub fn sort_file(path: &Path, descriptor: &StreamDescriptor) -> Result<SortOutcome, MergeError> {
    let stream = descriptor.name.as_str();
    let csv_err = |e: csv::Error| MergeError::csv(stream, e.to_string());

    let mut reader = line_tracking_reader(File::open(path)?);
    let header = reader.headers().map_err(csv_err)?.clone();
    let index = header
        .iter()
        .position(|h| h.trim() == descriptor.timestamp_column)
        .ok_or_else(|| MergeError::MissingTimestampColumn {
            stream: stream.to_string(),
            source_name: path.display().to_string(),
            column: descriptor.timestamp_column.clone(),
        })?;

    let mut rows: Vec<(Timestamp, StringRecord)> = Vec::new();
    let mut sorted = true;
    let mut record = StringRecord::new();
    while reader.read_record(&mut record).map_err(csv_err)? {
        let line = record_start_line(&mut reader, &record);
        let raw = record.get(index).ok_or(MergeError::ColumnWidthMismatch {
            stream: stream.to_string(),
            line,
            expected: index + 1,
            found: record.len(),
        })?;
        let timestamp = parse_timestamp(raw).ok_or_else(|| MergeError::TimestampParse {
            stream: stream.to_string(),
            line,
            value: raw.to_string(),
        })?;
        if rows.last().is_some_and(|(prev, _)| timestamp < *prev) {
            sorted = false;
        }
        rows.push((timestamp, record.clone()));
    }

    if sorted {
        debug!(rows = rows.len(), "already sorted");
        return Ok(SortOutcome::AlreadySorted { rows: rows.len() });
    }

    rows.sort_by_key(|(timestamp, _)| *timestamp);

    let tmp = temp_sibling(path);
    let write = || -> Result<(), MergeError> {
        let file = BufWriter::new(File::create(&tmp)?);
        let mut writer = WriterBuilder::new().flexible(true).from_writer(file);
        writer.write_record(&header).map_err(csv_err)?;
        for (_, record) in &rows {
            writer.write_record(record).map_err(csv_err)?;
        }
        writer.flush()?;
        Ok(())
    };
    if let Err(e) = write() {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)?;

    info!(rows = rows.len(), "sorted by timestamp");
    Ok(SortOutcome::Rewritten { rows: rows.len() })
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".sorting");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::StreamCatalog;

    fn hr() -> StreamDescriptor {
        StreamCatalog::default().get("HR").unwrap().as_ref().clone()
    }

    #[test]
    fn test_sorts_stably() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S1_HR.csv");
        fs::write(
            &path,
            "timestamp,HR\n\
             2020-01-01 00:00:02,62\n\
             2020-01-01 00:00:00,60\n\
             2020-01-01 00:00:02,63\n\
             2020-01-01 00:00:01,61\n",
        )
        .unwrap();

        assert_eq!(sort_file(&path, &hr()).unwrap(), SortOutcome::Rewritten { rows: 4 });
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "timestamp,HR\n\
             2020-01-01 00:00:00,60\n\
             2020-01-01 00:00:01,61\n\
             2020-01-01 00:00:02,62\n\
             2020-01-01 00:00:02,63\n"
        );
        assert!(!temp_sibling(&path).exists());
    }

    #[test]
    fn test_sorted_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S1_HR.csv");
        // unusual spacing survives because the file is never rewritten
        let original = "timestamp, HR\n2020-01-01 00:00:00,60\n2020-01-01 00:00:01,61";
        fs::write(&path, original).unwrap();
        assert_eq!(sort_file(&path, &hr()).unwrap(), SortOutcome::AlreadySorted { rows: 2 });
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_bad_timestamp_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S1_HR.csv");
        let original = "timestamp,HR\n2020-01-01 00:00:01,61\nsoon,60\n";
        fs::write(&path, original).unwrap();
        let err = sort_file(&path, &hr()).unwrap_err();
        assert!(matches!(err, MergeError::TimestampParse { line: 3, .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_bad_timestamp_line_counts_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S1_HR.csv");
        fs::write(&path, "timestamp,HR\n\n2020-01-01 00:00:01,61\n\nsoon,60\n").unwrap();
        let err = sort_file(&path, &hr()).unwrap_err();
        assert!(matches!(err, MergeError::TimestampParse { line: 5, .. }));
    }
}
