//! On-disk history format
//!
//! Plain UTF-8 text, one entry per line:
//!
//! ```text
//! # calcd history v1
//! 2026-10-19T08:15:02.183920511Z<TAB>2+2<TAB>4
//! ```
//!
//! Timestamps are RFC 3339 with all sub-second digits kept, and results use
//! the shortest representation that parses back to the same `f64`, so a
//! save followed by a load reproduces every entry exactly. Lines starting
//! with `#` and blank lines are ignored when reading.

use super::HistoryEntry;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

pub const FILE_HEADER: &str = "# calcd history v1";

const FIELD_SEPARATOR: char = '\t';

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("cannot access history file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed history file {} at line {line}: {reason}", .path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

impl HistoryError {
    fn io(path: &Path, source: io::Error) -> Self {
        HistoryError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Atomically replace `path` with `entries`.
///
/// The data goes to a temporary file in the same directory first and is
/// renamed over the target, so readers never see a half-written file.
pub fn write_entries(path: &Path, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| HistoryError::io(path, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write_to(&mut writer, entries).map_err(|e| HistoryError::io(path, e))?;
        writer.flush().map_err(|e| HistoryError::io(path, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| HistoryError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| HistoryError::io(path, e.error))?;

    Ok(())
}

fn write_to(writer: &mut impl Write, entries: &[HistoryEntry]) -> io::Result<()> {
    writeln!(writer, "{}", FILE_HEADER)?;
    for entry in entries {
        writeln!(
            writer,
            "{}{sep}{}{sep}{}",
            entry.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            sanitize(&entry.expression),
            entry.result,
            sep = FIELD_SEPARATOR
        )?;
    }
    Ok(())
}

/// Read every entry from `path`; `Ok(None)` when the file does not exist.
pub fn read_entries(path: &Path) -> Result<Option<Vec<HistoryEntry>>, HistoryError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(HistoryError::io(path, e)),
    };

    let mut entries = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let trimmed = line.trim_end_matches('\r');
        if trimmed.trim().is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let entry = parse_line(trimmed).map_err(|reason| HistoryError::Malformed {
            path: path.to_path_buf(),
            line: index + 1,
            reason,
        })?;
        entries.push(entry);
    }

    Ok(Some(entries))
}

fn parse_line(line: &str) -> Result<HistoryEntry, String> {
    let mut fields = line.splitn(3, FIELD_SEPARATOR);
    let (Some(timestamp), Some(expression), Some(result)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return Err("expected 3 tab-separated fields".to_string());
    };

    let timestamp = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|e| format!("invalid timestamp '{}': {}", timestamp, e))?
        .with_timezone(&Utc);

    let result = result
        .parse::<f64>()
        .map_err(|_| format!("invalid result '{}'", result))?;
    if !result.is_finite() {
        return Err(format!("non-finite result '{}'", result));
    }

    Ok(HistoryEntry {
        timestamp,
        expression: expression.to_string(),
        result,
    })
}

/// Field and line separators must not leak into a stored expression
fn sanitize(expression: &str) -> String {
    expression
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read_is_exact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.dat");
        let entries = vec![
            HistoryEntry::new("2+2", 4.0),
            HistoryEntry::new("1/3", 1.0 / 3.0),
            HistoryEntry::new("0.1+0.2", 0.1 + 0.2),
            HistoryEntry::new("2^70", 2f64.powi(70)),
        ];

        write_entries(&path, &entries).unwrap();
        let loaded = read_entries(&path).unwrap().unwrap();

        assert_eq!(loaded, entries);
    }

    #[test]
    fn test_file_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.dat");
        write_entries(&path, &[HistoryEntry::new("SQRT(16)", 4.0)]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], FILE_HEADER);
        let fields: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1], "SQRT(16)");
        assert_eq!(fields[2], "4");
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_entries(&dir.path().join("nope.dat")).unwrap().is_none());
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.dat");
        fs::write(
            &path,
            "# comment\n\n2026-01-01T00:00:00Z\t1+1\t2\r\n",
        )
        .unwrap();

        let loaded = read_entries(&path).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].expression, "1+1");
        assert_eq!(loaded[0].result, 2.0);
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.dat");
        fs::write(
            &path,
            "# calcd history v1\n2026-01-01T00:00:00Z\t1+1\t2\nnot a record\n",
        )
        .unwrap();

        match read_entries(&path) {
            Err(HistoryError::Malformed { line, .. }) => assert_eq!(line, 3),
            other => panic!("Expected Malformed error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_result_rejected() {
        assert!(parse_line("2026-01-01T00:00:00Z\t1+1\tfour").is_err());
        assert!(parse_line("2026-01-01T00:00:00Z\t1+1\tinf").is_err());
        assert!(parse_line("yesterday\t1+1\t2").is_err());
    }

    #[test]
    fn test_sanitize_tabs() {
        assert_eq!(sanitize("1\t+\n1"), "1 + 1");
    }
}
