//! CSV serialization of frames.

use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::tables::{Frame, TableKind};

use super::StagingError;

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Write `frame` to any writer as CSV with a header row.
pub fn write_frame<W: std::io::Write>(writer: W, frame: &Frame) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(frame.headers())?;
    for row in frame.rows() {
        csv_writer.write_record(row.iter().map(cell))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write `frame` to `<dir>/<kind file name>`, replacing any existing file.
pub fn write_table(dir: &Path, kind: TableKind, frame: &Frame) -> Result<PathBuf, StagingError> {
    std::fs::create_dir_all(dir).map_err(|source| StagingError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(kind.file_name());
    let file = std::fs::File::create(&path).map_err(|source| StagingError::Io {
        path: path.clone(),
        source,
    })?;

    write_frame(file, frame).map_err(|source| StagingError::Csv {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}
