// Output writers. Every file is written to a temporary sibling and renamed
// into place, so a failure never leaves a partial file behind.

use courtstats_core::table::Table;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to encode {path}: {source}")]
    Encode { path: String, source: BoxError },
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

fn write_atomic<F>(path: &Path, encode: F) -> Result<(), OutputError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), BoxError>,
{
    let io_err = |source: std::io::Error| OutputError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp = temp_path(path);
    let result = File::create(&tmp).map_err(io_err).and_then(|file| {
        let mut writer = BufWriter::new(file);
        encode(&mut writer).map_err(|source| OutputError::Encode {
            path: path.display().to_string(),
            source,
        })?;
        writer.flush().map_err(io_err)?;
        writer.get_ref().sync_all().map_err(io_err)
    });

    match result {
        Ok(()) => std::fs::rename(&tmp, path).map_err(io_err),
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            Err(e)
        }
    }
}

/// Write a table as CSV.
pub fn write_table(path: &Path, table: &Table) -> Result<(), OutputError> {
    write_atomic(path, |w| table.to_writer(w).map_err(BoxError::from))
}

/// Write serializable records as CSV with a header row.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<(), OutputError> {
    write_atomic(path, |w| {
        let mut writer = csv::Writer::from_writer(w);
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    })
}

/// Write a value as pretty-printed JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), OutputError> {
    write_atomic(path, |w| {
        serde_json::to_writer_pretty(&mut *w, value)?;
        w.write_all(b"\n")?;
        Ok(())
    })
}
