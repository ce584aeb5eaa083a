use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

use crate::domain::{Column, Table};
use crate::error::Result;

/// Serialize a table in the loader's format: header first, then rows in their
/// current order. Unknown dates are written back as their raw text.
#[instrument(skip(table), fields(rows = table.len()))]
pub fn export(table: &Table, delimiter: u8) -> Result<Vec<u8>> {
    let mut wtr = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    wtr.write_record(Column::headers())?;
    for record in table.records() {
        wtr.write_record(Column::ALL.iter().map(|c| record.cell(*c)))?;
    }

    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    info!("Serialized {} rows ({} bytes)", table.len(), bytes.len());
    Ok(bytes)
}

/// Write `bytes` to a sibling temp file and rename it over `path`, so readers
/// never see a half-written file.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_path(path);
    let result = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    Ok(result?)
}

/// Hex SHA-256 of exported bytes, recorded in the run report
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}
