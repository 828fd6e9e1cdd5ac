// src/output.rs

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::info;

/// Generation timestamp for `last_updated`: local time, ISO-8601, microseconds.
pub fn generated_at() -> String {
    Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// Serialize `bundle` to `<dir>/<file_name>` as pretty JSON.
///
/// Written to a hidden tmp file in the same directory and persisted over the
/// target. The tmp file is removed on any failure before that, so a failed
/// run leaves neither a half-written document nor a stray `.tmp` behind.
pub fn write_bundle<T: Serialize>(dir: &Path, file_name: &str, bundle: &T) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating output dir {:?}", dir))?;

    let path = dir.join(file_name);
    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_context(|| format!("creating tmp file in {:?}", dir))?;

    let mut w = BufWriter::new(tmp.as_file_mut());
    serde_json::to_writer_pretty(&mut w, bundle).context("serializing output JSON")?;
    w.write_all(b"\n")?;
    w.flush().with_context(|| format!("flushing {:?}", path))?;
    drop(w);

    tmp.persist(&path)
        .map_err(|e| e.error)
        .with_context(|| format!("renaming tmp file -> {:?}", path))?;

    let size_kb = fs::metadata(&path).map(|m| m.len() as f64 / 1024.0).unwrap_or(0.0);
    info!(path = %path.display(), size_kb = %format!("{size_kb:.1}"), "wrote bundle");
    Ok(path)
}
