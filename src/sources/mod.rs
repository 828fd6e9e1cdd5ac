// src/sources/mod.rs
//
// One module per output bundle: project rows, aggregate, write JSON.

pub mod procurement;
pub mod vendors;
pub mod warehouse;

use tracing::warn;

use crate::error::SourceError;

/// Turn "input not there" into `None` so the caller can skip that section;
/// every other failure still propagates.
pub fn available<T>(result: Result<T, SourceError>, what: &str) -> anyhow::Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_unavailable() => {
            warn!(source = what, error = %e, "input unavailable, section left empty");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
