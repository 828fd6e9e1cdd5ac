use std::path::PathBuf;
use thiserror::Error;

/// Failures at the source boundary (spreadsheet service or workbook files).
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("source file not found: {0}")]
    MissingFile(PathBuf),

    #[error("sheet '{sheet}' not found in {path}")]
    MissingSheet { path: PathBuf, sheet: String },

    #[error("workbook read failed: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SourceError {
    /// A missing file or sheet: the section is reported as unavailable
    /// instead of failing the whole export.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            SourceError::MissingFile(_) | SourceError::MissingSheet { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_inputs_are_unavailable() {
        assert!(SourceError::MissingFile(PathBuf::from("store.xlsx")).is_unavailable());
        assert!(SourceError::MissingSheet {
            path: PathBuf::from("store.xlsx"),
            sheet: "Sammary".into(),
        }
        .is_unavailable());
        assert!(!SourceError::Api {
            status: 401,
            body: "unauthorized".into(),
        }
        .is_unavailable());
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!SourceError::from(io).is_unavailable());
    }
}
