//! Saving exported documents to disk

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::ConsoleError;
use crate::models::{DocumentKind, ExportFilter};
use crate::network::client::ApiClient;

/// Write `bytes` to `dir/name`, creating `dir` if needed
pub async fn save_document(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, ConsoleError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Download `document` and save it under its default file name
pub async fn export_to_dir(
    client: &ApiClient,
    dir: &Path,
    document: DocumentKind,
    filter: &ExportFilter,
) -> Result<PathBuf, ConsoleError> {
    let bytes = client.export_document(document, filter).await?;
    let name = document.file_name(filter, Local::now().date_naive());
    tracing::info!(document = ?document, bytes = bytes.len(), name = %name, "Document downloaded");
    save_document(dir, &name, &bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_document_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("exports");
        let path = save_document(&target, "Teaching_load.xlsx", b"PK\x03\x04").await.unwrap();
        assert_eq!(path, target.join("Teaching_load.xlsx"));
        assert_eq!(std::fs::read(&path).unwrap(), b"PK\x03\x04");
    }

    #[tokio::test]
    async fn test_save_document_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let err = save_document(&blocker, "a.pdf", b"x").await.unwrap_err();
        assert!(matches!(err, ConsoleError::Io(_)));
    }
}
