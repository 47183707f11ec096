//! Upload of staged CSV files.

use object_store::{ObjectStore, PutPayload};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

use crate::metrics;
use crate::tables::TableKind;

use super::store::object_key;

/// A staged file waiting to be uploaded.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub kind: TableKind,
    pub path: PathBuf,
}

/// The upload that stopped the batch.
#[derive(Debug, Clone, Serialize)]
pub struct UploadFailure {
    pub kind: TableKind,
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of uploading a batch of staged files.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadReport {
    /// Object keys written, in upload order.
    pub uploaded: Vec<String>,
    /// Set when an upload failed; later files were not attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<UploadFailure>,
}

impl UploadReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Upload `files` under `prefix`, in order.
///
/// The first failure is logged and stops the batch, but is not returned as
/// an error: callers inspect the report instead.
pub async fn upload_tables(
    store: &dyn ObjectStore,
    prefix: &str,
    files: &[StagedFile],
) -> UploadReport {
    let mut report = UploadReport::default();

    for file in files {
        let key = object_key(prefix, &file.kind.file_name());

        let result = match tokio::fs::read(&file.path).await {
            Ok(bytes) => store
                .put(&key, PutPayload::from(bytes))
                .await
                .map(|_| ())
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(()) => {
                info!(
                    file = %file.path.display(),
                    key = %key,
                    "File: {} loaded successfully to object store",
                    file.path.display()
                );
                metrics::UPLOADS.with_label_values(&["success"]).inc();
                report.uploaded.push(key.to_string());
            }
            Err(e) => {
                error!(file = %file.path.display(), key = %key, "Error loading files: {}", e);
                metrics::UPLOADS.with_label_values(&["failure"]).inc();
                report.failure = Some(UploadFailure {
                    kind: file.kind,
                    path: file.path.clone(),
                    error: e,
                });
                break;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use tempfile::TempDir;

    fn stage(dir: &TempDir, kind: TableKind, body: &str) -> StagedFile {
        let path = dir.path().join(kind.file_name());
        std::fs::write(&path, body).unwrap();
        StagedFile { kind, path }
    }

    #[tokio::test]
    async fn test_uploads_under_prefix() {
        let dir = TempDir::new().unwrap();
        let store = InMemory::new();
        let files = vec![
            stage(&dir, TableKind::FactPlayerStats, "a\n"),
            stage(&dir, TableKind::DimTeams, "b\n"),
        ];

        let report = upload_tables(&store, "raw", &files).await;
        assert!(report.is_complete());
        assert_eq!(
            report.uploaded,
            vec!["raw/fact_nba_player_stats.csv", "raw/dim_nba_teams.csv"]
        );

        let body = store
            .get(&object_key("raw", "dim_nba_teams.csv"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(&body[..], b"b\n");
    }

    #[tokio::test]
    async fn test_failure_stops_batch_without_error() {
        let dir = TempDir::new().unwrap();
        let store = InMemory::new();
        let files = vec![
            stage(&dir, TableKind::FactPlayerStats, "a\n"),
            StagedFile {
                kind: TableKind::DimPlayers,
                path: dir.path().join("missing.csv"),
            },
            stage(&dir, TableKind::DimTeams, "b\n"),
        ];

        let report = upload_tables(&store, "raw", &files).await;
        assert_eq!(report.uploaded, vec!["raw/fact_nba_player_stats.csv"]);
        let failure = report.failure.unwrap();
        assert_eq!(failure.kind, TableKind::DimPlayers);
        assert!(store
            .head(&object_key("raw", "dim_nba_teams.csv"))
            .await
            .is_err());
    }
}
