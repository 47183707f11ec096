//! Staging: CSV files on local disk, then object storage.

mod job;
mod store;
mod uploader;
mod writer;

pub use job::{StageJob, StageJobConfig, StageReport};
pub use store::{create_object_store, object_key};
pub use uploader::{upload_tables, StagedFile, UploadFailure, UploadReport};
pub use writer::{write_frame, write_table};

use std::path::PathBuf;
use thiserror::Error;

use crate::stats::StatsError;
use crate::tables::TableError;

/// Errors that stop a staging run.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Stats API error: {0}")]
    Stats(#[from] StatsError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error writing {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Writer for {table} did not complete: {source}")]
    WriteTask {
        table: String,
        #[source]
        source: tokio::task::JoinError,
    },
}
