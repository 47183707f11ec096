//! Object store construction for the staging bucket.

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::{ObjectStore, RetryConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};

use super::StagingError;

fn create_retry_config() -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        backoff: object_store::BackoffConfig {
            init_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
            base: 2.0,
        },
        retry_timeout: Duration::from_secs(120),
    }
}

/// Create the store selected by `config`.
///
/// S3 credentials come from the usual AWS environment chain
/// (AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_REGION, ...).
pub fn create_object_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StagingError> {
    match config.backend {
        StorageBackend::S3 => {
            info!(bucket = %config.bucket, "Creating S3 object store");
            let mut builder = AmazonS3Builder::from_env()
                .with_bucket_name(&config.bucket)
                .with_retry(create_retry_config());
            if let Some(region) = &config.region {
                builder = builder.with_region(region);
            }
            Ok(Arc::new(builder.build()?))
        }
        StorageBackend::Local => {
            let root = &config.local_root;
            std::fs::create_dir_all(root).map_err(|source| StagingError::Io {
                path: root.clone(),
                source,
            })?;
            info!(root = %root.display(), "Creating local object store");
            Ok(Arc::new(LocalFileSystem::new_with_prefix(root)?))
        }
    }
}

/// Object key for a staged file, e.g. `raw/dim_nba_teams.csv`.
pub fn object_key(prefix: &str, file_name: &str) -> object_store::path::Path {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        object_store::path::Path::from(file_name)
    } else {
        object_store::path::Path::from(format!("{}/{}", prefix, file_name))
    }
}
