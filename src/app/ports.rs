use async_trait::async_trait;

use crate::domain::Dataset;

/// Produces the initial dataset from wherever the raw rows live.
/// The core never reads files itself; this is the collaborator boundary.
#[async_trait]
pub trait RowReaderPort: Send + Sync {
    async fn read(&self) -> Result<Dataset, String>;
}

/// Persists a dataset artifact (cleaned or masked) under a logical name
#[async_trait]
pub trait DatasetWriterPort: Send + Sync {
    async fn write_dataset(&self, name: &str, dataset: &Dataset) -> Result<(), String>;
}

/// Accepts a rendered stage report under a logical name
#[async_trait]
pub trait ReportSinkPort: Send + Sync {
    async fn write_report(&self, name: &str, contents: &str) -> Result<(), String>;
}
