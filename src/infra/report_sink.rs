use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use crate::app::ports::ReportSinkPort;
use crate::error::Result;

/// File-based implementation of ReportSinkPort.
/// Writes each rendered report as a text file into the output directory.
pub struct FileReportSink {
    output_dir: PathBuf,
}

impl FileReportSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn write(&self, name: &str, contents: &str) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(name);
        std::fs::write(&path, contents)?;
        info!(path = %path.display(), "report written");
        Ok(())
    }
}

#[async_trait]
impl ReportSinkPort for FileReportSink {
    async fn write_report(&self, name: &str, contents: &str) -> std::result::Result<(), String> {
        self.write(name, contents).map_err(|e| e.to_string())
    }
}
