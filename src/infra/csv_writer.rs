use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

use crate::app::ports::DatasetWriterPort;
use crate::domain::Dataset;
use crate::error::Result;

/// File-based implementation of DatasetWriterPort.
/// Writes a dataset as delimited text with a header row into the output
/// directory.
pub struct CsvDatasetWriter {
    output_dir: PathBuf,
}

impl CsvDatasetWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn write(&self, name: &str, dataset: &Dataset) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(name);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        let mut out = BufWriter::new(file);

        let columns = dataset.schema.field_names();
        let header: Vec<String> = columns.iter().map(|c| escape_cell(c)).collect();
        writeln!(out, "{}", header.join(","))?;
        for row in &dataset.rows {
            let cells: Vec<String> = columns
                .iter()
                .map(|c| escape_cell(&row.get(c).render()))
                .collect();
            writeln!(out, "{}", cells.join(","))?;
        }
        out.flush()?;
        info!(path = %path.display(), rows = dataset.len(), "dataset written");
        Ok(())
    }
}

#[async_trait]
impl DatasetWriterPort for CsvDatasetWriter {
    async fn write_dataset(&self, name: &str, dataset: &Dataset) -> std::result::Result<(), String> {
        self.write(name, dataset).map_err(|e| e.to_string())
    }
}

fn escape_cell(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
