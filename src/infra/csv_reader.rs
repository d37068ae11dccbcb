use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::app::ports::RowReaderPort;
use crate::domain::{Dataset, Row, Schema, Value};
use crate::error::{PipelineError, Result};

/// File-based implementation of RowReaderPort.
/// Reads a delimited text file with a header row into the given schema;
/// cells are trimmed and empty cells become explicit Missing markers.
pub struct CsvRowReader {
    path: PathBuf,
    schema: Schema,
}

impl CsvRowReader {
    pub fn new(path: impl Into<PathBuf>, schema: Schema) -> Self {
        Self {
            path: path.into(),
            schema,
        }
    }

    fn load(&self) -> Result<Dataset> {
        let contents = fs::read_to_string(&self.path)?;
        let mut lines = contents.lines();

        let header_line = lines.next().ok_or_else(|| PipelineError::MalformedRow {
            row: 0,
            message: "input file is empty".to_string(),
        })?;
        let header: Vec<String> = parse_line(header_line)
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();

        // Every schema column must be present; extra columns are ignored
        let mut column_index = Vec::with_capacity(self.schema.fields.len());
        for rule in &self.schema.fields {
            let idx = header
                .iter()
                .position(|h| h == &rule.name)
                .ok_or_else(|| PipelineError::MissingColumn(rule.name.clone()))?;
            column_index.push((rule.name.clone(), idx));
        }

        let mut dataset = Dataset::new(self.schema.clone());
        for (line_no, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let cells = parse_line(line);
            if cells.len() > header.len() {
                warn!(
                    row = line_no + 1,
                    cells = cells.len(),
                    "row has more cells than the header; extras ignored"
                );
            }
            let mut row = Row::new();
            for (name, idx) in &column_index {
                let value = cells
                    .get(*idx)
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .map(|c| Value::Text(c.to_string()))
                    .unwrap_or(Value::Missing);
                row.set(name, value);
            }
            dataset.rows.push(row);
        }
        Ok(dataset)
    }
}

#[async_trait]
impl RowReaderPort for CsvRowReader {
    async fn read(&self) -> std::result::Result<Dataset, String> {
        self.load().map_err(|e| e.to_string())
    }
}

/// Split one delimited line into cells, honoring double-quoted fields with
/// `""` escapes
pub(crate) fn parse_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                cells.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    cells.push(current);
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CUSTOMER_SCHEMA;
    use std::io::Write;

    #[test]
    fn test_parse_line_plain_and_quoted() {
        assert_eq!(parse_line("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(
            parse_line(r#"1,"Main St, Apt 4",x"#),
            vec!["1", "Main St, Apt 4", "x"]
        );
        assert_eq!(parse_line(r#""say ""hi""",y"#), vec![r#"say "hi""#, "y"]);
        assert_eq!(parse_line("a,,c"), vec!["a", "", "c"]);
    }

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_reads_rows_into_schema() {
        let file = write_temp(
            "customer_id,first_name,last_name,email,phone,address,date_of_birth,income,account_status,created_date\n\
             1,Patricia,Davis,p@x.com,555-234-5678,123 Main St,1985-03-12,75000,active,2020-01-15\n\
             2,,Smith,,555-999-8888,9 Oak Ave,1990-06-01,52000,inactive,2021-03-02\n",
        );
        let reader = CsvRowReader::new(file.path(), CUSTOMER_SCHEMA.clone());
        let dataset = reader.read().await.unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows[0].text("first_name"), "Patricia");
        assert!(dataset.rows[1].get("first_name").is_missing());
        assert!(dataset.rows[1].get("email").is_missing());
        assert_eq!(dataset.rows[1].text("account_status"), "inactive");
    }

    #[tokio::test]
    async fn test_missing_column_is_an_error() {
        let file = write_temp("customer_id,first_name\n1,Patricia\n");
        let reader = CsvRowReader::new(file.path(), CUSTOMER_SCHEMA.clone());
        let err = reader.read().await.unwrap_err();
        assert!(err.contains("Missing required column"));
    }

    #[tokio::test]
    async fn test_short_rows_pad_with_missing() {
        let file = write_temp(
            "customer_id,first_name,last_name,email,phone,address,date_of_birth,income,account_status,created_date\n\
             1,Patricia\n",
        );
        let reader = CsvRowReader::new(file.path(), CUSTOMER_SCHEMA.clone());
        let dataset = reader.read().await.unwrap();
        assert!(dataset.rows[0].get("phone").is_missing());
    }
}
