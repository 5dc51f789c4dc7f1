// Dataset file loader
//
// Reads CSV, Parquet and newline-delimited JSON files into Arrow batches so the
// server can register them as datasets at startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::prelude::{CsvReadOptions, NdJsonReadOptions, ParquetReadOptions, SessionContext};

use super::coordinator::DatasetRegistration;
use super::dataset::DatasetHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Parquet,
    NdJson,
}

impl FileFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .ok_or_else(|| anyhow!("File {} has no extension", path.display()))?;

        match extension.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "parquet" => Ok(FileFormat::Parquet),
            "json" | "jsonl" | "ndjson" => Ok(FileFormat::NdJson),
            other => Err(anyhow!("Unsupported dataset file extension: .{}", other)),
        }
    }
}

/// A named dataset file
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSource {
    pub name: String,
    pub path: PathBuf,
    pub format: FileFormat,
}

impl DatasetSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = FileFormat::from_path(&path)?;
        Ok(Self {
            name: name.into(),
            path,
            format,
        })
    }

    /// Parse `name=path` entries separated by commas
    pub fn parse_list(entries: &str) -> Result<Vec<Self>> {
        entries.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (name, path) = entry
                    .split_once('=')
                    .ok_or_else(|| anyhow!("Dataset entry '{}' is not name=path", entry))?;
                Self::new(name.trim(), path.trim())
            })
            .collect()
    }

    /// Read every row of the file
    pub async fn load(&self) -> Result<Vec<RecordBatch>> {
        let ctx = SessionContext::new();
        let path = self
            .path
            .to_str()
            .ok_or_else(|| anyhow!("Path {} is not valid UTF-8", self.path.display()))?;
        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let df = match self.format {
            FileFormat::Csv => {
                ctx.read_csv(path, CsvReadOptions::new().file_extension(&extension))
                    .await
            }
            FileFormat::Parquet => {
                let options = ParquetReadOptions {
                    file_extension: &extension,
                    ..Default::default()
                };
                ctx.read_parquet(path, options).await
            }
            FileFormat::NdJson => {
                ctx.read_json(path, NdJsonReadOptions::default().file_extension(&extension))
                    .await
            }
        }
        .with_context(|| format!("Failed to open dataset '{}' at {}", self.name, path))?;

        let schema = Arc::new(df.schema().as_arrow().clone());
        let mut batches = df
            .collect()
            .await
            .with_context(|| format!("Failed to read dataset '{}'", self.name))?;

        if batches.is_empty() {
            batches.push(RecordBatch::new_empty(schema));
        }

        let rows: usize = batches.iter().map(|batch| batch.num_rows()).sum();
        tracing::info!("Loaded dataset '{}' ({} rows) from {}", self.name, rows, path);

        Ok(batches)
    }

    /// Load the file and wrap it for adapter resolution
    pub async fn into_registration(self) -> Result<DatasetRegistration> {
        let batches = self.load().await?;
        Ok(DatasetRegistration::new(self.name, DatasetHandle::new(batches)))
    }
}
