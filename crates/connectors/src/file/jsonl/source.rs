//! Collections exported as extended JSON, one document per line
//! (`mongoexport` output). Each collection lives in `<dir>/<name>.jsonl`
//! or `<dir>/<name>.json`.

use crate::{
    error::SourceError,
    file::error::FileError,
    source::{DocumentCursor, DocumentSource},
};
use async_trait::async_trait;
use model::core::{document::Document, value::Value};
use std::path::{Component, Path, PathBuf};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader, Lines},
};
use tracing::debug;

const EXTENSIONS: &[&str] = &["jsonl", "json"];

#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    directory: PathBuf,
}

impl JsonLinesSource {
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, FileError> {
        let directory = directory.into();
        if !directory.exists() {
            return Err(FileError::NotFound(directory.display().to_string()));
        }
        if !directory.is_dir() {
            return Err(FileError::NotADirectory(directory.display().to_string()));
        }
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Resolves the export file of `collection` inside the directory. Names
    /// that could escape the directory are rejected.
    fn collection_path(&self, collection: &str) -> Result<PathBuf, SourceError> {
        let mut parts = Path::new(collection).components();
        let plain = matches!((parts.next(), parts.next()), (Some(Component::Normal(_)), None));
        if !plain || collection.contains(['/', '\\']) {
            return Err(FileError::InvalidCollectionName(collection.to_string()).into());
        }

        EXTENSIONS
            .iter()
            .map(|ext| self.directory.join(format!("{collection}.{ext}")))
            .find(|p| p.is_file())
            .ok_or_else(|| SourceError::CollectionNotFound(collection.to_string()))
    }
}

#[async_trait]
impl DocumentSource for JsonLinesSource {
    fn name(&self) -> String {
        format!("jsonl:{}", self.directory.display())
    }

    async fn count(&self, collection: &str) -> Result<u64, SourceError> {
        let path = self.collection_path(collection)?;
        let file = File::open(&path).await.map_err(FileError::from)?;
        let mut lines = BufReader::new(file).lines();

        let mut count = 0u64;
        while let Some(line) = lines.next_line().await.map_err(FileError::from)? {
            if !line.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn open_cursor(
        &self,
        collection: &str,
        fetch_size: usize,
    ) -> Result<Box<dyn DocumentCursor>, SourceError> {
        let path = self.collection_path(collection)?;
        let file = File::open(&path).await.map_err(FileError::from)?;
        debug!(collection, path = %path.display(), fetch_size, "Opened JSON lines cursor");

        Ok(Box::new(JsonLinesCursor {
            collection: collection.to_string(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
            fetch_size: fetch_size.max(1),
            exhausted: false,
        }))
    }
}

pub struct JsonLinesCursor {
    collection: String,
    lines: Lines<BufReader<File>>,
    line_no: u64,
    fetch_size: usize,
    exhausted: bool,
}

impl JsonLinesCursor {
    fn decode(&self, line: &str) -> Result<Document, SourceError> {
        let invalid = |reason: String| SourceError::InvalidDocument {
            collection: self.collection.clone(),
            position: self.line_no,
            reason,
        };

        let json: serde_json::Value =
            serde_json::from_str(line).map_err(|e| invalid(e.to_string()))?;
        match Value::from_extended_json(json).map_err(|e| invalid(e.to_string()))? {
            Value::Document(doc) => Ok(doc),
            other => Err(invalid(format!("expected an object, found {}", other.type_name()))),
        }
    }
}

#[async_trait]
impl DocumentCursor for JsonLinesCursor {
    async fn next_chunk(&mut self) -> Result<Option<Vec<Document>>, SourceError> {
        if self.exhausted {
            return Ok(None);
        }

        let mut chunk = Vec::with_capacity(self.fetch_size);
        while chunk.len() < self.fetch_size {
            let Some(line) = self.lines.next_line().await.map_err(FileError::from)? else {
                self.exhausted = true;
                break;
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            chunk.push(self.decode(&line)?);
        }

        if chunk.is_empty() {
            return Ok(None);
        }
        Ok(Some(chunk))
    }
}
