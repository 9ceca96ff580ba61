//! Whole-file JSON document repository.
//!
//! # Responsibility
//! - Read and write the desktop shell's single-file data format.
//! - Serve import/export of complete documents.
//!
//! # Invariants
//! - Writes go through a temp file in the same directory and an atomic
//!   rename; readers never observe a half-written file.
//! - Load of a missing or unparsable file yields the default document.

use crate::model::document::{AppDocument, DocumentPatch};
use crate::repo::document_repo::{DocumentRepository, RepoError, RepoResult};
use log::{info, warn};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Repository storing the whole document as one pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileDocumentRepository {
    path: PathBuf,
}

impl JsonFileDocumentRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the file, surfacing every failure.
    ///
    /// Used by import, where a bad file must be reported rather than
    /// silently treated as empty.
    pub fn read_strict(&self) -> RepoResult<AppDocument> {
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Replaces the stored document with `doc`.
    pub fn write_document(&self, doc: &AppDocument) -> RepoResult<()> {
        let encoded = serde_json::to_vec_pretty(doc)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&encoded)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

impl DocumentRepository for JsonFileDocumentRepository {
    fn load(&self) -> AppDocument {
        match self.read_strict() {
            Ok(doc) => {
                info!(
                    "event=doc_load module=repo status=ok backend=json tasks={} history_days={}",
                    doc.tasks.len(),
                    doc.history.len()
                );
                doc
            }
            Err(RepoError::Io(err)) if err.kind() == ErrorKind::NotFound => {
                info!("event=doc_load module=repo status=skip backend=json reason=missing_file");
                AppDocument::default()
            }
            Err(err) => {
                warn!(
                    "event=doc_load module=repo status=error backend=json error_code=unreadable error={}",
                    err
                );
                AppDocument::default()
            }
        }
    }

    fn save(&self, patch: &DocumentPatch) -> RepoResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut doc = self.load();
        doc.apply(patch);
        self.write_document(&doc)?;
        info!(
            "event=doc_save module=repo status=ok backend=json fields={}",
            patch.field_names().join(",")
        );
        Ok(())
    }
}
