//! On-disk index snapshot
//!
//! A snapshot directory holds three positionally aligned files:
//! `manifest.json`, `embeddings.bin` (row-major little-endian f32) and
//! `documents.json` (records without embeddings).

use super::{DocumentIndex, IndexOptions};
use crate::error::{MedRagError, Result};
use crate::types::{DocumentMetadata, DocumentRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
const EMBEDDINGS_FILE: &str = "embeddings.bin";
const DOCUMENTS_FILE: &str = "documents.json";

/// Snapshot header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub dimension: usize,
    pub count: usize,
    /// blake3 hex digest of `embeddings.bin`
    pub checksum: String,
    pub built_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct StoredDocumentRef<'a> {
    id: &'a str,
    domain: &'a str,
    text: &'a str,
    metadata: &'a DocumentMetadata,
}

#[derive(Deserialize)]
struct StoredDocument {
    id: String,
    domain: String,
    text: String,
    #[serde(default)]
    metadata: DocumentMetadata,
}

fn load_err(path: &Path, what: impl std::fmt::Display) -> MedRagError {
    MedRagError::IndexLoad(format!("{}: {}", path.display(), what))
}

impl DocumentIndex {
    /// Persist the index into `dir`, creating it if needed
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        let mut matrix = Vec::with_capacity(self.records.len() * self.dimension * 4);
        for record in &self.records {
            for value in &record.embedding {
                matrix.extend_from_slice(&value.to_le_bytes());
            }
        }

        let documents: Vec<StoredDocumentRef<'_>> = self
            .records
            .iter()
            .map(|r| StoredDocumentRef {
                id: &r.id,
                domain: &r.domain,
                text: &r.text,
                metadata: &r.metadata,
            })
            .collect();

        let manifest = IndexManifest {
            format_version: SNAPSHOT_FORMAT_VERSION,
            dimension: self.dimension,
            count: self.records.len(),
            checksum: blake3::hash(&matrix).to_hex().to_string(),
            built_at: Utc::now(),
        };

        fs::write(dir.join(EMBEDDINGS_FILE), &matrix)?;
        fs::write(dir.join(DOCUMENTS_FILE), serde_json::to_vec(&documents)?)?;
        // Manifest last, so a partial write never looks like a valid snapshot
        fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest)?,
        )?;

        tracing::info!(
            "Saved index snapshot to {}: {} records",
            dir.display(),
            manifest.count
        );
        Ok(())
    }

    /// Load a snapshot with default options
    pub fn load(dir: &Path) -> Result<Self> {
        Self::load_with(dir, IndexOptions::default())
    }

    pub fn load_with(dir: &Path, options: IndexOptions) -> Result<Self> {
        let (index, _) = Self::load_inner(dir, None, options)?;
        Ok(index)
    }

    /// Load and require a specific dimensionality, e.g. the active encoder's
    pub fn load_with_dimension(
        dir: &Path,
        expected_dimension: usize,
        options: IndexOptions,
    ) -> Result<Self> {
        let (index, _) = Self::load_inner(dir, Some(expected_dimension), options)?;
        Ok(index)
    }

    /// Read only the manifest of a snapshot
    pub fn read_manifest(dir: &Path) -> Result<IndexManifest> {
        let path = dir.join(MANIFEST_FILE);
        let bytes = fs::read(&path).map_err(|e| load_err(&path, e))?;
        let manifest: IndexManifest =
            serde_json::from_slice(&bytes).map_err(|e| load_err(&path, e))?;
        if manifest.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(load_err(
                &path,
                format!(
                    "unsupported format version {} (expected {})",
                    manifest.format_version, SNAPSHOT_FORMAT_VERSION
                ),
            ));
        }
        Ok(manifest)
    }

    fn load_inner(
        dir: &Path,
        expected_dimension: Option<usize>,
        options: IndexOptions,
    ) -> Result<(Self, IndexManifest)> {
        let manifest = Self::read_manifest(dir)?;

        if let Some(expected) = expected_dimension {
            if manifest.dimension != expected {
                return Err(load_err(
                    dir,
                    format!(
                        "snapshot dimension {} does not match expected {}",
                        manifest.dimension, expected
                    ),
                ));
            }
        }

        let emb_path = dir.join(EMBEDDINGS_FILE);
        let matrix = fs::read(&emb_path).map_err(|e| load_err(&emb_path, e))?;
        let row_bytes = manifest
            .dimension
            .checked_mul(4)
            .ok_or_else(|| load_err(dir, "manifest dimension out of range"))?;
        let expected_len = manifest
            .count
            .checked_mul(row_bytes)
            .ok_or_else(|| load_err(dir, "manifest count out of range"))?;
        if matrix.len() != expected_len {
            return Err(load_err(
                &emb_path,
                format!("expected {} bytes, found {}", expected_len, matrix.len()),
            ));
        }
        let checksum = blake3::hash(&matrix).to_hex().to_string();
        if checksum != manifest.checksum {
            return Err(load_err(&emb_path, "checksum mismatch"));
        }

        let doc_path = dir.join(DOCUMENTS_FILE);
        let bytes = fs::read(&doc_path).map_err(|e| load_err(&doc_path, e))?;
        let documents: Vec<StoredDocument> =
            serde_json::from_slice(&bytes).map_err(|e| load_err(&doc_path, e))?;
        if documents.len() != manifest.count {
            return Err(load_err(
                &doc_path,
                format!(
                    "{} documents for {} embedding rows",
                    documents.len(),
                    manifest.count
                ),
            ));
        }

        let records: Vec<DocumentRecord> = documents
            .into_iter()
            .enumerate()
            .map(|(row, doc)| {
                let start = row * row_bytes;
                let embedding = matrix[start..start + row_bytes]
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect();
                DocumentRecord {
                    id: doc.id,
                    domain: doc.domain,
                    text: doc.text,
                    embedding,
                    metadata: doc.metadata,
                }
            })
            .collect();

        let index = Self::assemble(manifest.dimension, records, options)?;
        tracing::info!(
            "Loaded index snapshot from {}: {} records, dimension {}",
            dir.display(),
            index.len(),
            index.dimension()
        );
        Ok((index, manifest))
    }
}
