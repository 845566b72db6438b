//! Per-PDF memory store (C4, §4.4).
//!
//! Entries are always appended, including when a query produced no usable
//! evidence, so the system keeps a complete audit trail. Writes are atomic:
//! the full list is serialized to a sibling temp file in the same
//! directory, then renamed over the target, so concurrent readers always
//! see either the old or the new file, never a torn write (§3 invariant 3).

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::clients::embedding::EmbeddingClient;
use crate::errors::MemoryError;
use crate::model::MemoryEntry;
use crate::utils::tokenize::token_overlap_score;

pub struct MemoryStore {
    root: PathBuf,
}

impl MemoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `memories/memory_<basename>_<hash10>.json`, where `hash10` is the
    /// first 10 hex characters of `sha256(abs_path)` (§3 invariant 4).
    pub fn file_for(&self, pdf_path: &str) -> PathBuf {
        let abs = absolute_ish(pdf_path);
        let digest = Sha256::digest(abs.as_bytes());
        let hash10: String = digest.iter().take(5).map(|b| format!("{b:02x}")).collect();
        let basename = Path::new(pdf_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        self.root.join(format!("memory_{basename}_{hash10}.json"))
    }

    pub async fn load(&self, pdf_path: &str) -> Result<Vec<MemoryEntry>, MemoryError> {
        let file = self.file_for(pdf_path);
        match tokio::fs::read(&file).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| MemoryError::Corrupt {
                path: file.display().to_string(),
                source,
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(MemoryError::Read {
                path: file.display().to_string(),
                source: err,
            }),
        }
    }

    pub async fn append(&self, pdf_path: &str, entry: MemoryEntry) -> Result<(), MemoryError> {
        let file = self.file_for(pdf_path);
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| MemoryError::Write {
                    path: file.display().to_string(),
                    source,
                })?;
        }

        let mut entries = self.load(pdf_path).await?;
        entries.push(entry);
        let payload = serde_json::to_vec_pretty(&entries).expect("MemoryEntry always serializes");

        let tmp_path = file.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &payload)
            .await
            .map_err(|source| MemoryError::Write {
                path: tmp_path.display().to_string(),
                source,
            })?;
        tokio::fs::rename(&tmp_path, &file)
            .await
            .map_err(|source| MemoryError::Write {
                path: file.display().to_string(),
                source,
            })?;
        Ok(())
    }

    pub async fn clear(&self, pdf_path: &str) -> Result<(), MemoryError> {
        let file = self.file_for(pdf_path);
        match tokio::fs::remove_file(&file).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(MemoryError::Write {
                path: file.display().to_string(),
                source: err,
            }),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<PathBuf>, MemoryError> {
        let mut paths = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(d) => d,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(paths),
            Err(err) => {
                return Err(MemoryError::Read {
                    path: self.root.display().to_string(),
                    source: err,
                })
            }
        };
        while let Ok(Some(entry)) = dir.next_entry().await {
            paths.push(entry.path());
        }
        Ok(paths)
    }

    /// Ranks entries by cosine similarity of the query embedding against
    /// each entry's stored `embedding`; falls back to token overlap against
    /// the concatenated question+answer text when embeddings are missing
    /// anywhere in the comparison (§4.4).
    pub async fn find_relevant(
        &self,
        query: &str,
        entries: &[MemoryEntry],
        top_k: usize,
        embedding_client: &dyn EmbeddingClient,
    ) -> Vec<MemoryEntry> {
        if entries.is_empty() {
            return Vec::new();
        }

        let query_embedding = embedding_client.embed(query).await;
        let mut scored: Vec<(f32, &MemoryEntry)> = Vec::with_capacity(entries.len());

        match query_embedding {
            Some(qe) if entries.iter().all(|e| e.embedding.is_some()) => {
                for e in entries {
                    let vec = e.embedding.as_ref().unwrap();
                    let candidate = crate::model::Embedding::new(vec.clone(), qe.model_id.clone());
                    scored.push((qe.cosine_similarity(&candidate), e));
                }
            }
            _ => {
                let query_tokens = crate::utils::tokenize::tokenize(query);
                for e in entries {
                    let combined = format!("{} {}", e.question, e.answer);
                    scored.push((token_overlap_score(&query_tokens, &combined), e));
                }
            }
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().take(top_k).map(|(_, e)| e.clone()).collect()
    }
}

/// Best-effort absolute-path normalization without requiring the path to
/// exist on disk (tests use synthetic paths that are never created).
fn absolute_ish(path: &str) -> String {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_string_lossy().to_string()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(p).to_string_lossy().to_string())
            .unwrap_or_else(|_| path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QualityFlag;
    use crate::testing::FakeEmbeddingClient;
    use uuid::Uuid;

    fn sample_entry(question: &str, answer: &str) -> MemoryEntry {
        MemoryEntry {
            id: Uuid::new_v4(),
            timestamp: 0,
            question: question.to_string(),
            answer: answer.to_string(),
            confidence: 0.8,
            flags: Vec::<QualityFlag>::new(),
            provenance: Vec::new(),
            embedding: None,
            model_id: None,
        }
    }

    #[tokio::test]
    async fn append_then_load_round_trips_and_grows_by_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        let pdf = "/docs/annual_report.pdf";

        let before = store.load(pdf).await.unwrap();
        assert_eq!(before.len(), 0);

        let entry = sample_entry("q1", "a1");
        store.append(pdf, entry.clone()).await.unwrap();

        let after = store.load(pdf).await.unwrap();
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(after.last().unwrap().question, "q1");
    }

    #[tokio::test]
    async fn distinct_absolute_paths_never_share_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        let a = store.file_for("/docs/a.pdf");
        let b = store.file_for("/docs/b.pdf");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn find_relevant_falls_back_to_token_overlap_without_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        let entries = vec![
            sample_entry("what was revenue", "revenue was high"),
            sample_entry("weather report", "sunny"),
        ];
        let client = FakeEmbeddingClient::unavailable();
        let top = store.find_relevant("revenue question", &entries, 1, &client).await;
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].question, "what was revenue");
    }

    #[tokio::test]
    async fn clear_removes_file_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        let pdf = "/docs/x.pdf";
        store.append(pdf, sample_entry("q", "a")).await.unwrap();
        store.clear(pdf).await.unwrap();
        assert_eq!(store.load(pdf).await.unwrap().len(), 0);
        // second clear on an already-missing file is not an error
        store.clear(pdf).await.unwrap();
    }
}
