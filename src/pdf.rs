//! PDF text extraction collaborator (§6).
//!
//! Out of scope per spec §1 ("PDF byte parsing and page-text extraction... a
//! thin wrapper over a PDF library"); this module defines the narrow trait
//! the rest of the pipeline depends on and a concrete implementation over
//! `oxidize-pdf`, grounded in
//! `examples/other_examples/2333f661_bzsanti-oxidizePdf__examples-ai_pipelines-rag_pipeline.rs.rs`.

use async_trait::async_trait;

use crate::errors::IngestError;

/// Reads page text out of a PDF file. A single page failing to extract
/// yields an empty string for that page rather than aborting the whole
/// document (§6).
#[async_trait]
pub trait PdfLoader: Send + Sync {
    async fn extract_text(&self, path: &str, max_pages: usize) -> Result<String, IngestError>;
}

/// Thin wrapper over `oxidize_pdf::parser::{PdfReader, PdfDocument}`.
pub struct OxidizePdfLoader;

impl OxidizePdfLoader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OxidizePdfLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PdfLoader for OxidizePdfLoader {
    async fn extract_text(&self, path: &str, max_pages: usize) -> Result<String, IngestError> {
        let path = path.to_string();
        tokio::task::spawn_blocking(move || extract_text_blocking(&path, max_pages))
            .await
            .map_err(|e| IngestError::PdfOpen {
                path: String::new(),
                message: format!("extraction task panicked: {e}"),
            })?
    }
}

fn extract_text_blocking(path: &str, max_pages: usize) -> Result<String, IngestError> {
    use oxidize_pdf::parser::{PdfDocument, PdfReader};

    let reader = PdfReader::open(path).map_err(|e| IngestError::PdfOpen {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    let doc = PdfDocument::new(reader);
    let pages = doc.extract_text().map_err(|e| IngestError::PdfOpen {
        path: path.to_string(),
        message: e.to_string(),
    })?;

    let joined = pages
        .into_iter()
        .take(max_pages)
        .map(|page| page.text)
        .collect::<Vec<_>>()
        .join("\n\n");
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePdfLoader;

    #[tokio::test]
    async fn fake_loader_respects_max_pages() {
        let loader = FakePdfLoader {
            pages: vec!["a".into(), "b".into(), "c".into()],
        };
        let text = loader.extract_text("x.pdf", 2).await.unwrap();
        assert_eq!(text, "a\n\nb");
    }
}
