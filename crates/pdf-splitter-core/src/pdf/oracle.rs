use async_trait::async_trait;
use lopdf::Document;
use std::sync::Arc;

use super::document::PdfDocument;
use super::extract::{Compression, serialize_pages};
use crate::error::{Error, Result};
use crate::split::SizeOracle;

/// Measures page subsets of a PDF by serializing them.
///
/// Serialization is CPU-bound and runs on tokio's blocking pool.
pub struct PdfSizeOracle {
    document: Arc<Document>,
    compression: Compression,
}

impl PdfSizeOracle {
    pub fn new(doc: &PdfDocument, compression: Compression) -> Self {
        Self {
            document: doc.document_arc(),
            compression,
        }
    }
}

#[async_trait]
impl SizeOracle for PdfSizeOracle {
    async fn measure(&self, pages: &[usize]) -> Result<u64> {
        let document = Arc::clone(&self.document);
        let pages = pages.to_vec();
        let compression = self.compression;

        let len = tokio::task::spawn_blocking(move || {
            serialize_pages(&document, &pages, compression).map(|bytes| bytes.len())
        })
        .await
        .map_err(|e| Error::Measurement(format!("serialization task failed: {e}")))??;

        Ok(u64::try_from(len).unwrap_or(u64::MAX))
    }

    fn name(&self) -> &'static str {
        "pdf"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pdf::test_support::{create_test_pdf, create_test_pdf_with_padding};
    use crate::split::split;

    #[tokio::test]
    async fn test_measure_matches_serialized_length() {
        let doc = PdfDocument::from_bytes(create_test_pdf(4, 500)).unwrap();
        let oracle = PdfSizeOracle::new(&doc, Compression::Off);

        let measured = oracle.measure(&[1, 2]).await.unwrap();
        let bytes = doc.serialize_pages(&[1, 2], Compression::Off).unwrap();
        assert_eq!(measured, bytes.len() as u64);
    }

    #[tokio::test]
    async fn test_measure_rejects_out_of_range() {
        let doc = PdfDocument::from_bytes(create_test_pdf(2, 0)).unwrap();
        let oracle = PdfSizeOracle::new(&doc, Compression::Off);

        let result = oracle.measure(&[5]).await;
        assert!(matches!(result, Err(Error::PdfInvalidPage { page: 5, total: 2 })));
    }

    #[tokio::test]
    async fn test_split_real_document_respects_ceiling() {
        let doc =
            PdfDocument::from_bytes(create_test_pdf_with_padding(&[4_000, 2_000, 9_000, 500, 500, 3_000]))
                .unwrap();
        let oracle = PdfSizeOracle::new(&doc, Compression::Off);
        let ceiling = 8_000;

        let groups = split(doc.page_count(), ceiling, &oracle).await.unwrap();

        let covered: Vec<usize> = groups.iter().flat_map(|g| g.pages()).collect();
        assert_eq!(covered, (0..6).collect::<Vec<_>>());
        for group in &groups {
            if group.page_count() > 1 {
                assert!(group.size <= ceiling);
            }
        }
        // The 9,000 byte page cannot fit anywhere
        assert!(groups.iter().any(|g| g.oversized && g.start_page == 2));
    }
}
