use std::path::Path;
use std::sync::Arc;

use lopdf::Document;

use super::extract::{Compression, serialize_pages};
use crate::error::{Error, Result};

/// Thread-safe wrapper around a parsed PDF document
#[derive(Clone)]
pub struct PdfDocument {
    /// Parsed object graph, shared with oracles running on blocking threads
    document: Arc<Document>,
    /// The serialized bytes this document was parsed from
    bytes: Arc<Vec<u8>>,
    /// Number of pages
    page_count: usize,
    /// Content-based cache ID (MD5 hex), computed once on load
    cache_id: String,
}

impl PdfDocument {
    /// Open a PDF from bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();

        let document = Document::load_mem(&bytes)
            .map_err(|e| Error::PdfOpen(format!("Failed to parse PDF: {e}")))?;

        let page_count = document.get_pages().len();
        let cache_id = format!("{:x}", md5::compute(&bytes));

        Ok(Self {
            document: Arc::new(document),
            bytes: Arc::new(bytes),
            page_count,
            cache_id,
        })
    }

    /// Open a PDF from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            Error::PdfOpen(format!("Failed to read file {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_bytes(bytes)
    }

    /// Serialize a lopdf document and reopen it.
    ///
    /// Reparsing keeps the in-memory object graph identical to what a reader
    /// of the saved bytes would see.
    pub fn from_document(mut document: Document) -> Result<Self> {
        let mut bytes = Vec::new();
        document
            .save_to(&mut bytes)
            .map_err(|e| Error::PdfSave(e.to_string()))?;
        Self::from_bytes(bytes)
    }

    /// Get number of pages
    pub const fn page_count(&self) -> usize {
        self.page_count
    }

    /// Serialized size in bytes
    pub fn size(&self) -> u64 {
        u64::try_from(self.bytes.len()).unwrap_or(u64::MAX)
    }

    /// Get raw PDF bytes as a slice.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Parsed lopdf document
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Parsed lopdf document as a reference-counted pointer.
    ///
    /// O(1); use when the document has to move onto another thread.
    pub fn document_arc(&self) -> Arc<Document> {
        Arc::clone(&self.document)
    }

    /// Cache key component derived from document content.
    ///
    /// MD5 hash of the PDF bytes, computed once on load.
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    /// Serialize the given 0-based pages (strictly ascending) as a new PDF.
    pub fn serialize_pages(&self, pages: &[usize], compression: Compression) -> Result<Vec<u8>> {
        serialize_pages(&self.document, pages, compression)
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("page_count", &self.page_count)
            .field("bytes_len", &self.bytes.len())
            .field("cache_id", &self.cache_id)
            .finish()
    }
}
