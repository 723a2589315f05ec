mod document;
mod extract;
mod merge;
mod oracle;
mod page_index;
#[cfg(test)]
pub(crate) mod test_support;

pub use document::PdfDocument;
pub use extract::{Compression, serialize_pages};
pub use merge::merge_documents;
pub use oracle::PdfSizeOracle;
pub use page_index::PageIndex;
