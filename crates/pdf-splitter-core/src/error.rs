use std::time::Duration;

use thiserror::Error;

/// Unified error type for pdf-splitter-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Splitting (invalid input, unmeasurable pages, cancellation, timeouts)
/// - PDF operations (opening, merging, extracting, saving)
/// - Merge session handling
/// - Configuration operations (loading, validation)
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Split Errors
    // ==========================================================================
    /// Caller passed an argument the operation cannot work with
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Even a single page could not be measured
    #[error("page {page} could not be measured: {reason}")]
    UnmeasurablePage { page: usize, reason: String },

    /// The size oracle failed to measure a candidate page set
    #[error("size measurement failed: {0}")]
    Measurement(String),

    /// Split was cancelled between oracle calls
    #[error("split cancelled")]
    SplitCancelled,

    /// Split did not finish within the caller's deadline
    #[error("split timed out after {0:?}")]
    SplitTimeout(Duration),

    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Failed to open or parse a PDF file
    #[error("failed to open PDF: {0}")]
    PdfOpen(String),

    /// Invalid page number requested
    #[error("invalid page number {page} (document has {total} pages)")]
    PdfInvalidPage { page: usize, total: usize },

    /// Failed to merge source documents
    #[error("failed to merge PDFs: {0}")]
    PdfMerge(String),

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    // ==========================================================================
    // Session Errors
    // ==========================================================================
    /// Merge requested with no files selected
    #[error("no input files selected")]
    NoInputFiles,

    /// File removal index outside the selection
    #[error("file index {index} out of range ({len} files selected)")]
    FileIndexOutOfRange { index: usize, len: usize },

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
