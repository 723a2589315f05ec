//! PDF Splitter Core Library
//!
//! This library provides the core functionality for preparing PDF uploads:
//! - Merging PDF files in order
//! - Splitting a document into contiguous page groups under a byte ceiling
//! - Measuring page subsets through a pluggable size oracle
//! - Memoizing measurements in memory

pub mod cache;
pub mod config;
pub mod error;
pub mod pdf;
pub mod session;
pub mod split;
pub mod util;

pub use cache::{CacheKey, MeasurementCache, MemoizedOracle};
pub use config::{AppConfig, CacheConfig, CompressionMode, OutputConfig, SplitLimits};
pub use error::{Error, Result};
pub use pdf::{Compression, PdfDocument, PdfSizeOracle, merge_documents};
pub use session::{MergeSession, SessionEvent, SessionUpdate, SourceFile};
pub use split::{CancelFlag, FnOracle, Group, SizeOracle, SplitPlan, Splitter, oracle_fn, split};
pub use util::{format_file_size, parse_byte_size};

use tracing::{info, warn};

/// Page bookkeeping for one merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    /// Number of files merged
    pub files: usize,
    /// Sum of the page counts of the input files
    pub uploaded_pages: usize,
    /// Page count of the merged document
    pub merged_pages: usize,
    /// Serialized size of the merged document
    pub merged_size: u64,
}

impl MergeSummary {
    /// Every input page made it into the merged document.
    pub const fn pages_match(&self) -> bool {
        self.uploaded_pages == self.merged_pages
    }
}

/// Merged document with its summary
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub document: PdfDocument,
    pub summary: MergeSummary,
}

/// One serialized output part
#[derive(Debug, Clone)]
pub struct SplitPart {
    pub group: Group,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Result of merging and, when needed, splitting
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub merge: MergeOutcome,
    /// Present only when the merged document exceeded the merge limit
    pub plan: Option<SplitPlan>,
    pub parts: Vec<SplitPart>,
}

/// High-level merge-then-split pipeline
pub struct MergeSplitter {
    config: AppConfig,
    cache: MeasurementCache,
    cancel: CancelFlag,
}

impl MergeSplitter {
    /// Create a pipeline with the given configuration
    pub fn new(config: AppConfig) -> Result<Self> {
        let cache = MeasurementCache::new(&config.cache);
        Self::with_cache(config, cache)
    }

    /// Create with a shared measurement cache
    pub fn with_cache(config: AppConfig, cache: MeasurementCache) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            cache,
            cancel: CancelFlag::new(),
        })
    }

    /// Flag that aborts planning between measurements once set.
    ///
    /// Cancellation is permanent for this pipeline.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Parse the selected files and concatenate their pages in order
    pub fn merge(&self, files: &[SourceFile]) -> Result<MergeOutcome> {
        if files.is_empty() {
            return Err(Error::NoInputFiles);
        }

        let sources = files
            .iter()
            .map(|file| {
                PdfDocument::from_bytes(file.bytes.as_slice())
                    .map_err(|e| Error::PdfOpen(format!("{}: {e}", file.name)))
            })
            .collect::<Result<Vec<_>>>()?;

        let uploaded_pages = sources.iter().map(PdfDocument::page_count).sum();
        let document = merge_documents(&sources)?;

        let summary = MergeSummary {
            files: files.len(),
            uploaded_pages,
            merged_pages: document.page_count(),
            merged_size: document.size(),
        };

        info!(
            "Merged {} files: {} pages, {} bytes",
            summary.files, summary.merged_pages, summary.merged_size
        );
        if !summary.pages_match() {
            warn!(
                "Merged document has {} pages but {} were uploaded",
                summary.merged_pages, summary.uploaded_pages
            );
        }

        Ok(MergeOutcome { document, summary })
    }

    /// Whether the document is above the configured merge limit
    pub fn needs_split(&self, doc: &PdfDocument) -> bool {
        doc.size() > self.config.limits.merge_limit_bytes
    }

    /// Serializer settings shared by planning and part rendering
    pub fn compression(&self) -> Compression {
        Compression::from_mode(
            self.config.limits.compression,
            self.config.limits.effective_ceiling(),
        )
    }

    /// Compute page groups for `doc` under the effective ceiling
    pub async fn plan(&self, doc: &PdfDocument) -> Result<SplitPlan> {
        let ceiling = self.config.limits.effective_ceiling();
        let compression = self.compression();

        // Sizes depend on the serializer settings as well as the content
        let measurement_id = format!("{}:{compression:?}", doc.cache_id());
        let oracle = MemoizedOracle::new(
            PdfSizeOracle::new(doc, compression),
            measurement_id,
            self.cache.clone(),
        );
        let splitter = Splitter::new(ceiling)?.with_cancel_flag(self.cancel.clone());

        info!(
            "Splitting {} pages ({} bytes) into parts of at most {} bytes",
            doc.page_count(),
            doc.size(),
            ceiling
        );

        let groups = match self.config.limits.timeout() {
            Some(timeout) => {
                splitter
                    .split_with_timeout(doc.page_count(), &oracle, timeout)
                    .await?
            }
            None => splitter.split(doc.page_count(), &oracle).await?,
        };

        let plan = SplitPlan::new(doc.page_count(), ceiling, groups);
        for group in plan.oversized() {
            warn!(
                "Part {} (page {}) is {} bytes, above the {} byte ceiling",
                group.index,
                group.start_page + 1,
                group.size,
                ceiling
            );
        }

        Ok(plan)
    }

    /// Serialize every group of `plan` into a part
    pub async fn render_parts(
        &self,
        doc: &PdfDocument,
        plan: &SplitPlan,
        progress_callback: Option<Box<dyn Fn(usize, usize) + Send>>,
    ) -> Result<Vec<SplitPart>> {
        let total = plan.len();
        let compression = self.compression();
        let mut parts = Vec::with_capacity(total);

        for group in plan.groups() {
            let document = doc.document_arc();
            let pages = group.page_indices();

            let bytes = tokio::task::spawn_blocking(move || {
                pdf::serialize_pages(&document, &pages, compression)
            })
            .await
            .map_err(|e| Error::PdfSave(format!("part {} task failed: {e}", group.index)))??;

            parts.push(SplitPart {
                group: group.clone(),
                file_name: self.config.output.part_file_name(group.index),
                bytes,
            });

            if let Some(ref callback) = progress_callback {
                callback(parts.len(), total);
            }
        }

        Ok(parts)
    }

    /// Merge `files`; split the result if it exceeds the merge limit
    pub async fn process(
        &self,
        files: &[SourceFile],
        progress_callback: Option<Box<dyn Fn(usize, usize) + Send>>,
    ) -> Result<ProcessOutcome> {
        let merge = self.merge(files)?;

        if !self.needs_split(&merge.document) {
            info!(
                "Merged document is within the {} byte limit",
                self.config.limits.merge_limit_bytes
            );
            return Ok(ProcessOutcome {
                merge,
                plan: None,
                parts: Vec::new(),
            });
        }

        let plan = self.plan(&merge.document).await?;
        let parts = self
            .render_parts(&merge.document, &plan, progress_callback)
            .await?;

        Ok(ProcessOutcome {
            merge,
            plan: Some(plan),
            parts,
        })
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
