//! Serialization of page subsets.
//!
//! The same routine backs both size measurement and part writing, so a part
//! written to disk is byte-for-byte the document that was measured.

use std::collections::BTreeSet;

use lopdf::{Document, Object, ObjectId};

use super::page_index::PageIndex;
use crate::config::CompressionMode;
use crate::error::{Error, Result};

/// Page trees deeper than this are treated as malformed (or cyclic).
pub(crate) const MAX_TREE_DEPTH: usize = 64;

/// How streams are encoded when serializing a page subset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    /// Keep streams as they are
    #[default]
    Off,
    /// Compress all streams
    Always,
    /// Save plainly; if that exceeds `threshold` bytes, compress and keep
    /// whichever output is smaller
    Fallback { threshold: u64 },
}

impl Compression {
    /// Resolve a configured mode against the split ceiling.
    pub const fn from_mode(mode: CompressionMode, ceiling: u64) -> Self {
        match mode {
            CompressionMode::Off => Self::Off,
            CompressionMode::Always => Self::Always,
            CompressionMode::Fallback => Self::Fallback { threshold: ceiling },
        }
    }
}

/// Serialize a new PDF holding exactly `pages` (0-based, strictly ascending).
pub fn serialize_pages(doc: &Document, pages: &[usize], compression: Compression) -> Result<Vec<u8>> {
    let mut subset = subset_document(doc, pages)?;

    match compression {
        Compression::Off => save(&mut subset),
        Compression::Always => {
            subset.compress();
            save(&mut subset)
        }
        Compression::Fallback { threshold } => {
            let plain = save(&mut subset)?;
            if byte_len(&plain) <= threshold {
                return Ok(plain);
            }

            subset.compress();
            let compressed = save(&mut subset)?;
            Ok(if compressed.len() < plain.len() {
                compressed
            } else {
                plain
            })
        }
    }
}

/// Copy of `doc` with every page outside `pages` removed.
fn subset_document(doc: &Document, pages: &[usize]) -> Result<Document> {
    if pages.is_empty() {
        return Err(Error::InvalidArgument("no pages requested".to_string()));
    }

    let page_map = doc.get_pages();
    let total = page_map.len();

    let mut keep = BTreeSet::new();
    let mut previous: Option<usize> = None;
    for &page in pages {
        let index = PageIndex::try_from_page_num(page, total)?;
        if previous.is_some_and(|p| page <= p) {
            return Err(Error::InvalidArgument(format!(
                "pages must be strictly ascending, got {page} after {}",
                previous.unwrap_or_default()
            )));
        }
        previous = Some(page);
        keep.insert(index.as_lopdf_page_number());
    }

    let delete: Vec<u32> = page_map
        .keys()
        .copied()
        .filter(|number| !keep.contains(number))
        .collect();

    let mut subset = doc.clone();
    if !delete.is_empty() {
        subset.delete_pages(&delete);
    }
    subset.prune_objects();
    refresh_page_counts(&mut subset)?;

    Ok(subset)
}

/// Recompute `/Count` on every node of the page tree.
pub(crate) fn refresh_page_counts(doc: &mut Document) -> Result<()> {
    let root = doc
        .catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| Error::Lopdf(format!("missing page tree root: {e}")))?;

    count_subtree(doc, root, 0)?;
    Ok(())
}

fn count_subtree(doc: &mut Document, node: ObjectId, depth: usize) -> Result<i64> {
    if depth > MAX_TREE_DEPTH {
        return Err(Error::Lopdf("page tree too deep".to_string()));
    }

    let kids: Vec<ObjectId> = match doc.get_dictionary(node).map(|dict| dict.get(b"Kids")) {
        Ok(Ok(Object::Array(kids))) => kids.iter().filter_map(|kid| kid.as_reference().ok()).collect(),
        // Leaf: a page
        Ok(_) => return Ok(1),
        // Dangling kid
        Err(_) => return Ok(0),
    };

    let mut total = 0;
    for kid in kids {
        total += count_subtree(doc, kid, depth + 1)?;
    }

    if let Ok(dict) = doc.get_dictionary_mut(node) {
        dict.set("Count", total);
    }
    Ok(total)
}

fn save(doc: &mut Document) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| Error::PdfSave(e.to_string()))?;
    Ok(buffer)
}

fn byte_len(bytes: &[u8]) -> u64 {
    u64::try_from(bytes.len()).unwrap_or(u64::MAX)
}
