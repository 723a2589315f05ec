//! Page-order preserving concatenation of PDF documents.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use super::document::PdfDocument;
use super::extract::MAX_TREE_DEPTH;
use crate::error::{Error, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Concatenate the pages of `sources` in order into one document.
///
/// Source page trees are replaced by a single flat Pages node, so inherited
/// attributes are first copied onto each page.
pub fn merge_documents(sources: &[PdfDocument]) -> Result<PdfDocument> {
    if sources.is_empty() {
        return Err(Error::NoInputFiles);
    }

    if sources.len() == 1 {
        return Ok(sources[0].clone());
    }

    let mut max_id: u32 = 1;
    let mut page_objects: Vec<(ObjectId, Object)> = Vec::new();
    let mut other_objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for (i, source) in sources.iter().enumerate() {
        let mut doc = source.document().clone();
        inherit_page_attributes(&mut doc);

        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for page_id in doc.get_pages().into_values() {
            let page = doc.get_object(page_id).map_err(|e| {
                Error::PdfMerge(format!("file {}: missing page object {page_id:?}: {e}", i + 1))
            })?;
            page_objects.push((page_id, page.clone()));
        }

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    other_objects.insert(object_id, object);
                }
            }
        }

        debug!("Collected {} pages after file {}", page_objects.len(), i + 1);
    }

    let mut document = Document::with_version("1.5");
    document.objects.extend(other_objects);
    // Renumbered ids are all below max_id
    document.max_id = max_id;

    let pages_id = document.new_object_id();

    let mut kids = Vec::with_capacity(page_objects.len());
    for (page_id, object) in page_objects {
        let Object::Dictionary(mut page) = object else {
            return Err(Error::PdfMerge(format!("page object {page_id:?} is not a dictionary")));
        };
        page.set("Parent", Object::Reference(pages_id));
        document.objects.insert(page_id, Object::Dictionary(page));
        kids.push(Object::Reference(page_id));
    }

    let page_count = i64::try_from(kids.len())
        .map_err(|_| Error::PdfMerge("too many pages".to_string()))?;

    let pages_dict = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(page_count)),
    ]);
    document.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = document.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    document.trailer.set("Root", Object::Reference(catalog_id));

    // Children of the discarded source catalogs (metadata, forms, name trees)
    let pruned = document.prune_objects();
    debug!("Dropped {} unreachable objects", pruned.len());

    PdfDocument::from_document(document)
}

/// Copy inheritable attributes from ancestor Pages nodes onto every page
/// that does not define them itself.
pub(crate) fn inherit_page_attributes(doc: &mut Document) {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    for page_id in page_ids {
        let inherited: Vec<(&[u8], Object)> = match doc.get_dictionary(page_id) {
            Ok(page) => INHERITABLE_ATTRIBUTES
                .iter()
                .filter(|key| !page.has(key))
                .filter_map(|&key| find_inherited(doc, page, key).map(|value| (key, value)))
                .collect(),
            Err(_) => continue,
        };

        if inherited.is_empty() {
            continue;
        }

        if let Ok(page) = doc.get_dictionary_mut(page_id) {
            for (key, value) in inherited {
                page.set(key.to_vec(), value);
            }
        }
    }
}

fn find_inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    None
}
