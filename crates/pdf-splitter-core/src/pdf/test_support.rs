//! PDF builders for unit tests.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Content stream showing `label`, padded with `padding` bytes of comment.
fn page_content(label: &str, padding: usize) -> Vec<u8> {
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![100.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(label)]),
            Operation::new("ET", vec![]),
        ],
    };

    let mut bytes = content.encode().unwrap_or_default();
    if padding > 0 {
        bytes.extend_from_slice(b"\n%");
        bytes.extend(std::iter::repeat_n(b'A', padding));
        bytes.push(b'\n');
    }
    bytes
}

fn font_resources(doc: &mut Document) -> ObjectId {
    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
    )]))
}

fn media_box() -> Object {
    Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()])
}

fn finish(mut doc: Document, pages_id: ObjectId, kids: Vec<ObjectId>, count: usize) -> Vec<u8> {
    let mut pages = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids.into_iter().map(Object::Reference).collect())),
        ("Count", Object::Integer(i64::try_from(count).unwrap_or(0))),
    ]);
    if let Ok(Object::Dictionary(existing)) = doc.get_object(pages_id) {
        for (key, value) in existing {
            if !pages.has(key) {
                pages.set(key.clone(), value.clone());
            }
        }
    }
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap_or_default();
    output
}

/// PDF with `num_pages` pages, each padded with `padding` bytes.
pub fn create_test_pdf(num_pages: usize, padding: usize) -> Vec<u8> {
    create_test_pdf_with_padding(&vec![padding; num_pages])
}

/// PDF with one page per entry, page `i` padded with `paddings[i]` bytes.
pub fn create_test_pdf_with_padding(paddings: &[usize]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let resources_id = font_resources(&mut doc);

    let kids = paddings
        .iter()
        .enumerate()
        .map(|(i, &padding)| {
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                page_content(&format!("Page {}", i + 1), padding),
            ));
            doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content_id)),
                ("Resources", Object::Reference(resources_id)),
                ("MediaBox", media_box()),
            ]))
        })
        .collect();

    finish(doc, pages_id, kids, paddings.len())
}

/// PDF whose pages sit under an intermediate Pages node and inherit
/// `Resources` and `MediaBox` from the root.
pub fn create_nested_tree_pdf(num_pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let root_id = doc.new_object_id();
    let middle_id = doc.new_object_id();
    let resources_id = font_resources(&mut doc);

    let kids: Vec<ObjectId> = (0..num_pages)
        .map(|i| {
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                page_content(&format!("Nested {}", i + 1), 0),
            ));
            doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(middle_id)),
                ("Contents", Object::Reference(content_id)),
            ]))
        })
        .collect();

    let middle = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Parent", Object::Reference(root_id)),
        ("Kids", Object::Array(kids.into_iter().map(Object::Reference).collect())),
        ("Count", Object::Integer(i64::try_from(num_pages).unwrap_or(0))),
    ]);
    doc.objects.insert(middle_id, Object::Dictionary(middle));

    doc.objects.insert(
        root_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Resources", Object::Reference(resources_id)),
            ("MediaBox", media_box()),
        ])),
    );

    finish(doc, root_id, vec![middle_id], num_pages)
}

/// PDF whose catalog carries a `/Metadata` stream of `metadata_len` bytes.
pub fn create_test_pdf_with_catalog_metadata(num_pages: usize, metadata_len: usize) -> Vec<u8> {
    let Ok(mut doc) = Document::load_mem(&create_test_pdf(num_pages, 0)) else {
        return Vec::new();
    };

    let metadata_id = doc.add_object(Stream::new(
        Dictionary::from_iter([
            ("Type", Object::Name(b"Metadata".to_vec())),
            ("Subtype", Object::Name(b"XML".to_vec())),
        ]),
        vec![b'm'; metadata_len],
    ));
    if let Ok(catalog) = doc.catalog_mut() {
        catalog.set("Metadata", Object::Reference(metadata_id));
    }

    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap_or_default();
    output
}
