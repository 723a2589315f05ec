/// Cache key for size measurements.
///
/// Keys are opaque MD5 hashes of the document id and the ordered page list,
/// so the same pages of the same document always map to the same key and
/// measurements of different documents never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: String,
}

impl CacheKey {
    pub fn new(doc_id: impl AsRef<str>, pages: &[usize]) -> Self {
        // Null byte between id and pages, commas between pages: ("a", [1, 2])
        // and ("a1", [2]) must not produce the same input.
        let page_list = pages
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let combined = format!("{}\0{}", doc_id.as_ref(), page_list);

        Self {
            hash: format!("{:x}", md5::compute(combined.as_bytes())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}
