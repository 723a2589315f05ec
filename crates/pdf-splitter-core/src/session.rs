//! File selection state for one merge.
//!
//! Front ends translate user actions (picking files, dropping files,
//! removing an entry, starting over) into [`SessionEvent`]s; the session
//! keeps the ordered selection and reports what changed.

use std::path::Path;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Leading bytes of every PDF file.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// A user-selected input file.
#[derive(Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, naming it after the path's file name.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self { name, bytes })
    }

    /// Whether the content starts with a PDF header.
    pub fn is_pdf(&self) -> bool {
        self.bytes.starts_with(PDF_MAGIC)
    }

    pub fn size(&self) -> u64 {
        u64::try_from(self.bytes.len()).unwrap_or(u64::MAX)
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

/// User actions on the selection
#[derive(Debug)]
pub enum SessionEvent {
    /// Files picked or dropped; non-PDF files are ignored
    AddFiles(Vec<SourceFile>),
    /// Remove the file at this position
    RemoveFile(usize),
    /// Start a new merge
    Reset,
}

/// What a handled event changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    FilesAdded {
        accepted: Vec<String>,
        rejected: Vec<String>,
    },
    FileRemoved {
        name: String,
    },
    Cleared,
}

/// Ordered selection of files to merge.
#[derive(Debug, Default)]
pub struct MergeSession {
    files: Vec<SourceFile>,
}

impl MergeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: SessionEvent) -> Result<SessionUpdate> {
        match event {
            SessionEvent::AddFiles(files) => Ok(self.add_files(files)),
            SessionEvent::RemoveFile(index) => self.remove_file(index),
            SessionEvent::Reset => {
                info!("Clearing {} selected files", self.files.len());
                self.files.clear();
                Ok(SessionUpdate::Cleared)
            }
        }
    }

    fn add_files(&mut self, files: Vec<SourceFile>) -> SessionUpdate {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for file in files {
            if file.is_pdf() {
                debug!("Selected {} ({} bytes)", file.name, file.bytes.len());
                accepted.push(file.name.clone());
                self.files.push(file);
            } else {
                debug!("Ignoring non-PDF file {}", file.name);
                rejected.push(file.name);
            }
        }

        SessionUpdate::FilesAdded { accepted, rejected }
    }

    fn remove_file(&mut self, index: usize) -> Result<SessionUpdate> {
        if index >= self.files.len() {
            return Err(Error::FileIndexOutOfRange {
                index,
                len: self.files.len(),
            });
        }

        let file = self.files.remove(index);
        Ok(SessionUpdate::FileRemoved { name: file.name })
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Merging needs at least one file.
    pub fn can_merge(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(SourceFile::size).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pdf(name: &str) -> SourceFile {
        SourceFile::new(name, b"%PDF-1.5\n%%EOF\n".to_vec())
    }

    #[test]
    fn test_add_filters_non_pdf() {
        let mut session = MergeSession::new();
        let update = session
            .handle(SessionEvent::AddFiles(vec![
                pdf("a.pdf"),
                SourceFile::new("notes.txt", b"hello".to_vec()),
                pdf("b.pdf"),
            ]))
            .unwrap();

        assert_eq!(
            update,
            SessionUpdate::FilesAdded {
                accepted: vec!["a.pdf".to_string(), "b.pdf".to_string()],
                rejected: vec!["notes.txt".to_string()],
            }
        );
        assert_eq!(session.len(), 2);
        assert!(session.can_merge());
    }

    #[test]
    fn test_add_appends_in_order() {
        let mut session = MergeSession::new();
        session.handle(SessionEvent::AddFiles(vec![pdf("1.pdf")])).unwrap();
        session.handle(SessionEvent::AddFiles(vec![pdf("2.pdf"), pdf("3.pdf")])).unwrap();

        let names: Vec<_> = session.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["1.pdf", "2.pdf", "3.pdf"]);
    }

    #[test]
    fn test_remove_file() {
        let mut session = MergeSession::new();
        session
            .handle(SessionEvent::AddFiles(vec![pdf("a.pdf"), pdf("b.pdf")]))
            .unwrap();

        let update = session.handle(SessionEvent::RemoveFile(0)).unwrap();
        assert_eq!(update, SessionUpdate::FileRemoved { name: "a.pdf".to_string() });
        assert_eq!(session.files()[0].name, "b.pdf");
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut session = MergeSession::new();
        session.handle(SessionEvent::AddFiles(vec![pdf("a.pdf")])).unwrap();

        let result = session.handle(SessionEvent::RemoveFile(3));
        assert!(matches!(result, Err(Error::FileIndexOutOfRange { index: 3, len: 1 })));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_reset_clears_selection() {
        let mut session = MergeSession::new();
        session.handle(SessionEvent::AddFiles(vec![pdf("a.pdf")])).unwrap();

        assert_eq!(session.handle(SessionEvent::Reset).unwrap(), SessionUpdate::Cleared);
        assert!(session.is_empty());
        assert!(!session.can_merge());
    }

    #[test]
    fn test_from_path_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        std::fs::write(&path, b"%PDF-1.7\n").unwrap();

        let file = SourceFile::from_path(&path).unwrap();
        assert_eq!(file.name, "scan.pdf");
        assert!(file.is_pdf());
        assert_eq!(file.size(), 9);
    }
}
