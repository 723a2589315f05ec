//! Page index newtype for safe conversion between 0-based indices and
//! lopdf's 1-based page numbers.

use std::fmt;

use crate::error::Error;

/// A validated 0-based page index.
///
/// Page numbers handed to lopdf are 1-based `u32`s; this type centralizes
/// that conversion and the range check against the document's page count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageIndex(u32);

impl PageIndex {
    /// Get the 1-indexed page number lopdf uses as `get_pages()` keys.
    #[must_use]
    pub const fn as_lopdf_page_number(self) -> u32 {
        // try_from_page_num rejects u32::MAX, so this cannot overflow
        self.0 + 1
    }

    /// Try to create a PageIndex from a 0-based page number.
    ///
    /// Returns an error if the page number is outside the document or too
    /// large to be expressed as a lopdf page number.
    pub fn try_from_page_num(page_num: usize, total_pages: usize) -> Result<Self, Error> {
        let invalid = || Error::PdfInvalidPage {
            page: page_num,
            total: total_pages,
        };

        if page_num >= total_pages {
            return Err(invalid());
        }

        let index = u32::try_from(page_num).map_err(|_| invalid())?;
        if index == u32::MAX {
            return Err(invalid());
        }

        Ok(Self(index))
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_page_num_valid() {
        let idx = PageIndex::try_from_page_num(5, 10).unwrap();
        assert_eq!(idx.as_lopdf_page_number(), 6);
    }

    #[test]
    fn test_try_from_page_num_out_of_range() {
        let result = PageIndex::try_from_page_num(10, 5);
        assert!(matches!(result, Err(Error::PdfInvalidPage { page: 10, total: 5 })));
    }

    #[test]
    fn test_display() {
        let idx = PageIndex::try_from_page_num(7, 8).unwrap();
        assert_eq!(format!("{idx}"), "7");
    }

    #[test]
    fn test_as_lopdf_page_number() {
        let idx = PageIndex::try_from_page_num(0, 3).unwrap();
        assert_eq!(idx.as_lopdf_page_number(), 1);

        let idx = PageIndex::try_from_page_num(2, 3).unwrap();
        assert_eq!(idx.as_lopdf_page_number(), 3);
    }
}
