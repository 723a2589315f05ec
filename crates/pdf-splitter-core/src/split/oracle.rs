use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// Measures the serialized size of a page subset.
///
/// Implementations must be deterministic for a fixed source document and
/// free of side effects; the splitter calls them many times with candidate
/// page runs and relies on larger runs never measuring smaller than their
/// prefixes.
#[async_trait]
pub trait SizeOracle: Send + Sync {
    /// Byte size of a document containing exactly `pages`, in that order.
    async fn measure(&self, pages: &[usize]) -> Result<u64>;

    /// Short label used in logs
    fn name(&self) -> &'static str {
        "oracle"
    }
}

#[async_trait]
impl<T: SizeOracle + ?Sized> SizeOracle for Arc<T> {
    async fn measure(&self, pages: &[usize]) -> Result<u64> {
        (**self).measure(pages).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Oracle backed by a synchronous closure.
pub struct FnOracle<F> {
    measure: F,
}

impl<F> FnOracle<F>
where
    F: Fn(&[usize]) -> Result<u64> + Send + Sync,
{
    pub const fn new(measure: F) -> Self {
        Self { measure }
    }
}

#[async_trait]
impl<F> SizeOracle for FnOracle<F>
where
    F: Fn(&[usize]) -> Result<u64> + Send + Sync,
{
    async fn measure(&self, pages: &[usize]) -> Result<u64> {
        (self.measure)(pages)
    }

    fn name(&self) -> &'static str {
        "fn"
    }
}

/// Wrap a closure as a [`SizeOracle`].
pub const fn oracle_fn<F>(measure: F) -> FnOracle<F>
where
    F: Fn(&[usize]) -> Result<u64> + Send + Sync,
{
    FnOracle::new(measure)
}
