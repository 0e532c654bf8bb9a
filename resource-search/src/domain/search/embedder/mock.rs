//! Mock embedder and provider factory for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::search::traits::{Embedder, ProviderFactory, Result, SearchError};

/// Mock embedder that returns configurable vectors.
///
/// # Examples
///
/// ```ignore
/// // Return a fixed vector
/// let embedder = MockEmbedder::returning(vec![0.1; 384]);
///
/// // Return different vectors for each call
/// let embedder = MockEmbedder::with_sequence(vec![
///     vec![0.1; 384],
///     vec![0.2; 384],
/// ]);
/// ```
#[derive(Clone)]
pub struct MockEmbedder {
    responses: Arc<Vec<Vec<f32>>>,
    call_count: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
    dimensions: usize,
}

impl MockEmbedder {
    /// Create a mock that always returns the same vector.
    pub fn returning(vector: Vec<f32>) -> Self {
        let dims = vector.len();
        Self {
            responses: Arc::new(vec![vector]),
            call_count: Arc::new(AtomicUsize::new(0)),
            failing: Arc::new(AtomicBool::new(false)),
            dimensions: dims,
        }
    }

    /// Create a mock that returns vectors in sequence.
    ///
    /// Wraps around if more calls are made than vectors provided.
    pub fn with_sequence(vectors: Vec<Vec<f32>>) -> Self {
        let dims = vectors.first().map(|v| v.len()).unwrap_or(384);
        Self {
            responses: Arc::new(vectors),
            call_count: Arc::new(AtomicUsize::new(0)),
            failing: Arc::new(AtomicBool::new(false)),
            dimensions: dims,
        }
    }

    /// Create a mock whose every call fails with `EmbeddingUnavailable`.
    pub fn failing() -> Self {
        let embedder = Self::default();
        embedder.set_failing(true);
        embedder
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Get the number of texts `embed` or `embed_batch` was asked for.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<Vec<f32>> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SearchError::embedding("mock provider failure"));
        }
        Ok(self.responses[idx % self.responses.len()].clone())
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::returning(vec![1.0, 0.0])
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.next()
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|_| self.next()).collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Provider factory that hands out a [`MockEmbedder`] and counts initializations.
#[derive(Clone)]
pub struct MockProviderFactory {
    embedder: MockEmbedder,
    init_count: Arc<AtomicUsize>,
    delay: Duration,
    failures_remaining: Arc<AtomicUsize>,
}

impl MockProviderFactory {
    pub fn new(embedder: MockEmbedder) -> Self {
        Self {
            embedder,
            init_count: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
            failures_remaining: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every initialization take at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the first `n` initialization attempts.
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_remaining.store(n, Ordering::SeqCst);
        self
    }

    pub fn init_count(&self) -> usize {
        self.init_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderFactory for MockProviderFactory {
    async fn create(&self) -> Result<Arc<dyn Embedder>> {
        self.init_count.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let should_fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(SearchError::embedding("mock model failed to load"));
        }

        Ok(Arc::new(self.embedder.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_fixed_vector() {
        let embedder = MockEmbedder::returning(vec![1.0, 2.0, 3.0]);

        let result = embedder.embed("test").await.unwrap();
        assert_eq!(result, vec![1.0, 2.0, 3.0]);

        let result = embedder.embed("another").await.unwrap();
        assert_eq!(result, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn mock_returns_sequence() {
        let embedder = MockEmbedder::with_sequence(vec![vec![1.0], vec![2.0], vec![3.0]]);

        assert_eq!(embedder.embed("a").await.unwrap(), vec![1.0]);
        assert_eq!(embedder.embed("b").await.unwrap(), vec![2.0]);
        assert_eq!(embedder.embed("c").await.unwrap(), vec![3.0]);
        // Wraps around
        assert_eq!(embedder.embed("d").await.unwrap(), vec![1.0]);
    }

    #[tokio::test]
    async fn mock_batch_increments_count_per_item() {
        let embedder = MockEmbedder::default();

        embedder.embed_batch(&["a", "b", "c"]).await.unwrap();
        assert_eq!(embedder.call_count(), 3);
    }

    #[tokio::test]
    async fn failing_mock_reports_unavailable() {
        let embedder = MockEmbedder::failing();

        let err = embedder.embed("a").await.unwrap_err();
        assert!(matches!(err, SearchError::EmbeddingUnavailable(_)));
        assert_eq!(embedder.call_count(), 1);
    }

    #[tokio::test]
    async fn factory_fails_then_recovers() {
        let factory = MockProviderFactory::new(MockEmbedder::default()).failing_first(2);

        assert!(factory.create().await.is_err());
        assert!(factory.create().await.is_err());
        assert!(factory.create().await.is_ok());
        assert_eq!(factory.init_count(), 3);
    }
}
