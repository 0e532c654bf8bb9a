//! Lazily initialized, process-wide embedding provider.
//!
//! Lifecycle: uninitialized -> initializing -> ready, or back to uninitialized
//! when an attempt fails. Callers that arrive while an attempt is in flight
//! await that same attempt and observe its outcome. Once ready, the handle is
//! read without taking the lock.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::traits::{Embedder, ProviderFactory, Result};

type InitFuture = Shared<BoxFuture<'static, Result<Arc<dyn Embedder>>>>;

struct InFlight {
    attempt: u64,
    future: InitFuture,
}

#[derive(Default)]
struct InitState {
    attempts: u64,
    in_flight: Option<InFlight>,
}

/// Shared handle that creates its provider on first use.
///
/// Cheap to clone; clones share the same provider and initialization state.
#[derive(Clone)]
pub struct ProviderLoader {
    inner: Arc<LoaderInner>,
}

struct LoaderInner {
    factory: Arc<dyn ProviderFactory>,
    dimensions: usize,
    ready: OnceLock<Arc<dyn Embedder>>,
    init: Mutex<InitState>,
}

impl ProviderLoader {
    /// `dimensions` is the configured embedding size, reported before the
    /// provider has been loaded.
    pub fn new(factory: Arc<dyn ProviderFactory>, dimensions: usize) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                factory,
                dimensions,
                ready: OnceLock::new(),
                init: Mutex::new(InitState::default()),
            }),
        }
    }

    /// Get the provider, initializing it if no attempt has succeeded yet.
    pub async fn get_provider(&self) -> Result<Arc<dyn Embedder>> {
        if let Some(provider) = self.inner.ready.get() {
            return Ok(provider.clone());
        }

        let (attempt, future) = {
            let mut state = self.inner.init.lock().await;

            if let Some(provider) = self.inner.ready.get() {
                return Ok(provider.clone());
            }

            let joined = match state
                .in_flight
                .as_ref()
                .map(|in_flight| (in_flight.attempt, in_flight.future.clone()))
            {
                // An attempt can finish after every waiter was cancelled, leaving
                // its outcome unrecorded.
                Some((attempt, future)) => match future.peek() {
                    Some(Ok(provider)) => {
                        let provider = provider.clone();
                        let _ = self.inner.ready.set(provider.clone());
                        state.in_flight = None;
                        info!(attempt, "Embedding provider ready");
                        return Ok(provider);
                    }
                    Some(Err(e)) => {
                        warn!(attempt, error = %e, "Discarding failed embedding provider attempt");
                        state.in_flight = None;
                        None
                    }
                    None => Some((attempt, future)),
                },
                None => None,
            };

            match joined {
                Some(joined) => joined,
                None => {
                    state.attempts += 1;
                    let attempt = state.attempts;
                    let factory = self.inner.factory.clone();
                    let future = async move {
                        info!(attempt, "Initializing embedding provider");
                        factory.create().await
                    }
                    .boxed()
                    .shared();

                    state.in_flight = Some(InFlight {
                        attempt,
                        future: future.clone(),
                    });
                    (attempt, future)
                }
            }
        };

        // The lock is not held while the provider initializes.
        let outcome = future.await;

        let mut state = self.inner.init.lock().await;
        if state
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.attempt == attempt)
        {
            state.in_flight = None;
            match &outcome {
                Ok(provider) => {
                    let _ = self.inner.ready.set(provider.clone());
                    info!(attempt, "Embedding provider ready");
                }
                Err(e) => warn!(attempt, error = %e, "Embedding provider initialization failed"),
            }
        }

        outcome
    }

    /// Whether a provider has been successfully initialized.
    pub fn is_ready(&self) -> bool {
        self.inner.ready.get().is_some()
    }
}

#[async_trait]
impl Embedder for ProviderLoader {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let provider = self.get_provider().await?;
        provider.embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let provider = self.get_provider().await?;
        provider.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.inner
            .ready
            .get()
            .map(|provider| provider.dimensions())
            .unwrap_or(self.inner.dimensions)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::domain::search::embedder::{MockEmbedder, MockProviderFactory};
    use crate::domain::search::traits::SearchError;

    #[tokio::test]
    async fn concurrent_first_calls_initialize_once() {
        let factory = MockProviderFactory::new(MockEmbedder::returning(vec![1.0, 0.0]))
            .with_delay(Duration::from_millis(50));
        let loader = ProviderLoader::new(Arc::new(factory.clone()), 2);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let loader = loader.clone();
                tokio::spawn(async move { loader.get_provider().await })
            })
            .collect();

        let mut providers = Vec::new();
        for handle in handles {
            providers.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(factory.init_count(), 1);
        assert!(providers
            .iter()
            .all(|p| Arc::ptr_eq(p, &providers[0])));
        assert!(loader.is_ready());
    }

    #[tokio::test]
    async fn ready_provider_is_reused() {
        let factory = MockProviderFactory::new(MockEmbedder::returning(vec![1.0]));
        let loader = ProviderLoader::new(Arc::new(factory.clone()), 1);

        let first = loader.get_provider().await.unwrap();
        let second = loader.get_provider().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.init_count(), 1);
    }

    #[tokio::test]
    async fn failure_is_shared_by_waiters_and_then_retried() {
        let factory = MockProviderFactory::new(MockEmbedder::returning(vec![1.0]))
            .with_delay(Duration::from_millis(50))
            .failing_first(1);
        let loader = ProviderLoader::new(Arc::new(factory.clone()), 1);

        let (a, b) = tokio::join!(loader.get_provider(), loader.get_provider());
        assert!(matches!(a, Err(SearchError::EmbeddingUnavailable(_))));
        assert_eq!(a.err(), b.err());
        assert_eq!(factory.init_count(), 1);
        assert!(!loader.is_ready());

        loader.get_provider().await.unwrap();
        assert_eq!(factory.init_count(), 2);
        assert!(loader.is_ready());
    }

    #[tokio::test]
    async fn embed_goes_through_loaded_provider() {
        let embedder = MockEmbedder::returning(vec![0.5, 0.5]);
        let factory = MockProviderFactory::new(embedder.clone());
        let loader = ProviderLoader::new(Arc::new(factory.clone()), 2);

        assert_eq!(loader.embed("heaps").await.unwrap(), vec![0.5, 0.5]);
        assert_eq!(loader.embed("tries").await.unwrap(), vec![0.5, 0.5]);
        assert_eq!(embedder.call_count(), 2);
        assert_eq!(factory.init_count(), 1);
    }

    #[tokio::test]
    async fn reports_configured_dimensions_until_loaded() {
        let factory = MockProviderFactory::new(MockEmbedder::returning(vec![0.0; 3]));
        let loader = ProviderLoader::new(Arc::new(factory), 384);

        assert_eq!(loader.dimensions(), 384);
        loader.get_provider().await.unwrap();
        assert_eq!(loader.dimensions(), 3);
    }

    #[tokio::test]
    async fn abandoned_caller_does_not_poison_initialization() {
        let factory = MockProviderFactory::new(MockEmbedder::returning(vec![1.0]))
            .with_delay(Duration::from_millis(50));
        let loader = ProviderLoader::new(Arc::new(factory.clone()), 1);

        let abandoned = tokio::time::timeout(Duration::from_millis(5), loader.get_provider()).await;
        assert!(abandoned.is_err());

        loader.get_provider().await.unwrap();
        assert_eq!(factory.init_count(), 1);
        assert!(loader.is_ready());
    }

    #[tokio::test]
    async fn failed_attempt_without_waiters_is_retried() {
        let factory = MockProviderFactory::new(MockEmbedder::returning(vec![1.0]))
            .with_delay(Duration::from_millis(20))
            .failing_first(1);
        let loader = ProviderLoader::new(Arc::new(factory.clone()), 1);

        let waiter = tokio::spawn({
            let loader = loader.clone();
            async move { loader.get_provider().await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;

        // The attempt fails while its only waiter is blocked on the state lock,
        // and that waiter is cancelled before it can record the outcome.
        let guard = loader.inner.init.lock().await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        waiter.abort();
        assert!(waiter.await.map(drop).unwrap_err().is_cancelled());
        drop(guard);

        loader.get_provider().await.unwrap();
        assert_eq!(factory.init_count(), 2);
        assert!(loader.is_ready());
    }

    #[tokio::test]
    async fn factory_errors_do_not_panic_callers() {
        struct Broken(AtomicUsize);

        #[async_trait]
        impl ProviderFactory for Broken {
            async fn create(&self) -> Result<Arc<dyn Embedder>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(SearchError::embedding("model file missing"))
            }
        }

        let broken = Arc::new(Broken(AtomicUsize::new(0)));
        let loader = ProviderLoader::new(broken.clone(), 4);

        assert!(loader.embed("x").await.is_err());
        assert!(loader.embed("y").await.is_err());
        assert_eq!(broken.0.load(Ordering::SeqCst), 2);
    }
}
