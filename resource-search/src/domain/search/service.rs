//! Search service: embed the query, rank every stored document, apply the
//! requester's visibility scope, then truncate to the requested size.

use tracing::{debug, instrument};

use super::access;
use super::ranker;
use super::traits::{DocumentStore, Embedder, Result, SearchError};
use super::types::{RankedResult, RequesterScope, SearchStats};

/// Configuration for the search service.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Default number of results to return
    pub default_limit: usize,
    /// Maximum number of results allowed
    pub max_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

/// Search service that combines query embedding with similarity ranking.
///
/// # Type Parameters
///
/// * `E` - Embedder implementation for generating query embeddings
/// * `R` - DocumentStore implementation providing the candidate set
///
/// # Examples
///
/// ```ignore
/// let service = SearchService::new(loader, store, SearchConfig::default());
/// let results = service.search("dynamic programming notes", &scope, Some(5)).await?;
/// ```
pub struct SearchService<E, R>
where
    E: Embedder,
    R: DocumentStore,
{
    embedder: E,
    store: R,
    config: SearchConfig,
}

impl<E, R> SearchService<E, R>
where
    E: Embedder,
    R: DocumentStore,
{
    /// Create a new search service.
    pub fn new(embedder: E, store: R, config: SearchConfig) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Create a search service with default configuration.
    pub fn with_defaults(embedder: E, store: R) -> Self {
        Self::new(embedder, store, SearchConfig::default())
    }

    /// Execute a search query.
    ///
    /// # Arguments
    ///
    /// * `query` - Natural language search query, must not be blank
    /// * `scope` - Visibility scope of the requester
    /// * `limit` - Maximum number of results (None uses default, capped at max_limit)
    ///
    /// # Returns
    ///
    /// Visible documents sorted by descending similarity, ties by ascending id.
    /// The result is always a prefix of the full ranked-and-filtered sequence.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn search(
        &self,
        query: &str,
        scope: &RequesterScope,
        limit: Option<usize>,
    ) -> Result<Vec<RankedResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidQuery("query must not be empty".into()));
        }

        let limit = self.effective_limit(limit)?;

        let (query_vector, candidates) =
            tokio::try_join!(self.embed_query(query), self.store.list_all())?;
        let candidate_count = candidates.len();

        let ranked = ranker::rank(&query_vector, candidates);
        let mut visible = access::filter(scope, ranked);
        let visible_count = visible.len();
        visible.truncate(limit);

        debug!(
            candidates = candidate_count,
            visible = visible_count,
            returned = visible.len(),
            "Search completed"
        );

        Ok(visible)
    }

    /// Get document counts.
    pub async fn stats(&self) -> Result<SearchStats> {
        let total = self.store.count().await?;
        let embedded = self.store.count_embedded().await?;

        Ok(SearchStats {
            total,
            embedded,
            missing_embedding: total - embedded,
        })
    }

    fn effective_limit(&self, limit: Option<usize>) -> Result<usize> {
        match limit {
            Some(0) => Err(SearchError::InvalidQuery("limit must be positive".into())),
            Some(limit) => Ok(limit.min(self.config.max_limit)),
            None => Ok(self.config.default_limit),
        }
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let vector = self.embedder.embed(query).await?;

        if vector.is_empty() {
            return Err(SearchError::embedding("provider returned an empty vector"));
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(SearchError::embedding(
                "provider returned non-finite values",
            ));
        }

        Ok(vector)
    }
}
