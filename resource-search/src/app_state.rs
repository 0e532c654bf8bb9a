use std::sync::Arc;

use crate::domain::search::{
    DocumentIndexer, DocumentStore, Embedder, IndexerConfig, SearchConfig, SearchService,
};

pub type SharedEmbedder = Arc<dyn Embedder>;
pub type SharedStore = Arc<dyn DocumentStore>;

#[derive(Clone)]
pub struct AppState {
    search_service: Arc<SearchService<SharedEmbedder, SharedStore>>,
    indexer: Arc<DocumentIndexer<SharedEmbedder, SharedStore>>,
}

impl AppState {
    pub fn new(
        embedder: SharedEmbedder,
        store: SharedStore,
        search_config: SearchConfig,
        indexer_config: IndexerConfig,
    ) -> Self {
        Self {
            search_service: Arc::new(SearchService::new(
                embedder.clone(),
                store.clone(),
                search_config,
            )),
            indexer: Arc::new(DocumentIndexer::new(embedder, store, indexer_config)),
        }
    }

    pub fn search_service(&self) -> &SearchService<SharedEmbedder, SharedStore> {
        &self.search_service
    }

    pub fn indexer(&self) -> &DocumentIndexer<SharedEmbedder, SharedStore> {
        &self.indexer
    }
}
