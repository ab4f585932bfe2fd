//! Searchable index over the settings and commands catalogs.
//!
//! The index is built lazily on first use and memoized. Concurrent callers
//! share one in-flight build. [`ConfigurationIndex::invalidate`] drops the
//! memoized build so the next call rebuilds from the current documents.

pub mod lexical;

use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

use crate::catalog::{
    build_catalog, Catalog, CatalogEntry, Command, IngestOptions, SchemaSource, Setting,
};
use crate::AssistantError;

pub use lexical::{identifier_words, LexicalIndex};

/// A completed build: the catalogs plus their full-text index.
#[derive(Debug)]
pub struct BuiltIndex {
    pub catalog: Arc<Catalog>,
    lexical: LexicalIndex,
}

impl BuiltIndex {
    /// Build from an already-ingested catalog.
    pub fn from_catalog(catalog: Catalog) -> Result<Self, AssistantError> {
        let lexical = LexicalIndex::build(&catalog)?;
        Ok(Self {
            catalog: Arc::new(catalog),
            lexical,
        })
    }

    /// Exact key match first, relevance search otherwise.
    pub fn search(&self, keywords: &str, limit: usize) -> Result<Vec<CatalogEntry>, AssistantError> {
        let keywords = keywords.trim();
        if let Some(entry) = self.catalog.entry(keywords) {
            return Ok(vec![entry]);
        }
        let ids = self.lexical.search(keywords, limit)?;
        Ok(ids
            .iter()
            .filter_map(|id| self.catalog.by_doc_id(id))
            .take(limit)
            .collect())
    }
}

/// Memoized configuration index over a [`SchemaSource`].
pub struct ConfigurationIndex {
    source: Arc<dyn SchemaSource>,
    options: IngestOptions,
    /// Keyed by generation; invalidation bumps the generation.
    built: Cache<u64, Arc<BuiltIndex>>,
    generation: AtomicU64,
}

impl ConfigurationIndex {
    pub fn new(source: Arc<dyn SchemaSource>, options: IngestOptions) -> Self {
        Self {
            source,
            options,
            built: Cache::builder().max_capacity(2).build(),
            generation: AtomicU64::new(0),
        }
    }

    /// Build the index if needed and return it. Idempotent.
    pub async fn initialize(&self) -> Result<Arc<BuiltIndex>, AssistantError> {
        let generation = self.generation.load(Ordering::SeqCst);
        self.built
            .try_get_with(generation, self.build(generation))
            .await
            .map_err(|e| AssistantError::Index(format!("Index build failed: {}", e)))
    }

    async fn build(&self, generation: u64) -> Result<Arc<BuiltIndex>, AssistantError> {
        let start = Instant::now();
        let docs = self.source.load().await?;
        let catalog = build_catalog(&docs, &self.options);
        let settings = catalog.setting_count();
        let commands = catalog.command_count();
        let built = BuiltIndex::from_catalog(catalog)?;
        info!(
            generation,
            settings,
            commands,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "configuration index built"
        );
        Ok(Arc::new(built))
    }

    /// Drop the memoized build. The next search or initialize rebuilds.
    pub fn invalidate(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.built.invalidate_all();
        info!(generation, "configuration index invalidated");
    }

    /// Change notification from the host. Invalidates when `uri` is one of
    /// the source documents and reports whether it did.
    pub fn document_changed(&self, uri: &str) -> bool {
        if self.source.watches(uri) {
            self.invalidate();
            true
        } else {
            false
        }
    }

    /// Search both catalogs. An exact key match wins and is returned alone.
    #[instrument(skip(self), level = "debug")]
    pub async fn search(
        &self,
        keywords: &str,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>, AssistantError> {
        self.initialize().await?.search(keywords, limit)
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<Setting>, AssistantError> {
        Ok(self.initialize().await?.catalog.setting(key).cloned())
    }

    pub async fn get_command(&self, key: &str) -> Result<Option<Command>, AssistantError> {
        Ok(self.initialize().await?.catalog.command(key).cloned())
    }

    /// Snapshot of the current catalogs.
    pub async fn catalog(&self) -> Result<Arc<Catalog>, AssistantError> {
        Ok(self.initialize().await?.catalog.clone())
    }

    /// Command keys most similar to `key`, best first, above a similarity floor.
    pub async fn nearest_commands(
        &self,
        key: &str,
        count: usize,
    ) -> Result<Vec<String>, AssistantError> {
        use rapidfuzz::distance::levenshtein;

        const MIN_SIMILARITY: f64 = 0.6;

        let catalog = self.catalog().await?;
        let needle = key.to_lowercase();
        let mut scored: Vec<(f64, &str)> = catalog
            .commands()
            .map(|c| {
                let similarity = levenshtein::normalized_similarity(
                    needle.chars(),
                    c.key.to_lowercase().chars(),
                );
                (similarity, c.key.as_str())
            })
            .filter(|(similarity, _)| *similarity >= MIN_SIMILARITY)
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(b.1))
        });
        Ok(scored
            .into_iter()
            .take(count)
            .map(|(_, k)| k.to_string())
            .collect())
    }
}
