//! Cache/store orchestration for repository analyses.
//!
//! Every lookup walks the same ladder:
//!
//! 1. fast cache, if the entry parses and validates;
//! 2. an invalid cache entry is evicted;
//! 3. persistent store, back-filling the cache on a hit;
//! 4. sample + generate, then write store and cache concurrently.
//!
//! Cache and store failures on the read side are logged and treated as a
//! miss. Write failures are logged and never fail the call.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use hackscope_core::degraded::{analysis_failed, no_content};
use hackscope_core::models::{AnalysisRecord, RepoKey};
use hackscope_core::store::{cache_key, AnalysisStore, FastCache};
use hackscope_core::validate::{record_from_value, validate_record};

use crate::errors::AnalysisError;
use crate::requester::AnalysisRequester;
use crate::sampler::ContentSampler;

/// How sampling failures on the miss path are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisMode {
    /// Always return a record; failures become `basic` placeholders.
    #[default]
    Lenient,
    /// Surface a missing repository as [`AnalysisError::NotFound`].
    Strict,
}

/// Where a returned record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Cached,
    Stored,
    Fresh,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub source: AnalysisSource,
    pub analysis: AnalysisRecord,
}

/// What an invalidation actually removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationReport {
    pub store_deleted: u64,
    pub cache_deleted: bool,
}

pub struct RepoAnalysisService {
    store: Arc<dyn AnalysisStore>,
    cache: Arc<dyn FastCache>,
    sampler: ContentSampler,
    requester: Arc<AnalysisRequester>,
    namespace: String,
}

impl RepoAnalysisService {
    pub fn new(
        store: Arc<dyn AnalysisStore>,
        cache: Arc<dyn FastCache>,
        sampler: ContentSampler,
        requester: Arc<AnalysisRequester>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            sampler,
            requester,
            namespace: namespace.into(),
        }
    }

    pub fn cache_key(&self, key: &RepoKey) -> String {
        cache_key(&self.namespace, &[&key.owner, &key.repo])
    }

    pub async fn get_analysis(
        &self,
        key: &RepoKey,
        mode: AnalysisMode,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let ck = self.cache_key(key);

        if let Some(record) = self.lookup_cache(key, &ck).await {
            return Ok(AnalysisOutcome {
                source: AnalysisSource::Cached,
                analysis: record,
            });
        }

        match self.store.find_repo_analysis(key).await {
            Ok(Some(record)) => match validate_record(&record) {
                Ok(()) => {
                    tracing::info!(owner = %key.owner, repo = %key.repo, "store hit");
                    self.fill_cache(&ck, &record).await;
                    return Ok(AnalysisOutcome {
                        source: AnalysisSource::Stored,
                        analysis: record,
                    });
                }
                Err(e) => {
                    tracing::warn!(owner = %key.owner, repo = %key.repo, error = %e, "stored analysis invalid, recomputing");
                }
            },
            Ok(None) => {
                tracing::debug!(owner = %key.owner, repo = %key.repo, "store miss");
            }
            Err(e) => {
                tracing::error!(owner = %key.owner, repo = %key.repo, error = %e, "store lookup failed, recomputing");
            }
        }

        self.compute_fresh(key, mode).await
    }

    /// Remove the stored record and cache entry for `key`.
    pub async fn invalidate_analysis(&self, key: &RepoKey) -> InvalidationReport {
        let ck = self.cache_key(key);
        let (stored, cached) = tokio::join!(self.store.delete_repo_analysis(key), self.cache.delete(&ck));

        let store_deleted = stored.unwrap_or_else(|e| {
            tracing::error!(owner = %key.owner, repo = %key.repo, error = %e, "store delete failed");
            0
        });
        let cache_deleted = cached.unwrap_or_else(|e| {
            tracing::warn!(key = %ck, error = %e, "cache delete failed");
            false
        });

        tracing::info!(
            owner = %key.owner,
            repo = %key.repo,
            store_deleted,
            cache_deleted,
            "analysis invalidated"
        );
        InvalidationReport {
            store_deleted,
            cache_deleted,
        }
    }

    /// Invalidate, then recompute without consulting cache or store.
    pub async fn reanalyze(&self, key: &RepoKey) -> Result<AnalysisOutcome, AnalysisError> {
        self.invalidate_analysis(key).await;
        self.compute_fresh(key, AnalysisMode::Lenient).await
    }

    pub async fn count(&self) -> Result<u64, AnalysisError> {
        self.store
            .count_repo_analyses()
            .await
            .map_err(AnalysisError::Store)
    }

    async fn lookup_cache(&self, key: &RepoKey, ck: &str) -> Option<AnalysisRecord> {
        match self.cache.get_hash(ck).await {
            Ok(Some(value)) => match record_from_value(&value) {
                Ok(record) => {
                    tracing::debug!(owner = %key.owner, repo = %key.repo, "cache hit");
                    Some(record)
                }
                Err(e) => {
                    tracing::info!(key = %ck, error = %e, "evicting invalid cache entry");
                    if let Err(e) = self.cache.delete(ck).await {
                        tracing::warn!(key = %ck, error = %e, "cache eviction failed");
                    }
                    None
                }
            },
            Ok(None) => {
                tracing::debug!(owner = %key.owner, repo = %key.repo, "cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(key = %ck, error = %e, "cache lookup failed");
                None
            }
        }
    }

    async fn fill_cache(&self, ck: &str, record: &AnalysisRecord) {
        let value = match serde_json::to_value(record) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key = %ck, error = %e, "cannot serialize analysis for cache");
                return;
            }
        };
        match self.cache.set_hash(ck, &value).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(key = %ck, "cache rejected write"),
            Err(e) => tracing::warn!(key = %ck, error = %e, "cache write failed"),
        }
    }

    async fn compute_fresh(
        &self,
        key: &RepoKey,
        mode: AnalysisMode,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let label = key.to_string();

        let record = match self.sampler.sample(key).await {
            Ok(sample) if sample.has_no_files() => no_content(&label, Utc::now()),
            Ok(sample) => self.requester.request_repo_analysis(key, sample.text()).await,
            Err(e @ AnalysisError::NotFound { .. }) if mode == AnalysisMode::Strict => {
                return Err(e);
            }
            Err(e) => {
                // Not persisted: the next lookup retries sampling.
                tracing::warn!(owner = %key.owner, repo = %key.repo, error = %e, "sampling failed, returning basic analysis");
                return Ok(AnalysisOutcome {
                    source: AnalysisSource::Fresh,
                    analysis: analysis_failed(&label, &e.cause(), Utc::now()),
                });
            }
        };

        self.persist(key, &record).await;
        Ok(AnalysisOutcome {
            source: AnalysisSource::Fresh,
            analysis: record,
        })
    }

    async fn persist(&self, key: &RepoKey, record: &AnalysisRecord) {
        let ck = self.cache_key(key);
        let (stored, ()) = tokio::join!(
            self.store.upsert_repo_analysis(key, record),
            self.fill_cache(&ck, record),
        );
        match stored {
            Ok(()) => tracing::info!(
                owner = %key.owner,
                repo = %key.repo,
                quality = record.analysis_quality.as_str(),
                "analysis stored"
            ),
            Err(e) => {
                tracing::error!(owner = %key.owner, repo = %key.repo, error = %e, "store upsert failed")
            }
        }
    }
}
