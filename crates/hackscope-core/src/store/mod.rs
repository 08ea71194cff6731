//! Storage abstraction for hackscope.
//!
//! Two tiers sit behind traits so the orchestration code never depends on a
//! concrete backend:
//!
//! | Trait | Role | Implementations |
//! |-------|------|-----------------|
//! | [`AnalysisStore`] | Authoritative repo analyses, keyed by owner + repo | SQLite, [`memory::InMemoryStore`] |
//! | [`ProjectStore`] | Raw scrapes and project analyses, keyed by id | SQLite, [`memory::InMemoryStore`] |
//! | [`FastCache`] | Low-latency namespaced JSON values | [`memory::InMemoryCache`] |
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::catalog::{ProjectMatches, ProjectQuery};
use crate::models::{AnalysisRecord, ProjectAnalysis, RawScrapeRecord, RepoKey};

/// Build a namespaced cache key: `namespace:part1:part2`.
pub fn cache_key(namespace: &str, parts: &[&str]) -> String {
    let mut key = String::from(namespace);
    for part in parts {
        key.push(':');
        key.push_str(part);
    }
    key
}

/// Persistent store for repository analyses. Keeps only the latest record per key.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn find_repo_analysis(&self, key: &RepoKey) -> Result<Option<AnalysisRecord>>;

    /// Insert or replace the record for `key`.
    async fn upsert_repo_analysis(&self, key: &RepoKey, record: &AnalysisRecord) -> Result<()>;

    /// Delete every record for `key`, returning how many were removed.
    async fn delete_repo_analysis(&self, key: &RepoKey) -> Result<u64>;

    async fn count_repo_analyses(&self) -> Result<u64>;
}

/// Persistent store for the project-analysis path.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn find_raw_scrape(&self, id: &str) -> Result<Option<RawScrapeRecord>>;

    /// Insert a raw scrape unless one already exists for its id.
    ///
    /// Returns `false` when an existing snapshot was kept.
    async fn insert_raw_scrape(&self, record: &RawScrapeRecord) -> Result<bool>;

    async fn find_project_analysis(&self, id: &str) -> Result<Option<ProjectAnalysis>>;

    async fn upsert_project_analysis(&self, record: &ProjectAnalysis) -> Result<()>;

    async fn delete_project_analysis(&self, id: &str) -> Result<u64>;

    async fn count_project_analyses(&self) -> Result<u64>;

    /// Matching project analyses for `query.page`, newest `updated_at` first,
    /// plus the total number of matches.
    async fn search_projects(&self, query: &ProjectQuery) -> Result<ProjectMatches>;

    /// Up to `count` project analyses in random order.
    async fn sample_projects(&self, count: usize) -> Result<Vec<ProjectAnalysis>>;
}

/// First-tier lookup ahead of the persistent store.
#[async_trait]
pub trait FastCache: Send + Sync {
    async fn get_hash(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`. Returns whether the write was accepted.
    async fn set_hash(&self, key: &str, value: &Value) -> Result<bool>;

    /// Remove `key`. Returns whether an entry existed.
    async fn delete(&self, key: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_namespaced_keys() {
        assert_eq!(cache_key("repo-analysis", &["octo", "repo"]), "repo-analysis:octo:repo");
        assert_eq!(cache_key("project-analysis", &["p1"]), "project-analysis:p1");
        assert_eq!(cache_key("ns", &[]), "ns");
    }
}
