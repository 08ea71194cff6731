//! In-memory store and cache implementations.
//!
//! Use `HashMap`s behind `std::sync::RwLock` for thread safety. The store is
//! used by tests and single-process deployments; the cache is the default
//! fast tier.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::catalog::{ProjectMatches, ProjectQuery};
use crate::models::{AnalysisRecord, ProjectAnalysis, RawScrapeRecord, RepoKey};

use super::{AnalysisStore, FastCache, ProjectStore};

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

/// In-memory persistent store for tests and single-process use.
#[derive(Default)]
pub struct InMemoryStore {
    repos: RwLock<HashMap<RepoKey, AnalysisRecord>>,
    raw: RwLock<HashMap<String, RawScrapeRecord>>,
    projects: RwLock<HashMap<String, ProjectAnalysis>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisStore for InMemoryStore {
    async fn find_repo_analysis(&self, key: &RepoKey) -> Result<Option<AnalysisRecord>> {
        let repos = self.repos.read().map_err(poisoned)?;
        Ok(repos.get(key).cloned())
    }

    async fn upsert_repo_analysis(&self, key: &RepoKey, record: &AnalysisRecord) -> Result<()> {
        let mut repos = self.repos.write().map_err(poisoned)?;
        repos.insert(key.clone(), record.clone());
        Ok(())
    }

    async fn delete_repo_analysis(&self, key: &RepoKey) -> Result<u64> {
        let mut repos = self.repos.write().map_err(poisoned)?;
        Ok(repos.remove(key).map_or(0, |_| 1))
    }

    async fn count_repo_analyses(&self) -> Result<u64> {
        Ok(self.repos.read().map_err(poisoned)?.len() as u64)
    }
}

#[async_trait]
impl ProjectStore for InMemoryStore {
    async fn find_raw_scrape(&self, id: &str) -> Result<Option<RawScrapeRecord>> {
        Ok(self.raw.read().map_err(poisoned)?.get(id).cloned())
    }

    async fn insert_raw_scrape(&self, record: &RawScrapeRecord) -> Result<bool> {
        let mut raw = self.raw.write().map_err(poisoned)?;
        if raw.contains_key(&record.id) {
            return Ok(false);
        }
        raw.insert(record.id.clone(), record.clone());
        Ok(true)
    }

    async fn find_project_analysis(&self, id: &str) -> Result<Option<ProjectAnalysis>> {
        Ok(self.projects.read().map_err(poisoned)?.get(id).cloned())
    }

    async fn upsert_project_analysis(&self, record: &ProjectAnalysis) -> Result<()> {
        let mut projects = self.projects.write().map_err(poisoned)?;
        projects.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete_project_analysis(&self, id: &str) -> Result<u64> {
        let mut projects = self.projects.write().map_err(poisoned)?;
        Ok(projects.remove(id).map_or(0, |_| 1))
    }

    async fn count_project_analyses(&self) -> Result<u64> {
        Ok(self.projects.read().map_err(poisoned)?.len() as u64)
    }

    async fn search_projects(&self, query: &ProjectQuery) -> Result<ProjectMatches> {
        let projects = self.projects.read().map_err(poisoned)?;
        let mut hits: Vec<&ProjectAnalysis> =
            projects.values().filter(|p| query.matches(p)).collect();
        hits.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));

        Ok(ProjectMatches {
            total: hits.len() as u64,
            projects: hits
                .into_iter()
                .skip(query.offset() as usize)
                .take(query.limit as usize)
                .cloned()
                .collect(),
        })
    }

    async fn sample_projects(&self, count: usize) -> Result<Vec<ProjectAnalysis>> {
        let projects = self.projects.read().map_err(poisoned)?;
        // freshly seeded hasher per call, so the order differs between calls
        let seed = RandomState::new();
        let mut all: Vec<&ProjectAnalysis> = projects.values().collect();
        all.sort_by_key(|p| seed.hash_one(&p.id));
        Ok(all.into_iter().take(count).cloned().collect())
    }
}

struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
}

/// In-process fast cache with an optional time-to-live.
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Option<Duration>,
}

impl InMemoryCache {
    /// `ttl = None` keeps entries until they are deleted.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InMemoryCache {
    /// Remove `key` if it is still expired under the write lock. A writer may
    /// have replaced the entry since it was last read; that value is returned.
    fn evict_expired(&self, key: &str, now: Instant) -> Result<Option<Value>> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        match entries.get(key) {
            Some(e) if e.is_live(now) => Ok(Some(e.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |t| t > now)
    }
}

#[async_trait]
impl FastCache for InMemoryCache {
    async fn get_hash(&self, key: &str) -> Result<Option<Value>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().map_err(poisoned)?;
            match entries.get(key) {
                None => return Ok(None),
                Some(e) if e.is_live(now) => return Ok(Some(e.value.clone())),
                Some(_) => {}
            }
        }
        self.evict_expired(key, now)
    }

    async fn set_hash(&self, key: &str, value: &Value) -> Result<bool> {
        let now = Instant::now();
        let expires_at = self.ttl.map(|ttl| now + ttl);
        let mut entries = self.entries.write().map_err(poisoned)?;
        if self.ttl.is_some() {
            entries.retain(|_, e| e.is_live(now));
        }
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                expires_at,
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().map_err(poisoned)?.remove(key).is_some())
    }
}
