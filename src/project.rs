//! Project (hackathon page) analysis path.
//!
//! Same cache → store → compute ladder as repository analyses, with a raw
//! page snapshot in between: the first successful scrape of an id is kept
//! and later recomputations reuse it instead of scraping again.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use hackscope_core::catalog::{ProjectCard, ProjectQuery, ProjectScore, SearchResults};
use hackscope_core::models::{GithubAnalysis, ProjectAnalysis, RawScrapeRecord};
use hackscope_core::store::{cache_key, FastCache, ProjectStore};
use hackscope_core::validate::{project_from_value, validate_project};

use crate::errors::AnalysisError;
use crate::orchestrator::{AnalysisMode, AnalysisSource, InvalidationReport, RepoAnalysisService};
use crate::requester::AnalysisRequester;
use crate::scrape::PageScraper;

pub const NO_REPOSITORY: &str = "No GitHub repository found";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOutcome {
    pub source: AnalysisSource,
    pub project_data: ProjectAnalysis,
}

pub struct ProjectAnalysisService {
    store: Arc<dyn ProjectStore>,
    cache: Arc<dyn FastCache>,
    scraper: Arc<dyn PageScraper>,
    requester: Arc<AnalysisRequester>,
    repos: Arc<RepoAnalysisService>,
    namespace: String,
    page_base_url: String,
}

impl ProjectAnalysisService {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        cache: Arc<dyn FastCache>,
        scraper: Arc<dyn PageScraper>,
        requester: Arc<AnalysisRequester>,
        repos: Arc<RepoAnalysisService>,
        namespace: impl Into<String>,
        page_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            scraper,
            requester,
            repos,
            namespace: namespace.into(),
            page_base_url: page_base_url.into(),
        }
    }

    pub fn page_url(&self, id: &str) -> String {
        format!("{}{}", self.page_base_url, id)
    }

    pub async fn get_project(&self, id: &str) -> Result<ProjectOutcome, AnalysisError> {
        check_id(id)?;
        let ck = cache_key(&self.namespace, &[id]);

        match self.cache.get_hash(&ck).await {
            Ok(Some(value)) => match project_from_value(&value) {
                Ok(project) => {
                    tracing::debug!(project_id = id, "cache hit");
                    return Ok(ProjectOutcome {
                        source: AnalysisSource::Cached,
                        project_data: project,
                    });
                }
                Err(e) => {
                    tracing::info!(key = %ck, error = %e, "evicting invalid cache entry");
                    if let Err(e) = self.cache.delete(&ck).await {
                        tracing::warn!(key = %ck, error = %e, "cache eviction failed");
                    }
                }
            },
            Ok(None) => tracing::debug!(project_id = id, "cache miss"),
            Err(e) => tracing::warn!(key = %ck, error = %e, "cache lookup failed"),
        }

        match self.store.find_project_analysis(id).await {
            Ok(Some(project)) if validate_project(&project).is_ok() => {
                tracing::info!(project_id = id, "store hit");
                self.fill_cache(&ck, &project).await;
                return Ok(ProjectOutcome {
                    source: AnalysisSource::Stored,
                    project_data: project,
                });
            }
            Ok(Some(_)) => tracing::warn!(project_id = id, "stored project invalid, recomputing"),
            Ok(None) => tracing::debug!(project_id = id, "store miss"),
            Err(e) => tracing::error!(project_id = id, error = %e, "store lookup failed, recomputing"),
        }

        self.compute_fresh(id).await
    }

    /// Drop the derived analysis. The raw page snapshot is kept.
    pub async fn invalidate(&self, id: &str) -> Result<InvalidationReport, AnalysisError> {
        check_id(id)?;
        let ck = cache_key(&self.namespace, &[id]);
        let (stored, cached) =
            tokio::join!(self.store.delete_project_analysis(id), self.cache.delete(&ck));

        let report = InvalidationReport {
            store_deleted: stored.unwrap_or_else(|e| {
                tracing::error!(project_id = id, error = %e, "store delete failed");
                0
            }),
            cache_deleted: cached.unwrap_or_else(|e| {
                tracing::warn!(key = %ck, error = %e, "cache delete failed");
                false
            }),
        };
        tracing::info!(
            project_id = id,
            store_deleted = report.store_deleted,
            cache_deleted = report.cache_deleted,
            "project analysis invalidated"
        );
        Ok(report)
    }

    pub async fn reanalyze(&self, id: &str) -> Result<ProjectOutcome, AnalysisError> {
        self.invalidate(id).await?;
        self.compute_fresh(id).await
    }

    pub async fn count(&self) -> Result<u64, AnalysisError> {
        self.store
            .count_project_analyses()
            .await
            .map_err(AnalysisError::Store)
    }

    /// Page through stored analyses. Only what is already stored is searched.
    pub async fn search(&self, query: &ProjectQuery) -> Result<SearchResults, AnalysisError> {
        let matches = self
            .store
            .search_projects(query)
            .await
            .map_err(AnalysisError::Store)?;
        tracing::debug!(
            text = %query.text,
            tech = %query.tech,
            page = query.page,
            total = matches.total,
            "project search"
        );
        Ok(SearchResults::new(query, &matches))
    }

    /// Random stored projects for discovery listings.
    pub async fn sample(&self, count: usize) -> Result<Vec<ProjectCard>, AnalysisError> {
        let projects = self
            .store
            .sample_projects(count)
            .await
            .map_err(AnalysisError::Store)?;
        Ok(projects.iter().map(ProjectCard::from).collect())
    }

    /// Score a project, analysing it first when nothing is cached or stored.
    pub async fn score(&self, id: &str) -> Result<ProjectScore, AnalysisError> {
        let outcome = self.get_project(id).await?;
        let score = self
            .requester
            .request_project_score(&outcome.project_data)
            .await?;
        tracing::info!(project_id = id, overall = score.overall, "project scored");
        Ok(score)
    }

    async fn compute_fresh(&self, id: &str) -> Result<ProjectOutcome, AnalysisError> {
        let url = self.page_url(id);
        let raw = self.load_or_scrape(id, &url).await;

        let (page, quality) = self.requester.request_project_page(&raw, &url).await;

        let github_analysis = match raw.linked_repo() {
            Some(key) => match self.repos.get_analysis(&key, AnalysisMode::Lenient).await {
                Ok(outcome) => GithubAnalysis::Analysis(outcome.analysis),
                Err(e) => {
                    tracing::warn!(project_id = id, repo = %key, error = %e, "linked repository analysis failed");
                    GithubAnalysis::unavailable(e.to_string())
                }
            },
            None => GithubAnalysis::unavailable(NO_REPOSITORY),
        };

        let now = Utc::now();
        let project = ProjectAnalysis {
            id: id.to_string(),
            analysis: page,
            github_analysis,
            analysis_quality: quality,
            created_at: now,
            updated_at: now,
        };

        let ck = cache_key(&self.namespace, &[id]);
        let (stored, ()) = tokio::join!(
            self.store.upsert_project_analysis(&project),
            self.fill_cache(&ck, &project),
        );
        match stored {
            Ok(()) => tracing::info!(project_id = id, quality = quality.as_str(), "project analysis stored"),
            Err(e) => tracing::error!(project_id = id, error = %e, "store upsert failed"),
        }

        Ok(ProjectOutcome {
            source: AnalysisSource::Fresh,
            project_data: project,
        })
    }

    /// Existing snapshot, or a new scrape. Only successful scrapes are kept.
    async fn load_or_scrape(&self, id: &str, url: &str) -> RawScrapeRecord {
        match self.store.find_raw_scrape(id).await {
            Ok(Some(raw)) => {
                tracing::debug!(project_id = id, "using stored page snapshot");
                return raw;
            }
            Ok(None) => {}
            Err(e) => tracing::error!(project_id = id, error = %e, "raw scrape lookup failed"),
        }

        let data = self.scraper.scrape(url).await;
        let raw = RawScrapeRecord::new(id, data, Utc::now());
        tracing::info!(project_id = id, github_url = %raw.github_url, "page scraped");

        if !raw.scrape_data.success {
            return raw;
        }
        match self.store.insert_raw_scrape(&raw).await {
            Ok(true) => raw,
            Ok(false) => {
                // A concurrent request stored its snapshot first.
                match self.store.find_raw_scrape(id).await {
                    Ok(Some(existing)) => existing,
                    _ => raw,
                }
            }
            Err(e) => {
                tracing::error!(project_id = id, error = %e, "raw scrape insert failed");
                raw
            }
        }
    }

    async fn fill_cache(&self, ck: &str, project: &ProjectAnalysis) {
        let value = match serde_json::to_value(project) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key = %ck, error = %e, "cannot serialize project for cache");
                return;
            }
        };
        match self.cache.set_hash(ck, &value).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(key = %ck, "cache rejected write"),
            Err(e) => tracing::warn!(key = %ck, error = %e, "cache write failed"),
        }
    }
}

/// Project ids are page slugs: ASCII letters, digits, `-`, `_` and `.`.
fn check_id(id: &str) -> Result<(), AnalysisError> {
    let ok = !id.is_empty()
        && id.len() <= 200
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !id.starts_with('.');
    if ok {
        Ok(())
    } else {
        Err(AnalysisError::InvalidInput(format!(
            "invalid project id '{}'",
            id
        )))
    }
}
