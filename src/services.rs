//! Service construction.
//!
//! All collaborators are built once at startup and handed to the services
//! explicitly. [`Collaborators`] is the seam tests use to swap in fakes.

use std::sync::Arc;

use anyhow::Result;

use hackscope_core::retry::BackoffPolicy;
use hackscope_core::store::memory::InMemoryCache;
use hackscope_core::store::{AnalysisStore, FastCache, ProjectStore};

use crate::config::{CacheBackend, Config};
use crate::db;
use crate::generate::{GeminiClient, GenerationOptions, TextGenerator};
use crate::github::{GitHubClient, SourceHost};
use crate::migrate;
use crate::orchestrator::RepoAnalysisService;
use crate::project::ProjectAnalysisService;
use crate::requester::AnalysisRequester;
use crate::sampler::ContentSampler;
use crate::scrape::{FirecrawlClient, PageScraper};
use crate::sqlite_cache::SqliteCache;
use crate::sqlite_store::SqliteStore;

/// External clients and storage backends.
pub struct Collaborators {
    pub host: Arc<dyn SourceHost>,
    pub generator: Arc<dyn TextGenerator>,
    pub scraper: Arc<dyn PageScraper>,
    pub analysis_store: Arc<dyn AnalysisStore>,
    pub project_store: Arc<dyn ProjectStore>,
    pub cache: Arc<dyn FastCache>,
    pub policy: BackoffPolicy,
}

/// The two analysis services, sharing one requester and one cache.
#[derive(Clone)]
pub struct Services {
    pub repos: Arc<RepoAnalysisService>,
    pub projects: Arc<ProjectAnalysisService>,
}

impl Services {
    pub fn assemble(config: &Config, collab: Collaborators) -> Self {
        let requester = Arc::new(AnalysisRequester::new(
            collab.generator,
            collab.policy,
            GenerationOptions::for_repo(&config.generation),
            GenerationOptions::for_project(&config.generation),
        ));

        let repos = Arc::new(RepoAnalysisService::new(
            collab.analysis_store,
            collab.cache.clone(),
            ContentSampler::new(collab.host),
            requester.clone(),
            config.cache.namespace_repo.clone(),
        ));

        let projects = Arc::new(ProjectAnalysisService::new(
            collab.project_store,
            collab.cache,
            collab.scraper,
            requester,
            repos.clone(),
            config.cache.namespace_project.clone(),
            config.scrape.page_base_url.clone(),
        ));

        Self { repos, projects }
    }

    /// Connect to SQLite, run migrations and build the HTTP clients.
    ///
    /// API keys are optional here; a missing key only fails the requests
    /// that need it, so cache and store maintenance work without one.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::run_migrations(&pool).await?;
        let cache: Arc<dyn FastCache> = match config.cache.backend {
            CacheBackend::Sqlite => Arc::new(SqliteCache::new(pool.clone(), config.cache.ttl())),
            CacheBackend::Memory => Arc::new(InMemoryCache::new(config.cache.ttl())),
        };
        let store = Arc::new(SqliteStore::new(pool));

        let github_token = std::env::var(&config.github.token_env).ok();
        if github_token.is_none() {
            tracing::warn!(
                env = %config.github.token_env,
                "no GitHub token set, using unauthenticated rate limits"
            );
        }
        let gemini_key = std::env::var(&config.generation.api_key_env).ok();
        if gemini_key.is_none() {
            tracing::warn!(
                env = %config.generation.api_key_env,
                "no generation API key set, new analyses will be basic placeholders"
            );
        }
        let firecrawl_key = std::env::var(&config.scrape.api_key_env).unwrap_or_else(|_| {
            tracing::warn!(
                env = %config.scrape.api_key_env,
                "no scraping API key set, project scrapes will fail"
            );
            String::new()
        });

        let collab = Collaborators {
            host: Arc::new(GitHubClient::new(&config.github, github_token)?),
            generator: Arc::new(GeminiClient::new(&config.generation, gemini_key)?),
            scraper: Arc::new(FirecrawlClient::new(&config.scrape, firecrawl_key)?),
            analysis_store: store.clone(),
            project_store: store,
            cache,
            policy: config.generation.backoff(),
        };

        Ok(Self::assemble(config, collab))
    }
}
