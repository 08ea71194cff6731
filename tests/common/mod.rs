//! Scripted collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};

use hackscope::config::{parse_config, Config};
use hackscope::errors::AnalysisError;
use hackscope::generate::{Generation, GenerationOptions, TextGenerator};
use hackscope::github::SourceHost;
use hackscope::scrape::PageScraper;
use hackscope::services::{Collaborators, Services};
use hackscope::sqlite_cache::SqliteCache;
use hackscope::sqlite_store::SqliteStore;
use hackscope::{db, migrate};
use hackscope_core::catalog::{ProjectMatches, ProjectQuery};
use hackscope_core::models::{
    AnalysisRecord, ProjectAnalysis, RawScrapeRecord, RepoKey, RepoMetadata, ScrapeData,
    TreeEntry,
};
use hackscope_core::retry::BackoffPolicy;
use hackscope_core::store::memory::{InMemoryCache, InMemoryStore};
use hackscope_core::store::{AnalysisStore, FastCache, ProjectStore};

pub const CONFIG: &str = r#"
[db]
path = "./data/test.sqlite"

[server]
bind = "127.0.0.1:0"
"#;

pub fn config() -> Config {
    parse_config(CONFIG).unwrap()
}

// ============ Source host ============

pub enum BlobScript {
    Content(&'static str),
    Empty,
    TooLarge,
    Fail,
}

pub struct FakeHost {
    pub missing: bool,
    pub tree: Vec<TreeEntry>,
    pub blobs: HashMap<String, BlobScript>,
    pub metadata_calls: AtomicUsize,
    pub blob_calls: AtomicUsize,
}

impl FakeHost {
    /// Each file gets sha `sha-<path>`.
    pub fn with_files(files: &[(&'static str, &'static str)]) -> Self {
        let mut tree = Vec::new();
        let mut blobs = HashMap::new();
        for (path, content) in files {
            let sha = format!("sha-{}", path);
            tree.push(TreeEntry::blob(*path, sha.clone()));
            blobs.insert(sha, BlobScript::Content(content));
        }
        Self {
            missing: false,
            tree,
            blobs,
            metadata_calls: AtomicUsize::new(0),
            blob_calls: AtomicUsize::new(0),
        }
    }

    pub fn missing() -> Self {
        Self {
            missing: true,
            ..Self::with_files(&[])
        }
    }

    pub fn script_blob(mut self, path: &str, script: BlobScript) -> Self {
        self.blobs.insert(format!("sha-{}", path), script);
        self
    }

    pub fn samples(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceHost for FakeHost {
    async fn repo_metadata(&self, key: &RepoKey) -> Result<RepoMetadata, AnalysisError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if self.missing {
            return Err(AnalysisError::not_found(format!("repository {}", key)));
        }
        Ok(RepoMetadata {
            default_branch: "main".into(),
            description: Some("A demo repository".into()),
            language: Some("Rust".into()),
            topics: vec!["hackathon".into()],
            stars: 7,
            forks: 2,
            created_at: Some("2024-01-01T00:00:00Z".into()),
            updated_at: Some("2024-02-01T00:00:00Z".into()),
        })
    }

    async fn tree(&self, _key: &RepoKey, branch: &str) -> Result<Vec<TreeEntry>, AnalysisError> {
        assert_eq!(branch, "main");
        Ok(self.tree.clone())
    }

    async fn blob(&self, _key: &RepoKey, sha: &str) -> Result<Option<String>, AnalysisError> {
        self.blob_calls.fetch_add(1, Ordering::SeqCst);
        match self.blobs.get(sha) {
            Some(BlobScript::Content(text)) => Ok(Some(STANDARD.encode(text.as_bytes()))),
            Some(BlobScript::Empty) => Ok(None),
            Some(BlobScript::TooLarge) => Err(AnalysisError::TooLarge {
                resource: sha.to_string(),
            }),
            Some(BlobScript::Fail) | None => Err(AnalysisError::upstream("GitHub", "HTTP 500")),
        }
    }
}

// ============ Generator ============

type Responder = dyn Fn(&str, usize) -> Result<String, AnalysisError> + Send + Sync;

/// Generator driven by a closure of `(prompt, call index)`.
pub struct ScriptedGenerator {
    respond: Box<Responder>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(
        respond: impl Fn(&str, usize) -> Result<String, AnalysisError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Well-formed responses for every prompt variant.
    pub fn well_behaved() -> Self {
        Self::new(|prompt, n| {
            if is_score_prompt(prompt) {
                Ok(score_json())
            } else if is_project_prompt(prompt) {
                Ok(project_json())
            } else {
                Ok(repo_json(&format!("Summary #{}", n)))
            }
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<Generation, AnalysisError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.respond)(prompt, n).map(|text| Generation {
            text,
            finish_reason: Some("STOP".into()),
        })
    }
}

pub fn is_project_prompt(prompt: &str) -> bool {
    prompt.starts_with("You are a judge")
}

pub fn is_score_prompt(prompt: &str) -> bool {
    prompt.starts_with("Evaluate the following project")
}

pub fn score_json() -> String {
    json!({
        "overall": 84,
        "categories": { "Innovation": 88, "Technical": 81, "Design": 79, "Impact": 86 }
    })
    .to_string()
}

pub fn repo_json(summary: &str) -> String {
    json!({
        "summary": summary,
        "technicalHighlights": "Rust service built on axum with a SQLite store.",
        "keyFeatures": [
            "HTTP API",
            "Persistent cache",
            "Retry with backoff",
            "Content sampling",
            "Structured logging"
        ],
        "complexity": "Moderate",
        "useCases": ["Judging hackathons", "Browsing projects"],
        "improvements": ["Add metrics", "Add auth"]
    })
    .to_string()
}

pub fn project_json() -> String {
    json!({
        "title": "Smart Cart",
        "description": "A shopping cart that scans items.",
        "gallery": { "images": ["https://img.example/cart.png"], "videos": [] },
        "summary": {
            "keyFeatures": ["Barcode scanning"],
            "technicalHighlights": ["Edge inference"],
            "impactPotential": ["Shorter queues"],
            "learningCurve": ["Low"]
        },
        "team": [{ "name": "Ada", "role": "Developer", "avatar": "/a.png" }],
        "details": {
            "techStack": ["Rust", "React"],
            "links": { "github": "https://github.com/octo-org/octo-repo" },
            "duration": "36 hours"
        }
    })
    .to_string()
}

// ============ Scraper ============

pub struct FakeScraper {
    pub data: ScrapeData,
    pub calls: AtomicUsize,
}

impl FakeScraper {
    pub fn page(markdown: &str) -> Self {
        Self {
            data: ScrapeData {
                success: true,
                markdown: markdown.to_string(),
                metadata: json!({ "title": "Smart Cart" }),
                error: None,
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            data: ScrapeData::failed("https://devpost.com/software/x", "HTTP 500"),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageScraper for FakeScraper {
    async fn scrape(&self, _url: &str) -> ScrapeData {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.data.clone()
    }
}

// ============ Stores and caches ============

/// In-memory store that counts reads and writes. [`CountingStore::go_down`]
/// makes every analysis read and write fail.
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryStore,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    down: AtomicBool,
}

impl CountingStore {
    pub fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    fn check_up(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            Err(anyhow!("database unavailable"))
        } else {
            Ok(())
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisStore for CountingStore {
    async fn find_repo_analysis(&self, key: &RepoKey) -> Result<Option<AnalysisRecord>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check_up()?;
        self.inner.find_repo_analysis(key).await
    }

    async fn upsert_repo_analysis(&self, key: &RepoKey, record: &AnalysisRecord) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_up()?;
        self.inner.upsert_repo_analysis(key, record).await
    }

    async fn delete_repo_analysis(&self, key: &RepoKey) -> Result<u64> {
        self.inner.delete_repo_analysis(key).await
    }

    async fn count_repo_analyses(&self) -> Result<u64> {
        self.inner.count_repo_analyses().await
    }
}

#[async_trait]
impl ProjectStore for CountingStore {
    async fn find_raw_scrape(&self, id: &str) -> Result<Option<RawScrapeRecord>> {
        self.inner.find_raw_scrape(id).await
    }

    async fn insert_raw_scrape(&self, record: &RawScrapeRecord) -> Result<bool> {
        self.inner.insert_raw_scrape(record).await
    }

    async fn find_project_analysis(&self, id: &str) -> Result<Option<ProjectAnalysis>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check_up()?;
        self.inner.find_project_analysis(id).await
    }

    async fn upsert_project_analysis(&self, record: &ProjectAnalysis) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_up()?;
        self.inner.upsert_project_analysis(record).await
    }

    async fn delete_project_analysis(&self, id: &str) -> Result<u64> {
        self.inner.delete_project_analysis(id).await
    }

    async fn count_project_analyses(&self) -> Result<u64> {
        self.inner.count_project_analyses().await
    }

    async fn search_projects(&self, query: &ProjectQuery) -> Result<ProjectMatches> {
        self.inner.search_projects(query).await
    }

    async fn sample_projects(&self, count: usize) -> Result<Vec<ProjectAnalysis>> {
        self.inner.sample_projects(count).await
    }
}

/// Cache whose backend is always unreachable.
pub struct DownCache;

#[async_trait]
impl FastCache for DownCache {
    async fn get_hash(&self, _key: &str) -> Result<Option<Value>> {
        Err(anyhow!("connection refused"))
    }

    async fn set_hash(&self, _key: &str, _value: &Value) -> Result<bool> {
        Err(anyhow!("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<bool> {
        Err(anyhow!("connection refused"))
    }
}

// ============ Harness ============

pub struct Harness {
    pub host: Arc<FakeHost>,
    pub generator: Arc<ScriptedGenerator>,
    pub scraper: Arc<FakeScraper>,
    pub store: Arc<CountingStore>,
    pub cache: Arc<dyn FastCache>,
    pub services: Services,
}

impl Harness {
    pub fn new(host: FakeHost, generator: ScriptedGenerator) -> Self {
        Self::build(
            host,
            generator,
            FakeScraper::page("no links"),
            Arc::new(InMemoryCache::default()),
        )
    }

    pub fn build(
        host: FakeHost,
        generator: ScriptedGenerator,
        scraper: FakeScraper,
        cache: Arc<dyn FastCache>,
    ) -> Self {
        let host = Arc::new(host);
        let generator = Arc::new(generator);
        let scraper = Arc::new(scraper);
        let store = Arc::new(CountingStore::default());

        let services = Services::assemble(
            &config(),
            Collaborators {
                host: host.clone(),
                generator: generator.clone(),
                scraper: scraper.clone(),
                analysis_store: store.clone(),
                project_store: store.clone(),
                cache: cache.clone(),
                policy: BackoffPolicy::immediate(3),
            },
        );

        Self {
            host,
            generator,
            scraper,
            store,
            cache,
            services,
        }
    }
}

/// Services over a SQLite file, the way a server and a CLI command each
/// open the same database.
pub async fn sqlite_services(
    db_path: &Path,
    host: Arc<FakeHost>,
    generator: Arc<ScriptedGenerator>,
) -> Services {
    let pool = db::connect_path(db_path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    let store = Arc::new(SqliteStore::new(pool.clone()));

    Services::assemble(
        &config(),
        Collaborators {
            host,
            generator,
            scraper: Arc::new(FakeScraper::page("no links")),
            analysis_store: store.clone(),
            project_store: store,
            cache: Arc::new(SqliteCache::new(pool, None)),
            policy: BackoffPolicy::immediate(3),
        },
    )
}

pub fn octo() -> RepoKey {
    RepoKey::new("octo-org", "octo-repo")
}
