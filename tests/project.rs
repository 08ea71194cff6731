mod common;

use std::sync::Arc;

use common::{
    is_project_prompt, is_score_prompt, project_json, repo_json, FakeHost, FakeScraper, Harness,
    ScriptedGenerator,
};
use hackscope::errors::AnalysisError;
use hackscope::orchestrator::AnalysisSource;
use hackscope::project::NO_REPOSITORY;
use hackscope_core::catalog::ProjectQuery;
use hackscope_core::models::{AnalysisQuality, GithubAnalysis, GITHUB_URL_NOT_FOUND};
use hackscope_core::store::memory::InMemoryCache;
use hackscope_core::store::{AnalysisStore, ProjectStore};

const LINKED_PAGE: &str = "# Smart Cart\n\nTry it out: [GitHub](https://github.com/octo-org/octo-repo)\n";

fn harness(scraper: FakeScraper, generator: ScriptedGenerator) -> Harness {
    Harness::build(
        FakeHost::with_files(&[("README.md", "# Octo")]),
        generator,
        scraper,
        Arc::new(InMemoryCache::default()),
    )
}

#[tokio::test]
async fn project_embeds_linked_repository_analysis() {
    let h = harness(FakeScraper::page(LINKED_PAGE), ScriptedGenerator::well_behaved());

    let outcome = h.services.projects.get_project("smart-cart").await.unwrap();
    assert_eq!(outcome.source, AnalysisSource::Fresh);

    let project = &outcome.project_data;
    assert_eq!(project.id, "smart-cart");
    assert_eq!(project.analysis.title, "Smart Cart");
    assert_eq!(project.analysis.url, "https://devpost.com/software/smart-cart");
    assert_eq!(project.analysis_quality, AnalysisQuality::Detailed);
    match &project.github_analysis {
        GithubAnalysis::Analysis(record) => assert!(record.is_detailed()),
        other => panic!("expected repository analysis, got {other:?}"),
    }

    // the linked repository analysis was persisted on its own key
    let repo = hackscope_core::models::RepoKey::new("octo-org", "octo-repo");
    assert!(h.store.find_repo_analysis(&repo).await.unwrap().is_some());

    let raw = h.store.find_raw_scrape("smart-cart").await.unwrap().unwrap();
    assert_eq!(raw.github_url, "https://github.com/octo-org/octo-repo");
}

#[tokio::test]
async fn second_lookup_is_served_from_cache() {
    let h = harness(FakeScraper::page(LINKED_PAGE), ScriptedGenerator::well_behaved());
    let projects = &h.services.projects;

    projects.get_project("smart-cart").await.unwrap();
    let calls = h.generator.calls();
    let reads = h.store.reads();

    let again = projects.get_project("smart-cart").await.unwrap();
    assert_eq!(again.source, AnalysisSource::Cached);
    assert_eq!(h.generator.calls(), calls);
    assert_eq!(h.store.reads(), reads);
    assert_eq!(h.scraper.calls(), 1);
}

#[tokio::test]
async fn page_without_repository_link_notes_it() {
    let h = harness(
        FakeScraper::page("# Smart Cart\n\nNo code yet."),
        ScriptedGenerator::well_behaved(),
    );

    let outcome = h.services.projects.get_project("smart-cart").await.unwrap();
    assert_eq!(
        outcome.project_data.github_analysis,
        GithubAnalysis::unavailable(NO_REPOSITORY)
    );
    assert_eq!(h.host.samples(), 0);

    let raw = h.store.find_raw_scrape("smart-cart").await.unwrap().unwrap();
    assert_eq!(raw.github_url, GITHUB_URL_NOT_FOUND);
}

#[tokio::test]
async fn reanalyze_reuses_the_page_snapshot() {
    let h = harness(FakeScraper::page(LINKED_PAGE), ScriptedGenerator::well_behaved());
    let projects = &h.services.projects;

    projects.get_project("smart-cart").await.unwrap();
    let outcome = projects.reanalyze("smart-cart").await.unwrap();

    assert_eq!(outcome.source, AnalysisSource::Fresh);
    assert_eq!(h.scraper.calls(), 1);
    assert_eq!(h.store.count_project_analyses().await.unwrap(), 1);
}

#[tokio::test]
async fn invalidate_keeps_raw_snapshot() {
    let h = harness(FakeScraper::page(LINKED_PAGE), ScriptedGenerator::well_behaved());
    let projects = &h.services.projects;

    projects.get_project("smart-cart").await.unwrap();
    let report = projects.invalidate("smart-cart").await.unwrap();
    assert_eq!(report.store_deleted, 1);
    assert!(report.cache_deleted);
    assert!(h.store.find_raw_scrape("smart-cart").await.unwrap().is_some());

    let outcome = projects.get_project("smart-cart").await.unwrap();
    assert_eq!(outcome.source, AnalysisSource::Fresh);
    assert_eq!(h.scraper.calls(), 1);
}

#[tokio::test]
async fn failed_generation_uses_fallback_page() {
    let generator = ScriptedGenerator::new(|prompt, _| {
        if is_project_prompt(prompt) {
            Ok("I could not find a project here.".into())
        } else {
            Ok(repo_json("Repo summary"))
        }
    });
    let h = harness(FakeScraper::page(LINKED_PAGE), generator);

    let outcome = h.services.projects.get_project("smart-cart").await.unwrap();
    let project = outcome.project_data;
    assert_eq!(project.analysis_quality, AnalysisQuality::Basic);
    assert_eq!(project.analysis.title, "Untitled Project");
    assert_eq!(project.analysis.url, "https://devpost.com/software/smart-cart");
    // 4 project attempts + 1 repository attempt
    assert_eq!(h.generator.calls(), 5);
    assert!(matches!(project.github_analysis, GithubAnalysis::Analysis(_)));
}

#[tokio::test]
async fn project_prompt_is_strictly_sanitized() {
    let generator = ScriptedGenerator::new(|_, _| Ok(project_json()));
    let h = harness(
        FakeScraper::page("# Café ☕\n\nSmart cart\u{0007} demo"),
        generator,
    );

    h.services.projects.get_project("cafe").await.unwrap();
    let prompt = &h.generator.prompts()[0];
    assert!(prompt.contains("# Caf \n\nSmart cart demo"));
}

#[tokio::test]
async fn failed_scrape_is_not_kept() {
    let h = harness(FakeScraper::failing(), ScriptedGenerator::well_behaved());
    let projects = &h.services.projects;

    projects.get_project("smart-cart").await.unwrap();
    assert!(h.store.find_raw_scrape("smart-cart").await.unwrap().is_none());

    projects.reanalyze("smart-cart").await.unwrap();
    assert_eq!(h.scraper.calls(), 2);
}

#[tokio::test]
async fn invalid_ids_are_rejected() {
    let h = harness(FakeScraper::page(""), ScriptedGenerator::well_behaved());
    let err = h.services.projects.get_project("../admin").await.unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidInput(_)));
    assert_eq!(h.scraper.calls(), 0);
}

#[tokio::test]
async fn unreachable_store_still_serves_the_project() {
    let h = harness(FakeScraper::page(LINKED_PAGE), ScriptedGenerator::well_behaved());
    h.store.go_down();
    let projects = &h.services.projects;

    let first = projects.get_project("smart-cart").await.unwrap();
    assert_eq!(first.source, AnalysisSource::Fresh);
    assert_eq!(first.project_data.analysis_quality, AnalysisQuality::Detailed);

    let calls = h.generator.calls();
    let second = projects.get_project("smart-cart").await.unwrap();
    assert_eq!(second.source, AnalysisSource::Cached);
    assert_eq!(h.generator.calls(), calls);
}

#[tokio::test]
async fn search_finds_stored_projects_only() {
    let h = harness(FakeScraper::page(LINKED_PAGE), ScriptedGenerator::well_behaved());
    let projects = &h.services.projects;

    let empty = projects.search(&ProjectQuery::default()).await.unwrap();
    assert_eq!(empty.pagination.total, 0);
    assert!(empty.results.is_empty());

    projects.get_project("smart-cart").await.unwrap();
    projects.get_project("cart-two").await.unwrap();

    let all = projects
        .search(&ProjectQuery::new(Some("cart"), Some("rust"), Some(1), Some(1)))
        .await
        .unwrap();
    assert_eq!(all.pagination.total, 2);
    assert_eq!(all.pagination.pages, 2);
    assert_eq!(all.results.len(), 1);
    // most recently updated first
    assert_eq!(all.results[0].id, "cart-two");
    let card = all.results[0].analysis.as_ref().expect("repository summary");
    assert!((80..=99).contains(&card.score));

    let none = projects
        .search(&ProjectQuery::new(None, Some("haskell"), None, None))
        .await
        .unwrap();
    assert_eq!(none.pagination.total, 0);
}

#[tokio::test]
async fn sample_returns_cards() {
    let h = harness(FakeScraper::page(LINKED_PAGE), ScriptedGenerator::well_behaved());
    let projects = &h.services.projects;

    assert!(projects.sample(6).await.unwrap().is_empty());
    projects.get_project("smart-cart").await.unwrap();
    projects.get_project("cart-two").await.unwrap();

    let cards = projects.sample(6).await.unwrap();
    assert_eq!(cards.len(), 2);
    assert_eq!(projects.sample(1).await.unwrap().len(), 1);
    assert!(cards.iter().all(|c| c.image == "https://img.example/cart.png"));
}

#[tokio::test]
async fn score_analyses_then_judges() {
    let h = harness(FakeScraper::page(LINKED_PAGE), ScriptedGenerator::well_behaved());

    let score = h.services.projects.score("smart-cart").await.unwrap();
    assert_eq!(score.overall, 84);
    assert_eq!(score.categories.innovation, 88);

    let prompts = h.generator.prompts();
    let last = prompts.last().unwrap();
    assert!(is_score_prompt(last));
    assert!(!is_project_prompt(last));
    assert!(last.contains("Title: Smart Cart"));
    assert!(last.contains("Tech Stack: Rust, React"));

    // the second score reuses the cached project
    let calls = h.generator.calls();
    h.services.projects.score("smart-cart").await.unwrap();
    assert_eq!(h.generator.calls(), calls + 1);
}

#[tokio::test]
async fn malformed_score_is_retried_then_reported() {
    let generator = ScriptedGenerator::new(|prompt, _| {
        if is_score_prompt(prompt) {
            Ok(r#"{"overall": 90}"#.into())
        } else if is_project_prompt(prompt) {
            Ok(project_json())
        } else {
            Ok(repo_json("Repo summary"))
        }
    });
    let h = harness(FakeScraper::page(LINKED_PAGE), generator);

    let err = h.services.projects.score("smart-cart").await.unwrap_err();
    assert!(matches!(err, AnalysisError::Validation(_)));
    let scores = h
        .generator
        .prompts()
        .iter()
        .filter(|p| is_score_prompt(p))
        .count();
    assert!(scores > 1);
}
