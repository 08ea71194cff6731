//! Analysis requester: prompt, generate, parse, retry, degrade.
//!
//! Both variants share the same discipline. Each attempt sends the prompt
//! once and parses the candidate text; generation and parse failures are
//! retried under the configured [`BackoffPolicy`]. Once the budget is spent
//! the caller gets a `basic` placeholder instead of an error.

use std::sync::Arc;

use chrono::Utc;

use hackscope_core::catalog::ProjectScore;
use hackscope_core::degraded::{analysis_failed, fallback_project_page};
use hackscope_core::models::{
    AnalysisQuality, AnalysisRecord, ProjectAnalysis, ProjectPageData, RawScrapeRecord, RepoKey,
};
use hackscope_core::prompt::{project_page_prompt, project_score_prompt, repo_analysis_prompt};
use hackscope_core::retry::BackoffPolicy;
use hackscope_core::sample::{sanitize_content, SanitizeMode};
use hackscope_core::validate::{parse_project_page, parse_project_score, parse_repo_analysis};

use crate::errors::AnalysisError;
use crate::generate::{GenerationOptions, TextGenerator};
use crate::retry::{with_retry, RetryFailure};

pub struct AnalysisRequester {
    generator: Arc<dyn TextGenerator>,
    policy: BackoffPolicy,
    repo_options: GenerationOptions,
    project_options: GenerationOptions,
}

impl AnalysisRequester {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        policy: BackoffPolicy,
        repo_options: GenerationOptions,
        project_options: GenerationOptions,
    ) -> Self {
        Self {
            generator,
            policy,
            repo_options,
            project_options,
        }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Request a detailed analysis, surfacing the terminal error.
    pub async fn try_request_repo_analysis(
        &self,
        key: &RepoKey,
        sample: &str,
    ) -> Result<AnalysisRecord, RetryFailure<AnalysisError>> {
        let prompt = repo_analysis_prompt(key, sample);
        let prompt = prompt.as_str();
        let generator = self.generator.as_ref();
        let options = &self.repo_options;

        let body = with_retry(&self.policy, &key.to_string(), |_| async move {
            let generation = generator.generate(prompt, options).await?;
            Ok::<_, AnalysisError>(parse_repo_analysis(&generation.text)?)
        })
        .await?;

        Ok(body.into_record(AnalysisQuality::Detailed, Utc::now()))
    }

    /// Request a detailed analysis; a spent budget yields a `basic` record.
    pub async fn request_repo_analysis(&self, key: &RepoKey, sample: &str) -> AnalysisRecord {
        match self.try_request_repo_analysis(key, sample).await {
            Ok(record) => record,
            Err(failure) => {
                tracing::warn!(
                    owner = %key.owner,
                    repo = %key.repo,
                    attempts = failure.attempts,
                    error = %failure.error,
                    "generation exhausted, returning basic analysis"
                );
                analysis_failed(&key.to_string(), &failure.error.cause(), Utc::now())
            }
        }
    }

    /// Structure a raw page scrape. Falls back to a fixed page on failure.
    pub async fn request_project_page(
        &self,
        raw: &RawScrapeRecord,
        page_url: &str,
    ) -> (ProjectPageData, AnalysisQuality) {
        let markdown = sanitize_content(&raw.scrape_data.markdown, SanitizeMode::Strict);
        let prompt = project_page_prompt(&markdown, &raw.scrape_data.metadata);
        let prompt = prompt.as_str();
        let generator = self.generator.as_ref();
        let options = &self.project_options;

        let result = with_retry(&self.policy, &raw.id, |_| async move {
            let generation = generator.generate(prompt, options).await?;
            Ok::<_, AnalysisError>(parse_project_page(&generation.text)?)
        })
        .await;

        match result {
            Ok(page) => (fill_page_defaults(page, &raw.id, page_url), AnalysisQuality::Detailed),
            Err(failure) => {
                tracing::warn!(
                    project_id = %raw.id,
                    attempts = failure.attempts,
                    error = %failure.error,
                    "project generation exhausted, using fallback page"
                );
                (fallback_project_page(&raw.id, page_url), AnalysisQuality::Basic)
            }
        }
    }

    /// Judge a stored project. Scores have no placeholder form, so the
    /// terminal error is returned once the budget is spent.
    pub async fn request_project_score(
        &self,
        project: &ProjectAnalysis,
    ) -> Result<ProjectScore, AnalysisError> {
        let prompt = project_score_prompt(project);
        let prompt = prompt.as_str();
        let generator = self.generator.as_ref();
        let options = &self.project_options;

        let label = format!("score {}", project.id);
        with_retry(&self.policy, &label, |_| async move {
            let generation = generator.generate(prompt, options).await?;
            Ok::<_, AnalysisError>(parse_project_score(&generation.text)?)
        })
        .await
        .map_err(|failure| {
            tracing::warn!(
                project_id = %project.id,
                attempts = failure.attempts,
                error = %failure.error,
                "project scoring exhausted"
            );
            failure.error
        })
    }
}

fn fill_page_defaults(mut page: ProjectPageData, id: &str, page_url: &str) -> ProjectPageData {
    page.id = id.to_string();
    if page.url.trim().is_empty() {
        page.url = page_url.to_string();
    }
    if page.title.trim().is_empty() {
        page.title = page
            .details
            .tech_stack
            .first()
            .cloned()
            .unwrap_or_else(|| "Untitled Project".to_string());
    }
    if page.description.trim().is_empty() {
        page.description = if page.summary.key_features.is_empty() {
            "No description available".to_string()
        } else {
            page.summary.key_features.join(". ")
        };
    }
    page
}
