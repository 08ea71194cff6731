//! Browsing stored project analyses.
//!
//! Listing clients never see full [`ProjectAnalysis`] records; they get
//! [`ProjectCard`]s with a heuristic repository score. Filtering is defined
//! here once so every store backend matches the same projects.

use serde::{Deserialize, Serialize};

use crate::models::{AnalysisRecord, GithubAnalysis, ProjectAnalysis};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;
pub const DEFAULT_SAMPLE_SIZE: usize = 6;
pub const MAX_SAMPLE_SIZE: usize = 20;

/// Normalized search request: lowercase needles, 1-based page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectQuery {
    pub text: String,
    pub tech: String,
    pub page: u32,
    pub limit: u32,
}

impl Default for ProjectQuery {
    fn default() -> Self {
        Self::new(None, None, None, None)
    }
}

impl ProjectQuery {
    pub fn new(
        text: Option<&str>,
        tech: Option<&str>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Self {
        let needle = |s: Option<&str>| s.map(|s| s.trim().to_lowercase()).unwrap_or_default();
        Self {
            text: needle(text),
            tech: needle(tech),
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Case-insensitive substring match.
    ///
    /// `text` is looked for in the title, description, id and repository
    /// summary; `tech` in any tech-stack entry. Empty needles match anything.
    pub fn matches(&self, project: &ProjectAnalysis) -> bool {
        let contains = |hay: &str, needle: &str| hay.to_lowercase().contains(needle);

        let text_ok = self.text.is_empty()
            || contains(&project.analysis.title, &self.text)
            || contains(&project.analysis.description, &self.text)
            || contains(&project.id, &self.text)
            || matches!(&project.github_analysis,
                GithubAnalysis::Analysis(record) if contains(&record.summary, &self.text));

        let tech_ok = self.tech.is_empty()
            || project
                .analysis
                .details
                .tech_stack
                .iter()
                .any(|t| contains(t, &self.tech));

        text_ok && tech_ok
    }
}

/// One page of matching projects, most recently updated first.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectMatches {
    pub projects: Vec<ProjectAnalysis>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardAnalysis {
    pub summary: String,
    pub score: u8,
}

/// Compact listing view of a stored project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tech_stack: Vec<String>,
    pub image: String,
    pub github: String,
    pub devpost: String,
    pub analysis: Option<CardAnalysis>,
}

impl From<&ProjectAnalysis> for ProjectCard {
    fn from(project: &ProjectAnalysis) -> Self {
        let page = &project.analysis;
        let title = if page.title.is_empty() {
            project.id.clone()
        } else {
            page.title.clone()
        };
        let analysis = match &project.github_analysis {
            GithubAnalysis::Analysis(record) => Some(CardAnalysis {
                summary: record.summary.clone(),
                score: repo_score(record),
            }),
            GithubAnalysis::Unavailable { .. } => None,
        };
        Self {
            id: project.id.clone(),
            title,
            description: page.description.clone(),
            tech_stack: page.details.tech_stack.clone(),
            image: page.gallery.images.first().cloned().unwrap_or_default(),
            github: page.details.links.github.clone().unwrap_or_default(),
            devpost: page.details.links.devpost.clone().unwrap_or_default(),
            analysis,
        }
    }
}

/// Heuristic 80..=99 score from the shape of a repository analysis.
pub fn repo_score(record: &AnalysisRecord) -> u8 {
    let mut score: u8 = 80;
    if record.key_features.len() > 3 {
        score += 5;
    }
    if record.complexity.to_lowercase().contains("high") {
        score += 5;
    }
    if record.use_cases.len() > 2 {
        score += 5;
    }
    if record.technical_highlights.chars().count() > 100 {
        score += 5;
    }
    score.min(99)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<ProjectCard>,
    pub pagination: Pagination,
}

impl SearchResults {
    pub fn new(query: &ProjectQuery, matches: &ProjectMatches) -> Self {
        Self {
            results: matches.projects.iter().map(ProjectCard::from).collect(),
            pagination: Pagination {
                total: matches.total,
                page: query.page,
                limit: query.limit,
                pages: matches.total.div_ceil(u64::from(query.limit)),
            },
        }
    }
}

/// Clamp a requested sample size.
pub fn sample_size(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_SAMPLE_SIZE)
        .clamp(1, MAX_SAMPLE_SIZE)
}

/// Judge-style scores out of 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCategories {
    #[serde(rename = "Innovation")]
    pub innovation: u8,
    #[serde(rename = "Technical")]
    pub technical: u8,
    #[serde(rename = "Design")]
    pub design: u8,
    #[serde(rename = "Impact")]
    pub impact: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectScore {
    pub overall: u8,
    pub categories: ScoreCategories,
}
