//! Core data models used throughout hackscope.
//!
//! These types represent the analysis records, raw page scrapes, and
//! repository metadata that flow through the sampling, generation, and
//! caching pipeline.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::validate::ParseError;

/// Sentinel stored in [`RawScrapeRecord::github_url`] when no repository link was found.
pub const GITHUB_URL_NOT_FOUND: &str = "Not Found";

static GITHUB_REPO_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://github\.com/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)").unwrap()
});

/// Quality tag attached to every [`AnalysisRecord`].
///
/// `Detailed` records come from a validated generation response; `Basic`
/// records are placeholders synthesized when generation or sampling failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisQuality {
    Basic,
    Detailed,
}

impl AnalysisQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisQuality::Basic => "basic",
            AnalysisQuality::Detailed => "detailed",
        }
    }
}

impl FromStr for AnalysisQuality {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(AnalysisQuality::Basic),
            "detailed" => Ok(AnalysisQuality::Detailed),
            _ => Err(ParseError::WrongType {
                field: "analysisQuality",
                expected: "\"basic\" or \"detailed\"",
            }),
        }
    }
}

/// Identity of a repository analysis: case-sensitive `owner` + `repo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoKey {
    pub owner: String,
    pub repo: String,
}

impl RepoKey {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Extract the first `https://github.com/<owner>/<repo>` link in `text`.
    ///
    /// Profile links (`https://github.com/<user>`) are skipped. Trailing
    /// `.git` suffixes are dropped so the key matches the hosting API.
    pub fn from_github_url(text: &str) -> Option<Self> {
        GITHUB_REPO_LINK.captures_iter(text).find_map(|caps| {
            let owner = caps.get(1)?.as_str();
            let repo = caps.get(2)?.as_str().trim_end_matches(".git");
            (Self::is_valid_name(owner) && Self::is_valid_name(repo))
                .then(|| Self::new(owner, repo))
        })
    }

    /// Owner and repository names: ASCII letters, digits, `-`, `_` and `.`,
    /// at most 100 characters, never `.` or `..`.
    pub fn is_valid_name(s: &str) -> bool {
        !s.is_empty()
            && s.len() <= 100
            && s != "."
            && s != ".."
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }

    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepoKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('/');
        let trimmed = trimmed
            .strip_prefix("https://github.com/")
            .unwrap_or(trimmed);
        match trimmed.split_once('/') {
            Some((owner, repo)) if Self::is_valid_name(owner) && Self::is_valid_name(repo) => {
                Ok(Self::new(owner, repo))
            }
            _ => Err(format!("expected <owner>/<repo>, got '{}'", s)),
        }
    }
}

/// The unit of cached work product: a structured technical assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub summary: String,
    pub technical_highlights: String,
    pub key_features: Vec<String>,
    pub complexity: String,
    pub use_cases: Vec<String>,
    pub improvements: Vec<String>,
    pub last_analyzed: DateTime<Utc>,
    pub analysis_quality: AnalysisQuality,
}

impl AnalysisRecord {
    pub fn is_detailed(&self) -> bool {
        self.analysis_quality == AnalysisQuality::Detailed
    }
}

/// Opaque page snapshot returned by the page-scraping collaborator.
///
/// A failed scrape is still a `ScrapeData`: `success` is false, `error`
/// carries the reason, and `markdown` holds a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeData {
    pub success: bool,
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeData {
    pub fn failed(url: &str, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            markdown: format!("Failed to scrape {}: {}", url, error),
            metadata: serde_json::json!({
                "url": url,
                "title": page_slug(url),
                "description": format!("Failed to load project data: {}", error),
                "error": error.clone(),
            }),
            error: Some(error),
        }
    }
}

/// Last path segment of `url`, used as a stand-in title.
pub fn page_slug(url: &str) -> &str {
    match url.trim_end_matches('/').rsplit('/').next() {
        Some(s) if !s.is_empty() => s,
        _ => "Unknown Project",
    }
}

/// Unprocessed scrape of a project page. Created once per `id`, never overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawScrapeRecord {
    pub id: String,
    pub scrape_data: ScrapeData,
    /// Linked repository URL, or [`GITHUB_URL_NOT_FOUND`].
    pub github_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RawScrapeRecord {
    pub fn new(id: impl Into<String>, scrape_data: ScrapeData, now: DateTime<Utc>) -> Self {
        let github_url = RepoKey::from_github_url(&scrape_data.markdown)
            .map(|k| k.html_url())
            .unwrap_or_else(|| GITHUB_URL_NOT_FOUND.to_string());
        Self {
            id: id.into(),
            scrape_data,
            github_url,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn linked_repo(&self) -> Option<RepoKey> {
        if self.github_url == GITHUB_URL_NOT_FOUND {
            return None;
        }
        RepoKey::from_github_url(&self.github_url)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gallery {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    #[serde(default)]
    pub key_features: Vec<String>,
    #[serde(default)]
    pub technical_highlights: Vec<String>,
    #[serde(default)]
    pub impact_potential: Vec<String>,
    #[serde(default)]
    pub learning_curve: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<MemberLinks>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devpost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetails {
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub links: ProjectLinks,
    #[serde(default)]
    pub duration: String,
}

/// Structured project page extracted from a raw scrape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectPageData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub gallery: Gallery,
    pub summary: ProjectSummary,
    pub team: Vec<TeamMember>,
    pub details: ProjectDetails,
}

/// Repository analysis attached to a project, or the reason there is none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GithubAnalysis {
    Analysis(AnalysisRecord),
    Unavailable { error: String },
}

impl GithubAnalysis {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        GithubAnalysis::Unavailable {
            error: reason.into(),
        }
    }
}

/// The cached work product of the project-analysis path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalysis {
    pub id: String,
    pub analysis: ProjectPageData,
    pub github_analysis: GithubAnalysis,
    pub analysis_quality: AnalysisQuality,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository metadata reported by the source-hosting API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub default_branch: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub topics: Vec<String>,
    pub stars: u64,
    pub forks: u64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeEntryKind {
    Blob,
    Tree,
    Commit,
}

/// One entry of a recursive repository tree listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub kind: TreeEntryKind,
    pub sha: String,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: TreeEntryKind::Blob,
            sha: sha.into(),
        }
    }
}
