//! Placeholder (`basic`) records substituted when a detailed analysis cannot
//! be produced.

use chrono::{DateTime, Utc};

use crate::models::{
    AnalysisQuality, AnalysisRecord, Gallery, ProjectDetails, ProjectPageData, ProjectSummary,
    TeamMember,
};

/// Coarse reason a detailed analysis could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    NotFound,
    AccessDenied,
    RateLimited,
    Timeout,
    Other(String),
}

fn basic(
    summary: String,
    technical_highlights: &str,
    key_features: &[&str],
    complexity: &str,
    use_cases: &[&str],
    improvements: &[&str],
    now: DateTime<Utc>,
) -> AnalysisRecord {
    let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    AnalysisRecord {
        summary,
        technical_highlights: technical_highlights.to_string(),
        key_features: owned(key_features),
        complexity: complexity.to_string(),
        use_cases: owned(use_cases),
        improvements: owned(improvements),
        last_analyzed: now,
        analysis_quality: AnalysisQuality::Basic,
    }
}

/// Record explaining why `label` could not be analysed.
pub fn analysis_failed(label: &str, cause: &FailureCause, now: DateTime<Utc>) -> AnalysisRecord {
    match cause {
        FailureCause::RateLimited => basic(
            format!("Analysis failed for {} due to AI rate limiting.", label),
            "AI service rate limit was exceeded. Please try again later.",
            &["Rate limit exceeded"],
            "Analysis unavailable due to API limits.",
            &["Retry analysis later"],
            &["Wait for API quota reset"],
            now,
        ),
        FailureCause::NotFound => basic(
            format!("Repository {} not found or is private.", label),
            "Please ensure the repository exists and is public, or the provided token has access.",
            &["Repository not accessible"],
            "Unable to determine due to error.",
            &[],
            &["Verify repository access and try again later."],
            now,
        ),
        FailureCause::AccessDenied => basic(
            format!("Access to {} was denied.", label),
            "The hosting or AI service refused the request. Check the configured credentials.",
            &["Access denied"],
            "Unable to determine due to error.",
            &[],
            &["Verify repository access and try again later."],
            now,
        ),
        FailureCause::Timeout => basic(
            format!("Analysis failed for {} because the request timed out.", label),
            "The request to GitHub or the AI service took too long to complete.",
            &["Request timeout"],
            "Unable to determine due to error.",
            &[],
            &["Retry analysis later"],
            now,
        ),
        FailureCause::Other(reason) => basic(
            format!("Failed to analyze {}.", label),
            &format!("Error: {}", reason),
            &["Analysis failed"],
            "Unable to determine due to error.",
            &[],
            &["Verify repository access and try again later."],
            now,
        ),
    }
}

/// Record for a repository with nothing worth sending to the model.
pub fn no_content(label: &str, now: DateTime<Utc>) -> AnalysisRecord {
    basic(
        format!(
            "Repository {} contains no primary code or documentation files for analysis.",
            label
        ),
        "Analysis could not be performed as no standard source code, README, or package manager files were found.",
        &["No analyzable content found"],
        "Unable to determine complexity due to limited content.",
        &[],
        &["Add source code or documentation to enable analysis"],
        now,
    )
}

/// Project page used when generation never produced a usable response.
pub fn fallback_project_page(id: &str, url: &str) -> ProjectPageData {
    ProjectPageData {
        id: id.to_string(),
        url: url.to_string(),
        title: "Untitled Project".to_string(),
        description: "Failed to parse project description".to_string(),
        gallery: Gallery::default(),
        summary: ProjectSummary {
            key_features: vec!["Project feature extraction failed".to_string()],
            technical_highlights: vec!["Technical analysis failed".to_string()],
            impact_potential: vec!["Impact analysis failed".to_string()],
            learning_curve: vec!["Learning curve analysis failed".to_string()],
        },
        team: vec![TeamMember {
            name: "Team Member".to_string(),
            role: "Developer".to_string(),
            avatar: "/default-avatar.png".to_string(),
            links: None,
        }],
        details: ProjectDetails {
            tech_stack: Vec::new(),
            links: Default::default(),
            duration: "Hackathon Project".to_string(),
        },
    }
}
