//! Parsing and structural validation of generation output and cached records.
//!
//! Model output is free-form text that is *expected* to contain JSON. The
//! functions here turn that text into either a fully typed value or a
//! [`ParseError`] describing exactly what was wrong; nothing partially typed
//! escapes this module.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::catalog::{ProjectScore, ScoreCategories};
use crate::models::{AnalysisQuality, AnalysisRecord, ProjectAnalysis, ProjectPageData};

/// Why a piece of text or a cached value could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The text was not valid JSON.
    InvalidJson(String),
    /// The JSON was valid but not an object.
    NotAnObject,
    MissingField(&'static str),
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    EmptyField(&'static str),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidJson(e) => write!(f, "response is not valid JSON: {}", e),
            ParseError::NotAnObject => write!(f, "response JSON is not an object"),
            ParseError::MissingField(name) => write!(f, "missing required field '{}'", name),
            ParseError::WrongType { field, expected } => {
                write!(f, "field '{}' must be {}", field, expected)
            }
            ParseError::EmptyField(name) => write!(f, "field '{}' must not be empty", name),
        }
    }
}

impl std::error::Error for ParseError {}

/// The six generated fields of an [`AnalysisRecord`], before it is stamped.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisBody {
    pub summary: String,
    pub technical_highlights: String,
    pub key_features: Vec<String>,
    pub complexity: String,
    pub use_cases: Vec<String>,
    pub improvements: Vec<String>,
}

impl AnalysisBody {
    pub fn into_record(self, quality: AnalysisQuality, now: DateTime<Utc>) -> AnalysisRecord {
        AnalysisRecord {
            summary: self.summary,
            technical_highlights: self.technical_highlights,
            key_features: self.key_features,
            complexity: self.complexity,
            use_cases: self.use_cases,
            improvements: self.improvements,
            last_analyzed: now,
            analysis_quality: quality,
        }
    }
}

/// Strip a surrounding fenced code block (```` ``` ```` or ```` ```json ````).
///
/// Text without a fence is returned trimmed but otherwise unchanged.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim()
}

/// Locate a fenced block anywhere in the text; used for the chattier
/// project-page responses that put prose around the JSON.
fn extract_embedded_fence(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    let end = after.find("```")?;
    Some(after[..end].trim())
}

fn parse_object(text: &str) -> Result<Map<String, Value>, ParseError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ParseError::NotAnObject),
    }
}

fn required_string(
    obj: &Map<String, Value>,
    field: &'static str,
    non_empty: bool,
) -> Result<String, ParseError> {
    let value = obj.get(field).ok_or(ParseError::MissingField(field))?;
    let s = value.as_str().ok_or(ParseError::WrongType {
        field,
        expected: "a string",
    })?;
    if non_empty && s.trim().is_empty() {
        return Err(ParseError::EmptyField(field));
    }
    Ok(s.to_string())
}

fn required_string_array(
    obj: &Map<String, Value>,
    field: &'static str,
    non_empty_items: bool,
) -> Result<Vec<String>, ParseError> {
    let value = obj.get(field).ok_or(ParseError::MissingField(field))?;
    let items = value.as_array().ok_or(ParseError::WrongType {
        field,
        expected: "an array of strings",
    })?;
    items
        .iter()
        .map(|item| {
            let s = item.as_str().ok_or(ParseError::WrongType {
                field,
                expected: "an array of strings",
            })?;
            if non_empty_items && s.trim().is_empty() {
                return Err(ParseError::EmptyField(field));
            }
            Ok(s.to_string())
        })
        .collect()
}

/// Parse a repository-analysis response into its six generated fields.
///
/// `summary`, `technicalHighlights` and `complexity` must be non-empty
/// strings; `keyFeatures` must be an array of non-empty strings; `useCases`
/// and `improvements` must be arrays of strings.
pub fn parse_repo_analysis(text: &str) -> Result<AnalysisBody, ParseError> {
    let obj = parse_object(strip_code_fences(text))?;
    Ok(AnalysisBody {
        summary: required_string(&obj, "summary", true)?,
        technical_highlights: required_string(&obj, "technicalHighlights", true)?,
        key_features: required_string_array(&obj, "keyFeatures", true)?,
        complexity: required_string(&obj, "complexity", true)?,
        use_cases: required_string_array(&obj, "useCases", false)?,
        improvements: required_string_array(&obj, "improvements", false)?,
    })
}

/// Parse a project-page response. `gallery`, `summary`, `team` and
/// `details` must be present with the right shapes; the scalar fields are
/// filled in by the caller.
pub fn parse_project_page(text: &str) -> Result<ProjectPageData, ParseError> {
    let candidate = match strip_code_fences(text) {
        s if s.starts_with('{') => s,
        s => extract_embedded_fence(s).unwrap_or(s),
    };
    let obj = parse_object(candidate)?;

    for (field, expected) in [
        ("gallery", "an object"),
        ("summary", "an object"),
        ("team", "an array"),
        ("details", "an object"),
    ] {
        let value = obj.get(field).ok_or(ParseError::MissingField(field))?;
        let ok = if field == "team" {
            value.is_array()
        } else {
            value.is_object()
        };
        if !ok {
            return Err(ParseError::WrongType { field, expected });
        }
    }

    serde_json::from_value(Value::Object(obj)).map_err(|e| ParseError::InvalidJson(e.to_string()))
}

fn required_score(obj: &Map<String, Value>, field: &'static str) -> Result<u8, ParseError> {
    let value = obj.get(field).ok_or(ParseError::MissingField(field))?;
    match value.as_f64() {
        Some(n) if (0.0..=100.0).contains(&n) => Ok(n.round() as u8),
        _ => Err(ParseError::WrongType {
            field,
            expected: "a number between 0 and 100",
        }),
    }
}

/// Parse a scoring response: an `overall` score plus the four categories.
pub fn parse_project_score(text: &str) -> Result<ProjectScore, ParseError> {
    let obj = parse_object(strip_code_fences(text))?;
    let overall = required_score(&obj, "overall")?;
    let categories = obj
        .get("categories")
        .ok_or(ParseError::MissingField("categories"))?
        .as_object()
        .ok_or(ParseError::WrongType {
            field: "categories",
            expected: "an object",
        })?;
    Ok(ProjectScore {
        overall,
        categories: ScoreCategories {
            innovation: required_score(categories, "Innovation")?,
            technical: required_score(categories, "Technical")?,
            design: required_score(categories, "Design")?,
            impact: required_score(categories, "Impact")?,
        },
    })
}

/// Parse a value read back from the fast cache into a record.
pub fn record_from_value(value: &Value) -> Result<AnalysisRecord, ParseError> {
    let obj = value.as_object().ok_or(ParseError::NotAnObject)?;
    for field in [
        "summary",
        "technicalHighlights",
        "keyFeatures",
        "complexity",
        "useCases",
        "improvements",
        "lastAnalyzed",
        "analysisQuality",
    ] {
        if !obj.contains_key(field) {
            return Err(ParseError::MissingField(field));
        }
    }
    let record: AnalysisRecord = serde_json::from_value(value.clone())
        .map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    validate_record(&record)?;
    Ok(record)
}

/// Full structural check of a stamped record.
///
/// Placeholder (`basic`) records pass as long as their text fields and the
/// key-feature list are populated.
pub fn validate_record(record: &AnalysisRecord) -> Result<(), ParseError> {
    if record.summary.trim().is_empty() {
        return Err(ParseError::EmptyField("summary"));
    }
    if record.technical_highlights.trim().is_empty() {
        return Err(ParseError::EmptyField("technicalHighlights"));
    }
    if record.complexity.trim().is_empty() {
        return Err(ParseError::EmptyField("complexity"));
    }
    if record.key_features.is_empty() || record.key_features.iter().any(|f| f.trim().is_empty())
    {
        return Err(ParseError::EmptyField("keyFeatures"));
    }
    Ok(())
}

/// Parse and check a cached project analysis.
pub fn project_from_value(value: &Value) -> Result<ProjectAnalysis, ParseError> {
    let project: ProjectAnalysis = serde_json::from_value(value.clone())
        .map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    validate_project(&project)?;
    Ok(project)
}

pub fn validate_project(project: &ProjectAnalysis) -> Result<(), ParseError> {
    if project.id.trim().is_empty() {
        return Err(ParseError::EmptyField("id"));
    }
    if project.analysis.title.trim().is_empty() {
        return Err(ParseError::EmptyField("title"));
    }
    if let crate::models::GithubAnalysis::Analysis(record) = &project.github_analysis {
        validate_record(record)?;
    }
    Ok(())
}
