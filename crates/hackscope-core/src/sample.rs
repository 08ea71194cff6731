//! Content sampling policy.
//!
//! Pure functions deciding *which* repository files are sent to the
//! generation API and *how* each file's content is cleaned up. The I/O side
//! (fetching the tree and blobs) lives in the native crate.
//!
//! # Selection
//!
//! 1. Every blob whose path ends with one of [`IMPORTANT_FILES`] is taken.
//! 2. Remaining blobs with one of [`SOURCE_EXTENSIONS`] (case-insensitive)
//!    fill the rest of the [`MAX_FILES_TO_ANALYZE`] budget, in tree order.
//!
//! # Output format
//!
//! ```text
//! File: README.md
//!
//! <content>
//!
//! ---
//!
//! File: src/main.rs
//!
//! <content>
//! ```

use crate::models::{RepoKey, RepoMetadata, TreeEntry, TreeEntryKind};

pub const MAX_FILES_TO_ANALYZE: usize = 30;

/// Per-file byte budget before truncation.
pub const MAX_FILE_BYTES: usize = 50_000;

pub const TRUNCATION_MARKER: &str = "\n...[truncated due to size]...\n";

/// Placeholder used when a blob exists but could not be fetched.
pub const CONTENT_UNAVAILABLE: &str = "[Content Unavailable]";

/// Placeholder used when the hosting API refuses a blob for its size.
pub const CONTENT_TOO_LARGE: &str = "[Content Too Large To Fetch]";

const FILE_SEPARATOR: &str = "\n\n---\n\n";

/// Manifest and readme names, matched by path suffix.
pub const IMPORTANT_FILES: &[&str] = &[
    "README.md",
    "package.json",
    "requirements.txt",
    "go.mod",
    "pom.xml",
    "build.gradle",
];

pub const SOURCE_EXTENSIONS: &[&str] = &[
    ".md", ".txt", ".js", ".ts", ".py", ".go", ".java", ".rb", ".php", ".cs", ".c", ".cpp", ".rs",
];

/// Character filter applied after truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SanitizeMode {
    /// Keep printable ASCII plus `\n`, `\r` and `\t`.
    Strict,
    /// Keep any character except non-whitespace control characters.
    #[default]
    Permissive,
}

/// A fetched and sanitized file.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledFile {
    pub path: String,
    pub content: String,
}

/// Why a sample carries repository metadata instead of file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The tree had no important or source files.
    NoFiles,
    /// Files were selected but none of them could be fetched.
    FetchFailed { attempted: usize },
}

/// Bounded text handed to the generation API.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentSample {
    Files { text: String, file_count: usize },
    MetadataOnly { text: String, reason: FallbackReason },
}

impl ContentSample {
    pub fn text(&self) -> &str {
        match self {
            ContentSample::Files { text, .. } => text,
            ContentSample::MetadataOnly { text, .. } => text,
        }
    }

    pub fn has_no_files(&self) -> bool {
        matches!(
            self,
            ContentSample::MetadataOnly {
                reason: FallbackReason::NoFiles,
                ..
            }
        )
    }
}

pub fn is_important(path: &str) -> bool {
    IMPORTANT_FILES.iter().any(|name| path.ends_with(name))
}

pub fn has_source_extension(path: &str) -> bool {
    let lower = path.to_lowercase();
    SOURCE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Choose the files to sample: all important files first, then eligible
/// source/doc files in tree order, up to [`MAX_FILES_TO_ANALYZE`] in total.
pub fn select_files(entries: &[TreeEntry]) -> Vec<&TreeEntry> {
    let blobs = entries
        .iter()
        .filter(|e| e.kind == TreeEntryKind::Blob && !e.path.is_empty() && !e.sha.is_empty());

    let important: Vec<&TreeEntry> = blobs.clone().filter(|e| is_important(&e.path)).collect();
    let remaining = MAX_FILES_TO_ANALYZE.saturating_sub(important.len());
    let others = blobs
        .filter(|e| !is_important(&e.path) && has_source_extension(&e.path))
        .take(remaining);

    important.into_iter().chain(others).collect()
}

/// Largest char boundary in `s` that is `<= max`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn keep_char(c: char, mode: SanitizeMode) -> bool {
    match mode {
        SanitizeMode::Strict => matches!(c, '\x20'..='\x7E' | '\n' | '\r' | '\t'),
        SanitizeMode::Permissive => !c.is_control() || c.is_whitespace(),
    }
}

/// Truncate to [`MAX_FILE_BYTES`] (appending [`TRUNCATION_MARKER`]) and
/// drop characters the mode disallows.
pub fn sanitize_content(content: &str, mode: SanitizeMode) -> String {
    let cut = floor_char_boundary(content, MAX_FILE_BYTES);
    let truncated = cut < content.len();

    let mut out: String = content[..cut].chars().filter(|c| keep_char(*c, mode)).collect();
    if truncated {
        out.push_str(TRUNCATION_MARKER);
    }
    out
}

/// Join sampled files into the `File: <path>` block format.
pub fn assemble_sample(files: &[SampledFile]) -> String {
    files
        .iter()
        .map(|f| format!("File: {}\n\n{}", f.path, f.content))
        .collect::<Vec<_>>()
        .join(FILE_SEPARATOR)
}

/// Synthetic sample built from repository metadata alone.
pub fn metadata_fallback(key: &RepoKey, meta: &RepoMetadata, reason: FallbackReason) -> String {
    let topics = if meta.topics.is_empty() {
        "None".to_string()
    } else {
        meta.topics.join(", ")
    };
    let note = match reason {
        FallbackReason::NoFiles => "NOTE: No primary code or documentation files (like README, package.json, source files) were identified for detailed analysis.".to_string(),
        FallbackReason::FetchFailed { attempted } => format!(
            "NOTE: Attempted to fetch {} files, but encountered errors retrieving their content.",
            attempted
        ),
    };

    format!(
        "Repository: {key}\n\
         Default Branch: {branch}\n\
         Description: {description}\n\
         Language: {language}\n\
         Topics: {topics}\n\
         Created: {created}\n\
         Last Updated: {updated}\n\
         Stars: {stars}\n\
         Forks: {forks}\n\
         \n\
         {note}",
        key = key,
        branch = meta.default_branch,
        description = meta
            .description
            .as_deref()
            .unwrap_or("No description available"),
        language = meta.language.as_deref().unwrap_or("Not specified"),
        topics = topics,
        created = meta.created_at.as_deref().unwrap_or("unknown"),
        updated = meta.updated_at.as_deref().unwrap_or("unknown"),
        stars = meta.stars,
        forks = meta.forks,
        note = note,
    )
}
