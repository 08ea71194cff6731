//! Content sampler: turns a repository into a bounded text sample.
//!
//! Metadata and tree lookups are fatal for the sample and propagate to the
//! caller. Blob fetches run concurrently and fail one file at a time; a
//! failed file keeps its slot with a placeholder. When nothing usable comes
//! back the sample falls back to a metadata summary.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::join_all;

use hackscope_core::models::{RepoKey, TreeEntry};
use hackscope_core::sample::{
    assemble_sample, metadata_fallback, sanitize_content, select_files, ContentSample,
    FallbackReason, SampledFile, SanitizeMode, CONTENT_TOO_LARGE, CONTENT_UNAVAILABLE,
};

use crate::errors::AnalysisError;
use crate::github::SourceHost;

enum Fetched {
    Content(SampledFile),
    Placeholder(SampledFile),
    Empty,
}

pub struct ContentSampler {
    host: Arc<dyn SourceHost>,
    mode: SanitizeMode,
}

impl ContentSampler {
    pub fn new(host: Arc<dyn SourceHost>) -> Self {
        Self {
            host,
            mode: SanitizeMode::Permissive,
        }
    }

    pub fn with_mode(mut self, mode: SanitizeMode) -> Self {
        self.mode = mode;
        self
    }

    pub async fn sample(&self, key: &RepoKey) -> Result<ContentSample, AnalysisError> {
        let meta = self.host.repo_metadata(key).await?;
        let tree = self.host.tree(key, &meta.default_branch).await?;

        let selected = select_files(&tree);
        tracing::debug!(
            owner = %key.owner,
            repo = %key.repo,
            tree_entries = tree.len(),
            selected = selected.len(),
            "selected files for sampling"
        );

        if selected.is_empty() {
            tracing::info!(owner = %key.owner, repo = %key.repo, "no analysable files, using metadata");
            return Ok(ContentSample::MetadataOnly {
                text: metadata_fallback(key, &meta, FallbackReason::NoFiles),
                reason: FallbackReason::NoFiles,
            });
        }

        let fetched = join_all(selected.iter().map(|entry| self.fetch_file(key, entry))).await;

        let mut files = Vec::with_capacity(fetched.len());
        let mut with_content = 0usize;
        for item in fetched {
            match item {
                Fetched::Content(file) => {
                    with_content += 1;
                    files.push(file);
                }
                Fetched::Placeholder(file) => files.push(file),
                Fetched::Empty => {}
            }
        }

        if with_content == 0 {
            let reason = FallbackReason::FetchFailed {
                attempted: selected.len(),
            };
            tracing::warn!(
                owner = %key.owner,
                repo = %key.repo,
                attempted = selected.len(),
                "no file content could be fetched, using metadata"
            );
            return Ok(ContentSample::MetadataOnly {
                text: metadata_fallback(key, &meta, reason),
                reason,
            });
        }

        Ok(ContentSample::Files {
            text: assemble_sample(&files),
            file_count: files.len(),
        })
    }

    async fn fetch_file(&self, key: &RepoKey, entry: &TreeEntry) -> Fetched {
        let placeholder = |text: &str| {
            Fetched::Placeholder(SampledFile {
                path: entry.path.clone(),
                content: text.to_string(),
            })
        };

        match self.host.blob(key, &entry.sha).await {
            Ok(Some(encoded)) => match decode_blob(&encoded) {
                Some(raw) => Fetched::Content(SampledFile {
                    path: entry.path.clone(),
                    content: sanitize_content(&raw, self.mode),
                }),
                None => {
                    tracing::warn!(path = %entry.path, "blob is not valid base64");
                    placeholder(CONTENT_UNAVAILABLE)
                }
            },
            Ok(None) => Fetched::Empty,
            Err(AnalysisError::TooLarge { .. }) => {
                tracing::warn!(path = %entry.path, "blob too large to fetch");
                placeholder(CONTENT_TOO_LARGE)
            }
            Err(e) => {
                tracing::warn!(path = %entry.path, error = %e, "blob fetch failed");
                placeholder(CONTENT_UNAVAILABLE)
            }
        }
    }
}

/// Decode GitHub's line-wrapped base64 blob encoding.
fn decode_blob(encoded: &str) -> Option<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact.as_bytes()).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wrapped_base64() {
        let encoded = "IyBIZWxs\nbyB3b3Js\nZA==\n";
        assert_eq!(decode_blob(encoded).as_deref(), Some("# Hello world"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_blob("!!!not base64!!!").is_none());
    }
}
