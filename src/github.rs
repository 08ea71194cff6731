//! Source-hosting collaborator: repository metadata, trees and blobs.
//!
//! [`SourceHost`] is the seam the sampler depends on; [`GitHubClient`] talks
//! to the GitHub REST API. Status codes are mapped onto [`AnalysisError`] so
//! callers can tell a missing repository from an exhausted quota.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;

use hackscope_core::models::{RepoKey, RepoMetadata, TreeEntry, TreeEntryKind};

use crate::config::GithubConfig;
use crate::errors::{from_transport, AnalysisError};

const SERVICE: &str = "GitHub";

/// Read-only view of a source-hosting API.
#[async_trait]
pub trait SourceHost: Send + Sync {
    async fn repo_metadata(&self, key: &RepoKey) -> Result<RepoMetadata, AnalysisError>;

    /// Full recursive tree listing of `branch`.
    async fn tree(&self, key: &RepoKey, branch: &str) -> Result<Vec<TreeEntry>, AnalysisError>;

    /// Base64-encoded blob content; `None` when the blob is empty.
    async fn blob(&self, key: &RepoKey, sha: &str) -> Result<Option<String>, AnalysisError>;
}

#[derive(Deserialize)]
struct RepoResponse {
    default_branch: String,
    description: Option<String>,
    language: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    created_at: Option<String>,
    updated_at: Option<String>,
}

#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeItem {
    #[serde(default)]
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    sha: String,
}

#[derive(Deserialize)]
struct BlobResponse {
    #[serde(default)]
    content: String,
}

/// GitHub REST client.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &GithubConfig, token: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        resource: &str,
    ) -> Result<T, AnalysisError> {
        let url = format!("{}{}", self.api_url, path);
        let mut req = self
            .http
            .get(&url)
            .header(USER_AGENT, concat!("hackscope/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| from_transport(SERVICE, resource, e))?;

        let status = resp.status();
        if !status.is_success() {
            let headers = resp.headers().clone();
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, &headers, &body, resource));
        }

        resp.json::<T>()
            .await
            .map_err(|e| from_transport(SERVICE, resource, e))
    }
}

#[async_trait]
impl SourceHost for GitHubClient {
    async fn repo_metadata(&self, key: &RepoKey) -> Result<RepoMetadata, AnalysisError> {
        let resource = format!("repository {}", key);
        let repo: RepoResponse = self
            .get_json(&format!("/repos/{}/{}", key.owner, key.repo), &resource)
            .await?;

        Ok(RepoMetadata {
            default_branch: repo.default_branch,
            description: repo.description,
            language: repo.language,
            topics: repo.topics,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            created_at: repo.created_at,
            updated_at: repo.updated_at,
        })
    }

    async fn tree(&self, key: &RepoKey, branch: &str) -> Result<Vec<TreeEntry>, AnalysisError> {
        let resource = format!("tree {}@{}", key, branch);
        let resp: TreeResponse = self
            .get_json(
                &format!(
                    "/repos/{}/{}/git/trees/{}?recursive=1",
                    key.owner, key.repo, branch
                ),
                &resource,
            )
            .await?;

        if resp.truncated {
            tracing::warn!(owner = %key.owner, repo = %key.repo, "tree listing truncated by host");
        }

        Ok(resp
            .tree
            .into_iter()
            .filter_map(|item| {
                let kind = match item.kind.as_str() {
                    "blob" => TreeEntryKind::Blob,
                    "tree" => TreeEntryKind::Tree,
                    "commit" => TreeEntryKind::Commit,
                    _ => return None,
                };
                Some(TreeEntry {
                    path: item.path,
                    kind,
                    sha: item.sha,
                })
            })
            .collect())
    }

    async fn blob(&self, key: &RepoKey, sha: &str) -> Result<Option<String>, AnalysisError> {
        let resource = format!("blob {} in {}", sha, key);
        let resp: BlobResponse = self
            .get_json(
                &format!("/repos/{}/{}/git/blobs/{}", key.owner, key.repo, sha),
                &resource,
            )
            .await?;
        Ok(Some(resp.content).filter(|c| !c.trim().is_empty()))
    }
}

/// Map a non-success GitHub response onto the error taxonomy.
pub(crate) fn classify_status(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    resource: &str,
) -> AnalysisError {
    let lower = body.to_lowercase();
    match status {
        StatusCode::NOT_FOUND => AnalysisError::not_found(resource),
        StatusCode::FORBIDDEN if lower.contains("too large") => AnalysisError::TooLarge {
            resource: resource.to_string(),
        },
        StatusCode::FORBIDDEN if lower.contains("rate limit") => AnalysisError::RateLimited {
            reset_hint: reset_hint(headers),
        },
        StatusCode::TOO_MANY_REQUESTS => AnalysisError::RateLimited {
            reset_hint: reset_hint(headers),
        },
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => AnalysisError::AccessDenied {
            message: format!("{} refused access to {}", SERVICE, resource),
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            AnalysisError::timeout(format!("{} {}", SERVICE, resource))
        }
        other => AnalysisError::upstream(SERVICE, format!("HTTP {} for {}", other, resource)),
    }
}

fn reset_hint(headers: &HeaderMap) -> Option<String> {
    let epoch: i64 = headers
        .get("x-ratelimit-reset")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    let at: DateTime<Utc> = DateTime::from_timestamp(epoch, 0)?;
    Some(at.format("%H:%M:%S UTC").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn not_found_maps_to_not_found() {
        let err = classify_status(
            StatusCode::NOT_FOUND,
            &HeaderMap::new(),
            r#"{"message":"Not Found"}"#,
            "repository o/r",
        );
        assert!(matches!(err, AnalysisError::NotFound { .. }));
    }

    #[test]
    fn forbidden_is_split_by_body() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("0"));

        let err = classify_status(
            StatusCode::FORBIDDEN,
            &headers,
            "API rate limit exceeded for 1.2.3.4",
            "repository o/r",
        );
        match err {
            AnalysisError::RateLimited { reset_hint } => {
                assert_eq!(reset_hint.as_deref(), Some("00:00:00 UTC"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = classify_status(
            StatusCode::FORBIDDEN,
            &HeaderMap::new(),
            "This API returns blobs up to 1 MB in size. The requested blob is too large",
            "blob abc",
        );
        assert!(matches!(err, AnalysisError::TooLarge { .. }));

        let err = classify_status(
            StatusCode::FORBIDDEN,
            &HeaderMap::new(),
            "Resource not accessible by integration",
            "repository o/r",
        );
        assert!(matches!(err, AnalysisError::AccessDenied { .. }));
    }

    #[test]
    fn server_errors_are_upstream() {
        let err = classify_status(
            StatusCode::BAD_GATEWAY,
            &HeaderMap::new(),
            "",
            "repository o/r",
        );
        assert!(matches!(err, AnalysisError::Upstream { .. }));
    }

    #[test]
    fn missing_reset_header_gives_no_hint() {
        assert_eq!(reset_hint(&HeaderMap::new()), None);
    }
}
