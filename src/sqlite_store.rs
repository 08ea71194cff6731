//! SQLite-backed [`AnalysisStore`] and [`ProjectStore`].
//!
//! List fields and nested project data are stored as JSON text; timestamps
//! as RFC 3339 strings.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use hackscope_core::catalog::{ProjectMatches, ProjectQuery};
use hackscope_core::models::{
    AnalysisQuality, AnalysisRecord, ProjectAnalysis, RawScrapeRecord, RepoKey,
};
use hackscope_core::store::{AnalysisStore, ProjectStore};

/// SQLite implementation of the persistent store traits.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("invalid timestamp in store: {}", s))?
        .with_timezone(&Utc))
}

fn row_to_record(row: &SqliteRow) -> Result<AnalysisRecord> {
    let list = |col: &str| -> Result<Vec<String>> {
        let raw: String = row.get(col);
        serde_json::from_str(&raw).with_context(|| format!("invalid {} column", col))
    };
    let quality: String = row.get("analysis_quality");
    let last_analyzed: String = row.get("last_analyzed");

    Ok(AnalysisRecord {
        summary: row.get("summary"),
        technical_highlights: row.get("technical_highlights"),
        key_features: list("key_features")?,
        complexity: row.get("complexity"),
        use_cases: list("use_cases")?,
        improvements: list("improvements")?,
        last_analyzed: parse_ts(&last_analyzed)?,
        analysis_quality: quality
            .parse::<AnalysisQuality>()
            .map_err(|e| anyhow::anyhow!(e.to_string()))?,
    })
}

fn row_to_project(row: &SqliteRow) -> Result<ProjectAnalysis> {
    let analysis_json: String = row.get("analysis_json");
    let github_json: String = row.get("github_analysis_json");
    let quality: String = row.get("analysis_quality");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(ProjectAnalysis {
        id: row.get("id"),
        analysis: serde_json::from_str(&analysis_json).context("invalid analysis_json")?,
        github_analysis: serde_json::from_str(&github_json)
            .context("invalid github_analysis_json")?,
        analysis_quality: quality
            .parse::<AnalysisQuality>()
            .map_err(|e| anyhow::anyhow!(e.to_string()))?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

const PROJECT_COLUMNS: &str =
    "id, analysis_json, github_analysis_json, analysis_quality, created_at, updated_at";

// Binds: the text needle five times, then the tech needle twice.
const PROJECT_FILTER: &str = r#"
    (? = ''
        OR instr(lower(id), ?) > 0
        OR instr(lower(COALESCE(json_extract(analysis_json, '$.title'), '')), ?) > 0
        OR instr(lower(COALESCE(json_extract(analysis_json, '$.description'), '')), ?) > 0
        OR instr(lower(COALESCE(json_extract(github_analysis_json, '$.summary'), '')), ?) > 0)
    AND (? = ''
        OR EXISTS (SELECT 1 FROM json_each(analysis_json, '$.details.techStack')
                   WHERE instr(lower(value), ?) > 0))
"#;

#[async_trait]
impl AnalysisStore for SqliteStore {
    async fn find_repo_analysis(&self, key: &RepoKey) -> Result<Option<AnalysisRecord>> {
        let row = sqlx::query(
            r#"
            SELECT summary, technical_highlights, key_features, complexity,
                   use_cases, improvements, last_analyzed, analysis_quality
            FROM repo_analyses
            WHERE owner = ? AND repo = ?
            "#,
        )
        .bind(&key.owner)
        .bind(&key.repo)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn upsert_repo_analysis(&self, key: &RepoKey, record: &AnalysisRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO repo_analyses (owner, repo, summary, technical_highlights,
                                       key_features, complexity, use_cases, improvements,
                                       last_analyzed, analysis_quality, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(owner, repo) DO UPDATE SET
                summary = excluded.summary,
                technical_highlights = excluded.technical_highlights,
                key_features = excluded.key_features,
                complexity = excluded.complexity,
                use_cases = excluded.use_cases,
                improvements = excluded.improvements,
                last_analyzed = excluded.last_analyzed,
                analysis_quality = excluded.analysis_quality,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&key.owner)
        .bind(&key.repo)
        .bind(&record.summary)
        .bind(&record.technical_highlights)
        .bind(serde_json::to_string(&record.key_features)?)
        .bind(&record.complexity)
        .bind(serde_json::to_string(&record.use_cases)?)
        .bind(serde_json::to_string(&record.improvements)?)
        .bind(format_ts(&record.last_analyzed))
        .bind(record.analysis_quality.as_str())
        .bind(format_ts(&Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_repo_analysis(&self, key: &RepoKey) -> Result<u64> {
        let result = sqlx::query("DELETE FROM repo_analyses WHERE owner = ? AND repo = ?")
            .bind(&key.owner)
            .bind(&key.repo)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_repo_analyses(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM repo_analyses")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl ProjectStore for SqliteStore {
    async fn find_raw_scrape(&self, id: &str) -> Result<Option<RawScrapeRecord>> {
        let row = sqlx::query(
            "SELECT id, scrape_json, github_url, created_at, updated_at FROM raw_scrapes WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let scrape_json: String = row.get("scrape_json");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");

        Ok(Some(RawScrapeRecord {
            id: row.get("id"),
            scrape_data: serde_json::from_str(&scrape_json).context("invalid scrape_json")?,
            github_url: row.get("github_url"),
            created_at: parse_ts(&created_at)?,
            updated_at: parse_ts(&updated_at)?,
        }))
    }

    async fn insert_raw_scrape(&self, record: &RawScrapeRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO raw_scrapes (id, scrape_json, github_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&record.id)
        .bind(serde_json::to_string(&record.scrape_data)?)
        .bind(&record.github_url)
        .bind(format_ts(&record.created_at))
        .bind(format_ts(&record.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_project_analysis(&self, id: &str) -> Result<Option<ProjectAnalysis>> {
        let row = sqlx::query(
            r#"
            SELECT id, analysis_json, github_analysis_json, analysis_quality, created_at, updated_at
            FROM project_analyses
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_project).transpose()
    }

    async fn upsert_project_analysis(&self, record: &ProjectAnalysis) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO project_analyses (id, analysis_json, github_analysis_json,
                                          analysis_quality, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                analysis_json = excluded.analysis_json,
                github_analysis_json = excluded.github_analysis_json,
                analysis_quality = excluded.analysis_quality,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.id)
        .bind(serde_json::to_string(&record.analysis)?)
        .bind(serde_json::to_string(&record.github_analysis)?)
        .bind(record.analysis_quality.as_str())
        .bind(format_ts(&record.created_at))
        .bind(format_ts(&record.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_project_analysis(&self, id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM project_analyses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_project_analyses(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM project_analyses")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn search_projects(&self, query: &ProjectQuery) -> Result<ProjectMatches> {
        let count_sql = format!("SELECT COUNT(*) FROM project_analyses WHERE {}", PROJECT_FILTER);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&query.text)
            .bind(&query.text)
            .bind(&query.text)
            .bind(&query.text)
            .bind(&query.text)
            .bind(&query.tech)
            .bind(&query.tech)
            .fetch_one(&self.pool)
            .await?;

        let page_sql = format!(
            "SELECT {} FROM project_analyses WHERE {} ORDER BY updated_at DESC, id ASC LIMIT ? OFFSET ?",
            PROJECT_COLUMNS, PROJECT_FILTER
        );
        let rows = sqlx::query(&page_sql)
            .bind(&query.text)
            .bind(&query.text)
            .bind(&query.text)
            .bind(&query.text)
            .bind(&query.text)
            .bind(&query.tech)
            .bind(&query.tech)
            .bind(i64::from(query.limit))
            .bind(query.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(ProjectMatches {
            projects: rows.iter().map(row_to_project).collect::<Result<_>>()?,
            total: total as u64,
        })
    }

    async fn sample_projects(&self, count: usize) -> Result<Vec<ProjectAnalysis>> {
        let sql = format!(
            "SELECT {} FROM project_analyses ORDER BY RANDOM() LIMIT ?",
            PROJECT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(count as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_project).collect()
    }
}
