use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Latest analysis per repository; (owner, repo) is case-sensitive.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS repo_analyses (
            owner TEXT NOT NULL,
            repo TEXT NOT NULL,
            summary TEXT NOT NULL,
            technical_highlights TEXT NOT NULL,
            key_features TEXT NOT NULL DEFAULT '[]',
            complexity TEXT NOT NULL,
            use_cases TEXT NOT NULL DEFAULT '[]',
            improvements TEXT NOT NULL DEFAULT '[]',
            last_analyzed TEXT NOT NULL,
            analysis_quality TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (owner, repo)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Raw page snapshots, written once per id
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS raw_scrapes (
            id TEXT PRIMARY KEY,
            scrape_json TEXT NOT NULL,
            github_url TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_analyses (
            id TEXT PRIMARY KEY,
            analysis_json TEXT NOT NULL,
            github_analysis_json TEXT NOT NULL,
            analysis_quality TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Shared fast cache; expires_at is unix millis, NULL = never
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cache_entries (
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL,
            expires_at INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_project_analyses_updated_at ON project_analyses(updated_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_repo_analyses_last_analyzed ON repo_analyses(last_analyzed DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
