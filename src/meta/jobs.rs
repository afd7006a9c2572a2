//! Repository operations for scrape jobs

use super::{CatalogDb, ScrapeJob};
use crate::error::Result;

/// Jobs returned by `list_jobs` when no limit is given
pub const DEFAULT_JOB_LIST_LIMIT: i64 = 100;

impl CatalogDb {
    pub async fn insert_job(&self, job: &ScrapeJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scrape_jobs (
                id, target_url, target_type, status, items_scraped, retry_count, max_retries,
                started_at, finished_at, error_log, metadata, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.target_url)
        .bind(&job.target_type)
        .bind(&job.status)
        .bind(job.items_scraped)
        .bind(job.retry_count)
        .bind(job.max_retries)
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(&job.error_log)
        .bind(&job.metadata)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist lifecycle fields of an existing job
    pub async fn save_job(&self, job: &ScrapeJob) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE scrape_jobs SET
                status = ?, items_scraped = ?, retry_count = ?, started_at = ?,
                finished_at = ?, error_log = ?, metadata = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&job.status)
        .bind(job.items_scraped)
        .bind(job.retry_count)
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(&job.error_log)
        .bind(&job.metadata)
        .bind(job.updated_at)
        .bind(&job.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_job(&self, id: &str) -> Result<Option<ScrapeJob>> {
        let job = sqlx::query_as::<_, ScrapeJob>("SELECT * FROM scrape_jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    /// Most recent jobs first
    pub async fn list_jobs(&self, limit: i64) -> Result<Vec<ScrapeJob>> {
        let jobs = sqlx::query_as::<_, ScrapeJob>(
            "SELECT * FROM scrape_jobs ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{test_db, JobStatus, ScrapeTarget};
    use sqlx::types::Json;

    #[tokio::test]
    async fn test_job_insert_save_get() {
        let (db, _tmp) = test_db().await;

        let mut job = ScrapeJob::new("https://x.test/".into(), ScrapeTarget::Category, 3);
        job.metadata = Some(Json(serde_json::json!({ "category_slug": "fiction" })));
        db.insert_job(&job).await.unwrap();

        job.status = JobStatus::Failed.to_string();
        job.error_log = Some("boom".into());
        db.save_job(&job).await.unwrap();

        let loaded = db.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.get_status().unwrap(), JobStatus::Failed);
        assert_eq!(loaded.get_target().unwrap(), ScrapeTarget::Category);
        assert_eq!(loaded.error_log.as_deref(), Some("boom"));
        assert_eq!(
            loaded.metadata.unwrap().0["category_slug"],
            serde_json::json!("fiction")
        );
        assert!(db.get_job("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_jobs_newest_first() {
        let (db, _tmp) = test_db().await;

        let mut ids = Vec::new();
        for _ in 0..5 {
            let job = ScrapeJob::new("https://x.test/".into(), ScrapeTarget::Navigation, 3);
            db.insert_job(&job).await.unwrap();
            ids.push(job.id);
        }

        let jobs = db.list_jobs(3).await.unwrap();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].id, ids[4]);
        assert_eq!(jobs[2].id, ids[2]);
        assert_eq!(db.list_jobs(DEFAULT_JOB_LIST_LIMIT).await.unwrap().len(), 5);
    }
}
