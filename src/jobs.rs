//! Scrape job lifecycle
//!
//! ```text
//! pending ──► running ──► completed
//!    │           │
//!    │           └──────► failed
//!    └───────────┴──────► cancelled
//! ```
//!
//! `completed`, `failed` and `cancelled` are terminal. `retry_count` and
//! `max_retries` are recorded for each job but nothing retries a failed job.

use crate::error::{Error, Result};
use crate::meta::{CatalogDb, JobStatus, ScrapeJob, ScrapeTarget};
use chrono::Utc;
use sqlx::types::Json;
use tracing::debug;

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Pending, Cancelled)
                | (Running, Cancelled)
        )
    }
}

/// Records scrape attempts and moves them through their states
#[derive(Clone)]
pub struct JobTracker {
    db: CatalogDb,
    max_retries: i64,
}

impl JobTracker {
    pub fn new(db: CatalogDb, max_retries: i64) -> Self {
        Self { db, max_retries }
    }

    /// Insert a fresh `pending` job
    pub async fn create(
        &self,
        target_url: &str,
        target: ScrapeTarget,
        metadata: Option<serde_json::Value>,
    ) -> Result<ScrapeJob> {
        let mut job = ScrapeJob::new(target_url.to_string(), target, self.max_retries);
        job.metadata = metadata.map(Json);
        self.db.insert_job(&job).await?;
        debug!("Created {} job {} for {}", target, job.id, target_url);
        Ok(job)
    }

    /// `pending` to `running`, stamping `started_at`
    pub async fn start(&self, job: &mut ScrapeJob) -> Result<()> {
        self.transition(job, JobStatus::Running)?;
        job.started_at = Some(job.updated_at);
        self.db.save_job(job).await
    }

    /// `running` to `completed` with the accepted item count
    pub async fn complete(&self, job: &mut ScrapeJob, items_scraped: usize) -> Result<()> {
        self.transition(job, JobStatus::Completed)?;
        job.items_scraped = items_scraped as i64;
        job.finished_at = Some(job.updated_at);
        self.db.save_job(job).await
    }

    /// `running` to `failed` with the error text
    pub async fn fail(&self, job: &mut ScrapeJob, error_log: &str) -> Result<()> {
        self.transition(job, JobStatus::Failed)?;
        job.error_log = Some(error_log.to_string());
        job.finished_at = Some(job.updated_at);
        self.db.save_job(job).await
    }

    /// Administrative cancel of a job that has not finished
    pub async fn cancel(&self, job: &mut ScrapeJob) -> Result<()> {
        self.transition(job, JobStatus::Cancelled)?;
        job.finished_at = Some(job.updated_at);
        self.db.save_job(job).await
    }

    fn transition(&self, job: &mut ScrapeJob, next: JobStatus) -> Result<()> {
        let current = job.get_status()?;
        if !current.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        job.status = next.to_string();
        job.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::test_db;

    #[test]
    fn test_transition_table() {
        use JobStatus::*;
        let all = [Pending, Running, Completed, Failed, Cancelled];
        for from in all {
            for to in all {
                if from.is_terminal() {
                    assert!(!from.can_transition_to(to), "{from} -> {to}");
                }
            }
        }
        assert!(Pending.can_transition_to(Running));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Running.can_transition_to(Pending));
        assert!(Running.can_transition_to(Cancelled));
    }

    #[tokio::test]
    async fn test_success_path() {
        let (db, _tmp) = test_db().await;
        let tracker = JobTracker::new(db.clone(), 3);

        let mut job = tracker
            .create("https://x.test/", ScrapeTarget::Navigation, None)
            .await
            .unwrap();
        tracker.start(&mut job).await.unwrap();
        tracker.complete(&mut job, 7).await.unwrap();

        let stored = db.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.get_status().unwrap(), JobStatus::Completed);
        assert_eq!(stored.items_scraped, 7);
        assert!(stored.started_at.is_some());
        assert!(stored.finished_at >= stored.started_at);
        assert_eq!(stored.retry_count, 0);
    }

    #[tokio::test]
    async fn test_terminal_jobs_are_not_resurrected() {
        let (db, _tmp) = test_db().await;
        let tracker = JobTracker::new(db.clone(), 3);

        let mut job = tracker
            .create("https://x.test/", ScrapeTarget::Category, None)
            .await
            .unwrap();
        tracker.start(&mut job).await.unwrap();
        tracker.fail(&mut job, "navigation timeout").await.unwrap();

        let err = tracker.start(&mut job).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert!(tracker.complete(&mut job, 1).await.is_err());

        let stored = db.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.get_status().unwrap(), JobStatus::Failed);
        assert_eq!(stored.error_log.as_deref(), Some("navigation timeout"));
    }

    #[tokio::test]
    async fn test_cancel_pending() {
        let (db, _tmp) = test_db().await;
        let tracker = JobTracker::new(db, 5);

        let mut job = tracker
            .create(
                "https://x.test/p",
                ScrapeTarget::ProductDetail,
                Some(serde_json::json!({ "source_id": "p" })),
            )
            .await
            .unwrap();
        assert_eq!(job.max_retries, 5);
        tracker.cancel(&mut job).await.unwrap();
        assert_eq!(job.get_status().unwrap(), JobStatus::Cancelled);
        assert!(tracker.start(&mut job).await.is_err());
    }
}
