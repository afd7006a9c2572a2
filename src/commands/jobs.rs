//! Job inspection commands

use crate::error::{Error, Result};
use crate::meta::{CatalogDb, ScrapeJob};
use tracing::info;

/// Most recent scrape jobs, newest first
pub async fn cmd_list_jobs(db: &CatalogDb, limit: i64) -> Result<Vec<ScrapeJob>> {
    info!("Listing up to {} scrape jobs", limit);
    db.list_jobs(limit.max(1)).await
}

pub async fn cmd_get_job(db: &CatalogDb, id: &str) -> Result<ScrapeJob> {
    db.get_job(id)
        .await?
        .ok_or_else(|| Error::JobNotFound(id.to_string()))
}

pub fn print_jobs(jobs: &[ScrapeJob]) {
    println!("\n🗂  Scrape Jobs\n");

    if jobs.is_empty() {
        println!("No scrape jobs recorded yet.");
        return;
    }

    for job in jobs {
        println!(
            "• {} [{} / {}] {} item(s)  {}",
            job.id,
            job.target_type,
            job.status,
            job.items_scraped,
            job.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        println!("    {}", job.target_url);
        if let Some(err) = &job.error_log {
            println!("    error: {}", err);
        }
    }
}

pub fn print_job(job: &ScrapeJob) {
    println!("Job {}", job.id);
    println!("  Target:   {} ({})", job.target_url, job.target_type);
    println!("  Status:   {}", job.status);
    println!("  Items:    {}", job.items_scraped);
    println!("  Retries:  {}/{}", job.retry_count, job.max_retries);
    println!("  Created:  {}", job.created_at.to_rfc3339());
    if let Some(started) = job.started_at {
        println!("  Started:  {}", started.to_rfc3339());
    }
    if let Some(finished) = job.finished_at {
        println!("  Finished: {}", finished.to_rfc3339());
    }
    if let Some(err) = &job.error_log {
        println!("  Error:    {}", err);
    }
    if let Some(metadata) = &job.metadata {
        println!("  Metadata: {}", metadata.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{test_db, ScrapeTarget};

    #[tokio::test]
    async fn test_get_missing_job_is_not_found() {
        let (db, _tmp) = test_db().await;
        let err = cmd_get_job(&db, "nope").await.unwrap_err();
        assert!(matches!(err, Error::JobNotFound(ref id) if id == "nope"));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_and_get() {
        let (db, _tmp) = test_db().await;
        let job = ScrapeJob::new("https://x.test/".into(), ScrapeTarget::Navigation, 3);
        db.insert_job(&job).await.unwrap();

        let jobs = cmd_list_jobs(&db, 0).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(cmd_get_job(&db, &job.id).await.unwrap().id, job.id);
    }
}
