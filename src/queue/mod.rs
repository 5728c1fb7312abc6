//! Redis-backed Work Queue (C4): a `main` job list, a `dlq` dead-letter
//! list, and one `job:<id>` status hash per job with a 24h expiry.
//!
//! Grounded in the original's `src/main.py` queue endpoints: `/submit-job`
//! (`LPUSH` + `HSET` + `EXPIRE`), `/queue/status` (`LLEN`), `/queue/*/items`
//! (`LRANGE`), the DLQ requeue/delete handlers (linear scan + `LREM`), and
//! `/queue/dlq/requeue-all` (`RPOPLPUSH` loop).

use chrono::Utc;
use redis::AsyncCommands;

use crate::errors::QueueError;
use crate::models::{JobEnvelope, JobStatus, JobStatusRecord};

const STATUS_TTL_SECS: i64 = 86_400;

/// Cheap to clone: `ConnectionManager` multiplexes over one shared connection,
/// so every clone (one per axum handler invocation, one in the worker loop)
/// talks to the same Redis connection rather than opening a new one.
#[derive(Clone)]
pub struct WorkQueue {
    redis: redis::aio::ConnectionManager,
    main_list: String,
    dlq_list: String,
}

impl WorkQueue {
    pub async fn connect(redis_url: &str, main_list: &str, dlq_list: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        let redis = client.get_connection_manager().await?;
        Ok(Self {
            redis,
            main_list: main_list.to_string(),
            dlq_list: dlq_list.to_string(),
        })
    }

    fn status_key(job_id: &uuid::Uuid) -> String {
        format!("job:{job_id}")
    }

    /// Pushes `job` onto the main list and writes its initial status hash
    /// (NewsAgent §4.4 / the original's `/submit-job`). Returns the queue
    /// depth observed immediately after the push.
    pub async fn enqueue(&mut self, job: &JobEnvelope) -> Result<i64, QueueError> {
        let payload = serde_json::to_string(job)?;
        let record = JobStatusRecord {
            status: JobStatus::Queued,
            source_url: job.source_url.clone(),
            created_at: job.timestamp.clone(),
            result: None,
            error: None,
            traceback: None,
        };

        let _: () = self.redis.lpush(&self.main_list, payload).await?;
        self.write_status(&job.job_id, &record).await?;

        let depth: i64 = self.redis.llen(&self.main_list).await?;
        Ok(depth)
    }

    async fn write_status(&mut self, job_id: &uuid::Uuid, record: &JobStatusRecord) -> Result<(), QueueError> {
        let key = Self::status_key(job_id);
        let fields: Vec<(&str, String)> = vec![
            ("status", serde_json::to_value(&record.status)?.as_str().unwrap_or_default().to_string()),
            ("source_url", record.source_url.clone()),
            ("created_at", record.created_at.clone()),
            ("result", record.result.as_ref().map(|v| v.to_string()).unwrap_or_default()),
            ("error", record.error.clone().unwrap_or_default()),
            ("traceback", record.traceback.clone().unwrap_or_default()),
        ];
        let _: () = self.redis.hset_multiple(&key, &fields).await?;
        let _: () = self.redis.expire(&key, STATUS_TTL_SECS).await?;
        Ok(())
    }

    /// Blocks on the main list until a job arrives (worker loop's top-level
    /// poll). Marks the job `Processing` before returning it.
    pub async fn dequeue_blocking(&mut self, timeout_secs: f64) -> Result<Option<JobEnvelope>, QueueError> {
        let reply: Option<(String, String)> = self.redis.brpop(&self.main_list, timeout_secs).await?;
        let Some((_, payload)) = reply else {
            return Ok(None);
        };
        let job: JobEnvelope = serde_json::from_str(&payload)?;
        self.set_status(&job.job_id, JobStatus::Processing).await?;
        Ok(Some(job))
    }

    pub async fn set_status(&mut self, job_id: &uuid::Uuid, status: JobStatus) -> Result<(), QueueError> {
        let key = Self::status_key(job_id);
        let value = serde_json::to_value(status)?;
        let s = value.as_str().unwrap_or_default();
        let _: () = self.redis.hset(&key, "status", s).await?;
        Ok(())
    }

    pub async fn mark_completed(&mut self, job_id: &uuid::Uuid, result: &serde_json::Value) -> Result<(), QueueError> {
        let key = Self::status_key(job_id);
        let fields = [
            ("status", serde_json::to_value(JobStatus::Completed)?.as_str().unwrap_or_default().to_string()),
            ("result", result.to_string()),
        ];
        let _: () = self.redis.hset_multiple(&key, &fields).await?;
        Ok(())
    }

    pub async fn mark_failed(&mut self, job_id: &uuid::Uuid, error: &str) -> Result<(), QueueError> {
        let key = Self::status_key(job_id);
        let fields = [
            ("status", serde_json::to_value(JobStatus::Failed)?.as_str().unwrap_or_default().to_string()),
            ("error", error.to_string()),
        ];
        let _: () = self.redis.hset_multiple(&key, &fields).await?;
        Ok(())
    }

    /// Moves a job to the dead-letter list, recording the failure reason and
    /// an optional traceback (NewsAgent §4.4 DLQ semantics).
    pub async fn dead_letter(&mut self, job: &JobEnvelope, error: &str, traceback: Option<&str>) -> Result<(), QueueError> {
        let payload = serde_json::to_string(job)?;
        let _: () = self.redis.lpush(&self.dlq_list, payload).await?;

        let key = Self::status_key(&job.job_id);
        let fields = vec![
            ("status", serde_json::to_value(JobStatus::Crashed)?.as_str().unwrap_or_default().to_string()),
            ("error", error.to_string()),
            ("traceback", traceback.unwrap_or_default().to_string()),
        ];
        let _: () = self.redis.hset_multiple(&key, &fields).await?;
        let _: () = self.redis.expire(&key, STATUS_TTL_SECS).await?;
        Ok(())
    }

    /// Moves one job off the DLQ back onto the main list by `job_id`, via a
    /// linear scan matching the original's `/queue/dlq/requeue/{job_id}`
    /// (the DLQ is not indexed by id, so a full scan is the only option).
    pub async fn requeue(&mut self, job_id: &uuid::Uuid) -> Result<bool, QueueError> {
        let items: Vec<String> = self.redis.lrange(&self.dlq_list, 0, -1).await?;
        for raw in &items {
            if let Ok(job) = serde_json::from_str::<JobEnvelope>(raw) {
                if &job.job_id == job_id {
                    let removed: i64 = self.redis.lrem(&self.dlq_list, 1, raw).await?;
                    if removed > 0 {
                        let _: () = self.redis.lpush(&self.main_list, raw).await?;
                        self.set_status(job_id, JobStatus::Requeued).await?;
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    /// Drains the entire DLQ back onto the main list, atomically per item
    /// via `RPOPLPUSH`, matching `/queue/dlq/requeue-all`.
    pub async fn requeue_all(&mut self) -> Result<i64, QueueError> {
        let mut moved = 0i64;
        loop {
            let raw: Option<String> = self.redis.rpoplpush(&self.dlq_list, &self.main_list).await?;
            match raw {
                Some(payload) => {
                    if let Ok(job) = serde_json::from_str::<JobEnvelope>(&payload) {
                        self.set_status(&job.job_id, JobStatus::Requeued).await?;
                    }
                    moved += 1;
                }
                None => break,
            }
        }
        Ok(moved)
    }

    /// Deletes one job from the DLQ by id and drops its status hash,
    /// matching `DELETE /queue/dlq/{job_id}`.
    pub async fn delete_from_dlq(&mut self, job_id: &uuid::Uuid) -> Result<bool, QueueError> {
        let items: Vec<String> = self.redis.lrange(&self.dlq_list, 0, -1).await?;
        for raw in &items {
            if let Ok(job) = serde_json::from_str::<JobEnvelope>(raw) {
                if &job.job_id == job_id {
                    let removed: i64 = self.redis.lrem(&self.dlq_list, 1, raw).await?;
                    if removed > 0 {
                        let _: () = self.redis.del(Self::status_key(job_id)).await?;
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    /// Reads the status hash for a job, decoding the nested `result` JSON
    /// blob if present, matching `GET /jobs/{job_id}`.
    pub async fn status(&mut self, job_id: &uuid::Uuid) -> Result<Option<JobStatusRecord>, QueueError> {
        let key = Self::status_key(job_id);
        let map: std::collections::HashMap<String, String> = self.redis.hgetall(&key).await?;
        if map.is_empty() {
            return Ok(None);
        }

        let status: JobStatus = map
            .get("status")
            .and_then(|s| serde_json::from_value(serde_json::Value::String(s.clone())).ok())
            .unwrap_or(JobStatus::Queued);

        let result = map
            .get("result")
            .filter(|s| !s.is_empty())
            .and_then(|s| serde_json::from_str(s).ok());

        Ok(Some(JobStatusRecord {
            status,
            source_url: map.get("source_url").cloned().unwrap_or_default(),
            created_at: map.get("created_at").cloned().unwrap_or_else(|| Utc::now().to_rfc3339()),
            result,
            error: map.get("error").filter(|s| !s.is_empty()).cloned(),
            traceback: map.get("traceback").filter(|s| !s.is_empty()).cloned(),
        }))
    }

    /// `(main_len, dlq_len)`, matching `/queue/status`.
    pub async fn counts(&mut self) -> Result<(i64, i64), QueueError> {
        let main_len: i64 = self.redis.llen(&self.main_list).await?;
        let dlq_len: i64 = self.redis.llen(&self.dlq_list).await?;
        Ok((main_len, dlq_len))
    }

    /// Paginated peek into either list without popping, matching
    /// `/queue/main/items` and `/queue/dlq/items`.
    pub async fn peek_main(&mut self, start: isize, stop: isize) -> Result<Vec<JobEnvelope>, QueueError> {
        self.peek(&self.main_list.clone(), start, stop).await
    }

    pub async fn peek_dlq(&mut self, start: isize, stop: isize) -> Result<Vec<JobEnvelope>, QueueError> {
        self.peek(&self.dlq_list.clone(), start, stop).await
    }

    async fn peek(&mut self, list: &str, start: isize, stop: isize) -> Result<Vec<JobEnvelope>, QueueError> {
        let raw: Vec<String> = self.redis.lrange(list, start, stop).await?;
        Ok(raw
            .iter()
            .filter_map(|s| serde_json::from_str(s).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_key_format() {
        let id = uuid::Uuid::nil();
        assert_eq!(WorkQueue::status_key(&id), format!("job:{id}"));
    }
}
