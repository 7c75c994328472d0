//! Job operations and clone resolution.
//!
//! A job that gets restarted in openQA is not modified; a new job is created
//! and the old one records it as its `clone_id`. The `*_follow` operations
//! walk that chain to the newest job.

use crate::client::{Instance, merge_params};
use crate::envelope::{self, Envelope};
use crate::error::{ClientError, Result};
use crate::types::{Comment, Job, JobStatus};
use std::collections::BTreeMap;

/// Extra query parameters for job listings, e.g. `arch`, `distri`, `flavor`,
/// `machine`, `version`, `build`. Comma separated values become arrays.
pub type JobQuery = BTreeMap<String, String>;

impl Instance {
    /// Query the job overview.
    ///
    /// `test` is added as the `test` parameter when non-empty. The overview
    /// only carries job id and name, use [`Instance::get_jobs`] for details.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use openqa_client::{Instance, JobQuery};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let instance = Instance::o3()?;
    /// let mut params = JobQuery::new();
    /// params.insert("distri".to_string(), "opensuse".to_string());
    /// params.insert("arch".to_string(), "x86_64,aarch64".to_string());
    /// let jobs = instance.get_overview("", &params).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_overview(&self, test: &str, params: &JobQuery) -> Result<Vec<Job>> {
        let params = with_test(test, params);
        let mut url = self.url("jobs/overview");
        if !params.is_empty() {
            url = format!("{}?{}", url, merge_params(&params));
        }
        self.fetch_jobs(&url, envelope::JOB_OVERVIEW).await
    }

    /// Get the latest job of a test suite per job group.
    ///
    /// Of all returned jobs only the one with the highest ID per `group_id`
    /// is kept. The result is ordered by group.
    pub async fn get_latest_jobs(&self, test: &str, params: &JobQuery) -> Result<Vec<Job>> {
        let params = with_test(test, params);
        let mut url = self.url("jobs");
        if !params.is_empty() {
            url = format!("{}?{}", url, merge_params(&params));
        }
        let jobs = self.fetch_jobs(&url, envelope::JOBS).await?;
        Ok(latest_per_group(jobs))
    }

    /// Fetch a single job.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_job(&self, id: i64) -> Result<Job> {
        let body = self.get(&self.url(&format!("jobs/{}", id))).await?;
        let mut job: Job = envelope::JOB.decode_one(&body)?;
        job.attach(self);
        Ok(job)
    }

    /// Fetch several jobs with one request.
    ///
    /// An empty `ids` slice returns immediately without touching the network.
    pub async fn get_jobs(&self, ids: &[i64]) -> Result<Vec<Job>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = ids
            .iter()
            .map(|id| format!("ids={}", id))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}?{}", self.url("jobs"), query);
        self.fetch_jobs(&url, envelope::JOBS).await
    }

    /// Fetch a job and follow its clones to the newest one.
    ///
    /// At most [`Instance::max_recursion_depth`] jobs are fetched; a chain
    /// that is still cloned after that fails with
    /// [`ClientError::RecursionLimit`]. A job naming itself as its clone is
    /// not followed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use openqa_client::Instance;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let instance = Instance::o3()?;
    /// let job = instance.get_job_follow(42).await?;
    /// if job.id != 42 {
    ///     println!("job 42 was restarted as {}", job.id);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_job_follow(&self, id: i64) -> Result<Job> {
        let mut current = id;
        for depth in 0..self.max_recursion_depth() {
            let job = self.get_job(current).await?;
            match job.clone_id {
                Some(clone) if job.is_cloned() => {
                    tracing::debug!(job = current, clone, depth, "Following clone");
                    current = clone;
                }
                _ => return Ok(job),
            }
        }
        tracing::warn!(
            requested = id,
            last = current,
            depth = self.max_recursion_depth(),
            "Clone chain exceeds recursion limit"
        );
        Err(ClientError::RecursionLimit {
            depth: self.max_recursion_depth(),
        })
    }

    /// Fetch several jobs, replacing each cloned one by its newest clone.
    ///
    /// The output keeps the order of `ids`. Each cloned job is resolved on its
    /// own, since a batch answer cannot tell which clone belongs to which
    /// original once chains fork. Any failure aborts the whole call.
    pub async fn get_jobs_follow(&self, ids: &[i64]) -> Result<Vec<Job>> {
        let mut jobs = self.get_jobs(ids).await?;
        self.follow_in_place(&mut jobs).await?;
        Ok(jobs)
    }

    /// Delete a job.
    pub async fn delete_job(&self, id: i64) -> Result<()> {
        let body = self.delete(&self.url(&format!("jobs/{}", id))).await?;
        self.trace_body("delete_job", &body);
        Ok(())
    }

    /// Fetch only state, result and blocker of a job via the experimental
    /// status endpoint.
    pub async fn get_job_state(&self, id: i64) -> Result<JobStatus> {
        let url = self.url(&format!("/experimental/jobs/{}/status", id));
        let body = self.get(&url).await?;
        envelope::JOB_STATUS.decode_one(&body)
    }

    /// Fetch the comments of a job.
    pub async fn get_comments(&self, job_id: i64) -> Result<Vec<Comment>> {
        let body = self
            .get(&self.url(&format!("jobs/{}/comments", job_id)))
            .await?;
        self.trace_body("get_comments", &body);
        envelope::COMMENTS.decode_many(&body)
    }

    async fn fetch_jobs(&self, url: &str, envelope: Envelope) -> Result<Vec<Job>> {
        let body = self.get(url).await?;
        let mut jobs: Vec<Job> = envelope.decode_many(&body)?;
        for job in &mut jobs {
            job.attach(self);
        }
        Ok(jobs)
    }

    /// Replace every cloned job in `jobs` by its resolved clone, in place.
    async fn follow_in_place(&self, jobs: &mut [Job]) -> Result<()> {
        for slot in jobs.iter_mut() {
            if slot.is_cloned() {
                *slot = self.get_job_follow(slot.id).await?;
            }
        }
        Ok(())
    }
}

impl Job {
    /// Fetch the given jobs through the instance this job came from.
    ///
    /// Meant for IDs taken from [`Job::children`] or [`Job::parents`]. With
    /// `follow`, cloned jobs are replaced by their newest clone.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the job was not fetched
    /// through an [`Instance`].
    pub async fn fetch_children(&self, ids: &[i64], follow: bool) -> Result<Vec<Job>> {
        let instance = self.instance.as_ref().ok_or_else(|| {
            ClientError::Configuration(format!("job {} is not attached to an instance", self.id))
        })?;
        let mut children = instance.get_jobs(ids).await?;
        if follow {
            instance.follow_in_place(&mut children).await?;
        }
        Ok(children)
    }

    /// Fetch all chained, directly chained and parallel children.
    pub async fn fetch_all_children(&self, follow: bool) -> Result<Vec<Job>> {
        self.fetch_children(&self.children.all(), follow).await
    }
}

fn with_test(test: &str, params: &JobQuery) -> JobQuery {
    let mut params = params.clone();
    if !test.is_empty() {
        params.insert("test".to_string(), test.to_string());
    }
    params
}

/// Keep the highest-ID job per group.
fn latest_per_group(jobs: Vec<Job>) -> Vec<Job> {
    let mut latest: BTreeMap<Option<i64>, Job> = BTreeMap::new();
    for job in jobs {
        match latest.get(&job.group_id) {
            Some(kept) if kept.id >= job.id => {}
            _ => {
                latest.insert(job.group_id, job);
            }
        }
    }
    latest.into_values().collect()
}
