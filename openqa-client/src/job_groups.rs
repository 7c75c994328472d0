//! Job group and parent job group operations.

use crate::client::Instance;
use crate::envelope;
use crate::error::Result;
use crate::settings::FormBody;
use crate::types::JobGroup;

/// Collection a group lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKind {
    Job,
    Parent,
}

impl GroupKind {
    fn collection(self) -> &'static str {
        match self {
            Self::Job => "job_groups",
            Self::Parent => "parent_groups",
        }
    }
}

impl Instance {
    /// List all job groups.
    pub async fn get_job_groups(&self) -> Result<Vec<JobGroup>> {
        self.list_groups(GroupKind::Job).await
    }

    /// Get one job group.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`](crate::ClientError::NotFound) if
    /// openQA answers with an empty list.
    pub async fn get_job_group(&self, id: i64) -> Result<JobGroup> {
        self.get_group(GroupKind::Job, id).await
    }

    /// Create a job group. The returned group carries the ID assigned by openQA.
    pub async fn post_job_group(&self, group: &JobGroup) -> Result<JobGroup> {
        self.post_group(GroupKind::Job, group).await
    }

    /// Delete a job group.
    ///
    /// openQA refuses to delete groups that still have jobs or a job
    /// template. Removing those first is up to the caller, see
    /// [`Instance::delete_job_template`] and [`Instance::delete_job_group_jobs`].
    pub async fn delete_job_group(&self, id: i64) -> Result<()> {
        self.delete_group(GroupKind::Job, id).await
    }

    /// List all parent job groups.
    pub async fn get_parent_job_groups(&self) -> Result<Vec<JobGroup>> {
        self.list_groups(GroupKind::Parent).await
    }

    /// Get one parent job group.
    pub async fn get_parent_job_group(&self, id: i64) -> Result<JobGroup> {
        self.get_group(GroupKind::Parent, id).await
    }

    /// Create a parent job group.
    pub async fn post_parent_job_group(&self, group: &JobGroup) -> Result<JobGroup> {
        self.post_group(GroupKind::Parent, group).await
    }

    /// Delete a parent job group.
    pub async fn delete_parent_job_group(&self, id: i64) -> Result<()> {
        self.delete_group(GroupKind::Parent, id).await
    }

    /// IDs of all jobs in a job group.
    pub async fn get_job_group_jobs(&self, id: i64) -> Result<Vec<i64>> {
        let body = self.get(&self.url(&format!("job_groups/{}/jobs", id))).await?;
        self.trace_body("get_job_group_jobs", &body);
        envelope::GROUP_JOB_IDS.decode_many(&body)
    }

    /// Delete every job of a job group, one request per job.
    ///
    /// Stops at the first failed deletion; jobs deleted before it stay deleted.
    pub async fn delete_job_group_jobs(&self, id: i64) -> Result<()> {
        let jobs = self.get_job_group_jobs(id).await?;
        tracing::debug!(group = id, count = jobs.len(), "Deleting job group jobs");
        for job in jobs {
            self.delete_job(job).await?;
        }
        Ok(())
    }

    async fn list_groups(&self, kind: GroupKind) -> Result<Vec<JobGroup>> {
        let body = self.get(&self.url(kind.collection())).await?;
        envelope::JOB_GROUPS.decode_many(&body)
    }

    async fn get_group(&self, kind: GroupKind, id: i64) -> Result<JobGroup> {
        let body = self
            .get(&self.url(&format!("{}/{}", kind.collection(), id)))
            .await?;
        let groups: Vec<JobGroup> = envelope::JOB_GROUPS.decode_many(&body)?;
        envelope::first(groups, format_args!("{} {}", kind.collection(), id))
    }

    async fn post_group(&self, kind: GroupKind, group: &JobGroup) -> Result<JobGroup> {
        let form = group_form(group);
        let body = self
            .post(&self.url(kind.collection()), Some(form.encode().into_bytes()))
            .await?;
        self.trace_body("post_group", &body);
        envelope::overlay(group, &body)
    }

    async fn delete_group(&self, kind: GroupKind, id: i64) -> Result<()> {
        let body = self
            .delete(&self.url(&format!("{}/{}", kind.collection(), id)))
            .await?;
        self.trace_body("delete_group", &body);
        Ok(())
    }
}

/// Form fields openQA accepts when creating a group. Unset fields are omitted.
fn group_form(group: &JobGroup) -> FormBody {
    let mut form = FormBody::new().with("name", group.name.as_str());
    if let Some(parent) = group.parent_id.filter(|_| group.has_parent()) {
        form.push("parent_id", parent.to_string());
    }
    if let Some(description) = &group.description {
        form.push("description", description.as_str());
    }
    let numbers = [
        ("sort_order", group.sort_order),
        ("default_priority", group.default_priority),
        ("build_version_sort", group.build_version_sort),
        ("carry_over_bugrefs", group.carry_over_bugrefs),
    ];
    for (key, value) in numbers {
        if let Some(value) = value {
            form.push(key, value.to_string());
        }
    }
    form
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_form_minimal() {
        let group = JobGroup::new("openSUSE Tumbleweed");
        assert_eq!(group_form(&group).encode(), "name=openSUSE%20Tumbleweed");
    }

    #[test]
    fn test_group_form_full() {
        let group = JobGroup {
            name: "SLE".to_string(),
            parent_id: Some(3),
            description: Some("maintenance".to_string()),
            sort_order: Some(1),
            default_priority: Some(50),
            ..JobGroup::default()
        };
        assert_eq!(
            group_form(&group).encode(),
            "name=SLE&parent_id=3&description=maintenance&sort_order=1&default_priority=50"
        );
    }

    #[test]
    fn test_group_form_skips_zero_parent() {
        let group = JobGroup {
            parent_id: Some(0),
            ..JobGroup::new("top")
        };
        assert_eq!(group_form(&group).encode(), "name=top");
    }
}
