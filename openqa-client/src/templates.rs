//! Job template operations.

use crate::client::Instance;
use crate::envelope;
use crate::error::Result;
use crate::types::JobTemplate;

impl Instance {
    /// List all job templates.
    pub async fn get_job_templates(&self) -> Result<Vec<JobTemplate>> {
        let body = self.get(&self.url("job_templates")).await?;
        envelope::JOB_TEMPLATES.decode_many(&body)
    }

    /// Get one job template.
    pub async fn get_job_template(&self, id: i64) -> Result<JobTemplate> {
        let body = self
            .get(&self.url(&format!("job_templates/{}", id)))
            .await?;
        let templates: Vec<JobTemplate> = envelope::JOB_TEMPLATES.decode_many(&body)?;
        envelope::first(templates, format_args!("job template {}", id))
    }

    /// Delete a job template.
    pub async fn delete_job_template(&self, id: i64) -> Result<()> {
        let body = self
            .delete(&self.url(&format!("job_templates/{}", id)))
            .await?;
        self.trace_body("delete_job_template", &body);
        Ok(())
    }

    /// Get the scheduling YAML of a job group, as raw text.
    pub async fn get_job_template_yaml(&self, group_id: i64) -> Result<String> {
        let body = self
            .get(&self.url(&format!("job_templates_scheduling/{}", group_id)))
            .await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Replace the scheduling YAML of a job group. The text is sent verbatim.
    pub async fn post_job_template_yaml(&self, group_id: i64, yaml: &str) -> Result<()> {
        let body = self
            .post(
                &self.url(&format!("job_templates_scheduling/{}", group_id)),
                Some(yaml.as_bytes().to_vec()),
            )
            .await?;
        self.trace_body("post_job_template_yaml", &body);
        Ok(())
    }
}
