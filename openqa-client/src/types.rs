//! Entity types returned by the openQA API.

use crate::client::Instance;
use crate::settings::{self, SettingRecord, Settings};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting for a worker.
    #[default]
    Scheduled,
    /// Assigned to a worker, not yet started.
    Assigned,
    /// Worker is preparing the job.
    Setup,
    /// Job is executing.
    Running,
    /// Results are being uploaded.
    Uploading,
    /// Job finished; its result is meaningful.
    Done,
    /// Job was cancelled before finishing.
    Cancelled,
    /// Any state this client does not know about.
    #[serde(other)]
    Unknown,
}

impl JobState {
    /// Wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Assigned => "assigned",
            Self::Setup => "setup",
            Self::Running => "running",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job dependencies of one direction, grouped by dependency kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDependencies {
    /// Regular chained dependencies.
    #[serde(rename = "Chained", default)]
    pub chained: Vec<i64>,
    /// Directly chained dependencies (same worker, no reboot).
    #[serde(rename = "Directly chained", default)]
    pub directly_chained: Vec<i64>,
    /// Parallel dependencies.
    #[serde(rename = "Parallel", default)]
    pub parallel: Vec<i64>,
}

impl JobDependencies {
    /// All IDs in chained, directly chained, parallel order. Not deduplicated.
    pub fn all(&self) -> Vec<i64> {
        self.chained
            .iter()
            .chain(&self.directly_chained)
            .chain(&self.parallel)
            .copied()
            .collect()
    }

    /// True if there are no dependencies of any kind.
    pub fn is_empty(&self) -> bool {
        self.chained.is_empty() && self.directly_chained.is_empty() && self.parallel.is_empty()
    }
}

/// The subset of job settings the client interprets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSettings {
    #[serde(rename = "ARCH", default)]
    pub arch: String,
    #[serde(rename = "BACKEND", default)]
    pub backend: String,
    #[serde(rename = "MACHINE", default)]
    pub machine: String,
}

/// A test job.
///
/// Jobs fetched through an [`Instance`] stay attached to it, so they can
/// fetch their own children via [`Job::fetch_children`].
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub test: String,
    #[serde(default)]
    pub state: JobState,
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: String,
    #[serde(default)]
    pub priority: i64,
    /// ID of the job that superseded this one; `None` or `Some(0)` if none.
    #[serde(default)]
    pub clone_id: Option<i64>,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub assigned_worker_id: Option<i64>,
    #[serde(default)]
    pub blocked_by_id: Option<i64>,
    #[serde(default)]
    pub settings: JobSettings,
    #[serde(default)]
    pub children: JobDependencies,
    #[serde(default)]
    pub parents: JobDependencies,
    #[serde(default)]
    pub t_started: Option<String>,
    #[serde(default)]
    pub t_finished: Option<String>,
    /// Web UI link of the job, filled in on fetch.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link: String,
    /// Base URL of the instance the job was fetched from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote: String,
    #[serde(skip)]
    pub(crate) instance: Option<Instance>,
}

impl Job {
    /// True if the job was superseded by a different job.
    pub fn is_cloned(&self) -> bool {
        matches!(self.clone_id, Some(clone) if clone != 0 && clone != self.id)
    }

    /// True once the job reached its final state.
    pub fn is_done(&self) -> bool {
        self.state == JobState::Done
    }

    /// The job result, only meaningful once the job is done.
    pub fn outcome(&self) -> Option<&str> {
        if self.is_done() {
            Some(self.result.as_str())
        } else {
            None
        }
    }

    /// The instance this job was fetched through, if any.
    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    /// Attach the job to `instance` and derive its link.
    pub(crate) fn attach(&mut self, instance: &Instance) {
        self.link = format!("{}/tests/{}", instance.base_url(), self.id);
        self.remote = instance.base_url().to_string();
        self.instance = Some(instance.clone());
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("test", &self.test)
            .field("state", &self.state)
            .field("result", &self.result)
            .field("clone_id", &self.clone_id)
            .field("group_id", &self.group_id)
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.test == other.test
            && self.state == other.state
            && self.result == other.result
            && self.priority == other.priority
            && self.clone_id == other.clone_id
            && self.group_id == other.group_id
            && self.assigned_worker_id == other.assigned_worker_id
            && self.blocked_by_id == other.blocked_by_id
            && self.settings == other.settings
            && self.children == other.children
            && self.parents == other.parents
            && self.t_started == other.t_started
            && self.t_finished == other.t_finished
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() { &self.test } else { &self.name };
        match self.outcome() {
            Some(result) => write!(f, "{} {} ({}/{})", self.id, name, self.state, result),
            None => write!(f, "{} {} ({})", self.id, name, self.state),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Collect the IDs of `jobs`, preserving order.
pub fn extract_job_ids(jobs: &[Job]) -> Vec<i64> {
    jobs.iter().map(|j| j.id).collect()
}

/// Result of the fast job status lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub state: JobState,
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: String,
    #[serde(default)]
    pub blocked_by_id: Option<i64>,
}

/// A job group, or a parent job group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobGroup {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Parent group; `None` or `Some(0)` for a top-level group.
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_version_sort: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carry_over_bugrefs: Option<i64>,
}

impl JobGroup {
    /// Create a group with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// True if the group sits below a parent group.
    pub fn has_parent(&self) -> bool {
        matches!(self.parent_id, Some(id) if id > 0)
    }
}

/// A worker machine definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub backend: String,
    #[serde(default)]
    pub settings: Settings,
}

/// Machine as openQA sends it, with settings in list form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct WireMachine {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub backend: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub settings: Vec<SettingRecord>,
}

impl From<WireMachine> for Machine {
    fn from(w: WireMachine) -> Self {
        Self {
            settings: settings::from_wire(&w.settings),
            id: w.id,
            name: w.name,
            backend: w.backend,
        }
    }
}

impl From<&Machine> for WireMachine {
    fn from(m: &Machine) -> Self {
        Self {
            id: m.id,
            backend: m.backend.clone(),
            name: m.name.clone(),
            settings: settings::to_wire(&m.settings),
        }
    }
}

/// A product (medium) definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub distri: String,
    #[serde(default)]
    pub flavor: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub settings: Settings,
}

/// Product as openQA sends it, with settings in list form.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WireProduct {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub distri: String,
    #[serde(default)]
    pub flavor: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub settings: Vec<SettingRecord>,
}

impl From<WireProduct> for Product {
    fn from(w: WireProduct) -> Self {
        Self {
            settings: settings::from_wire(&w.settings),
            id: w.id,
            arch: w.arch,
            distri: w.distri,
            flavor: w.flavor,
            group: w.group,
            version: w.version,
        }
    }
}

/// A registered worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: i64,
    #[serde(default)]
    pub host: String,
    /// Worker slot number on its host.
    #[serde(default)]
    pub instance: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "bool_from_int")]
    pub alive: bool,
    #[serde(default, deserialize_with = "bool_from_int")]
    pub connected: bool,
    #[serde(default, deserialize_with = "bool_from_int")]
    pub websocket: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// openQA encodes worker flags as `0`/`1`, older versions as booleans.
fn bool_from_int<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(i)) => i != 0,
        None => false,
    })
}

/// A job template. Passed through without interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobTemplate {
    #[serde(default)]
    pub id: i64,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// A comment on a job. Passed through without interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_decodes_wire_shape() {
        let job: Job = serde_json::from_value(json!({
            "id": 42,
            "name": "sle-15-SP5-x86_64-Build1.1-minimal@64bit",
            "test": "minimal",
            "state": "done",
            "result": "passed",
            "priority": 50,
            "clone_id": null,
            "group_id": 7,
            "assigned_worker_id": 3,
            "blocked_by_id": null,
            "settings": {"ARCH": "x86_64", "BACKEND": "qemu", "MACHINE": "64bit", "DISTRI": "sle"},
            "children": {"Chained": [43], "Directly chained": [], "Parallel": [44, 45]},
            "parents": {"Chained": [], "Directly chained": [], "Parallel": []},
            "t_started": "2024-01-15T10:00:00",
            "t_finished": null
        }))
        .unwrap();

        assert_eq!(job.id, 42);
        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.outcome(), Some("passed"));
        assert_eq!(job.settings.machine, "64bit");
        assert_eq!(job.children.all(), vec![43, 44, 45]);
        assert!(job.parents.is_empty());
        assert!(!job.is_cloned());
        assert!(job.instance().is_none());
    }

    #[test]
    fn test_is_cloned() {
        let mut job = Job {
            id: 10,
            ..Job::default()
        };
        assert!(!job.is_cloned());
        job.clone_id = Some(0);
        assert!(!job.is_cloned());
        job.clone_id = Some(10);
        assert!(!job.is_cloned());
        job.clone_id = Some(11);
        assert!(job.is_cloned());
    }

    #[test]
    fn test_unknown_state_decodes() {
        let job: Job = serde_json::from_value(json!({"id": 1, "state": "teleporting"})).unwrap();
        assert_eq!(job.state, JobState::Unknown);
        assert_eq!(job.outcome(), None);
    }

    #[test]
    fn test_job_display() {
        let job = Job {
            id: 7,
            name: "minimal".to_string(),
            state: JobState::Running,
            result: "none".to_string(),
            ..Job::default()
        };
        assert_eq!(job.to_string(), "7 minimal (running)");

        let done = Job {
            state: JobState::Done,
            result: "failed".to_string(),
            ..job
        };
        assert_eq!(done.to_string(), "7 minimal (done/failed)");
    }

    #[test]
    fn test_job_serialization_skips_instance() {
        let instance = Instance::new("http://localhost:9526").unwrap();
        let mut job = Job {
            id: 5,
            ..Job::default()
        };
        job.attach(&instance);

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["link"], "http://localhost:9526/tests/5");
        assert!(value.get("instance").is_none());
    }

    #[test]
    fn test_machine_from_wire() {
        let wire: WireMachine = serde_json::from_value(json!({
            "id": 1,
            "name": "64bit",
            "backend": "qemu",
            "settings": [{"key": "WORKER_CLASS", "value": "qemu_x86_64"}, {"key": "BROKEN"}]
        }))
        .unwrap();
        let machine = Machine::from(wire);
        assert_eq!(machine.settings.len(), 1);
        assert_eq!(machine.settings["WORKER_CLASS"], "qemu_x86_64");

        let back = WireMachine::from(&machine);
        assert_eq!(back.settings, vec![SettingRecord::new("WORKER_CLASS", "qemu_x86_64")]);
    }

    #[test]
    fn test_worker_flags() {
        let worker: Worker = serde_json::from_value(json!({
            "id": 1,
            "host": "worker1",
            "instance": 2,
            "status": "idle",
            "alive": 1,
            "connected": 0,
            "websocket": true,
            "error": null,
            "properties": {"WORKER_CLASS": "qemu_x86_64"}
        }))
        .unwrap();
        assert!(worker.alive);
        assert!(!worker.connected);
        assert!(worker.websocket);
        assert_eq!(worker.properties["WORKER_CLASS"], "qemu_x86_64");
    }

    #[test]
    fn test_template_passthrough() {
        let template: JobTemplate = serde_json::from_value(json!({
            "id": 3,
            "prio": 50,
            "test_suite": {"name": "minimal"}
        }))
        .unwrap();
        assert_eq!(template.id, 3);
        assert_eq!(template.fields["test_suite"]["name"], "minimal");
    }
}
