//! Response envelope decoding.
//!
//! openQA is not consistent about how it wraps payloads: some endpoints
//! return a bare array, others an object with one named field holding the
//! array, single jobs come wrapped in `{"job": {...}}`. Every operation picks
//! one of the constants below; nothing inspects the decoded value to guess.

use crate::error::{ClientError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// What to do when a wrapped response lacks its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Missing {
    /// Fail with [`ClientError::InvalidResponse`].
    Fail,
    /// Treat as an empty collection.
    Empty,
}

/// Decode strategy for one endpoint group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Envelope {
    /// The body is the payload itself.
    Bare,
    /// The payload sits under a single named field.
    Wrapped {
        field: &'static str,
        missing: Missing,
    },
}

/// `GET /jobs/overview`.
pub(crate) const JOB_OVERVIEW: Envelope = Envelope::Bare;
/// `GET /jobs/{id}`.
pub(crate) const JOB: Envelope = Envelope::Wrapped {
    field: "job",
    missing: Missing::Fail,
};
/// `GET /experimental/jobs/{id}/status`.
pub(crate) const JOB_STATUS: Envelope = Envelope::Bare;
/// `GET /jobs?ids=...` and `GET /jobs?test=...`.
pub(crate) const JOBS: Envelope = Envelope::Wrapped {
    field: "jobs",
    missing: Missing::Empty,
};
/// `GET /job_groups`, `GET /parent_groups`.
pub(crate) const JOB_GROUPS: Envelope = Envelope::Bare;
/// `GET /job_groups/{id}/jobs`.
pub(crate) const GROUP_JOB_IDS: Envelope = Envelope::Wrapped {
    field: "ids",
    missing: Missing::Fail,
};
/// `GET /workers`.
pub(crate) const WORKERS: Envelope = Envelope::Wrapped {
    field: "workers",
    missing: Missing::Fail,
};
/// `GET /job_templates`.
pub(crate) const JOB_TEMPLATES: Envelope = Envelope::Wrapped {
    field: "JobTemplates",
    missing: Missing::Fail,
};
/// `GET /machines`.
pub(crate) const MACHINES: Envelope = Envelope::Wrapped {
    field: "Machines",
    missing: Missing::Fail,
};
/// `GET /products`.
pub(crate) const PRODUCTS: Envelope = Envelope::Wrapped {
    field: "Products",
    missing: Missing::Fail,
};
/// `GET /jobs/{id}/comments`.
pub(crate) const COMMENTS: Envelope = Envelope::Bare;

impl Envelope {
    /// Decode a collection.
    pub(crate) fn decode_many<T: DeserializeOwned>(self, body: &[u8]) -> Result<Vec<T>> {
        match self {
            Self::Bare => Ok(serde_json::from_slice(body)?),
            Self::Wrapped { field, missing } => match unwrap_field(body, field)? {
                Some(value) => Ok(serde_json::from_value(value)?),
                None if missing == Missing::Empty => Ok(Vec::new()),
                None => Err(missing_field(field)),
            },
        }
    }

    /// Decode a single entity. A missing field is always an error here.
    pub(crate) fn decode_one<T: DeserializeOwned>(self, body: &[u8]) -> Result<T> {
        match self {
            Self::Bare => Ok(serde_json::from_slice(body)?),
            Self::Wrapped { field, .. } => match unwrap_field(body, field)? {
                Some(value) => Ok(serde_json::from_value(value)?),
                None => Err(missing_field(field)),
            },
        }
    }
}

fn unwrap_field(body: &[u8], field: &str) -> Result<Option<Value>> {
    let mut object: serde_json::Map<String, Value> = serde_json::from_slice(body)?;
    Ok(object.remove(field).filter(|v| !v.is_null()))
}

fn missing_field(field: &str) -> ClientError {
    ClientError::InvalidResponse(format!("missing field `{}`", field))
}

/// Take the first element of a by-ID lookup.
pub(crate) fn first<T>(items: Vec<T>, what: impl std::fmt::Display) -> Result<T> {
    items
        .into_iter()
        .next()
        .ok_or_else(|| ClientError::NotFound(what.to_string()))
}

/// Merge the fields of a write response over the entity that was sent.
///
/// openQA answers POSTs with a partial object (usually just `{"id": N}`);
/// whatever it returns replaces the submitted values.
pub(crate) fn overlay<T>(sent: &T, body: &[u8]) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut base = serde_json::to_value(sent)?;
    let response: Value = serde_json::from_slice(body)?;
    if let (Value::Object(base), Value::Object(response)) = (&mut base, response) {
        base.extend(response);
    }
    Ok(serde_json::from_value(base)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Job, JobGroup, Worker};

    #[test]
    fn test_bare_array() {
        let groups: Vec<JobGroup> = JOB_GROUPS
            .decode_many(br#"[{"id":1,"name":"SLE"},{"id":2,"name":"openSUSE","parent_id":5}]"#)
            .unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].parent_id, Some(5));
    }

    #[test]
    fn test_wrapped_array() {
        let workers: Vec<Worker> = WORKERS
            .decode_many(br#"{"workers":[{"id":1,"host":"w1","instance":1}]}"#)
            .unwrap();
        assert_eq!(workers[0].host, "w1");
    }

    #[test]
    fn test_missing_field_fails_for_strict_endpoints() {
        let result: Result<Vec<Worker>> = WORKERS.decode_many(br#"{"error":"nope"}"#);
        assert!(matches!(result, Err(ClientError::InvalidResponse(_))));
    }

    #[test]
    fn test_missing_field_is_empty_for_jobs() {
        let jobs: Vec<Job> = JOBS.decode_many(br#"{}"#).unwrap();
        assert!(jobs.is_empty());
        let jobs: Vec<Job> = JOBS.decode_many(br#"{"jobs":null}"#).unwrap();
        assert!(jobs.is_empty());
    }

    #[test]
    fn test_single_job() {
        let job: Job = JOB.decode_one(br#"{"job":{"id":42,"clone_id":99}}"#).unwrap();
        assert_eq!(job.id, 42);
        assert_eq!(job.clone_id, Some(99));

        let missing: Result<Job> = JOB.decode_one(br#"{"error":"no such job"}"#);
        assert!(matches!(missing, Err(ClientError::InvalidResponse(_))));
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let result: Result<Vec<Job>> = JOB_OVERVIEW.decode_many(b"<html>");
        assert!(matches!(result, Err(ClientError::Decode(_))));
    }

    #[test]
    fn test_first() {
        assert_eq!(first(vec![1, 2], "x").unwrap(), 1);
        assert!(matches!(
            first(Vec::<i32>::new(), "machine 3"),
            Err(ClientError::NotFound(msg)) if msg == "machine 3"
        ));
    }

    #[test]
    fn test_overlay() {
        let sent = JobGroup::new("SLE 15");
        let merged = overlay(&sent, br#"{"id":12}"#).unwrap();
        assert_eq!(merged.id, 12);
        assert_eq!(merged.name, "SLE 15");
    }
}
