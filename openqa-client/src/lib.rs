//! Rust client for the openQA REST API.
//!
//! This crate wraps the `/api/v1` endpoints of an openQA instance and decodes
//! their responses into typed entities.
//!
//! # Features
//!
//! - Signed requests (`X-API-Key`, `X-API-Microtime`, `X-API-Hash`)
//! - One request in flight per instance by default
//! - Jobs, including following restarted jobs through their clone chain
//! - Job groups, parent groups, job templates and scheduling YAML
//! - Machines and products, with settings mapped from openQA's list form
//! - Workers and job comments
//!
//! # Example
//!
//! ```no_run
//! use openqa_client::Instance;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let instance = Instance::o3()?;
//!
//! // Get a job, or whatever job replaced it
//! let job = instance.get_job_follow(3_000_000).await?;
//! println!("{} -> {}", job, job.link);
//!
//! // Its children, also resolved to their latest clones
//! for child in job.fetch_all_children(true).await? {
//!     println!("  {}", child);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Authentication
//!
//! Reading is anonymous. Writes need an API key and secret:
//!
//! ```no_run
//! # use openqa_client::Instance;
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let instance = Instance::new("http://localhost:9526")?
//!     .with_credentials(std::env::var("OPENQA_API_KEY")?, std::env::var("OPENQA_API_SECRET")?);
//! # Ok(())
//! # }
//! ```
//!
//! Or take everything from the environment with
//! [`InstanceConfig::from_env`].
//!
//! # Concurrency
//!
//! Requests through one [`Instance`] (and its clones) are serialized: a
//! request waits until the previous one has fully completed. Use
//! [`Instance::with_allow_parallel`] to lift that when the server copes.
//! Nothing is retried and there are no timeouts; wrap calls in
//! `tokio::time::timeout` if you need one.
//!
//! # Error Handling
//!
//! All operations return `Result<T, ClientError>`:
//!
//! ```no_run
//! # use openqa_client::{Instance, ClientError};
//! # async fn example() -> Result<(), ClientError> {
//! # let instance = Instance::o3()?;
//! match instance.get_job(42).await {
//!     Ok(job) => println!("Found: {}", job),
//!     Err(ClientError::Status { status: 404, .. }) => println!("No such job"),
//!     Err(e) => println!("Error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
mod client;
mod config;
mod envelope;
mod error;
mod job_groups;
mod jobs;
mod machines;
mod products;
pub mod settings;
mod templates;
mod types;
mod workers;

pub use client::{DEFAULT_MAX_RECURSIONS, Instance, O3_URL, default_user_agent};
pub use config::{InstanceConfig, OSD_URL, resolve_remote};
pub use error::{ClientError, Result};
pub use jobs::JobQuery;
pub use settings::Settings;
pub use types::{
    Comment, Job, JobDependencies, JobGroup, JobSettings, JobState, JobStatus, JobTemplate,
    Machine, Product, Worker, extract_job_ids,
};
