//! Ferry Core - Core library for GitFerry repository migrations
//!
//! This crate drives repository migrations from Azure DevOps to GitHub:
//! exporting source data, transferring git history through a mirror clone,
//! converting CI pipelines to workflow skeletons, replicating work items as
//! issues and reporting on the result. Platform access goes through the
//! [`platform`] traits so the orchestrator never talks to a REST API
//! directly.

pub mod analysis;
pub mod config;
pub mod error;
pub mod git;
pub mod markdown;
pub mod model;
pub mod naming;
pub mod orchestrator;
pub mod pipeline;
pub mod platform;
pub mod report;
pub mod retry;
pub mod snapshot;
pub mod throttle;
pub mod workitem;

pub use config::Config;
pub use error::{Error, Result};
pub use model::{MigrationTarget, PipelineScope, RunOptions};
pub use orchestrator::{MigrationOrchestrator, MigrationOutcome};
pub use platform::{SourcePlatform, TargetPlatform};
pub use retry::RetryPolicy;
pub use throttle::RateLimiter;
