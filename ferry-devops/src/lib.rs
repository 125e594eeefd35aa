//! Ferry DevOps - Azure DevOps integration for GitFerry
//!
//! This crate implements the source side of a migration: projects,
//! repositories, branches, pull requests, work items and build pipelines
//! read over the Azure DevOps REST API.

mod client;
pub mod models;

pub use client::DevOpsClient;
