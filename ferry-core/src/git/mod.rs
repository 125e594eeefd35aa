//! Git history transfer engine

pub mod auth;
pub mod transfer;
pub mod verify;

pub use auth::{authenticated_url, sanitize_clone_url, GitCredential};
pub use transfer::{GitMigrator, TemporaryMirror, TransferRequest};
pub use verify::{local_mirror_stats, verify_mirror};
