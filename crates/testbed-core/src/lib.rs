//! Core orchestration for testbed configurations.
//!
//! This crate ties together the schema, the YAML store, and control-plane
//! clients: `prepare` and `resume` take a configuration from template or disk
//! through overlay, finalization and sync, and `Engine::apply_node_auth`
//! reconciles the aws-auth ConfigMap under a deadline and a cancellation token.
//! It also provides the per-config lock and the reconcile state machine.

pub mod concurrency;
pub mod engine;
pub mod lifecycle;
pub mod node_auth;
pub mod reconcile;

pub use concurrency::{install_signal_handler, ConfigLock};
pub use engine::{prepare, prepare_with, resume, Engine};
pub use lifecycle::{validate_transition, ReconcileState};
pub use node_auth::{render_aws_auth, write_artifact};
pub use reconcile::{reconcile, ReconcileOptions, ReconcileReport};

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config error: {0}")]
    Config(testbed_schema::ConfigError),
    #[error("I/O error: {0}")]
    ConfigIo(testbed_schema::ConfigError),
    #[error("store error: {0}")]
    Store(#[from] testbed_store::StoreError),
    #[error("runtime error: {0}")]
    Runtime(#[from] testbed_runtime::RuntimeError),
    #[error("config error: instance-profile-role-arn is empty, cannot render node auth")]
    EmptyRoleArn,
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("'{0}' is locked by another testbed process")]
    Locked(PathBuf),
    #[error("aborted after {attempts} attempts")]
    Aborted { attempts: u32 },
    #[error("deadline of {deadline:?} exceeded after {attempts} attempts: {last_error}")]
    DeadlineExceeded {
        attempts: u32,
        deadline: Duration,
        last_error: String,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<testbed_schema::ConfigError> for CoreError {
    fn from(e: testbed_schema::ConfigError) -> Self {
        if e.is_io() {
            Self::ConfigIo(e)
        } else {
            Self::Config(e)
        }
    }
}
