//! Control-plane clients for testbed.
//!
//! This crate implements the remote-apply layer: the `ControlPlane` trait, a
//! `kubectl` backend that runs the real client under a per-call timeout, a
//! scripted mock backend for tests, and prerequisite checking.

pub mod control_plane;
pub mod kubectl;
pub mod mock;
pub mod prereq;

pub use control_plane::ControlPlane;
pub use kubectl::KubectlClient;
pub use mock::{MockControlPlane, MockStep};
pub use prereq::{check_control_plane_prereqs, format_missing, MissingPrereq};

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("control-plane command failed ({status}): {output}")]
    ExecFailed { status: String, output: String },
    #[error("control-plane command timed out after {0:?}")]
    Timeout(Duration),
}
