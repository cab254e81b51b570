use crate::control_plane::ControlPlane;
use crate::RuntimeError;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// What the mock does on one `apply` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockStep {
    Succeed(String),
    Fail(String),
    /// Never answers; the call ends when its timeout fires.
    Hang,
}

/// Scripted control plane. Steps are consumed in order; once the script is
/// exhausted every call repeats the fallback step.
pub struct MockControlPlane {
    script: Mutex<VecDeque<MockStep>>,
    fallback: MockStep,
    applied: Mutex<Vec<String>>,
}

impl MockControlPlane {
    pub fn new(script: impl IntoIterator<Item = MockStep>, fallback: MockStep) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            applied: Mutex::new(Vec::new()),
        }
    }

    pub fn always_succeed() -> Self {
        Self::new([], MockStep::Succeed("configmap/aws-auth configured".to_owned()))
    }

    pub fn always_fail(message: &str) -> Self {
        Self::new([], MockStep::Fail(message.to_owned()))
    }

    /// Manifest contents seen so far, one entry per call.
    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.applied.lock().map(|a| a.len()).unwrap_or_default()
    }

    fn next_step(&self) -> Result<MockStep, RuntimeError> {
        let mut script = self
            .script
            .lock()
            .map_err(|e| RuntimeError::ExecFailed {
                status: "mock".to_owned(),
                output: format!("mutex poisoned: {e}"),
            })?;
        Ok(script.pop_front().unwrap_or_else(|| self.fallback.clone()))
    }
}

impl ControlPlane for MockControlPlane {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn apply(&self, manifest: &Path, timeout: Duration) -> Result<String, RuntimeError> {
        let content = std::fs::read_to_string(manifest)?;
        if let Ok(mut applied) = self.applied.lock() {
            applied.push(content);
        }

        match self.next_step()? {
            MockStep::Succeed(out) => Ok(out),
            MockStep::Fail(out) => Err(RuntimeError::ExecFailed {
                status: "exit status: 1".to_owned(),
                output: out,
            }),
            MockStep::Hang => {
                tokio::time::sleep(timeout).await;
                Err(RuntimeError::Timeout(timeout))
            }
        }
    }
}
