use crate::control_plane::ControlPlane;
use crate::RuntimeError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use testbed_schema::Config;
use tokio::process::Command;
use tracing::debug;

/// Runs `kubectl --kubeconfig=<path> apply --filename=<manifest>`.
#[derive(Debug, Clone)]
pub struct KubectlClient {
    program: PathBuf,
    kubeconfig: PathBuf,
}

impl KubectlClient {
    pub fn new(program: impl Into<PathBuf>, kubeconfig: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            kubeconfig: kubeconfig.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let program = if cfg.kubectl_path.is_empty() {
            "kubectl"
        } else {
            cfg.kubectl_path.as_str()
        };
        Self::new(program, &cfg.kubeconfig_path)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, manifest: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(format!("--kubeconfig={}", self.kubeconfig.display()))
            .arg("apply")
            .arg(format!("--filename={}", manifest.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl ControlPlane for KubectlClient {
    fn name(&self) -> &'static str {
        "kubectl"
    }

    async fn apply(&self, manifest: &Path, timeout: Duration) -> Result<String, RuntimeError> {
        debug!(
            "{} --kubeconfig={} apply --filename={}",
            self.program.display(),
            self.kubeconfig.display(),
            manifest.display()
        );
        let child = self
            .command(manifest)
            .spawn()
            .map_err(|source| RuntimeError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        // Dropping the wait future drops the child, and kill_on_drop reaps it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(RuntimeError::Timeout(timeout)),
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = combined.trim().to_owned();

        if output.status.success() {
            Ok(combined)
        } else {
            Err(RuntimeError::ExecFailed {
                status: output.status.to_string(),
                output: combined,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_shape() {
        let client = KubectlClient::new("/usr/local/bin/kubectl", "/tmp/kubeconfig");
        let cmd = client.command(Path::new("/tmp/aws-auth.yaml"));
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "/usr/local/bin/kubectl");
        let args: Vec<_> = std_cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "--kubeconfig=/tmp/kubeconfig",
                "apply",
                "--filename=/tmp/aws-auth.yaml"
            ]
        );
    }

    #[test]
    fn from_config_falls_back_to_path_lookup() {
        let mut cfg = Config::default_template();
        cfg.kubectl_path.clear();
        cfg.kubeconfig_path = "/tmp/kc".to_owned();
        let client = KubectlClient::from_config(&cfg);
        assert_eq!(client.program(), Path::new("kubectl"));
    }
}
