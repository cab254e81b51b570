use std::fmt;
use std::path::Path;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

/// A bare name is looked up on `PATH`; anything with a separator must exist as given.
fn command_exists(program: &str) -> bool {
    if program.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(program).is_file();
    }
    Command::new("which")
        .arg(program)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check what `apply-node-auth` needs: a runnable kubectl and a kubeconfig.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_control_plane_prereqs(kubectl_path: &str, kubeconfig_path: &str) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    let program = if kubectl_path.is_empty() {
        "kubectl"
    } else {
        kubectl_path
    };
    if !command_exists(program) {
        missing.push(MissingPrereq {
            name: program.to_owned(),
            purpose: "applying manifests to the cluster",
            install_hint: "https://kubernetes.io/docs/tasks/tools/ or set kubectl-path",
        });
    }

    if kubeconfig_path.is_empty() || !Path::new(kubeconfig_path).is_file() {
        missing.push(MissingPrereq {
            name: format!("kubeconfig ({kubeconfig_path})"),
            purpose: "cluster endpoint and credentials for kubectl",
            install_hint: "write the cluster kubeconfig and set kubeconfig-path",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\ntestbed requires these to apply node authentication.");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prereq_display() {
        let m = MissingPrereq {
            name: "kubectl".to_owned(),
            purpose: "applying manifests",
            install_hint: "brew install kubectl",
        };
        let s = format!("{m}");
        assert!(s.contains("kubectl"));
        assert!(s.contains("applying manifests"));
        assert!(s.contains("brew install kubectl"));
    }

    #[test]
    fn absent_binary_and_kubeconfig_reported() {
        let missing = check_control_plane_prereqs("/nonexistent/bin/kubectl", "/nonexistent/kubeconfig");
        assert_eq!(missing.len(), 2);
        assert_eq!(missing[0].name, "/nonexistent/bin/kubectl");
        assert!(missing[1].name.contains("/nonexistent/kubeconfig"));
    }

    #[test]
    fn existing_paths_pass() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("kubectl");
        let kubeconfig = dir.path().join("kubeconfig");
        std::fs::write(&bin, "#!/bin/sh\n").unwrap();
        std::fs::write(&kubeconfig, "apiVersion: v1\n").unwrap();

        let missing = check_control_plane_prereqs(
            bin.to_str().unwrap(),
            kubeconfig.to_str().unwrap(),
        );
        assert!(missing.is_empty(), "{}", format_missing(&missing));
    }

    #[test]
    fn format_missing_produces_readable_output() {
        let missing = check_control_plane_prereqs("/nonexistent/kubectl", "");
        let output = format_missing(&missing);
        assert!(output.contains("missing prerequisites:"));
        assert!(output.contains("/nonexistent/kubectl"));
        assert!(output.contains("kubeconfig"));
    }
}
