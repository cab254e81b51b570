//! CLI subprocess integration tests.
//!
//! These tests invoke the `testbed` binary as a subprocess and verify
//! exit codes, stdout content, and JSON output.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn testbed_bin(tmp: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_testbed"));
    cmd.env("TMPDIR", tmp);
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn init_config(dir: &Path) -> PathBuf {
    let path = dir.join("ec2config.yaml");
    let output = testbed_bin(dir)
        .args(["init", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success(), "init failed: {}", stderr(&output));
    path
}

#[test]
fn cli_version_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let output = testbed_bin(dir.path()).arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("testbed"));
}

#[test]
fn cli_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    let output = testbed_bin(dir.path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let out = stdout(&output);
    for cmd in ["init", "finalize", "show", "ssh", "apply-node-auth", "plugins"] {
        assert!(out.contains(cmd), "help must list '{cmd}': {out}");
    }
}

#[test]
fn init_writes_finalized_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ec2config.yaml");
    let output = testbed_bin(dir.path())
        .args(["--json", "init", "--config"])
        .arg(&path)
        .env("TESTBED_EC2_CLUSTER_SIZE", "3")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", stderr(&output));

    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let name = summary["cluster-name"].as_str().unwrap();
    assert!(name.starts_with("ec2-"));
    assert!(name.contains("-pdx-us-west-2-"));
    assert_eq!(summary["config-path-bucket"], format!("{name}/ec2config.yaml"));

    let cfg = testbed_store::load(&path).unwrap();
    assert_eq!(cfg.cluster_size, 3);
    assert!(cfg.init_script_created);
    assert!(cfg.updated_at.is_some());
}

#[test]
fn init_unknown_region_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ec2config.yaml");
    let output = testbed_bin(dir.path())
        .args(["init", "--config"])
        .arg(&path)
        .env("TESTBED_EC2_AWS_REGION", "mars-north-1")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("mars-north-1"));
    assert!(!path.exists());
}

#[test]
fn init_unsupported_override_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ec2config.yaml");
    let output = testbed_bin(dir.path())
        .args(["init", "--config"])
        .arg(&path)
        .env("TESTBED_EC2_LOG_OUTPUTS", "stdout")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("TESTBED_EC2_LOG_OUTPUTS"));
}

#[test]
fn init_with_unusable_tmpdir_is_plain_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = testbed_bin(&dir.path().join("missing"))
        .arg("init")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1), "{}", stderr(&output));
    assert!(stderr(&output).contains("I/O error"));
}

#[test]
fn finalize_missing_file_is_store_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = testbed_bin(dir.path())
        .arg("finalize")
        .arg(dir.path().join("absent.yaml"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("store error"));
}

#[test]
fn finalize_keeps_identity_and_applies_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = init_config(dir.path());
    let before = testbed_store::load(&path).unwrap();

    let output = testbed_bin(dir.path())
        .arg("finalize")
        .arg(&path)
        .env("TESTBED_EC2_INSTANCE_TYPE", "c5.xlarge")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", stderr(&output));

    let after = testbed_store::load(&path).unwrap();
    assert_eq!(after.cluster_name, before.cluster_name);
    assert_eq!(after.instance_type, "c5.xlarge");
    assert_eq!(after.log_outputs, before.log_outputs);
    assert!(dir.path().join("ec2config.backup.yaml").exists());
}

#[test]
fn show_json_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = init_config(dir.path());

    let output = testbed_bin(dir.path())
        .args(["--json", "show"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["aws-region"], "us-west-2");
    assert_eq!(value["cluster-size"], 1);
    assert_eq!(value["node-auth-applied"], false);
}

#[test]
fn show_human_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = init_config(dir.path());

    let output = testbed_bin(dir.path()).arg("show").arg(&path).output().unwrap();
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("cluster-name:"));
    assert!(out.contains("m5.large"));
    assert!(out.contains("pending"));
}

#[test]
fn ssh_without_instances_says_so() {
    let dir = tempfile::tempdir().unwrap();
    let path = init_config(dir.path());

    let output = testbed_bin(dir.path()).arg("ssh").arg(&path).output().unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("no instances recorded"));
}

#[test]
fn ssh_prints_commands_for_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = init_config(dir.path());
    let mut cfg = testbed_store::load(&path).unwrap();
    cfg.refresh_instances([testbed_schema::Instance {
        instance_id: "i-0123".to_owned(),
        public_dns_name: "ec2-1-2-3-4.us-west-2.compute.amazonaws.com".to_owned(),
        ..testbed_schema::Instance::default()
    }]);
    testbed_store::sync(&mut cfg).unwrap();

    let output = testbed_bin(dir.path()).arg("ssh").arg(&path).output().unwrap();
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("ec2-user@ec2-1-2-3-4.us-west-2.compute.amazonaws.com"));
    assert!(out.contains(&format!("chmod 400 {}", cfg.key_path)));
}

#[test]
fn plugins_json_lists_builtins() {
    let dir = tempfile::tempdir().unwrap();
    let output = testbed_bin(dir.path())
        .args(["--json", "plugins"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let names: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["name"].as_str())
        .collect();
    assert!(names.contains(&"update-amazon-linux-2"));
    assert!(names.contains(&"install-start-docker-ubuntu"));
}

#[test]
fn completions_bash() {
    let dir = tempfile::tempdir().unwrap();
    let output = testbed_bin(dir.path())
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("testbed"));
}

#[test]
fn apply_node_auth_without_role_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = init_config(dir.path());

    let output = testbed_bin(dir.path())
        .arg("apply-node-auth")
        .arg(&path)
        .env("TESTBED_SKIP_PREREQS", "1")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("instance-profile-role-arn"));
}

#[test]
fn apply_node_auth_reports_missing_kubectl() {
    let dir = tempfile::tempdir().unwrap();
    let path = init_config(dir.path());
    let mut cfg = testbed_store::load(&path).unwrap();
    cfg.kubectl_path = dir.path().join("no-kubectl").to_string_lossy().into_owned();
    testbed_store::sync(&mut cfg).unwrap();

    let output = testbed_bin(dir.path())
        .arg("apply-node-auth")
        .arg(&path)
        .env_remove("TESTBED_SKIP_PREREQS")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("missing prerequisites"));
}

#[cfg(unix)]
mod with_fake_kubectl {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn configure(dir: &Path, script: &str) -> PathBuf {
        let path = init_config(dir);
        let bin = dir.join("kubectl");
        std::fs::write(&bin, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        let kubeconfig = dir.join("kubeconfig");
        std::fs::write(&kubeconfig, "apiVersion: v1\nkind: Config\n").unwrap();

        let mut cfg = testbed_store::load(&path).unwrap();
        cfg.kubectl_path = bin.to_string_lossy().into_owned();
        cfg.kubeconfig_path = kubeconfig.to_string_lossy().into_owned();
        cfg.instance_profile_role_arn = "arn:aws:iam::123456789012:role/node-role".to_owned();
        testbed_store::sync(&mut cfg).unwrap();
        path
    }

    #[test]
    fn success_marks_config_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = configure(
            dir.path(),
            "for a in \"$@\"; do case \"$a\" in --filename=*) cat \"${a#--filename=}\";; esac; done",
        );

        let output = testbed_bin(dir.path())
            .args(["--json", "apply-node-auth"])
            .arg(&path)
            .args(["--retry-delay", "10ms", "--deadline", "20s"])
            .output()
            .unwrap();
        assert!(output.status.success(), "{}", stderr(&output));

        let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
        assert_eq!(value["attempts"], 1);
        let echoed = value["output"].as_str().unwrap();
        assert!(echoed.contains("rolearn: arn:aws:iam::123456789012:role/node-role"));
        assert!(echoed.contains("system:node:{{EC2PrivateDNSName}}"));

        let cfg = testbed_store::load(&path).unwrap();
        assert!(cfg.node_auth_applied);
        assert!(cfg.status.starts_with("applied node auth"));
    }

    #[test]
    fn persistent_failure_hits_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let path = configure(dir.path(), "echo 'error: Unauthorized' >&2\nexit 1");

        let output = testbed_bin(dir.path())
            .arg("apply-node-auth")
            .arg(&path)
            .args(["--retry-delay", "50ms", "--deadline", "400ms"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(5), "{}", stderr(&output));
        assert!(stderr(&output).contains("Unauthorized"));

        let cfg = testbed_store::load(&path).unwrap();
        assert!(!cfg.node_auth_applied);
        assert!(cfg.status.starts_with("apply node auth failed"));
    }
}
