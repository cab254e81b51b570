pub mod apply_node_auth;
pub mod completions;
pub mod finalize;
pub mod init;
pub mod plugins;
pub mod show;
pub mod ssh;

use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use testbed_core::ConfigLock;
use testbed_schema::Config;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_STORE_ERROR: u8 = 3;
pub const EXIT_ABORTED: u8 = 4;
pub const EXIT_DEADLINE_EXCEEDED: u8 = 5;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn finish(pb: &ProgressBar, msg: String) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(msg);
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✗ {msg}"));
}

pub fn colorize_applied(applied: bool) -> String {
    use console::Style;
    if applied {
        Style::new().green().apply_to("applied").to_string()
    } else {
        Style::new().yellow().apply_to("pending").to_string()
    }
}

pub fn lock_config(path: &Path) -> Result<ConfigLock, String> {
    ConfigLock::for_config(path).map_err(|e| format!("config lock: {e}"))
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    testbed_store::load(path).map_err(|e| format!("store error: {e}"))
}

/// Identity and paths of a finalized configuration, for `init` and `finalize`.
pub fn summary(cfg: &Config) -> serde_json::Value {
    serde_json::json!({
        "cluster-name": cfg.cluster_name,
        "tag": cfg.tag,
        "aws-region": cfg.aws_region,
        "config-path": cfg.config_path,
        "config-path-bucket": cfg.config_path_bucket,
        "key-name": cfg.key_name,
        "key-path": cfg.key_path,
        "log-outputs": cfg.log_outputs,
    })
}

pub fn print_summary(cfg: &Config) {
    println!("cluster:     {}", cfg.cluster_name);
    println!("region:      {}", cfg.aws_region);
    println!("instances:   {} x {}", cfg.cluster_size, cfg.instance_type);
    println!("config:      {}", cfg.config_path);
    println!("key:         {} ({})", cfg.key_name, cfg.key_path);
}
