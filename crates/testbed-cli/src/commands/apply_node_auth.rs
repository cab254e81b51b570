use super::{json_pretty, load_config, lock_config, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use std::path::Path;
use testbed_core::{Engine, ReconcileOptions};
use testbed_runtime::{check_control_plane_prereqs, format_missing, KubectlClient};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub fn run(
    config: &Path,
    options: ReconcileOptions,
    stop: &CancellationToken,
    json: bool,
) -> Result<u8, String> {
    let _lock = lock_config(config)?;
    let mut cfg = load_config(config)?;

    if std::env::var("TESTBED_SKIP_PREREQS").as_deref() != Ok("1") {
        let missing = check_control_plane_prereqs(&cfg.kubectl_path, &cfg.kubeconfig_path);
        if !missing.is_empty() {
            return Err(format_missing(&missing));
        }
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start async runtime: {e}"))?;
    let client = KubectlClient::from_config(&cfg);
    debug!("using {} with {options:?}", client.program().display());
    let engine = Engine::new(client, options);

    let pb = if json {
        None
    } else {
        Some(spinner(&format!("applying node auth for {}...", cfg.cluster_name)))
    };
    let result = runtime.block_on(engine.apply_node_auth(&mut cfg, stop));

    let report = match result {
        Ok(r) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "node auth applied");
            }
            r
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "node auth not applied");
            }
            return Err(e.to_string());
        }
    };

    if json {
        let payload = serde_json::json!({
            "cluster-name": cfg.cluster_name,
            "attempts": report.attempts,
            "elapsed-secs": report.elapsed.as_secs_f64(),
            "output": report.output,
            "status": cfg.status,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "applied node auth to {} after {} attempts",
            cfg.cluster_name, report.attempts
        );
        if !report.output.is_empty() {
            println!("{}", report.output);
        }
    }
    Ok(EXIT_SUCCESS)
}
