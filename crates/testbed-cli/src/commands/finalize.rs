use super::{json_pretty, lock_config, print_summary, summary, EXIT_SUCCESS};
use std::path::Path;
use testbed_schema::ProcessEnv;

pub fn run(config: &Path, json: bool) -> Result<u8, String> {
    let _lock = lock_config(config)?;

    let cfg = testbed_core::resume(config, &ProcessEnv).map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&summary(&cfg))?);
    } else {
        println!("finalized {}", cfg.config_path);
        print_summary(&cfg);
    }
    Ok(EXIT_SUCCESS)
}
