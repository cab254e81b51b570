use super::{json_pretty, lock_config, print_summary, summary, EXIT_SUCCESS};
use std::path::Path;
use testbed_schema::ProcessEnv;

pub fn run(config: Option<&Path>, json: bool) -> Result<u8, String> {
    let _lock = config.map(lock_config).transpose()?;

    let cfg = testbed_core::prepare(config, &ProcessEnv).map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&summary(&cfg))?);
    } else {
        println!("created configuration for {}", cfg.cluster_name);
        print_summary(&cfg);
    }
    Ok(EXIT_SUCCESS)
}
