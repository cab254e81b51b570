use super::{json_pretty, load_config, EXIT_SUCCESS};
use std::path::Path;

pub fn run(config: &Path, json: bool) -> Result<u8, String> {
    let cfg = load_config(config)?;

    if json {
        let instances: Vec<_> = cfg
            .instances
            .values()
            .map(|inst| {
                serde_json::json!({
                    "instance-id": inst.instance_id,
                    "public-dns-name": inst.public_dns_name,
                    "ssh": format!(
                        "ssh -o \"StrictHostKeyChecking no\" -i {} {}@{}",
                        cfg.key_path, cfg.user_name, inst.public_dns_name
                    ),
                })
            })
            .collect();
        println!("{}", json_pretty(&instances)?);
    } else if cfg.instances.is_empty() {
        eprintln!("no instances recorded in {}", config.display());
    } else {
        print!("{}", cfg.ssh_commands());
    }
    Ok(EXIT_SUCCESS)
}
