use super::{colorize_applied, json_pretty, load_config, EXIT_SUCCESS};
use std::path::Path;

pub fn run(config: &Path, json: bool) -> Result<u8, String> {
    let cfg = load_config(config)?;
    if json {
        println!("{}", json_pretty(&cfg)?);
        return Ok(EXIT_SUCCESS);
    }

    let updated = cfg
        .updated_at
        .map_or_else(|| "(never)".to_owned(), |t| t.to_rfc3339());
    println!("cluster-name:  {}", cfg.cluster_name);
    println!("tag:           {}", cfg.tag);
    println!("aws-region:    {}", cfg.aws_region);
    println!("image-id:      {}", cfg.image_id);
    println!("instance-type: {}", cfg.instance_type);
    println!("cluster-size:  {}", cfg.cluster_size);
    println!("plugins:       {}", cfg.plugins.join(", "));
    println!("key-path:      {}", cfg.key_path);
    println!("instances:     {}", cfg.instances.len());
    println!("node-auth:     {}", colorize_applied(cfg.node_auth_applied));
    if !cfg.status.is_empty() {
        println!("status:        {}", cfg.status);
    }
    println!("updated-at:    {updated}");
    Ok(EXIT_SUCCESS)
}
