use super::{json_pretty, EXIT_SUCCESS};
use testbed_schema::list_plugins;

pub fn run(json: bool) -> Result<u8, String> {
    let plugins = list_plugins();
    if json {
        let entries: Vec<_> = plugins
            .iter()
            .map(|p| serde_json::json!({ "name": p.name, "description": p.description }))
            .collect();
        println!("{}", json_pretty(&entries)?);
    } else {
        for p in plugins {
            println!("{:<40} {}", p.name, p.description);
        }
    }
    Ok(EXIT_SUCCESS)
}
