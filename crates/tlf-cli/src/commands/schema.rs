use schemars::schema_for;
use tlf_config::TlfConfig;

/// Handle `tlf schema`: print the JSON Schema of `tlf.toml`.
pub fn handle() -> anyhow::Result<i32> {
    let schema = schema_for!(TlfConfig);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(0)
}
