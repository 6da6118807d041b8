//! `parley serve`: Start the HTTP API server.

use std::path::Path;

use crate::bootstrap;

pub async fn run(config_path: &Path, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let handle = bootstrap::load_config(config_path)?;
    let gateway = handle.snapshot().config.gateway.clone();

    println!("Parley Gateway");
    println!("   Config:    {}", config_path.display());
    println!(
        "   Listening: {}:{}",
        gateway.host,
        port_override.unwrap_or(gateway.port)
    );

    let pipeline = bootstrap::build_pipeline(handle).await?;
    parley_gateway::start(pipeline, port_override).await?;

    Ok(())
}
