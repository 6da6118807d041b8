//! `parley init`: Write a default configuration file.

use parley_config::AppConfig;
use std::path::Path;

pub fn run(config_path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("Parley — First-Time Setup");
    println!("=========================\n");

    if let Some(dir) = config_path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
            println!("  Created config directory: {}", dir.display());
        }
    }

    if config_path.exists() && !force {
        println!("  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or re-run with --force.\n");
        return Ok(());
    }

    std::fs::write(config_path, AppConfig::default_toml())?;
    println!("  Created config at: {}", config_path.display());
    println!("\n  Next steps:");
    println!("   1. Set OPENAI_API_KEY (or PARLEY_API_KEY), PINECONE_API_KEY and GITHUB_TOKEN");
    println!("   2. Point [images] catalog_path and [gibberish] lexicon_path at real files");
    println!("   3. Run: parley doctor, then parley serve\n");

    Ok(())
}
