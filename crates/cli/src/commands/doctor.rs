//! `parley doctor`: Diagnose configuration and collaborator health.

use parley_agent::WordListLexicon;
use parley_config::ConfigHandle;
use parley_core::provider::Generator;
use std::path::Path;

use crate::bootstrap;

pub async fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Parley Doctor — System Diagnostics");
    println!("==================================\n");

    let mut issues = 0;

    if !config_path.exists() {
        println!("  ⚠️  No config file at {} — defaults in use (run `parley init`)", config_path.display());
        issues += 1;
    }

    let handle = match ConfigHandle::load(config_path) {
        Ok(handle) => {
            println!("  ✅ Configuration and profiles valid");
            handle
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  Fix the configuration before running further checks.");
            return Err(e.into());
        }
    };
    let snapshot = handle.snapshot();
    let config = &snapshot.config;

    match WordListLexicon::load(&config.gibberish.lexicon_path) {
        Ok(lexicon) => println!("  ✅ Lexicon loaded ({} words)", lexicon.len()),
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    if config.images.enabled {
        if config.images.catalog_path.exists() {
            println!("  ✅ Image catalog found at {}", config.images.catalog_path.display());
        } else {
            println!("  ❌ Image catalog missing at {}", config.images.catalog_path.display());
            issues += 1;
        }
    } else {
        println!("  ➖ Image search disabled");
    }

    match bootstrap::session_store(config).await {
        Ok(store) => println!("  ✅ Session store ready ({})", store.name()),
        Err(e) => {
            println!("  ❌ Session store unavailable: {e}");
            issues += 1;
        }
    }

    match bootstrap::vector_search(config) {
        Ok(search) => println!("  ✅ Vector search configured ({})", search.name()),
        Err(e) => {
            println!("  ❌ Vector search not configured: {e}");
            issues += 1;
        }
    }

    if config.documents.token.is_some() {
        println!("  ✅ Document store token configured");
    } else {
        println!("  ⚠️  No GITHUB_TOKEN — private repositories will fail to fetch");
        issues += 1;
    }

    match parley_providers::build_generator(config) {
        Ok(generator) => match generator.health_check().await {
            Ok(true) => println!("  ✅ Generation backend reachable ({})", config.generation.model),
            Ok(false) | Err(_) => {
                println!("  ⚠️  Generation backend did not answer a health check");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ {e} — set OPENAI_API_KEY or PARLEY_API_KEY");
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
