//! `parley chat`: Interactive or single-message chat mode.

use parley_agent::{ChatPipeline, TurnOutcome, TurnStatus};
use parley_core::session::SessionId;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::bootstrap;

pub async fn run(
    config_path: &Path,
    message: Option<String>,
    session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let handle = bootstrap::load_config(config_path)?;
    let bot_name = handle.snapshot().config.bot.name.clone();
    let pipeline = bootstrap::build_pipeline(handle).await?;

    let session_id = match session {
        Some(id) => SessionId::from(&id),
        None => pipeline.start_session().await?,
    };

    if let Some(msg) = message {
        let outcome = pipeline.handle_turn(&session_id, &msg).await?;
        println!("{}", outcome.bot_response);
        return Ok(());
    }

    println!();
    println!("  Parley — Interactive Mode");
    println!("  Session:   {session_id}");
    println!("  Assistant: {bot_name}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt()?;
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        match pipeline.handle_turn(&session_id, line).await {
            Ok(outcome) => print_outcome(&bot_name, &outcome),
            Err(e) => eprintln!("  [Error] {e}\n"),
        }
        prompt()?;
    }

    print_summary(&pipeline, &session_id).await;
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

fn print_outcome(bot_name: &str, outcome: &TurnOutcome) {
    println!();
    for line in outcome.bot_response.lines() {
        println!("  {bot_name} > {line}");
    }
    match (outcome.status, outcome.mode) {
        (TurnStatus::Answered, Some(mode)) => println!("  [{mode}]"),
        (status, _) => println!("  [{status:?}]"),
    }
    println!();
}

async fn print_summary(pipeline: &ChatPipeline, session_id: &SessionId) {
    match pipeline.history(session_id).await {
        Ok(session) => println!("\n  {} turn(s) saved to session {session_id}\n", session.history.len()),
        Err(e) => eprintln!("\n  [Error] could not read history: {e}\n"),
    }
}
