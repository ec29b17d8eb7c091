// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Atelier CLI entry point
//!
//! Runs one generation from a prompt and prints the streamed document and a
//! section summary.

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use atelier::cli::Args;
use atelier::config::Settings;
use atelier::document::{parse_document, SectionTag};
use atelier::error::Result;
use atelier::llm::registry::{self, GenerationProfile};
use atelier::orchestrator::OrchestratorConfig;
use atelier::prompt;
use atelier::relay::{RelayEvent, StreamRelay};
use atelier::tools::{ToolRegistry, WebSearchTool};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("atelier={default}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let settings = Settings::load()?;

    let model = args
        .model
        .clone()
        .unwrap_or_else(|| settings.defaults.model.clone());
    let row = registry::resolve(&model);
    let provider = registry::provider_for(row, &settings)?;
    let profile = GenerationProfile::from(row);

    let mut tools = ToolRegistry::new();
    if let Some(key) = settings.search_api_key() {
        let tool = match settings.search.base_url {
            Some(ref base_url) => WebSearchTool::with_base_url(key, base_url),
            None => WebSearchTool::new(key),
        };
        tools.register(Arc::new(tool));
    }

    let relay = StreamRelay::new(
        provider,
        Arc::new(tools),
        OrchestratorConfig::from(&settings.pipeline),
    );

    if let Some(topic) = args.fun_fact {
        let fact = relay.fill_in(&topic, profile).await?;
        println!("{fact}");
        return Ok(());
    }

    let Some(prompt_text) = args.prompt else {
        eprintln!("Nothing to do: pass a prompt, or --fun-fact <topic>");
        return Ok(());
    };

    if args.title {
        let title = relay.suggest_title(&prompt_text, profile).await?;
        println!("{title}");
        return Ok(());
    }

    let messages = vec![atelier::llm::message::Message::user(prompt_text)];
    let mut rx = relay.open(messages, profile, Some(prompt::SYSTEM_PROMPT.to_string()));

    let mut buffer = String::new();
    let mut stdout = std::io::stdout();
    while let Some(event) = rx.recv().await {
        match event {
            RelayEvent::Chunk { content } => {
                buffer.push_str(&content);
                print!("{content}");
                let _ = stdout.flush();
            }
            RelayEvent::Done => break,
            RelayEvent::Error { message } => {
                eprintln!("\nGeneration failed: {message}");
                std::process::exit(1);
            }
        }
    }
    println!();

    let document = parse_document(&buffer, true);
    eprintln!("\nSections:");
    for tag in SectionTag::ALL {
        if let Some(section) = document.get(tag) {
            let status = if section.complete { "complete" } else { "incomplete" };
            eprintln!("  {tag}: {status} ({} bytes)", section.content.len());
        }
    }

    Ok(())
}
