use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{config::load_settings, HttpQaBackend, SessionController};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod terminal;

use terminal::{InputCommand, TerminalTab, TerminalView, HELP};

#[derive(Parser, Debug)]
#[command(about = "Chat with the page you are reading")]
struct Args {
    /// Page to analyze; can be changed later with /open.
    #[arg(long)]
    url: Option<String>,
    /// Question-answering backend, e.g. http://127.0.0.1:8000.
    #[arg(long)]
    api_base_url: Option<String>,
    /// Client settings file (defaults to ./client.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref()).context("failed to load settings")?;
    if let Some(api_base_url) = args.api_base_url {
        settings = settings.with_api_base_url(api_base_url);
    }
    let backend = HttpQaBackend::new(&settings).context("failed to build HTTP client")?;
    info!(api_base_url = backend.base_url(), "using backend");

    let tab = Arc::new(TerminalTab::new(args.url));
    let view = Arc::new(TerminalView::stdout());
    let controller = SessionController::new(Arc::new(backend), tab.clone(), view);

    spawn_initialize(&controller);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match InputCommand::parse(&line) {
            InputCommand::Ask(question) => {
                let controller = controller.clone();
                tokio::spawn(async move {
                    if !controller.submit_question(&question).await {
                        debug!("question ignored; session busy or not ready");
                    }
                });
            }
            InputCommand::Retry => {
                if controller.retry_visible().await {
                    spawn_initialize(&controller);
                } else {
                    println!("Nothing to retry.");
                }
            }
            InputCommand::Open(url) => {
                tab.open(url);
                spawn_initialize(&controller);
            }
            InputCommand::Help => println!("{HELP}"),
            InputCommand::Unknown(command) => println!("Unknown command {command}. {HELP}"),
            InputCommand::Quit => break,
        }
    }

    Ok(())
}

fn spawn_initialize(controller: &Arc<SessionController>) {
    let controller = controller.clone();
    tokio::spawn(async move { controller.initialize().await });
}
