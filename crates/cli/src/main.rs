// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `triage` — the CLI surface over `triaged`'s wire protocol (§6):
//! `start`, `stop`, `status`. Minimal by design; the pipeline itself lives
//! entirely in the daemon.

mod client;
mod color;
mod exit_error;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use triage_daemon::env;
use triage_wire::{Request, Response};

use crate::client::Client;
use crate::exit_error::ExitError;

#[derive(Parser)]
#[command(name = "triage", version, styles = color::styles())]
struct Cli {
    /// State directory (also where `config.toml` is read from). Defaults to
    /// `TRIAGE_STATE_DIR`, then `$XDG_STATE_HOME/triage`, then
    /// `~/.local/state/triage`. Must be given consistently across `start`,
    /// `stop`, and `status` for a given daemon instance.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon.
    Start {
        /// Run in the foreground instead of spawning a background process.
        #[arg(long)]
        foreground: bool,
    },
    /// Ask the daemon to shut down.
    Stop,
    /// Print a pipeline status summary.
    Status {
        /// Print the summary as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let state_dir = cli.state_dir.unwrap_or_else(env::state_dir);
    if let Err(e) = run(&state_dir, cli.command).await {
        eprintln!("triage: {e}");
        let code = e.downcast_ref::<ExitError>().map(|exit| exit.code).unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(state_dir: &std::path::Path, command: Command) -> Result<()> {
    match command {
        Command::Start { foreground } => start(state_dir, foreground).await,
        Command::Stop => stop(state_dir).await,
        Command::Status { json } => status(state_dir, json).await,
    }
}

async fn start(state_dir: &std::path::Path, foreground: bool) -> Result<()> {
    triage_core::Config::load(state_dir).map_err(|e| ExitError::config(e.to_string()))?;

    if foreground {
        let binary = client::find_triaged_binary();
        let status = std::process::Command::new(&binary).arg(state_dir).status()?;
        return if status.success() {
            Ok(())
        } else {
            Err(ExitError::operational(format!("daemon exited with {status}")).into())
        };
    }

    if Client::connect(state_dir).await.is_ok() {
        println!("{} daemon already running", color::muted("->"));
        return Ok(());
    }

    client::spawn_and_wait_ready(state_dir).await?;
    println!("{} daemon started", color::header("->"));
    Ok(())
}

async fn stop(state_dir: &std::path::Path) -> Result<()> {
    let mut client = Client::connect(state_dir).await?;
    match client.send(Request::Stop).await? {
        Response::Ok => {
            println!("daemon stopped");
            Ok(())
        }
        Response::Error { message } => Err(ExitError::operational(message).into()),
        Response::Status(_) => Err(ExitError::operational("unexpected response to stop").into()),
    }
}

async fn status(state_dir: &std::path::Path, json: bool) -> Result<()> {
    let mut client = Client::connect(state_dir).await?;
    match client.send(Request::Status).await? {
        Response::Status(summary) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("groups open:     {}", summary.groups_open);
                println!("pending repairs: {}", summary.pending_repairs);
                println!("queue depth:     {}", summary.queue_depth);
                println!("agents:");
                if summary.agents.is_empty() {
                    println!("  {}", color::muted("none registered"));
                }
                for agent in &summary.agents {
                    println!(
                        "  {:<16} {:<10} {}/{}",
                        color::header(&agent.name),
                        agent.status,
                        agent.active_tasks,
                        agent.max_concurrent
                    );
                }
            }
            Ok(())
        }
        Response::Error { message } => Err(ExitError::operational(message).into()),
        Response::Ok => Err(ExitError::operational("unexpected response to status").into()),
    }
}
