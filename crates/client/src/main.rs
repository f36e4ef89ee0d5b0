// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kiln` — foreground client for the resident build daemon.
//!
//! Forwards the invocation verbatim to the daemon, renders the build's
//! event stream, and exits with the build's exit code.

use std::path::{Path, PathBuf};

use clap::Parser;
use indexmap::IndexMap;
use kiln::{
    color, connect, is_dumb_terminal, render::RenderLoop, ClientError, DumbDisplay, ExitError,
    FileLog, InputHandler, LogSink, MessageCollector, TerminalDisplay, TransportConfig,
};
use kiln_wire::{BuildRequest, Message};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "kiln",
    version,
    about = "Run a build on the resident daemon",
    styles = color::styles()
)]
struct Cli {
    /// Arguments forwarded verbatim to the build tool
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("kiln: {e}");
            std::process::exit(e.code);
        }
    }
}

async fn run(cli: Cli) -> Result<i32, ExitError> {
    init_tracing();

    let socket = kiln_daemon::env::socket_path()?;
    let (client, inbound) = connect(&socket, TransportConfig::from_env()).await?;

    let working_dir = std::env::current_dir()?;
    let project_dir = detect_project_dir(&working_dir);
    let env: IndexMap<String, String> = std::env::vars().collect();
    let request = BuildRequest {
        args: cli.args.clone(),
        working_dir: working_dir.to_string_lossy().into_owned(),
        project_dir: project_dir.to_string_lossy().into_owned(),
        env,
    };
    client
        .dispatch
        .send(Message::BuildRequest(request))
        .await
        .map_err(|_| ExitError::new(1, "connection lost before the build started"))?;

    let sink: Box<dyn LogSink> = match log_file_arg(&cli.args) {
        Some(path) => Box::new(FileLog::create(&path)?),
        None => Box::new(MessageCollector::new()),
    };

    // Ctrl-C outside raw mode (dumb terminals, or before raw mode is up)
    // still cancels the build. Weak senders keep this task from holding
    // the transport open after shutdown.
    {
        let dispatch = client.dispatch.downgrade();
        let events = client.events.downgrade();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                if let Some(dispatch) = dispatch.upgrade() {
                    let _ = dispatch.send(Message::CancelBuild).await;
                }
                if let Some(events) = events.upgrade() {
                    let _ = events.send(Message::CancelBuild).await;
                }
            }
        });
    }

    let daemon_id = client.daemon_id.clone();
    let code = if is_dumb_terminal() {
        let render =
            RenderLoop::new(inbound, client.dispatch.clone(), DumbDisplay::new(), sink, daemon_id, true);
        render.run().await?
    } else {
        let display =
            TerminalDisplay::new().map_err(ClientError::TerminalUnavailable)?;
        let handler = InputHandler::spawn(client.events.clone(), client.dispatch.clone());
        let render =
            RenderLoop::new(inbound, client.dispatch.clone(), display, sink, daemon_id, false)
                .with_input(handler.modal_sender(), handler.input_active());
        let code = render.run().await?;
        handler.shutdown();
        code
    };

    client.shutdown().await;
    Ok(code)
}

fn init_tracing() {
    if std::env::var("KILN_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_env("KILN_LOG"))
            .with_writer(std::io::stderr)
            .init();
    }
}

/// The value of a `-l`/`--log-file` argument, if the invocation carries
/// one. The argument is still forwarded to the build tool either way.
fn log_file_arg(args: &[String]) -> Option<PathBuf> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-l" || arg == "--log-file" {
            return iter.next().map(PathBuf::from);
        }
        if let Some(value) = arg.strip_prefix("--log-file=") {
            return Some(PathBuf::from(value));
        }
    }
    None
}

/// Walk up from the working directory to the outermost consecutive
/// directory carrying a build descriptor. A `.mvn` marker wins outright.
fn detect_project_dir(working_dir: &Path) -> PathBuf {
    let mut root = None;
    for dir in working_dir.ancestors() {
        if dir.join(".mvn").is_dir() {
            return dir.to_path_buf();
        }
        if dir.join("pom.xml").is_file() {
            root = Some(dir.to_path_buf());
        } else if root.is_some() {
            break;
        }
    }
    root.unwrap_or_else(|| working_dir.to_path_buf())
}
