use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use squall::api::ChatClient;
use squall::chat_loop;
use squall::core::config::Config;
use squall::session::Session;

#[derive(Parser)]
#[command(name = "squall")]
#[command(version)]
#[command(about = "An interactive chat client that routes weather queries to an MCP tool server")]
#[command(
    long_about = "Squall spawns an MCP weather server as a subprocess, discovers its tools, \
and runs an interactive chat loop. Queries containing \"weather alert in\" or \
\"weather forecast for\" are routed to the server's tools; everything else is \
answered by a local Ollama model.\n\n\
Configuration is read from config.toml in the platform config directory \
(model, base_url); OLLAMA_HOST overrides the endpoint."
)]
struct Args {
    /// Path to the MCP server script to spawn (must be a .py file)
    server_script: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "squall=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Help and version are normal exits; a missing argument is not.
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let chat = ChatClient::new(&config);

    let session = match Session::connect(&args.server_script).await {
        Ok(session) => session,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };

    // Shutdown runs exactly once on every exit path out of the loop.
    let result = chat_loop::run(&session, &chat).await;
    session.shutdown().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
