//! The interactive read-route-print loop.
//!
//! Strictly sequential: one query is fully resolved (routed, invoked,
//! printed) before the next line is read. Two error boundaries keep the loop
//! alive: tool-call failures are absorbed inside [`Session::invoke_tool`],
//! and anything else that fails during a turn is printed here as
//! `Error: {message}`.

use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::ChatClient;
use crate::mcp::{ALERTS_TOOL, FORECAST_TOOL};
use crate::router::{alert_arguments, forecast_arguments, route, Route, INVALID_LOCATION_MESSAGE};
use crate::session::Session;

/// Runs until the user types "quit" or stdin reaches end of file. Only I/O
/// errors on the console itself escape.
pub async fn run(session: &Session, chat: &ChatClient) -> std::io::Result<()> {
    println!("\nMCP Client Started!");
    println!("Type your queries or 'quit' to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nQuery: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if is_quit(query) {
            break;
        }

        let response = process_query(session, chat, query).await;
        println!("\n{response}");
    }

    Ok(())
}

/// Resolves one turn to the text that gets printed.
async fn process_query(session: &Session, chat: &ChatClient, query: &str) -> String {
    match route(query) {
        Route::Alerts { state } => {
            session
                .invoke_tool(ALERTS_TOOL, alert_arguments(&state))
                .await
        }
        Route::Forecast {
            latitude,
            longitude,
        } => {
            session
                .invoke_tool(FORECAST_TOOL, forecast_arguments(latitude, longitude))
                .await
        }
        Route::InvalidLocation => INVALID_LOCATION_MESSAGE.to_string(),
        Route::Chat => match chat.chat(query).await {
            Ok(reply) => reply,
            Err(message) => format!("Error: {message}"),
        },
    }
}

fn is_quit(query: &str) -> bool {
    query.eq_ignore_ascii_case("quit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_is_case_insensitive() {
        assert!(is_quit("quit"));
        assert!(is_quit("QUIT"));
        assert!(is_quit("Quit"));
    }

    #[test]
    fn quit_must_be_the_whole_line() {
        assert!(!is_quit("quit now"));
        assert!(!is_quit(""));
        assert!(!is_quit("please quit"));
    }
}
