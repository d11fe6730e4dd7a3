use std::fmt::Write as _;

use tilesync::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

const HELP: &str = "Type w/a/s/d or ArrowUp/ArrowLeft/... then Enter. Escape restarts, q quits.";

fn render(state: &GameState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Score: {}", state.score);
    let _ = writeln!(out, "{}", "-".repeat(state.grid.len() * 6));
    for row in &state.grid {
        for cell in row {
            match cell {
                Some(tile) => {
                    let _ = write!(out, "{:5} ", tile.value);
                }
                None => out.push_str("    . "),
            }
        }
        out.truncate(out.trim_end().len());
        out.push('\n');
    }
    if state.won {
        out.push_str("You win!\n");
    }
    if state.over {
        out.push_str("Game over. Press Escape to restart.\n");
    }
    out
}

// ---------------------------------------------------------------------------
// Client loop
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env();
    info!(endpoint = %config.endpoint, "connecting");
    let mut client = GameClient::connect(config)?;

    let mut state = client.subscribe_state();
    let mut connection = client.subscribe_connection();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if let Some(banner) = connection.borrow_and_update().banner() {
        println!("{banner}");
    }
    print!("{}", render(&state.borrow_and_update()));
    println!("{HELP}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let key = line.trim();
                if should_quit(key) {
                    break;
                }
                if client.press(key)?.is_none() && !key.is_empty() {
                    println!("ignored: {key}");
                }
            }
            Ok(()) = state.changed() => {
                print!("{}", render(&state.borrow_and_update()));
            }
            Ok(()) = connection.changed() => {
                let current = *connection.borrow_and_update();
                match current.banner() {
                    Some(banner) => println!("{banner}"),
                    None => println!("Connected."),
                }
            }
        }
    }

    client.stop().await;
    Ok(())
}
