//! Interactive command loop over stdin.

use anyhow::Result;
use lockbridge_bridge::BridgeClient;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::info;

const BANNER: &str = "\
========== LOCK BRIDGE ==========
Welcome to the lock bridge!
Type 'help' for available commands, 'quit' to exit.
=================================";

/// Words that end the session instead of being sent to the bridge.
fn is_exit(line: &str) -> bool {
    matches!(line, "quit" | "exit")
}

/// Read commands until `quit`, end of input, or Ctrl-C.
pub async fn run(client: &BridgeClient) -> Result<()> {
    println!("{BANNER}");
    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        };

        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_exit(line) {
            break;
        }

        let reply = client.execute_line(line).await?;
        println!("{}", reply.message);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words() {
        assert!(is_exit("quit"));
        assert!(is_exit("exit"));
        assert!(!is_exit("status"));
        assert!(!is_exit("quit now"));
    }
}
