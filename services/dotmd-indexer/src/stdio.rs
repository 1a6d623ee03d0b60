//! Stdio transport for JSON-RPC: reads one request per line from stdin,
//! writes one response per line to stdout. Lets `dotmd-indexer` run as a
//! subprocess for agent tooling that speaks JSON-RPC over pipes.

use std::io::{self, BufRead, Write};
use tracing::{error, info, warn};

use crate::handlers::AppState;
use crate::jsonrpc::{route_method, JsonRpcError, JsonRpcRequest, JsonRpcResponse};

pub async fn run(state: AppState) -> io::Result<()> {
    info!("starting JSON-RPC stdio server");
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("error reading from stdin: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
            Ok(request) => route_method(&request.method, request.params, request.id, &state).await,
            Err(e) => {
                warn!("invalid JSON-RPC request: {e}");
                JsonRpcResponse::error_public(JsonRpcError::parse_error())
            }
        };

        let json = serde_json::to_string(&response)?;
        writeln!(stdout, "{json}")?;
        stdout.flush()?;
    }

    info!("JSON-RPC stdio server stopped");
    Ok(())
}
