use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use chamadad::config::Config;
use chamadad::ipc;
use chamadad::logging;
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};

/// JSON-lines sidecar for the attendance dashboard.
#[derive(Debug, Parser)]
#[command(name = "chamadad", version, about)]
struct Args {
    /// Config file (defaults to the user config dir).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Connect to this backend at startup.
    #[arg(long, conflicts_with = "workspace")]
    remote_url: Option<String>,

    /// Open this embedded workspace at startup.
    #[arg(long)]
    workspace: Option<PathBuf>,
}

fn startup_request(args: &Args, config: &Config) -> Option<ipc::Request> {
    if let Some(path) = &args.workspace {
        return Some(ipc::Request {
            id: "startup".to_string(),
            method: "workspace.select".to_string(),
            params: json!({ "path": path }),
        });
    }
    let base_url = args.remote_url.clone().or_else(|| config.remote.base_url.clone())?;
    Some(ipc::Request {
        id: "startup".to_string(),
        method: "session.connect".to_string(),
        params: json!({ "baseUrl": base_url }),
    })
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_tracing();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading config")?;

    let mut state = ipc::AppState::new(config);

    // A failed startup connection is not fatal; the caller can retry over IPC.
    if let Some(req) = startup_request(&args, &state.config) {
        let resp = ipc::handle_request(&mut state, req);
        if resp.get("ok").and_then(|v| v.as_bool()) == Some(true) {
            info!(backend = ?state.backend, "connected at startup");
        } else {
            warn!(error = %resp["error"], "startup connection failed");
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let resp = json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                });
                let _ = writeln!(stdout, "{resp}");
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    Ok(())
}
