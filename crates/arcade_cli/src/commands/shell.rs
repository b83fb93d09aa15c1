//! Shell command implementation.

use arcade_core::{Config, Store};
use arcade_server::{KvServer, ServerConfig};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Options for the shell command.
#[derive(Debug, Clone)]
pub struct ShellOptions {
    /// Idle session time-to-live; `None` keeps sessions until closed.
    pub session_ttl: Option<Duration>,
    /// Maximum number of open sessions.
    pub max_sessions: usize,
    /// Writer lock wait.
    pub busy_timeout: Duration,
}

/// Runs the shell command.
pub fn run(path: &Path, options: &ShellOptions) -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::open_with_config(path, Config::default().busy_timeout(options.busy_timeout))?;
    let mut config = ServerConfig::new().with_max_sessions(options.max_sessions);
    config.session_ttl = options.session_ttl;
    let server = KvServer::new(&store, config);

    tracing::info!(path = %path.display(), "serving requests on stdin");

    let stdin = io::stdin();
    let mut out = BufWriter::new(io::stdout().lock());
    serve(&server, stdin.lock(), &mut out)?;

    let stats = store.stats().snapshot();
    tracing::info!(
        autocommits = stats.autocommits,
        transactions = stats.transactions_committed,
        "shell closed"
    );
    Ok(())
}

/// Answers each non-empty input line with one response line.
pub fn serve<R: BufRead, W: Write>(server: &KvServer<'_>, input: R, out: &mut W) -> io::Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        server.evict_expired();
        writeln!(out, "{}", server.handle_json(&line))?;
        out.flush()?;
    }
    Ok(())
}
