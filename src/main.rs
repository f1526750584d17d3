use abx_client::config::{ClientConfig, DEFAULT_FIRST_SEQ, DEFAULT_HOST, DEFAULT_LAST_SEQ, DEFAULT_PORT};
use abx_client::diag::{DiagnosticLog, DEFAULT_LOG_FILE};
use abx_client::output::{save_json, DEFAULT_OUT_FILE};
use abx_client::recovery::RecoveryEngine;
use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(version, about = "Fetch the ABX trade feed, recover missing packets and save them as JSON")]
struct Args {
    /// Exchange host
    #[arg(long, env = "ABX_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Exchange port
    #[arg(long, env = "ABX_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// First sequence number expected from the feed
    #[arg(long, env = "ABX_FIRST_SEQ", default_value_t = DEFAULT_FIRST_SEQ)]
    first_seq: i32,

    /// Last sequence number expected from the feed (the feed never announces it)
    #[arg(long, env = "ABX_LAST_SEQ", default_value_t = DEFAULT_LAST_SEQ)]
    last_seq: i32,

    /// Per-connection timeout in milliseconds; blocks indefinitely when unset
    #[arg(long, env = "ABX_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Output JSON path
    #[arg(long, env = "ABX_OUT_FILE", default_value = DEFAULT_OUT_FILE)]
    out: PathBuf,

    /// Diagnostic log path (appended to)
    #[arg(long, env = "ABX_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    log: PathBuf,
}

fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();
    let args = Args::parse();

    let config = ClientConfig::new(
        args.host,
        args.port,
        args.first_seq..=args.last_seq,
        args.timeout_ms.map(Duration::from_millis),
    )?;
    let log = DiagnosticLog::new(&args.log);

    let session = RecoveryEngine::tcp(config.clone(), log)
        .run()
        .with_context(|| format!("Failed to connect to server at {}", config.address()))?;

    println!("Processing time: {}ms", session.elapsed.as_millis());
    if let Some(reason) = &session.stream.interrupted {
        eprintln!("stream ended early after {} packets: {}", session.stream.frames, reason);
    }
    let missing = session.packets.missing(config.expected_range());
    if !missing.is_empty() {
        eprintln!("{} of {} resends failed; missing sequences: {:?}", session.unrecovered().len(), session.resends.len(), missing);
    }

    save_json(&args.out, &session.packets)?;
    println!("Packets saved to {}", args.out.display());
    Ok(())
}
