// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! ping - Send ICMP echo requests

use anyhow::{Context, Result};
use clap::Parser;
use icmplib::{ConfigFile, ConsoleReporter, IcmpError, ProbeConfig, Prober, RawTransport};
use log::debug;
use std::path::PathBuf;
use std::process::exit;
use tracing_subscriber::EnvFilter;

/// Ping utility
#[derive(Parser, Debug)]
#[command(name = "ping")]
#[command(about = "Send ICMP ECHO_REQUEST to network hosts", long_about = None)]
struct Args {
    /// Host to ping
    #[arg(required = true)]
    host: String,

    /// Number of pings to send
    #[arg(short, long)]
    count: Option<u16>,

    /// Timeout for each ping (seconds)
    #[arg(short = 'W', long)]
    timeout: Option<u64>,

    /// Time to live of outgoing packets
    #[arg(short = 't', long)]
    ttl: Option<u8>,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => ProbeConfig::load_from(path)?,
        None => ProbeConfig::load()?,
    };
    if let Some(count) = args.count {
        config.count = count;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(ttl) = args.ttl {
        config.ttl = ttl;
    }
    config.validate()?;
    debug!("using {:?}", config);

    let transport = RawTransport::new(config.recv_buffer);
    let mut prober = Prober::new(transport, ConsoleReporter::stdout(), config);

    let stats = match prober.ping(&args.host) {
        Ok(stats) => stats,
        Err(e @ IcmpError::Socket(_)) => {
            eprintln!("ping: {} - error: {}", args.host, e);
            eprintln!("Note: ICMP sockets require CAP_NET_RAW capability or root privileges");
            exit(1);
        }
        Err(e) => return Err(e).with_context(|| format!("ping {} failed", args.host)),
    };

    // Exit with appropriate code
    if stats.received() == 0 {
        exit(1);
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let directives = log_directives(verbose, std::env::var("RUST_LOG").ok());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .with_writer(std::io::stderr)
        .init();
}

/// `RUST_LOG` wins when set; otherwise warn, or debug with `-v`.
fn log_directives(verbose: bool, rust_log: Option<String>) -> String {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => directives,
        _ if verbose => "debug".to_string(),
        _ => "warn".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_overrides_default_level() {
        assert_eq!(log_directives(false, Some("debug".to_string())), "debug");
        assert_eq!(
            log_directives(true, Some("icmplib=trace".to_string())),
            "icmplib=trace"
        );
    }

    #[test]
    fn test_default_level() {
        assert_eq!(log_directives(false, None), "warn");
        assert_eq!(log_directives(true, None), "debug");
        assert_eq!(log_directives(false, Some("  ".to_string())), "warn");
    }
}
