// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! traceroute - Trace the route to a host with ICMP echo probes

use anyhow::{Context, Result};
use clap::Parser;
use icmplib::{ConfigFile, ConsoleReporter, IcmpError, ProbeConfig, Prober, RawTransport};
use log::{debug, info};
use std::path::PathBuf;
use std::process::exit;
use tracing_subscriber::EnvFilter;

/// Traceroute utility
#[derive(Parser, Debug)]
#[command(name = "traceroute")]
#[command(about = "Print the route packets take to a network host", long_about = None)]
struct Args {
    /// Host to trace
    #[arg(required = true)]
    host: String,

    /// Maximum number of hops to probe
    #[arg(short = 'm', long)]
    max_hops: Option<u8>,

    /// Timeout for each probe (seconds)
    #[arg(short = 'w', long)]
    timeout: Option<u64>,

    /// Delay between probes (milliseconds)
    #[arg(short = 'z', long)]
    delay: Option<u64>,

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
    if let Some(max_hops) = args.max_hops {
        config.max_hops = max_hops;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(delay) = args.delay {
        config.hop_delay_ms = delay;
    }
    config.validate()?;
    debug!("using {:?}", config);

    let transport = RawTransport::new(config.recv_buffer);
    let mut prober = Prober::new(transport, ConsoleReporter::stdout(), config);

    let result = match prober.traceroute(&args.host) {
        Ok(result) => result,
        Err(e @ IcmpError::Socket(_)) => {
            eprintln!("traceroute: {} - error: {}", args.host, e);
            eprintln!("Note: ICMP sockets require CAP_NET_RAW capability or root privileges");
            exit(1);
        }
        Err(e) => return Err(e).with_context(|| format!("traceroute {} failed", args.host)),
    };

    if result.reached {
        info!("{} reached in {} hops", args.host, result.last_ttl);
    } else {
        println!("{} not reached within {} hops", args.host, result.last_ttl);
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
