// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Per-probe and end-of-run reporting

use std::io::{self, Write};
use std::net::Ipv4Addr;

use crate::codes::describe;
use crate::error::IcmpError;
use crate::raw::TimeoutCause;
use crate::reply::Mismatch;
use crate::stats::Summary;

/// What came back for one probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub ttl: u8,
    pub rtt_ms: f64,
    pub icmp_type: u8,
    pub icmp_code: u8,
    pub source: Ipv4Addr,
    /// Identifier and sequence number, echo replies only.
    pub echo: Option<(u16, u16)>,
    /// Validation result, echo replies only.
    pub valid: Option<bool>,
    pub mismatches: Vec<Mismatch>,
}

impl ProbeReport {
    pub fn description(&self) -> Option<&'static str> {
        describe(self.icmp_type, self.icmp_code)
    }
}

pub trait Reporter {
    fn start(&mut self, host: &str, address: Ipv4Addr);
    fn response(&mut self, report: &ProbeReport);
    fn timeout(&mut self, ttl: u8, cause: TimeoutCause);
    fn malformed(&mut self, ttl: u8, error: &IcmpError);
    fn summary(&mut self, host: &str, summary: &Summary);
}

/// Writes human readable lines, to stdout by default.
pub struct ConsoleReporter<W: Write = io::Stdout> {
    out: W,
}

impl ConsoleReporter {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

// Console output is best effort; a closed stdout must not end the run.
impl<W: Write> Reporter for ConsoleReporter<W> {
    fn start(&mut self, host: &str, address: Ipv4Addr) {
        let _ = writeln!(self.out, "Pinging ({}) {}", host, address);
    }

    fn response(&mut self, report: &ProbeReport) {
        let mut line = format!(
            "  TTL={}    RTT={:.0} ms    Type={}    Code={}",
            report.ttl, report.rtt_ms, report.icmp_type, report.icmp_code
        );
        if let Some((identifier, sequence)) = report.echo {
            line.push_str(&format!(
                "        Identifier={}    Sequence Number={}",
                identifier, sequence
            ));
        }
        line.push_str(&format!("    {}", report.source));
        if let Some(description) = report.description() {
            line.push_str(&format!("  {}", description));
        }
        let _ = writeln!(self.out, "{}", line);

        for mismatch in &report.mismatches {
            let _ = writeln!(self.out, "  {}", mismatch);
        }
    }

    fn timeout(&mut self, ttl: u8, cause: TimeoutCause) {
        let _ = writeln!(
            self.out,
            "  TTL={}    *        *        *        *        *      {}",
            ttl, cause
        );
    }

    fn malformed(&mut self, ttl: u8, error: &IcmpError) {
        let _ = writeln!(self.out, "  TTL={}    unparseable reply: {}", ttl, error);
    }

    fn summary(&mut self, host: &str, summary: &Summary) {
        let _ = writeln!(self.out);
        let _ = writeln!(self.out, "--- {} ping statistics ---", host);
        let _ = writeln!(
            self.out,
            "{} packets transmitted, {} received, {:.0}% packet loss",
            summary.sent, summary.received, summary.loss_pct
        );
        let _ = writeln!(
            self.out,
            "Ping Complete - Min RTT: {:.0} ms, Max RTT: {:.0} ms, Avg RTT: {:.0} ms",
            summary.min_ms, summary.max_ms, summary.avg_ms
        );
    }
}
