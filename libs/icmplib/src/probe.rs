// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Ping and traceroute probe loops
//!
//! Probes run strictly one after another: each is built, sent, waited on
//! and reported before the next one is built.

use std::net::Ipv4Addr;
use std::thread;

use log::{debug, warn};

use crate::codes::{ICMP_DEST_UNREACHABLE, ICMP_TIME_EXCEEDED};
use crate::config::ProbeConfig;
use crate::error::Result;
use crate::packet::EchoRequest;
use crate::raw::{Datagram, ProbeOutcome, Transport};
use crate::reply::{validate, EchoReply};
use crate::report::{ProbeReport, Reporter};
use crate::resolve::resolve_host;
use crate::stats::RunStatistics;

/// Identifier shared by every probe of this process.
pub fn process_identifier() -> u16 {
    (std::process::id() & 0xFFFF) as u16
}

#[derive(Debug, Clone)]
pub struct TraceResult {
    pub probes: u32,
    /// TTL of the last probe sent.
    pub last_ttl: u8,
    pub reached: bool,
    pub stats: RunStatistics,
}

pub struct Prober<T, R> {
    transport: T,
    reporter: R,
    config: ProbeConfig,
    identifier: u16,
}

impl<T: Transport, R: Reporter> Prober<T, R> {
    pub fn new(transport: T, reporter: R, config: ProbeConfig) -> Self {
        Self {
            transport,
            reporter,
            config,
            identifier: process_identifier(),
        }
    }

    pub fn with_identifier(mut self, identifier: u16) -> Self {
        self.identifier = identifier;
        self
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Sends `count` echo requests with sequence numbers from 0 and reports
    /// the run statistics.
    pub fn ping(&mut self, host: &str) -> Result<RunStatistics> {
        let address = resolve_host(host)?;
        debug!("ping {} ({}) identifier={}", host, address, self.identifier);
        self.reporter.start(host, address);

        let mut stats = RunStatistics::new();
        for sequence in 0..self.config.count {
            let mut request = self.request(host, address, sequence, self.config.ttl);
            self.probe(&mut request, &mut stats)?;
        }

        if let Some(summary) = stats.summarize() {
            self.reporter.summary(host, &summary);
        }
        Ok(stats)
    }

    /// Probes with TTL 1, 2, ... until the target answers with an echo reply
    /// or `max_hops` has been probed.
    pub fn traceroute(&mut self, host: &str) -> Result<TraceResult> {
        let address = resolve_host(host)?;
        debug!(
            "traceroute {} ({}) identifier={} max_hops={}",
            host, address, self.identifier, self.config.max_hops
        );
        self.reporter.start(host, address);

        let mut stats = RunStatistics::new();
        let mut probes = 0;
        let mut ttl: u8 = 1;
        loop {
            let mut request = self.request(host, address, ttl as u16, ttl);
            let reached = self.probe(&mut request, &mut stats)?;
            probes += 1;

            if reached || ttl >= self.config.max_hops {
                if !reached {
                    debug!("{} not reached within {} hops", host, ttl);
                }
                return Ok(TraceResult {
                    probes,
                    last_ttl: ttl,
                    reached,
                    stats,
                });
            }

            ttl += 1;
            thread::sleep(self.config.hop_delay());
        }
    }

    fn request(&self, host: &str, address: Ipv4Addr, sequence: u16, ttl: u8) -> EchoRequest {
        let mut request = EchoRequest::build(self.identifier, sequence).with_target(host, address);
        request.set_ttl(ttl);
        request
    }

    /// Runs one probe. Returns true when the target itself answered.
    fn probe(&mut self, request: &mut EchoRequest, stats: &mut RunStatistics) -> Result<bool> {
        let ttl = request.ttl();
        let outcome = match self
            .transport
            .send_and_wait(request, self.config.timeout(), stats)
        {
            Ok(outcome) => outcome,
            Err(e) if !e.is_fatal() => {
                self.reporter.malformed(ttl, &e);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        match outcome {
            ProbeOutcome::EchoReply(datagram) => {
                self.echo_reply(request, datagram, stats);
                Ok(true)
            }
            ProbeOutcome::TimeExceeded { code, datagram } => {
                stats.record_response();
                self.reporter
                    .response(&error_report(ttl, ICMP_TIME_EXCEEDED, code, &datagram));
                Ok(false)
            }
            ProbeOutcome::Unreachable { code, datagram } => {
                stats.record_response();
                self.reporter
                    .response(&error_report(ttl, ICMP_DEST_UNREACHABLE, code, &datagram));
                Ok(false)
            }
            ProbeOutcome::Unknown { icmp_type, datagram } => {
                debug!("unexpected ICMP type {} from {}", icmp_type, datagram.source);
                let code = datagram.icmp_code().unwrap_or_default();
                self.reporter
                    .response(&error_report(ttl, icmp_type, code, &datagram));
                Ok(false)
            }
            ProbeOutcome::Timeout(cause) => {
                self.reporter.timeout(ttl, cause);
                Ok(false)
            }
        }
    }

    fn echo_reply(&mut self, request: &EchoRequest, datagram: Datagram, stats: &mut RunStatistics) {
        let ttl = request.ttl();
        let Datagram {
            bytes,
            source,
            elapsed,
            received_at,
        } = datagram;

        let mut reply = match EchoReply::parse(bytes) {
            Ok(reply) => reply,
            Err(e) => {
                self.reporter.malformed(ttl, &e);
                return;
            }
        };
        validate(request, &mut reply);

        let rtt_ms = reply
            .rtt_ms(received_at)
            .unwrap_or_else(|| elapsed.as_secs_f64() * 1000.0);
        stats.record_rtt(rtt_ms);
        stats.record_response();

        let mismatches = reply.mismatches(request);
        if !reply.is_valid() {
            warn!(
                "invalid echo reply from {}: {} check(s) failed",
                source,
                mismatches.len()
            );
        }

        self.reporter.response(&ProbeReport {
            ttl,
            rtt_ms,
            icmp_type: reply.icmp_type(),
            icmp_code: reply.icmp_code(),
            source,
            echo: Some((reply.identifier(), reply.sequence_number())),
            valid: Some(reply.is_valid()),
            mismatches,
        });
    }
}

fn error_report(ttl: u8, icmp_type: u8, icmp_code: u8, datagram: &Datagram) -> ProbeReport {
    ProbeReport {
        ttl,
        rtt_ms: datagram.elapsed_ms(),
        icmp_type,
        icmp_code,
        source: datagram.source,
        echo: None,
        valid: None,
        mismatches: Vec::new(),
    }
}
