// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! icmplib - ICMP echo and traceroute engine for Rustux
//!
//! Builds checksummed echo requests, sends them over a raw IPv4 socket,
//! classifies and validates what comes back, and drives the ping and
//! traceroute probe loops.

pub mod checksum;
pub mod codes;
pub mod config;
pub mod error;
pub mod packet;
pub mod probe;
pub mod raw;
pub mod reply;
pub mod report;
pub mod resolve;
pub mod stats;

pub use checksum::checksum;
pub use config::{ConfigFile, ProbeConfig};
pub use error::{IcmpError, Result};
pub use packet::{EchoRequest, ECHO_PATTERN, ICMP_ECHO_REPLY, ICMP_ECHO_REQUEST};
pub use probe::{Prober, TraceResult};
pub use raw::{Datagram, ProbeOutcome, RawSocket, RawTransport, TimeoutCause, Transport};
pub use reply::{EchoReply, Mismatch};
pub use report::{ConsoleReporter, ProbeReport, Reporter};
pub use resolve::resolve_host;
pub use stats::{RunStatistics, Summary};
