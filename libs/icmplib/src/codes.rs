// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! ICMP type/code descriptions
//!
//! Reference: https://www.iana.org/assignments/icmp-parameters/icmp-parameters.xhtml

pub const ICMP_DEST_UNREACHABLE: u8 = 3;
pub const ICMP_TIME_EXCEEDED: u8 = 11;

const UNREACHABLE: [&str; 16] = [
    "Net Unreachable",
    "Host Unreachable",
    "Protocol Unreachable",
    "Port Unreachable",
    "Fragmentation Needed and Don't Fragment was Set",
    "Source Route Failed",
    "Destination Network Unknown",
    "Destination Host Unknown",
    "Source Host Isolated",
    "Communication with Destination Network is Administratively Prohibited",
    "Communication with Destination Host is Administratively Prohibited",
    "Destination Network Unreachable for Type of Service",
    "Destination Host Unreachable for Type of Service",
    "Communication Administratively Prohibited",
    "Host Precedence Violation",
    "Precedence cutoff in effect",
];

const TIME_EXCEEDED: [&str; 2] = [
    "Time to Live exceeded in Transit",
    "Fragment Reassembly Time Exceeded",
];

/// Human readable meaning of an error message type/code pair.
pub fn describe(icmp_type: u8, icmp_code: u8) -> Option<&'static str> {
    let table: &[&'static str] = match icmp_type {
        ICMP_DEST_UNREACHABLE => &UNREACHABLE,
        ICMP_TIME_EXCEEDED => &TIME_EXCEEDED,
        _ => return None,
    };
    table.get(icmp_code as usize).copied()
}
