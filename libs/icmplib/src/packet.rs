// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! ICMP echo request construction

use std::net::Ipv4Addr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::checksum::checksum;
use crate::error::Result;
use crate::resolve::resolve_host;

pub const ICMP_ECHO_REQUEST: u8 = 8;
pub const ICMP_ECHO_REPLY: u8 = 0;

pub const HEADER_LEN: usize = 8;
pub const TIMESTAMP_LEN: usize = 8;
pub const DEFAULT_TTL: u8 = 255;

/// Payload carried after the send timestamp in every request.
pub const ECHO_PATTERN: &[u8; 52] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub icmp_type: u8,
    pub icmp_code: u8,
    pub icmp_cksum: u16,
    pub icmp_id: u16,
    pub icmp_seq: u16,
}

impl IcmpHeader {
    pub fn pack(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0] = self.icmp_type;
        buf[1] = self.icmp_code;
        buf[2..4].copy_from_slice(&self.icmp_cksum.to_be_bytes());
        buf[4..6].copy_from_slice(&self.icmp_id.to_be_bytes());
        buf[6..8].copy_from_slice(&self.icmp_seq.to_be_bytes());
        buf
    }
}

/// An outbound echo request together with its target and hop limit.
#[derive(Debug, Clone)]
pub struct EchoRequest {
    target_host: String,
    target_address: Option<Ipv4Addr>,
    header: IcmpHeader,
    ttl: u8,
    header_bytes: [u8; HEADER_LEN],
    data: Vec<u8>,
}

impl EchoRequest {
    /// Builds a checksummed echo request stamped with the current time.
    pub fn build(identifier: u16, sequence_number: u16) -> Self {
        let mut request = Self {
            target_host: String::new(),
            target_address: None,
            header: IcmpHeader {
                icmp_type: ICMP_ECHO_REQUEST,
                icmp_code: 0,
                icmp_cksum: 0,
                icmp_id: identifier,
                icmp_seq: sequence_number,
            },
            ttl: DEFAULT_TTL,
            header_bytes: [0; HEADER_LEN],
            data: Vec::with_capacity(TIMESTAMP_LEN + ECHO_PATTERN.len()),
        };
        request.encode();
        request
    }

    /// Re-packs the datagram with a fresh send timestamp.
    pub fn encode(&mut self) {
        self.encode_at(SystemTime::now());
    }

    /// Two-pass pack: the checksum is computed with the field zeroed and the
    /// header is packed again once the real value is known.
    pub fn encode_at(&mut self, sent_at: SystemTime) {
        self.header.icmp_cksum = 0;
        self.header_bytes = self.header.pack();

        let seconds = sent_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        self.data.clear();
        self.data.extend_from_slice(&seconds.to_ne_bytes());
        self.data.extend_from_slice(ECHO_PATTERN);

        self.header.icmp_cksum = checksum(&self.to_bytes());
        self.header_bytes = self.header.pack();
    }

    /// Resolves `host` and records it as the destination.
    pub fn set_target(&mut self, host: &str) -> Result<Ipv4Addr> {
        let address = resolve_host(host)?;
        self.target_host = host.to_string();
        self.target_address = Some(address);
        Ok(address)
    }

    /// Records an already resolved destination.
    pub fn with_target(mut self, host: &str, address: Ipv4Addr) -> Self {
        self.target_host = host.to_string();
        self.target_address = Some(address);
        self
    }

    pub fn target_host(&self) -> &str {
        &self.target_host
    }

    pub fn target_address(&self) -> Option<Ipv4Addr> {
        self.target_address
    }

    pub fn header(&self) -> &IcmpHeader {
        &self.header
    }

    pub fn icmp_type(&self) -> u8 {
        self.header.icmp_type
    }

    pub fn icmp_code(&self) -> u8 {
        self.header.icmp_code
    }

    pub fn checksum(&self) -> u16 {
        self.header.icmp_cksum
    }

    pub fn identifier(&self) -> u16 {
        self.header.icmp_id
    }

    pub fn sequence_number(&self) -> u16 {
        self.header.icmp_seq
    }

    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.ttl = ttl;
    }

    /// Payload before the timestamp is prepended.
    pub fn data_raw(&self) -> &'static [u8] {
        ECHO_PATTERN
    }

    /// Send time in seconds since the epoch, as carried in the payload.
    pub fn timestamp(&self) -> f64 {
        let mut raw = [0u8; TIMESTAMP_LEN];
        raw.copy_from_slice(&self.data[..TIMESTAMP_LEN]);
        f64::from_ne_bytes(raw)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.data.len());
        buf.extend_from_slice(&self.header_bytes);
        buf.extend_from_slice(&self.data);
        buf
    }

    pub fn hex_dump(&self) -> String {
        format!(
            "header ({} bytes): {}\ndata ({} bytes): {}",
            self.header_bytes.len(),
            hex::encode(self.header_bytes),
            self.data.len(),
            hex::encode(&self.data)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_header_layout() {
        let request = EchoRequest::build(0x1234, 7);
        let bytes = request.to_bytes();

        assert_eq!(bytes.len(), HEADER_LEN + TIMESTAMP_LEN + ECHO_PATTERN.len());
        assert_eq!(bytes[0], ICMP_ECHO_REQUEST);
        assert_eq!(bytes[1], 0);
        assert_eq!(&bytes[4..6], &[0x12, 0x34]);
        assert_eq!(&bytes[6..8], &[0x00, 0x07]);
        assert_eq!(&bytes[16..], &ECHO_PATTERN[..]);
        assert_eq!(request.ttl(), DEFAULT_TTL);
    }

    #[test]
    fn test_checksum_verifies() {
        let request = EchoRequest::build(42, 3);
        let bytes = request.to_bytes();
        assert_eq!(checksum(&bytes), 0);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), request.checksum());
    }

    #[test]
    fn test_checksum_is_computed_over_zeroed_field() {
        let request = EchoRequest::build(42, 3);
        let mut bytes = request.to_bytes();
        bytes[2] = 0;
        bytes[3] = 0;
        assert_eq!(checksum(&bytes), request.checksum());
    }

    #[test]
    fn test_reencode_updates_timestamp_and_checksum() {
        let mut request = EchoRequest::build(1, 1);
        request.encode_at(UNIX_EPOCH + Duration::from_secs(1_000));
        assert_eq!(request.timestamp(), 1_000.0);
        let first = request.checksum();

        request.encode_at(UNIX_EPOCH + Duration::from_secs(2_000));
        assert_eq!(request.timestamp(), 2_000.0);
        assert_ne!(request.checksum(), first);
        assert_eq!(checksum(&request.to_bytes()), 0);
    }

    #[test]
    fn test_with_target() {
        let request = EchoRequest::build(1, 0).with_target("localhost", Ipv4Addr::LOCALHOST);
        assert_eq!(request.target_host(), "localhost");
        assert_eq!(request.target_address(), Some(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_set_target_literal() {
        let mut request = EchoRequest::build(1, 0);
        assert_eq!(request.target_address(), None);
        request.set_target("10.0.0.1").unwrap();
        assert_eq!(request.target_address(), Some(Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[test]
    fn test_hex_dump() {
        let request = EchoRequest::build(0x0102, 0x0304);
        let dump = request.hex_dump();
        assert!(dump.starts_with("header (8 bytes): 0800"));
        assert!(dump.contains("01020304"));
        assert!(dump.contains("data (60 bytes)"));
    }
}
