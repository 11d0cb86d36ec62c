// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! ICMP echo reply parsing and validation

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{IcmpError, Result};
use crate::packet::EchoRequest;

/// Field offsets into a received datagram, IPv4 header included.
pub mod offset {
    pub const IP_HEADER_LEN: usize = 20;
    pub const TYPE: usize = IP_HEADER_LEN;
    pub const CODE: usize = TYPE + 1;
    pub const CHECKSUM: usize = CODE + 1;
    pub const IDENTIFIER: usize = CHECKSUM + 2;
    pub const SEQUENCE: usize = IDENTIFIER + 2;
    pub const TIMESTAMP: usize = SEQUENCE + 2;
    pub const PAYLOAD: usize = TIMESTAMP + 8;
}

pub const MIN_REPLY_LEN: usize = offset::PAYLOAD;

/// A received echo reply. Validity flags stay false until [`validate`] runs.
#[derive(Debug, Clone)]
pub struct EchoReply {
    bytes: Vec<u8>,
    sequence_valid: bool,
    identifier_valid: bool,
    payload_valid: bool,
    overall_valid: bool,
}

impl EchoReply {
    pub fn parse(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < MIN_REPLY_LEN {
            return Err(IcmpError::MalformedReply {
                len: bytes.len(),
                needed: MIN_REPLY_LEN,
            });
        }

        Ok(Self {
            bytes,
            sequence_valid: false,
            identifier_valid: false,
            payload_valid: false,
            overall_valid: false,
        })
    }

    fn u16_at(&self, at: usize) -> u16 {
        u16::from_be_bytes([self.bytes[at], self.bytes[at + 1]])
    }

    pub fn icmp_type(&self) -> u8 {
        self.bytes[offset::TYPE]
    }

    pub fn icmp_code(&self) -> u8 {
        self.bytes[offset::CODE]
    }

    pub fn checksum(&self) -> u16 {
        self.u16_at(offset::CHECKSUM)
    }

    pub fn identifier(&self) -> u16 {
        self.u16_at(offset::IDENTIFIER)
    }

    pub fn sequence_number(&self) -> u16 {
        self.u16_at(offset::SEQUENCE)
    }

    /// Send time echoed back by the peer, in seconds since the epoch.
    pub fn sent_timestamp(&self) -> f64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.bytes[offset::TIMESTAMP..offset::PAYLOAD]);
        f64::from_ne_bytes(raw)
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[offset::PAYLOAD..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Round trip from the echoed timestamp to `received_at`.
    ///
    /// Returns `None` when the echoed timestamp is not a plausible time.
    pub fn rtt_ms(&self, received_at: SystemTime) -> Option<f64> {
        let received = received_at.duration_since(UNIX_EPOCH).ok()?.as_secs_f64();
        let sent = self.sent_timestamp();
        if !sent.is_finite() || sent <= 0.0 || sent > received {
            return None;
        }
        Some((received - sent) * 1000.0)
    }

    pub fn is_sequence_valid(&self) -> bool {
        self.sequence_valid
    }

    pub fn is_identifier_valid(&self) -> bool {
        self.identifier_valid
    }

    pub fn is_payload_valid(&self) -> bool {
        self.payload_valid
    }

    pub fn is_valid(&self) -> bool {
        self.overall_valid
    }

    /// One entry per failed check, in sequence/identifier/payload order.
    pub fn mismatches(&self, request: &EchoRequest) -> Vec<Mismatch> {
        let mut out = Vec::new();
        if !self.sequence_valid {
            out.push(Mismatch::Sequence {
                received: self.sequence_number(),
                expected: request.sequence_number(),
            });
        }
        if !self.identifier_valid {
            out.push(Mismatch::Identifier {
                received: self.identifier(),
                expected: request.identifier(),
            });
        }
        if !self.payload_valid {
            out.push(Mismatch::Payload {
                received: String::from_utf8_lossy(self.payload()).into_owned(),
                expected: String::from_utf8_lossy(request.data_raw()).into_owned(),
            });
        }
        out
    }
}

/// Cross-checks `reply` against the request it answers.
///
/// Every check runs so that an invalid reply reports each failing field.
pub fn validate(request: &EchoRequest, reply: &mut EchoReply) {
    reply.sequence_valid = reply.sequence_number() == request.sequence_number();
    reply.identifier_valid = reply.identifier() == request.identifier();
    reply.payload_valid = reply.payload() == request.data_raw();
    reply.overall_valid = reply.sequence_valid && reply.identifier_valid && reply.payload_valid;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    Sequence { received: u16, expected: u16 },
    Identifier { received: u16, expected: u16 },
    Payload { received: String, expected: String },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Sequence { received, expected } => write!(
                f,
                "[Invalid Sequence Number]: Received: {} Expected: {}",
                received, expected
            ),
            Mismatch::Identifier { received, expected } => write!(
                f,
                "[Invalid Packet Identifier]: Received: {} Expected: {}",
                received, expected
            ),
            Mismatch::Payload { received, expected } => write!(
                f,
                "[Invalid Raw Data]: Received: {} Expected: {}",
                received, expected
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::checksum;
    use crate::packet::{ECHO_PATTERN, ICMP_ECHO_REPLY};
    use std::time::Duration;

    /// Wraps an outbound request as the peer would answer it.
    fn reply_to(request: &EchoRequest) -> Vec<u8> {
        let mut ip = vec![0u8; offset::IP_HEADER_LEN];
        ip[0] = 0x45;
        ip[9] = 1;
        let mut icmp = request.to_bytes();
        icmp[0] = ICMP_ECHO_REPLY;
        icmp[2] = 0;
        icmp[3] = 0;
        let sum = checksum(&icmp);
        icmp[2..4].copy_from_slice(&sum.to_be_bytes());
        ip.extend_from_slice(&icmp);
        ip
    }

    #[test]
    fn test_build_then_parse() {
        let request = EchoRequest::build(0xBEEF, 9);
        let reply = EchoReply::parse(reply_to(&request)).unwrap();

        assert_eq!(reply.icmp_type(), ICMP_ECHO_REPLY);
        assert_eq!(reply.icmp_code(), 0);
        assert_eq!(reply.identifier(), 0xBEEF);
        assert_eq!(reply.sequence_number(), 9);
        assert_eq!(reply.payload(), &ECHO_PATTERN[..]);
        assert_eq!(reply.sent_timestamp(), request.timestamp());
        assert_eq!(checksum(&reply.as_bytes()[offset::TYPE..]), 0);
    }

    #[test]
    fn test_parse_request_bytes_as_received() {
        let request = EchoRequest::build(77, 2);
        let mut raw = vec![0u8; offset::IP_HEADER_LEN];
        raw.extend_from_slice(&request.to_bytes());
        let reply = EchoReply::parse(raw).unwrap();

        assert_eq!(reply.identifier(), 77);
        assert_eq!(reply.sequence_number(), 2);
        assert_eq!(reply.checksum(), request.checksum());
        assert_eq!(reply.payload(), request.data_raw());
    }

    #[test]
    fn test_flags_default_false() {
        let request = EchoRequest::build(1, 1);
        let reply = EchoReply::parse(reply_to(&request)).unwrap();
        assert!(!reply.is_sequence_valid());
        assert!(!reply.is_identifier_valid());
        assert!(!reply.is_payload_valid());
        assert!(!reply.is_valid());
    }

    #[test]
    fn test_too_short() {
        let err = EchoReply::parse(vec![0u8; MIN_REPLY_LEN - 1]).unwrap_err();
        assert!(matches!(
            err,
            IcmpError::MalformedReply { len: 35, needed: 36 }
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_minimum_length_has_empty_payload() {
        let reply = EchoReply::parse(vec![0u8; MIN_REPLY_LEN]).unwrap();
        assert!(reply.payload().is_empty());
    }

    #[test]
    fn test_validate_all_match() {
        let request = EchoRequest::build(42, 3);
        let mut reply = EchoReply::parse(reply_to(&request)).unwrap();
        validate(&request, &mut reply);

        assert!(reply.is_sequence_valid());
        assert!(reply.is_identifier_valid());
        assert!(reply.is_payload_valid());
        assert!(reply.is_valid());
        assert!(reply.mismatches(&request).is_empty());
    }

    #[test]
    fn test_validate_sequence_mismatch() {
        let request = EchoRequest::build(42, 3);
        let mut raw = reply_to(&request);
        raw[offset::SEQUENCE..offset::SEQUENCE + 2].copy_from_slice(&4u16.to_be_bytes());
        let mut reply = EchoReply::parse(raw).unwrap();
        validate(&request, &mut reply);

        assert!(!reply.is_sequence_valid());
        assert!(reply.is_identifier_valid());
        assert!(reply.is_payload_valid());
        assert!(!reply.is_valid());
        assert_eq!(
            reply.mismatches(&request),
            vec![Mismatch::Sequence { received: 4, expected: 3 }]
        );
    }

    #[test]
    fn test_validate_reports_every_failure() {
        let request = EchoRequest::build(42, 3);
        let mut raw = reply_to(&request);
        raw[offset::IDENTIFIER..offset::IDENTIFIER + 2].copy_from_slice(&43u16.to_be_bytes());
        raw[offset::SEQUENCE..offset::SEQUENCE + 2].copy_from_slice(&5u16.to_be_bytes());
        raw.truncate(raw.len() - 1);
        let mut reply = EchoReply::parse(raw).unwrap();
        validate(&request, &mut reply);

        let mismatches = reply.mismatches(&request);
        assert_eq!(mismatches.len(), 3);
        assert_eq!(
            mismatches[1].to_string(),
            "[Invalid Packet Identifier]: Received: 43 Expected: 42"
        );
        assert!(matches!(mismatches[2], Mismatch::Payload { .. }));
    }

    #[test]
    fn test_rtt_from_echoed_timestamp() {
        let mut request = EchoRequest::build(1, 1);
        request.encode_at(UNIX_EPOCH + Duration::from_secs(100));
        let reply = EchoReply::parse(reply_to(&request)).unwrap();

        let rtt = reply
            .rtt_ms(UNIX_EPOCH + Duration::from_millis(100_250))
            .unwrap();
        assert!((rtt - 250.0).abs() < 1e-6);
        assert_eq!(reply.rtt_ms(UNIX_EPOCH + Duration::from_secs(50)), None);
    }

    #[test]
    fn test_rtt_rejects_garbage_timestamp() {
        let reply = EchoReply::parse(vec![0u8; MIN_REPLY_LEN]).unwrap();
        assert_eq!(reply.rtt_ms(SystemTime::now()), None);
    }
}
