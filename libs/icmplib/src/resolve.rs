// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Hostname resolution

use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};

use crate::error::{IcmpError, Result};

/// Resolves `host` to an IPv4 address using the system resolver.
///
/// A blank host means the loopback address.
pub fn resolve_host(host: &str) -> Result<Ipv4Addr> {
    let host = host.trim();
    if host.is_empty() {
        return Ok(Ipv4Addr::LOCALHOST);
    }

    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(addr)) => return Ok(addr),
        Ok(IpAddr::V6(_)) => {
            return Err(IcmpError::Resolution {
                host: host.to_string(),
                reason: "IPv6 not supported".to_string(),
            })
        }
        Err(_) => {}
    }

    let addrs = format!("{}:0", host)
        .to_socket_addrs()
        .map_err(|e| IcmpError::Resolution {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

    addrs
        .filter_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| IcmpError::Resolution {
            host: host.to_string(),
            reason: "no IPv4 address".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_literal() {
        assert_eq!(resolve_host("192.0.2.7").unwrap(), Ipv4Addr::new(192, 0, 2, 7));
        assert_eq!(resolve_host(" 10.1.2.3 ").unwrap(), Ipv4Addr::new(10, 1, 2, 3));
    }

    #[test]
    fn test_blank_is_loopback() {
        assert_eq!(resolve_host("").unwrap(), Ipv4Addr::LOCALHOST);
        assert_eq!(resolve_host("   ").unwrap(), Ipv4Addr::LOCALHOST);
    }

    #[test]
    fn test_ipv6_rejected() {
        let err = resolve_host("::1").unwrap_err();
        assert!(matches!(err, IcmpError::Resolution { .. }));
        assert!(err.is_fatal());
    }
}
