// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Error types

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IcmpError>;

#[derive(Debug, Error)]
pub enum IcmpError {
    /// The target host could not be turned into an IPv4 address.
    #[error("hostname lookup failed: {host}: {reason}")]
    Resolution { host: String, reason: String },

    /// A received datagram is too short to be interpreted.
    #[error("malformed reply: {len} bytes received, at least {needed} required")]
    MalformedReply { len: usize, needed: usize },

    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),

    #[error("config error: {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl IcmpError {
    /// Errors that end a run; everything else only affects one probe.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, IcmpError::MalformedReply { .. })
    }
}
