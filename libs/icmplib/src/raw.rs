// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Raw socket transport

use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::mem::size_of;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant, SystemTime};

use log::{debug, log_enabled, trace, Level};

use crate::codes::{ICMP_DEST_UNREACHABLE, ICMP_TIME_EXCEEDED};
use crate::error::{IcmpError, Result};
use crate::packet::{EchoRequest, ICMP_ECHO_REPLY, ICMP_ECHO_REQUEST};
use crate::reply::offset;
use crate::stats::RunStatistics;

pub const DEFAULT_RECV_BUFFER: usize = 1024;

/// An IPv4 raw socket, closed when dropped.
pub struct RawSocket {
    fd: libc::c_int,
}

impl RawSocket {
    pub fn new(protocol: i32) -> Result<Self> {
        let fd = unsafe {
            libc::socket(
                libc::AF_INET,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                protocol,
            )
        };

        if fd < 0 {
            return Err(IcmpError::Socket(io::Error::last_os_error()));
        }

        Ok(Self { fd })
    }

    /// Raw ICMP socket; needs CAP_NET_RAW or root.
    pub fn icmp() -> Result<Self> {
        Self::new(libc::IPPROTO_ICMP)
    }

    fn set_option<T>(&self, level: libc::c_int, name: libc::c_int, value: &T) -> Result<()> {
        let rc = unsafe {
            libc::setsockopt(
                self.fd,
                level,
                name,
                value as *const T as *const libc::c_void,
                size_of::<T>() as libc::socklen_t,
            )
        };

        if rc < 0 {
            return Err(IcmpError::Socket(io::Error::last_os_error()));
        }
        Ok(())
    }

    pub fn set_ttl(&self, ttl: u8) -> Result<()> {
        let ttl = ttl as libc::c_int;
        self.set_option(libc::IPPROTO_IP, libc::IP_TTL, &ttl)
    }

    pub fn set_timeout(&self, duration: Duration) -> Result<()> {
        let timeout = libc::timeval {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_usec: duration.subsec_micros() as libc::suseconds_t,
        };
        self.set_option(libc::SOL_SOCKET, libc::SO_RCVTIMEO, &timeout)
    }

    pub fn send_to(&self, buf: &[u8], dest: Ipv4Addr) -> Result<usize> {
        let mut sockaddr: libc::sockaddr_in = unsafe { std::mem::zeroed() };
        sockaddr.sin_family = libc::AF_INET as libc::sa_family_t;
        sockaddr.sin_port = 0;
        sockaddr.sin_addr = libc::in_addr {
            s_addr: u32::from_ne_bytes(dest.octets()),
        };

        let sent = unsafe {
            libc::sendto(
                self.fd,
                buf.as_ptr() as *const libc::c_void,
                buf.len(),
                0,
                &sockaddr as *const _ as *const libc::sockaddr,
                size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
        };

        if sent < 0 {
            return Err(IcmpError::Socket(io::Error::last_os_error()));
        }

        Ok(sent as usize)
    }

    /// Receives one datagram. The raw I/O error is returned so callers can
    /// tell a receive timeout apart from a real failure.
    pub fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, Ipv4Addr)> {
        let mut sockaddr: libc::sockaddr_in = unsafe { std::mem::zeroed() };
        let mut addr_len = size_of::<libc::sockaddr_in>() as libc::socklen_t;

        let recv_len = unsafe {
            libc::recvfrom(
                self.fd,
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
                &mut sockaddr as *mut _ as *mut libc::sockaddr,
                &mut addr_len,
            )
        };

        if recv_len < 0 {
            return Err(io::Error::last_os_error());
        }

        let source = Ipv4Addr::from(sockaddr.sin_addr.s_addr.to_ne_bytes());
        Ok((recv_len as usize, source))
    }

    /// Blocks until the socket is readable or `timeout` passes. A poll cut
    /// short by a signal resumes with whatever is left of the timeout.
    pub fn wait_readable(&self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let mut pfd = libc::pollfd {
                fd: self.fd,
                events: libc::POLLIN,
                revents: 0,
            };
            let remaining = deadline.saturating_duration_since(Instant::now());
            let millis = remaining.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

            let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
            if rc < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(IcmpError::Socket(err));
            }

            return Ok(rc > 0 && pfd.revents & libc::POLLIN != 0);
        }
    }
}

#[cfg(test)]
impl std::os::fd::AsRawFd for RawSocket {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.fd
    }
}

#[cfg(test)]
impl std::os::fd::FromRawFd for RawSocket {
    unsafe fn from_raw_fd(fd: std::os::fd::RawFd) -> Self {
        Self { fd }
    }
}

impl Drop for RawSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

/// Socket operations used for one echo exchange.
pub trait EchoSocket {
    fn set_timeout(&self, duration: Duration) -> Result<()>;
    fn set_ttl(&self, ttl: u8) -> Result<()>;
    fn send_to(&self, buf: &[u8], dest: Ipv4Addr) -> Result<usize>;
    fn wait_readable(&self, timeout: Duration) -> Result<bool>;
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, Ipv4Addr)>;
}

impl EchoSocket for RawSocket {
    fn set_timeout(&self, duration: Duration) -> Result<()> {
        RawSocket::set_timeout(self, duration)
    }

    fn set_ttl(&self, ttl: u8) -> Result<()> {
        RawSocket::set_ttl(self, ttl)
    }

    fn send_to(&self, buf: &[u8], dest: Ipv4Addr) -> Result<usize> {
        RawSocket::send_to(self, buf, dest)
    }

    fn wait_readable(&self, timeout: Duration) -> Result<bool> {
        RawSocket::wait_readable(self, timeout)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, Ipv4Addr)> {
        RawSocket::recv_from(self, buf)
    }
}

/// A datagram received in answer to a probe, IPv4 header included.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub bytes: Vec<u8>,
    pub source: Ipv4Addr,
    /// Time from send to receipt.
    pub elapsed: Duration,
    pub received_at: SystemTime,
}

impl Datagram {
    /// `None` when the datagram ends before the ICMP type byte.
    pub fn icmp_type(&self) -> Option<u8> {
        self.bytes.get(offset::TYPE).copied()
    }

    pub fn icmp_code(&self) -> Option<u8> {
        self.bytes.get(offset::CODE).copied()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutCause {
    /// Nothing became readable within the wait.
    NoReply,
    /// Data arrived but the wait had already used the whole budget.
    BudgetExhausted,
    /// The receive itself timed out.
    Socket,
}

impl fmt::Display for TimeoutCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutCause::NoReply => write!(f, "Request timed out."),
            TimeoutCause::BudgetExhausted => {
                write!(f, "Request timed out (By no remaining time left).")
            }
            TimeoutCause::Socket => write!(f, "Request timed out (By Exception)."),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    EchoReply(Datagram),
    TimeExceeded { code: u8, datagram: Datagram },
    Unreachable { code: u8, datagram: Datagram },
    Unknown { icmp_type: u8, datagram: Datagram },
    Timeout(TimeoutCause),
}

impl ProbeOutcome {
    /// Sorts a received datagram by its ICMP type.
    pub fn classify(datagram: Datagram) -> Result<Self> {
        let (icmp_type, code) = match (datagram.icmp_type(), datagram.icmp_code()) {
            (Some(icmp_type), Some(code)) => (icmp_type, code),
            _ => {
                return Err(IcmpError::MalformedReply {
                    len: datagram.bytes.len(),
                    needed: offset::CODE + 1,
                })
            }
        };

        Ok(match icmp_type {
            ICMP_TIME_EXCEEDED => ProbeOutcome::TimeExceeded { code, datagram },
            ICMP_DEST_UNREACHABLE => ProbeOutcome::Unreachable { code, datagram },
            ICMP_ECHO_REPLY => ProbeOutcome::EchoReply(datagram),
            icmp_type => ProbeOutcome::Unknown { icmp_type, datagram },
        })
    }

    pub fn is_echo_reply(&self) -> bool {
        matches!(self, ProbeOutcome::EchoReply(_))
    }
}

/// Sends one request and waits a bounded time for whatever comes back.
pub trait Transport {
    fn send_and_wait(
        &mut self,
        request: &mut EchoRequest,
        timeout: Duration,
        stats: &mut RunStatistics,
    ) -> Result<ProbeOutcome>;
}

/// [`Transport`] over a socket opened for each probe and dropped before
/// `send_and_wait` returns.
pub struct RawTransport<S = RawSocket, F = fn() -> Result<RawSocket>> {
    recv_buffer: usize,
    open: F,
    _socket: PhantomData<S>,
}

impl RawTransport {
    /// Raw ICMP socket transport.
    pub fn new(recv_buffer: usize) -> Self {
        Self::with_opener(recv_buffer, RawSocket::icmp)
    }
}

impl Default for RawTransport {
    fn default() -> Self {
        Self::new(DEFAULT_RECV_BUFFER)
    }
}

impl<S, F> RawTransport<S, F>
where
    S: EchoSocket,
    F: FnMut() -> Result<S>,
{
    pub fn with_opener(recv_buffer: usize, open: F) -> Self {
        Self {
            recv_buffer,
            open,
            _socket: PhantomData,
        }
    }
}

impl<S, F> Transport for RawTransport<S, F>
where
    S: EchoSocket,
    F: FnMut() -> Result<S>,
{
    fn send_and_wait(
        &mut self,
        request: &mut EchoRequest,
        timeout: Duration,
        stats: &mut RunStatistics,
    ) -> Result<ProbeOutcome> {
        let address = match request.target_address() {
            Some(address) => address,
            None => {
                let host = request.target_host().to_string();
                request.set_target(&host)?
            }
        };

        let socket = (self.open)()?;
        socket.set_timeout(timeout)?;
        socket.set_ttl(request.ttl())?;

        request.encode();
        if log_enabled!(Level::Trace) {
            trace!("{}", request.hex_dump());
        }

        socket.send_to(&request.to_bytes(), address)?;
        let started = Instant::now();
        stats.record_sent();
        debug!(
            "sent echo request to {} id={} seq={} ttl={}",
            address,
            request.identifier(),
            request.sequence_number(),
            request.ttl()
        );

        // A raw socket also sees echo requests, our own included on loopback
        loop {
            let remaining = timeout.saturating_sub(started.elapsed());
            if !socket.wait_readable(remaining)? {
                debug!("no reply from {} within {:?}", address, timeout);
                return Ok(ProbeOutcome::Timeout(TimeoutCause::NoReply));
            }
            let waited = started.elapsed();

            let mut buf = vec![0u8; self.recv_buffer];
            let (len, source) = match socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(e)
                    if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
                {
                    debug!("receive from {} timed out: {}", address, e);
                    return Ok(ProbeOutcome::Timeout(TimeoutCause::Socket));
                }
                Err(e) => return Err(e.into()),
            };
            let received_at = SystemTime::now();
            let elapsed = started.elapsed();

            if waited >= timeout {
                return Ok(ProbeOutcome::Timeout(TimeoutCause::BudgetExhausted));
            }

            buf.truncate(len);
            if buf.get(offset::TYPE) == Some(&ICMP_ECHO_REQUEST) {
                debug!("skipping echo request from {}", source);
                continue;
            }
            debug!("received {} bytes from {} after {:?}", len, source, elapsed);

            return ProbeOutcome::classify(Datagram {
                bytes: buf,
                source,
                elapsed,
                received_at,
            });
        }
    }
}
