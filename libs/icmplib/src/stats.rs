// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Run statistics

/// Counters and RTT samples accumulated over one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatistics {
    rtts_ms: Vec<f64>,
    sent: u64,
    received: u64,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&mut self) {
        self.sent += 1;
    }

    /// Counts a response from the network, whether or not it is an echo reply.
    pub fn record_response(&mut self) {
        self.received += 1;
    }

    pub fn record_rtt(&mut self, rtt_ms: f64) {
        self.rtts_ms.push(rtt_ms);
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn rtts_ms(&self) -> &[f64] {
        &self.rtts_ms
    }

    pub fn min_rtt_ms(&self) -> f64 {
        if self.rtts_ms.is_empty() {
            return 0.0;
        }
        self.rtts_ms.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max_rtt_ms(&self) -> f64 {
        if self.rtts_ms.is_empty() {
            return 0.0;
        }
        self.rtts_ms.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn avg_rtt_ms(&self) -> f64 {
        if self.rtts_ms.is_empty() {
            return 0.0;
        }
        self.rtts_ms.iter().sum::<f64>() / self.rtts_ms.len() as f64
    }

    /// `None` until at least one probe has been sent.
    pub fn packet_loss_percent(&self) -> Option<f64> {
        if self.sent == 0 {
            return None;
        }
        let lost = self.sent.saturating_sub(self.received);
        Some(lost as f64 / self.sent as f64 * 100.0)
    }

    pub fn summarize(&self) -> Option<Summary> {
        Some(Summary {
            min_ms: self.min_rtt_ms(),
            max_ms: self.max_rtt_ms(),
            avg_ms: self.avg_rtt_ms(),
            loss_pct: self.packet_loss_percent()?,
            sent: self.sent,
            received: self.received,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
    pub loss_pct: f64,
    pub sent: u64,
    pub received: u64,
}
