//! Round-trip latency estimation from periodic echo probes.

use crate::config::SyncConfig;
use log::{debug, trace};
use shared::ClientEvent;
use std::collections::{HashMap, VecDeque};

/// Smoothed round-trip estimate over a bounded window of samples.
///
/// Unanswered probes expire after the timeout and simply contribute no
/// sample.
#[derive(Debug, Clone)]
pub struct LatencyEstimator {
    samples: VecDeque<f64>,
    history_size: usize,
    outstanding: HashMap<u32, f64>,
    next_seq: u32,
    probe_interval_ms: f64,
    probe_timeout_ms: f64,
    last_probe_at: Option<f64>,
    min_ms: Option<f64>,
    max_ms: Option<f64>,
    lost_probes: u64,
}

impl LatencyEstimator {
    pub fn new(history_size: usize, probe_interval_ms: f64, probe_timeout_ms: f64) -> Self {
        Self {
            samples: VecDeque::with_capacity(history_size.max(1)),
            history_size: history_size.max(1),
            outstanding: HashMap::new(),
            next_seq: 1,
            probe_interval_ms,
            probe_timeout_ms,
            last_probe_at: None,
            min_ms: None,
            max_ms: None,
            lost_probes: 0,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.latency_history,
            config.probe_interval_ms,
            config.probe_timeout_ms,
        )
    }

    /// Emits a `ping` probe once the probe interval has elapsed.
    pub fn poll_probe(&mut self, now_ms: f64) -> Option<ClientEvent> {
        self.expire_outstanding(now_ms);

        let due = match self.last_probe_at {
            Some(last) => now_ms - last >= self.probe_interval_ms,
            None => true,
        };
        if !due {
            return None;
        }

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.outstanding.insert(seq, now_ms);
        self.last_probe_at = Some(now_ms);
        trace!("Latency probe {} sent at {:.1}ms", seq, now_ms);

        Some(ClientEvent::Ping {
            seq,
            client_sent_at: now_ms,
        })
    }

    /// Matches an echo against its outstanding probe and records the round trip.
    pub fn on_pong(&mut self, seq: u32, now_ms: f64) -> Option<f64> {
        let sent_at = self.outstanding.remove(&seq)?;
        let rtt = (now_ms - sent_at).max(0.0);
        self.record_sample(rtt);
        Some(rtt)
    }

    /// Records a latency the server measured itself (`latencyAck`).
    pub fn on_latency_ack(&mut self, latency_ms: f64) {
        if latency_ms.is_finite() && latency_ms >= 0.0 {
            self.record_sample(latency_ms);
        } else {
            debug!("Ignoring invalid server latency {}", latency_ms);
        }
    }

    fn record_sample(&mut self, rtt_ms: f64) {
        self.samples.push_back(rtt_ms);
        while self.samples.len() > self.history_size {
            self.samples.pop_front();
        }
        self.min_ms = Some(self.min_ms.map_or(rtt_ms, |min| min.min(rtt_ms)));
        self.max_ms = Some(self.max_ms.map_or(rtt_ms, |max| max.max(rtt_ms)));
    }

    fn expire_outstanding(&mut self, now_ms: f64) {
        let timeout = self.probe_timeout_ms;
        let before = self.outstanding.len();
        self.outstanding.retain(|_, sent_at| now_ms - *sent_at <= timeout);
        let expired = before - self.outstanding.len();
        if expired > 0 {
            self.lost_probes += expired as u64;
            debug!("{} latency probe(s) went unanswered", expired);
        }
    }

    /// Mean of the retained round-trip samples.
    pub fn latency_ms(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    /// Half the mean round trip, or zero before the first sample.
    pub fn one_way_delay_ms(&self) -> f64 {
        self.latency_ms().map_or(0.0, |latency| latency / 2.0)
    }

    pub fn min_ms(&self) -> Option<f64> {
        self.min_ms
    }

    pub fn max_ms(&self) -> Option<f64> {
        self.max_ms
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn lost_probes(&self) -> u64 {
        self.lost_probes
    }
}

impl Default for LatencyEstimator {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}
