//! Codec Operation Counters
//!
//! Lightweight counters for operator alerting: policy rejections and probe
//! refusals mean shards are going missing, restore failures mean corruption.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct CodecStats {
    encodes: AtomicU64,
    decodes: AtomicU64,
    policy_rejections: AtomicU64,
    probe_refusals: AtomicU64,
    restore_failures: AtomicU64,
    deferred_parity: AtomicU64,
}

/// Point-in-time copy of [`CodecStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CodecStatsSnapshot {
    pub encodes: u64,
    pub decodes: u64,
    pub policy_rejections: u64,
    pub probe_refusals: u64,
    pub restore_failures: u64,
    pub deferred_parity: u64,
}

impl CodecStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_encode(&self) {
        self.encodes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode(&self) {
        self.decodes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_policy_rejection(&self) {
        self.policy_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_probe_refusal(&self) {
        self.probe_refusals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_restore_failure(&self) {
        self.restore_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deferred_parity(&self, count: usize) {
        self.deferred_parity
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CodecStatsSnapshot {
        CodecStatsSnapshot {
            encodes: self.encodes.load(Ordering::Relaxed),
            decodes: self.decodes.load(Ordering::Relaxed),
            policy_rejections: self.policy_rejections.load(Ordering::Relaxed),
            probe_refusals: self.probe_refusals.load(Ordering::Relaxed),
            restore_failures: self.restore_failures.load(Ordering::Relaxed),
            deferred_parity: self.deferred_parity.load(Ordering::Relaxed),
        }
    }
}
