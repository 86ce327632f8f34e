//! Per-agent webhook delivery health
//!
//! Process-local and in-memory by design: this is a liveness signal, not an
//! audit log, and starts fresh on every restart. Records are independent per
//! agent, so atomic per-key updates are all the concurrency the map needs.

use agora_types::AgentId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// Delivery bookkeeping for one agent's callback endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliveryRecord {
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_status_code: Option<u16>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub total_sent: u64,
    pub total_failed: u64,
}

/// Agents whose endpoints keep failing are treated as offline for quorum
/// purposes. Self-healing: one success clears the streak.
pub trait Liveness: Send + Sync {
    fn is_offline(&self, agent_id: AgentId) -> bool;
}

/// Concurrent map of delivery records, keyed by agent.
#[derive(Debug)]
pub struct DeliveryHealth {
    records: DashMap<AgentId, DeliveryRecord>,
    offline_threshold: u32,
}

impl DeliveryHealth {
    /// Create a health map; agents reach "offline" at `offline_threshold`
    /// consecutive failed deliveries.
    pub fn new(offline_threshold: u32) -> Self {
        Self {
            records: DashMap::new(),
            offline_threshold,
        }
    }

    /// A delivery succeeded; clears the failure streak.
    pub fn record_success(&self, agent_id: AgentId, status_code: u16) {
        let mut record = self.records.entry(agent_id).or_default();
        record.last_attempt = Some(Utc::now());
        record.last_status_code = Some(status_code);
        record.last_error = None;
        record.consecutive_failures = 0;
        record.total_sent += 1;
    }

    /// A delivery failed for good (retries exhausted or non-retryable).
    pub fn record_failure(&self, agent_id: AgentId, status_code: Option<u16>, error: &str) {
        let mut record = self.records.entry(agent_id).or_default();
        record.last_attempt = Some(Utc::now());
        record.last_status_code = status_code;
        record.last_error = Some(error.to_string());
        record.consecutive_failures += 1;
        record.total_failed += 1;
    }

    /// Snapshot of one agent's record.
    pub fn get(&self, agent_id: AgentId) -> Option<DeliveryRecord> {
        self.records.get(&agent_id).map(|r| r.clone())
    }

    /// Snapshot of all records.
    pub fn snapshot(&self) -> Vec<(AgentId, DeliveryRecord)> {
        self.records
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }
}

impl Liveness for DeliveryHealth {
    fn is_offline(&self, agent_id: AgentId) -> bool {
        self.records
            .get(&agent_id)
            .map(|r| r.consecutive_failures >= self.offline_threshold)
            .unwrap_or(false)
    }
}
