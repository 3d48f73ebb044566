// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

//! Partial-success aggregation over sharded storage responses.

use std::fmt;

/// Storage partition identifier.
pub type PartitionId = i32;

/// Why a partition failed to answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum PartError {
    RpcFailure,
    LeaderChanged,
    StoreNotReady,
    Unknown,
}

impl fmt::Display for PartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PartError::RpcFailure => "rpc failure",
            PartError::LeaderChanged => "leader changed",
            PartError::StoreNotReady => "store not ready",
            PartError::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Per-host timing of one fanned-out request.
#[derive(Clone, Debug)]
pub struct HostLatency {
    pub host: String,
    pub latency_us: u64,
    pub exec_us: u64,
}

/// Aggregate of per-partition responses to a single logical request. Some
/// partitions may have failed; `completeness` reports how many answered.
#[derive(Clone, Debug)]
pub struct ShardedResponse<T> {
    total_parts: usize,
    responses: Vec<T>,
    failed_parts: Vec<(PartitionId, PartError)>,
    host_latency: Vec<HostLatency>,
}

impl<T> ShardedResponse<T> {
    pub fn new(total_parts: usize) -> Self {
        Self {
            total_parts,
            responses: Vec::new(),
            failed_parts: Vec::new(),
            host_latency: Vec::new(),
        }
    }

    pub fn push_response(&mut self, resp: T) {
        self.responses.push(resp);
    }

    pub fn push_failure(&mut self, part: PartitionId, error: PartError) {
        self.failed_parts.push((part, error));
    }

    pub fn push_latency(&mut self, latency: HostLatency) {
        self.host_latency.push(latency);
    }

    /// Percentage of partitions that answered, in `[0, 100]`.
    pub fn completeness(&self) -> u32 {
        if self.total_parts == 0 {
            return 100;
        }
        let ok = self.total_parts - self.failed_parts.len();
        (ok * 100 / self.total_parts) as u32
    }

    pub fn failed_parts(&self) -> &[(PartitionId, PartError)] {
        &self.failed_parts
    }

    pub fn host_latency(&self) -> &[HostLatency] {
        &self.host_latency
    }

    pub fn responses(&self) -> &[T] {
        &self.responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completeness() {
        let mut resp: ShardedResponse<()> = ShardedResponse::new(4);
        for _ in 0..3 {
            resp.push_response(());
        }
        resp.push_failure(3, PartError::RpcFailure);
        assert_eq!(resp.completeness(), 75);

        let empty: ShardedResponse<()> = ShardedResponse::new(0);
        assert_eq!(empty.completeness(), 100);

        let mut dead: ShardedResponse<()> = ShardedResponse::new(2);
        dead.push_failure(0, PartError::RpcFailure);
        dead.push_failure(1, PartError::LeaderChanged);
        assert_eq!(dead.completeness(), 0);
    }
}
