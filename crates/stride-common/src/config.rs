// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

/// Runtime flags consumed by the traversal executor.
#[derive(Clone, Copy, Debug)]
pub struct ExecConfig {
    /// Push the final-step predicate down to the storage tier (default: true).
    /// Only applies to forward traversal; reverse traversal always evaluates
    /// the predicate locally.
    pub filter_pushdown: bool,

    /// Dump per-host latencies and row counts for every traversal request
    /// (default: false).
    pub trace_traverse: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            filter_pushdown: true,
            trace_traverse: false,
        }
    }
}
