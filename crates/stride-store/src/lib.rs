// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

pub mod client;
pub mod codec;
pub mod memory;
pub mod sharded;
pub mod wire;

// Re-exports for convenience
pub use client::GraphStorageClient;
pub use codec::{RowReader, encode_row};
pub use memory::MemoryGraphStore;
pub use sharded::{HostLatency, PartError, PartitionId, ShardedResponse};
pub use wire::{
    EdgeData, EdgeKey, EdgePropResponse, EdgeRecord, PropDef, QueryResponse, TagData, VertexData,
    meta,
};
