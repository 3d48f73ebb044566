// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

use crate::sharded::ShardedResponse;
use crate::wire::{EdgeKey, EdgePropResponse, PropDef, QueryResponse};
use futures::future::BoxFuture;
use stride_common::core::ids::{EdgeType, SpaceId, VertexId};
use stride_common::error::Result;

/// Asynchronous storage client consumed by the traversal executor.
///
/// A transport-level failure surfaces as `Err(StrideError::Remote)`; a
/// partition-level failure is carried inside the [`ShardedResponse`] and
/// judged by the caller via `completeness()`.
pub trait GraphStorageClient: Send + Sync {
    /// Walk one hop from `src_ids` over `edge_types` (signed; negative means
    /// reverse). `push_down_filter` is an opaque serialized predicate the
    /// storage tier applies before returning edge records.
    fn get_neighbors(
        &self,
        space: SpaceId,
        src_ids: Vec<VertexId>,
        edge_types: Vec<EdgeType>,
        push_down_filter: Option<String>,
        props: Vec<PropDef>,
    ) -> BoxFuture<'_, Result<ShardedResponse<QueryResponse>>>;

    /// Fetch the requested tag properties of `ids`.
    fn get_vertex_props(
        &self,
        space: SpaceId,
        ids: Vec<VertexId>,
        props: Vec<PropDef>,
    ) -> BoxFuture<'_, Result<ShardedResponse<QueryResponse>>>;

    /// Fetch edge rows by exact key. All keys of one call share an edge type.
    fn get_edge_props(
        &self,
        space: SpaceId,
        keys: Vec<EdgeKey>,
        props: Vec<PropDef>,
    ) -> BoxFuture<'_, Result<ShardedResponse<EdgePropResponse>>>;
}
