// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

//! Post-hop enrichment: destination-vertex properties, and the second RPC
//! round that reverse traversal needs to materialize edge properties
//! absent from reverse-indexed edges.

use super::TraverseExecutor;
use futures::future::try_join_all;
use fxhash::FxHashMap;
use stride_common::core::ids::{EdgeType, VertexId};
use stride_common::error::{Result, StrideError};
use stride_store::codec::RowReader;
use stride_store::sharded::ShardedResponse;
use stride_store::wire::{EdgeKey, PropDef, QueryResponse, meta};

impl TraverseExecutor {
    /// Returns `false` when the terminal destination set is empty (dead
    /// end), in which case the caller emits an empty result.
    pub(crate) async fn enrich(
        &mut self,
        resp: &ShardedResponse<QueryResponse>,
    ) -> Result<bool> {
        let require_dst = self.ectx.has_dst_tag_prop();
        let require_edge = self.ectx.has_edge_prop();

        // Forward with no destination properties needs nothing. Reverse can
        // also go straight to materialization when neither edge nor
        // destination properties are referenced, except when `OVER *` with an
        // empty yield synthesized the dst-id columns.
        if (!require_dst && !self.reversely)
            || (self.reversely
                && !require_dst
                && !require_edge
                && !(self.ectx.is_over_all() && self.synthesized_yields))
        {
            return Ok(true);
        }

        let dst_ids = self.collect_frontier(resp, false);
        if dst_ids.is_empty() {
            return Ok(false);
        }

        if !self.reversely || (require_dst && !require_edge) {
            self.fetch_vertex_props(dst_ids).await?;
            return Ok(true);
        }

        // Reverse traversal: the edge rows come from the forward index, so
        // the fetch must happen before any destination-property fetch.
        self.fetch_reverse_edge_props(resp).await?;
        if require_dst {
            self.fetch_vertex_props(dst_ids).await?;
        }
        Ok(true)
    }

    /// Reconstruct forward edge keys by swapping the reverse record and
    /// fetch their rows, one concurrent request per edge type.
    async fn fetch_reverse_edge_props(
        &mut self,
        resp: &ShardedResponse<QueryResponse>,
    ) -> Result<()> {
        self.check_cancelled()?;

        let mut keys_by_type: FxHashMap<EdgeType, Vec<EdgeKey>> = FxHashMap::default();
        for r in resp.responses() {
            for vdata in &r.vertices {
                for edata in &vdata.edge_data {
                    let Some(schema) = r.edge_schema.get(&edata.edge_type) else {
                        continue;
                    };
                    for edge in &edata.edges {
                        let reader = RowReader::decode(schema.clone(), &edge.props)?;
                        let rank = reader
                            .prop(meta::RANK)
                            .and_then(|v| v.as_int())
                            .map_err(|_| {
                                StrideError::Remote("missing rank on reverse edge record".into())
                            })?;
                        let logical = edata.edge_type.abs();
                        // The record's `dst` is the forward-edge source.
                        keys_by_type.entry(logical).or_default().push(EdgeKey {
                            src: edge.dst,
                            dst: vdata.vertex_id,
                            edge_type: logical,
                            ranking: rank,
                        });
                    }
                }
            }
        }

        let mut props_by_type: FxHashMap<EdgeType, Vec<PropDef>> = FxHashMap::default();
        for (edge, prop) in self.ectx.alias_props() {
            let ty = self
                .ectx
                .edge_type(edge)
                .ok_or_else(|| StrideError::name_not_found("edge", edge.clone()))?;
            let logical = ty.abs();
            props_by_type.entry(logical).or_default().push(PropDef::Edge {
                edge_type: logical,
                name: prop.clone(),
            });
        }

        let futures: Vec<_> = keys_by_type
            .into_iter()
            .map(|(ty, keys)| {
                let props = props_by_type.get(&ty).cloned().unwrap_or_default();
                self.storage.get_edge_props(self.space, keys, props)
            })
            .collect();
        let results = try_join_all(futures).await.map_err(|e| self.fail(e))?;

        let holder = self
            .edge_holder
            .as_mut()
            .ok_or_else(|| StrideError::Internal("edge holder missing in reverse traversal".into()))?;
        for sharded in &results {
            for r in sharded.responses() {
                holder.add(r)?;
            }
        }
        Ok(())
    }

    pub(crate) async fn fetch_vertex_props(&mut self, ids: Vec<VertexId>) -> Result<()> {
        self.check_cancelled()?;
        let mut props = Vec::new();
        for (tag, prop) in self.ectx.dst_tag_props() {
            let tag_id = self
                .ectx
                .tag_id(tag)
                .ok_or_else(|| StrideError::name_not_found("tag", tag.clone()))?;
            props.push(PropDef::Dest {
                tag_id,
                name: prop.clone(),
            });
        }
        let resp = self
            .storage
            .get_vertex_props(self.space, ids, props)
            .await
            .map_err(|e| self.fail(e))?;
        self.check_completeness(&resp, "get dest props failed")?;
        for r in resp.responses() {
            self.vertex_holder.add(r)?;
        }
        Ok(())
    }
}
