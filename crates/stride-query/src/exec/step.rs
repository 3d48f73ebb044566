// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

//! The hop loop. Steps run strictly in sequence; within a step the storage
//! client aggregates per-shard responses into one composite answer.

use super::TraverseExecutor;
use fxhash::FxHashSet;
use stride_common::core::ids::VertexId;
use stride_common::error::{Result, StrideError};
use stride_store::sharded::ShardedResponse;
use stride_store::wire::{PropDef, QueryResponse, meta};
use tracing::{debug, error, info, warn};

impl TraverseExecutor {
    /// Drives hops 1..=N. Returns the final-step response, or `None` when an
    /// intermediate frontier drained (dead end).
    pub(crate) async fn run_steps(&mut self) -> Result<Option<ShardedResponse<QueryResponse>>> {
        loop {
            let resp = self.step_out().await?;
            if self.is_final_step() {
                return Ok(Some(resp));
            }
            let next = self.collect_frontier(&resp, true);
            if next.is_empty() {
                debug!(step = self.cur_step, "frontier drained before final step");
                return Ok(None);
            }
            self.starts = next;
            self.cur_step += 1;
        }
    }

    pub(crate) fn is_final_step(&self) -> bool {
        self.cur_step == self.steps
    }

    /// The property list of one `get_neighbors` request.
    ///
    /// Intermediate steps only need `_dst` to grow the frontier. The final
    /// step adds source-tag properties; forward traversal also embeds edge
    /// properties, while reverse traversal requests `_rank` instead and
    /// leaves edge properties to the enrichment fetch.
    pub(crate) fn step_out_props(&self) -> Result<Vec<PropDef>> {
        let mut props = Vec::new();
        for &ty in &self.edge_types {
            props.push(PropDef::Edge {
                edge_type: ty,
                name: meta::DST.into(),
            });
            if self.is_final_step() && self.reversely {
                props.push(PropDef::Edge {
                    edge_type: ty,
                    name: meta::RANK.into(),
                });
            }
        }
        if !self.is_final_step() {
            return Ok(props);
        }

        for (tag, prop) in self.ectx.src_tag_props() {
            let tag_id = self
                .ectx
                .tag_id(tag)
                .ok_or_else(|| StrideError::name_not_found("tag", tag.clone()))?;
            props.push(PropDef::Source {
                tag_id,
                name: prop.clone(),
            });
        }

        if self.reversely {
            return Ok(props);
        }
        for (edge, prop) in self.ectx.alias_props() {
            if prop == meta::DST {
                continue;
            }
            let ty = self
                .ectx
                .edge_type(edge)
                .ok_or_else(|| StrideError::name_not_found("edge", edge.clone()))?;
            props.push(PropDef::Edge {
                edge_type: ty,
                name: prop.clone(),
            });
        }
        Ok(props)
    }

    async fn step_out(&mut self) -> Result<ShardedResponse<QueryResponse>> {
        self.check_cancelled()?;
        let props = self.step_out_props()?;

        // Push-down only on the final step of a forward traversal; reverse
        // push-down falls back to local evaluation silently.
        let push_down = if self.config.filter_pushdown && self.is_final_step() && !self.reversely {
            self.pushdown_repr.clone()
        } else {
            None
        };
        self.filter_pushed = push_down.is_some();

        let resp = self
            .storage
            .get_neighbors(
                self.space,
                self.starts.clone(),
                self.edge_types.clone(),
                push_down,
                props,
            )
            .await
            .map_err(|e| self.fail(e))?;
        self.check_completeness(&resp, "get neighbors failed")?;

        if self.config.trace_traverse {
            info!(
                step = self.cur_step,
                vertices = self.starts.len(),
                "step finished"
            );
            for hl in resp.host_latency() {
                info!(
                    host = %hl.host,
                    latency_us = hl.latency_us,
                    exec_us = hl.exec_us,
                    "host latency"
                );
            }
        }
        Ok(resp)
    }

    /// Zero completeness is fatal; partial completeness is logged and the
    /// query continues with whatever rows arrived.
    pub(crate) fn check_completeness<T>(
        &self,
        resp: &ShardedResponse<T>,
        what: &str,
    ) -> Result<()> {
        let completeness = resp.completeness();
        if completeness == 0 {
            return Err(self.fail(StrideError::Remote(what.into())));
        }
        if completeness != 100 {
            warn!(completeness, "storage request partially failed");
            for (part, code) in resp.failed_parts() {
                error!(part = *part, error = %code, "partition failed");
            }
        }
        Ok(())
    }

    /// Union of destination ids across the response. When `track` is set,
    /// each destination is recorded against its source's root so pipeline
    /// columns stay addressable at later hops.
    pub(crate) fn collect_frontier(
        &mut self,
        resp: &ShardedResponse<QueryResponse>,
        track: bool,
    ) -> Vec<VertexId> {
        let mut seen = FxHashSet::default();
        let mut frontier = Vec::new();
        for r in resp.responses() {
            for vdata in &r.vertices {
                for edata in &vdata.edge_data {
                    for edge in &edata.edges {
                        if track {
                            if let Some(tracker) = self.back_tracker.as_mut() {
                                tracker.add(vdata.vertex_id, edge.dst);
                            }
                        }
                        if seen.insert(edge.dst) {
                            frontier.push(edge.dst);
                        }
                    }
                }
            }
        }
        frontier
    }
}
