// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

//! Row materialization: one evaluation context per (source, edge,
//! destination) triple, local filter, DISTINCT suppression and the typed
//! sinks.

use super::{EmitMode, TraverseExecutor, TraverseOutput};
use crate::context::ExpressionContext;
use crate::holders::{BackTracker, EdgeHolder, VertexHolder};
use crate::interim::{InterimResult, RowIndex};
use crate::response::{ExecutionResponse, Row, column_value};
use crate::typing::calculate_expr_type;
use fxhash::{FxHashSet, FxHasher};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use stride_common::core::ids::{EdgeType, SpaceId, TagId, VertexId};
use stride_common::core::schema::{SchemaDescriptor, SchemaManager};
use stride_common::core::value::{PropertyType, PropertyValue};
use stride_common::error::{Result, StrideError};
use stride_common::expr::EvalContext;
use stride_store::codec::RowReader;
use stride_store::sharded::ShardedResponse;
use stride_store::wire::{QueryResponse, TagData, meta};
use tracing::info;

/// Materialization failures surface as expression errors regardless of the
/// underlying lookup that tripped.
fn expr_err(e: StrideError) -> StrideError {
    match e {
        StrideError::Expression(_) => e,
        other => StrideError::Expression(other.to_string()),
    }
}

impl TraverseExecutor {
    pub(crate) fn finish(&self, resp: ShardedResponse<QueryResponse>) -> Result<TraverseOutput> {
        let column_names = self.result_column_names();
        let col_types: Vec<PropertyType> = self
            .yields
            .iter()
            .map(|col| {
                calculate_expr_type(
                    &col.expr,
                    self.schema.as_ref(),
                    self.space,
                    self.row_index.as_ref(),
                )
            })
            .collect();

        match self.emit {
            EmitMode::Response => {
                let mut rows = Vec::new();
                self.process_final_result(&resp, |record| {
                    let columns = record
                        .iter()
                        .zip(&col_types)
                        .map(|(value, ty)| column_value(*ty, value))
                        .collect();
                    rows.push(Row { columns });
                    Ok(())
                })?;
                if self.config.trace_traverse {
                    info!(rows = rows.len(), "materialized result");
                }
                Ok(TraverseOutput::Response(ExecutionResponse {
                    column_names,
                    rows,
                }))
            }
            EmitMode::Interim => {
                let mut result: Option<InterimResult> = None;
                self.process_final_result(&resp, |record| {
                    let out = result.get_or_insert_with(|| {
                        // The first record pins the schema: statically
                        // inferred types, runtime tags where inference gave
                        // Unknown.
                        let types = record
                            .iter()
                            .zip(&col_types)
                            .map(|(value, ty)| {
                                if *ty == PropertyType::Unknown {
                                    value.type_tag()
                                } else {
                                    *ty
                                }
                            })
                            .collect();
                        InterimResult::with_types(column_names.clone(), types)
                    });
                    out.push_row(record);
                    Ok(())
                })?;
                Ok(TraverseOutput::Interim(result.unwrap_or_else(|| {
                    InterimResult::with_types(column_names, col_types)
                })))
            }
        }
    }

    /// Walk every (vertex, edge group, edge record) triple of the final
    /// response and feed surviving records to the sink.
    fn process_final_result(
        &self,
        resp: &ShardedResponse<QueryResponse>,
        mut sink: impl FnMut(Vec<PropertyValue>) -> Result<()>,
    ) -> Result<()> {
        let multi_edge = self.edge_types.len() > 1;
        let mut seen: FxHashSet<u64> = FxHashSet::default();

        for r in resp.responses() {
            for vdata in &r.vertices {
                for edata in &vdata.edge_data {
                    let cur_schema = r.edge_schema.get(&edata.edge_type);
                    for edge in &edata.edges {
                        let reader = match cur_schema {
                            Some(schema) => {
                                Some(RowReader::decode(schema.clone(), &edge.props)?)
                            }
                            None => None,
                        };
                        let ctx = TripleContext {
                            space: self.space,
                            schema: self.schema.as_ref(),
                            ectx: &self.ectx,
                            reversely: self.reversely,
                            multi_edge,
                            vertex_holder: &self.vertex_holder,
                            edge_holder: self.edge_holder.as_ref(),
                            back_tracker: self.back_tracker.as_ref(),
                            row_index: self.row_index.as_ref(),
                            vertex_schemas: &r.vertex_schema,
                            edge_schemas: &r.edge_schema,
                            tag_data: &vdata.tag_data,
                            src_id: vdata.vertex_id,
                            dst_id: edge.dst,
                            edge_type: edata.edge_type,
                            edge_reader: reader.as_ref(),
                        };

                        if !self.filter_pushed {
                            if let Some(filter) = &self.filter {
                                let keep = filter.eval(&ctx).map_err(expr_err)?;
                                if !keep.as_bool() {
                                    continue;
                                }
                            }
                        }

                        let mut record = Vec::with_capacity(self.yields.len());
                        for col in &self.yields {
                            record.push(col.expr.eval(&ctx).map_err(expr_err)?);
                        }

                        if self.distinct {
                            let mut hasher = FxHasher::default();
                            for value in &record {
                                value.hash(&mut hasher);
                            }
                            if !seen.insert(hasher.finish()) {
                                continue;
                            }
                        }
                        sink(record)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// All property sources reachable from one traversal triple. Replaces the
/// original's per-getter closures with a single borrowed context.
struct TripleContext<'a> {
    space: SpaceId,
    schema: &'a dyn SchemaManager,
    ectx: &'a ExpressionContext,
    reversely: bool,
    multi_edge: bool,
    vertex_holder: &'a VertexHolder,
    edge_holder: Option<&'a EdgeHolder>,
    back_tracker: Option<&'a BackTracker>,
    row_index: Option<&'a RowIndex>,
    vertex_schemas: &'a HashMap<TagId, Arc<SchemaDescriptor>>,
    edge_schemas: &'a HashMap<EdgeType, Arc<SchemaDescriptor>>,
    tag_data: &'a [TagData],
    src_id: VertexId,
    dst_id: VertexId,
    /// Signed type of the current edge group, as traversed.
    edge_type: EdgeType,
    edge_reader: Option<&'a RowReader>,
}

impl TripleContext<'_> {
    fn resolve_edge(&self, name: &str) -> Result<EdgeType> {
        self.ectx.edge_type(name).ok_or_else(|| {
            StrideError::Expression(format!("get edge type for `{}' failed", name))
        })
    }

    /// `0` marks "this column belongs to one of the other traversed edges".
    fn other_edge(&self, name: &str) -> Result<Option<PropertyValue>> {
        if self.multi_edge {
            let ty = self.resolve_edge(name)?;
            if ty != self.edge_type {
                return Ok(Some(PropertyValue::Int(0)));
            }
        }
        Ok(None)
    }

    fn interim_prop(&self, prop: &str) -> Result<PropertyValue> {
        let root = self
            .back_tracker
            .and_then(|tracker| tracker.get(self.src_id))
            .unwrap_or(self.src_id);
        let index = self
            .row_index
            .ok_or_else(|| StrideError::Expression("no inbound rows bound".into()))?;
        index.column_with_vid(root, prop)
    }
}

impl EvalContext for TripleContext<'_> {
    fn edge_dst_id(&self, edge: &str) -> Result<PropertyValue> {
        if let Some(zero) = self.other_edge(edge)? {
            return Ok(zero);
        }
        // On a reverse record the semantic destination is the queried
        // vertex itself.
        Ok(PropertyValue::Int(if self.reversely {
            self.src_id
        } else {
            self.dst_id
        }))
    }

    fn edge_src_id(&self, edge: &str) -> Result<PropertyValue> {
        if let Some(zero) = self.other_edge(edge)? {
            return Ok(zero);
        }
        Ok(PropertyValue::Int(if self.reversely {
            self.dst_id
        } else {
            self.src_id
        }))
    }

    fn edge_rank(&self, edge: &str) -> Result<PropertyValue> {
        if let Some(zero) = self.other_edge(edge)? {
            return Ok(zero);
        }
        match self.edge_reader {
            Some(reader) => reader.prop(meta::RANK),
            None => Ok(PropertyValue::Int(0)),
        }
    }

    fn edge_type_of(&self, edge: &str) -> Result<PropertyValue> {
        if let Some(zero) = self.other_edge(edge)? {
            return Ok(zero);
        }
        Ok(PropertyValue::Int(self.edge_type.abs() as i64))
    }

    fn src_tag_prop(&self, tag: &str, prop: &str) -> Result<PropertyValue> {
        let tag_id = self
            .ectx
            .tag_id(tag)
            .ok_or_else(|| StrideError::Expression(format!("get tag id for `{}' failed", tag)))?;
        match self.tag_data.iter().find(|td| td.tag_id == tag_id) {
            Some(td) => {
                let schema = self.vertex_schemas.get(&tag_id).ok_or_else(|| {
                    StrideError::Internal(format!("no response schema for tag {}", tag_id))
                })?;
                RowReader::decode(schema.clone(), &td.data)?.prop(prop)
            }
            // The source vertex does not carry this tag: schema default.
            None => self
                .schema
                .tag_schema(self.space, tag_id)?
                .default_value(prop),
        }
    }

    fn dst_tag_prop(&self, tag: &str, prop: &str) -> Result<PropertyValue> {
        let tag_id = self
            .ectx
            .tag_id(tag)
            .ok_or_else(|| StrideError::Expression(format!("get tag id for `{}' failed", tag)))?;
        self.vertex_holder.get(self.dst_id, tag_id, prop)
    }

    fn alias_prop(&self, edge: &str, prop: &str) -> Result<PropertyValue> {
        let ty = self.resolve_edge(edge)?;
        if self.reversely {
            let holder = self
                .edge_holder
                .ok_or_else(|| StrideError::Internal("edge holder missing".into()))?;
            if ty != self.edge_type {
                return holder.default_prop(ty.abs(), prop);
            }
            return holder.get(self.dst_id, self.src_id, self.edge_type.abs(), prop);
        }
        if ty != self.edge_type {
            // A column of one of the other traversed edges: default value,
            // so a union over edges keeps a consistent row width.
            let schema = self.edge_schemas.get(&ty).ok_or_else(|| {
                StrideError::Expression(format!("no schema for edge `{}'", edge))
            })?;
            return schema.default_value(prop);
        }
        let reader = self
            .edge_reader
            .ok_or_else(|| StrideError::Internal("edge row missing".into()))?;
        reader.prop(prop)
    }

    fn input_prop(&self, prop: &str) -> Result<PropertyValue> {
        self.interim_prop(prop)
    }

    fn variable_prop(&self, _var: &str, prop: &str) -> Result<PropertyValue> {
        self.interim_prop(prop)
    }
}
