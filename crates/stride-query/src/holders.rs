// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

//! Accumulators carried across traversal stages: the child-to-root tracker
//! and the fetched vertex/edge property holders.

use fxhash::FxHashMap;
use std::sync::Arc;
use stride_common::core::ids::{EdgeType, TagId, VertexId};
use stride_common::core::schema::SchemaDescriptor;
use stride_common::core::value::PropertyValue;
use stride_common::error::{Result, StrideError};
use stride_store::codec::RowReader;
use stride_store::wire::{EdgePropResponse, QueryResponse, meta};

/// Maps every intermediate-hop vertex back to the start-set root it was
/// reached from, so root-keyed pipeline columns stay addressable at the
/// final hop.
#[derive(Debug, Default)]
pub struct BackTracker {
    mapping: FxHashMap<VertexId, VertexId>,
}

impl BackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `child` was reached from `parent`. The stored root is the
    /// parent's own root when the parent is itself tracked.
    pub fn add(&mut self, parent: VertexId, child: VertexId) {
        let root = self.mapping.get(&parent).copied().unwrap_or(parent);
        self.mapping.insert(child, root);
    }

    pub fn get(&self, id: VertexId) -> Option<VertexId> {
        self.mapping.get(&id).copied()
    }
}

/// Destination-vertex properties fetched by the enrichment stage.
#[derive(Debug, Default)]
pub struct VertexHolder {
    data: FxHashMap<VertexId, FxHashMap<TagId, (Arc<SchemaDescriptor>, Vec<PropertyValue>)>>,
}

impl VertexHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, resp: &QueryResponse) -> Result<()> {
        for vdata in &resp.vertices {
            let entry = self.data.entry(vdata.vertex_id).or_default();
            for td in &vdata.tag_data {
                let schema = resp.vertex_schema.get(&td.tag_id).ok_or_else(|| {
                    StrideError::Internal(format!("no schema for tag {} in response", td.tag_id))
                })?;
                let reader = RowReader::decode(schema.clone(), &td.data)?;
                entry.insert(td.tag_id, (schema.clone(), reader.values().to_vec()));
            }
        }
        Ok(())
    }

    /// Property of `id` under `tag`. A vertex or tag that was never fetched
    /// resolves to the schema default.
    pub fn get(&self, id: VertexId, tag: TagId, prop: &str) -> Result<PropertyValue> {
        let Some((schema, values)) = self.data.get(&id).and_then(|tags| tags.get(&tag)) else {
            return self.default_prop(tag, prop);
        };
        match schema.field_index(prop) {
            Some(idx) if idx < values.len() => Ok(values[idx].clone()),
            Some(_) => schema.default_value(prop),
            None => Err(StrideError::name_not_found("property", prop)),
        }
    }

    fn default_prop(&self, tag: TagId, prop: &str) -> Result<PropertyValue> {
        for tags in self.data.values() {
            if let Some((schema, _)) = tags.get(&tag) {
                return schema.default_value(prop);
            }
        }
        Err(StrideError::Expression(format!(
            "unknown vertex tag {}",
            tag
        )))
    }
}

/// Forward edge rows fetched back during reverse traversal, keyed by the
/// response's own `_src`/`_dst` columns.
#[derive(Debug, Default)]
pub struct EdgeHolder {
    edges: FxHashMap<(VertexId, VertexId, EdgeType), (Arc<SchemaDescriptor>, Vec<PropertyValue>)>,
    schemas: FxHashMap<EdgeType, Arc<SchemaDescriptor>>,
}

impl EdgeHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, resp: &EdgePropResponse) -> Result<()> {
        let Some(schema) = &resp.schema else {
            return Ok(());
        };
        if resp.data.is_empty() {
            return Ok(());
        }
        for row in &resp.data {
            let reader = RowReader::decode(schema.clone(), row)?;
            let src = reader.prop(meta::SRC)?.as_int()?;
            let dst = reader.prop(meta::DST)?.as_int()?;
            let ty = reader.prop(meta::TYPE)?.as_int()? as EdgeType;
            self.edges
                .insert((src, dst, ty), (schema.clone(), reader.values().to_vec()));
            self.schemas.insert(ty, schema.clone());
        }
        Ok(())
    }

    pub fn get(
        &self,
        src: VertexId,
        dst: VertexId,
        edge_type: EdgeType,
        prop: &str,
    ) -> Result<PropertyValue> {
        let (schema, values) = self.edges.get(&(src, dst, edge_type)).ok_or_else(|| {
            StrideError::Expression(format!(
                "edge ({} -> {}, type {}) not fetched",
                src, dst, edge_type
            ))
        })?;
        match schema.field_index(prop) {
            Some(idx) if idx < values.len() => Ok(values[idx].clone()),
            Some(_) => schema.default_value(prop),
            None => Err(StrideError::name_not_found("property", prop)),
        }
    }

    /// Default for an edge type that may not have been fetched at all: the
    /// reserved meta columns default to zero, anything else needs a schema.
    pub fn default_prop(&self, edge_type: EdgeType, prop: &str) -> Result<PropertyValue> {
        match self.schemas.get(&edge_type) {
            Some(schema) => schema.default_value(prop),
            None if matches!(prop, meta::SRC | meta::DST | meta::RANK) => {
                Ok(PropertyValue::Int(0))
            }
            None => Err(StrideError::Expression(format!(
                "no default for {}.{} in reverse traversal",
                edge_type, prop
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_tracker_roots() {
        let mut bt = BackTracker::new();
        // 1 -> 2 -> 4 and 1 -> 3 -> 4
        bt.add(1, 2);
        bt.add(1, 3);
        bt.add(2, 4);
        assert_eq!(bt.get(2), Some(1));
        assert_eq!(bt.get(3), Some(1));
        // Transitive: 4's root is 1, not 2.
        assert_eq!(bt.get(4), Some(1));
        assert_eq!(bt.get(9), None);
    }

    #[test]
    fn test_edge_holder_meta_defaults() {
        let holder = EdgeHolder::new();
        assert_eq!(
            holder.default_prop(3, meta::RANK).unwrap(),
            PropertyValue::Int(0)
        );
        assert!(holder.default_prop(3, "since").is_err());
    }
}
