// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

//! In-memory storage service. Implements [`GraphStorageClient`] over a
//! sharded adjacency map, honors push-down filters, and can inject
//! per-shard failures. Backs the integration tests and embedded use.

use crate::client::GraphStorageClient;
use crate::codec::encode_row;
use crate::sharded::{HostLatency, PartError, PartitionId, ShardedResponse};
use crate::wire::{
    EdgeData, EdgeKey, EdgePropResponse, EdgeRecord, PropDef, QueryResponse, TagData, VertexData,
    meta,
};
use futures::future::BoxFuture;
use fxhash::{FxHashMap, FxHashSet};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use stride_common::core::ids::{EdgeRanking, EdgeType, SpaceId, TagId, VertexId};
use stride_common::core::schema::{SchemaDescriptor, SchemaManager, SpaceSchema};
use stride_common::core::value::{PropertyType, PropertyValue};
use stride_common::error::{Result, StrideError};
use stride_common::expr::{EvalContext, Expr};
use tracing::debug;

struct StoredEdge {
    src: VertexId,
    dst: VertexId,
    /// Logical (positive) type.
    edge_type: EdgeType,
    ranking: EdgeRanking,
    props: FxHashMap<String, PropertyValue>,
}

#[derive(Default)]
struct Inner {
    vertices: FxHashMap<VertexId, FxHashMap<TagId, FxHashMap<String, PropertyValue>>>,
    edges: Vec<StoredEdge>,
    out_index: FxHashMap<VertexId, Vec<usize>>,
    in_index: FxHashMap<VertexId, Vec<usize>>,
    failing_shards: FxHashSet<usize>,
}

pub struct MemoryGraphStore {
    space: SpaceId,
    shard_count: usize,
    schema: Arc<SpaceSchema>,
    inner: RwLock<Inner>,
    neighbors_calls: AtomicUsize,
    vertex_props_calls: AtomicUsize,
    edge_props_calls: AtomicUsize,
    last_filter: RwLock<Option<String>>,
}

impl MemoryGraphStore {
    pub fn new(space: SpaceId, shard_count: usize, schema: Arc<SpaceSchema>) -> Self {
        assert!(shard_count > 0, "shard_count must be positive");
        Self {
            space,
            shard_count,
            schema,
            inner: RwLock::new(Inner::default()),
            neighbors_calls: AtomicUsize::new(0),
            vertex_props_calls: AtomicUsize::new(0),
            edge_props_calls: AtomicUsize::new(0),
            last_filter: RwLock::new(None),
        }
    }

    pub fn add_vertex(
        &self,
        id: VertexId,
        tag: &str,
        props: Vec<(&str, PropertyValue)>,
    ) -> Result<()> {
        let tag_id = self.schema.tag_id(self.space, tag)?;
        let mut inner = self.inner.write();
        let entry = inner.vertices.entry(id).or_default().entry(tag_id).or_default();
        for (name, value) in props {
            entry.insert(name.to_string(), value);
        }
        Ok(())
    }

    pub fn add_edge(
        &self,
        src: VertexId,
        dst: VertexId,
        edge: &str,
        ranking: EdgeRanking,
        props: Vec<(&str, PropertyValue)>,
    ) -> Result<()> {
        let edge_type = self.schema.edge_type(self.space, edge)?;
        let mut inner = self.inner.write();
        let idx = inner.edges.len();
        inner.edges.push(StoredEdge {
            src,
            dst,
            edge_type,
            ranking,
            props: props
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        });
        inner.out_index.entry(src).or_default().push(idx);
        inner.in_index.entry(dst).or_default().push(idx);
        Ok(())
    }

    /// All subsequent requests touching this shard fail at the partition
    /// level.
    pub fn fail_shard(&self, shard: usize) {
        self.inner.write().failing_shards.insert(shard);
    }

    pub fn shard_of(&self, id: VertexId) -> usize {
        id.rem_euclid(self.shard_count as i64) as usize
    }

    pub fn neighbors_calls(&self) -> usize {
        self.neighbors_calls.load(Ordering::Relaxed)
    }

    pub fn vertex_props_calls(&self) -> usize {
        self.vertex_props_calls.load(Ordering::Relaxed)
    }

    pub fn edge_props_calls(&self) -> usize {
        self.edge_props_calls.load(Ordering::Relaxed)
    }

    /// The push-down filter of the most recent `get_neighbors` call.
    pub fn last_push_down_filter(&self) -> Option<String> {
        self.last_filter.read().clone()
    }

    fn check_space(&self, space: SpaceId) -> Result<()> {
        if space != self.space {
            return Err(StrideError::Remote(format!("unknown space {}", space)));
        }
        Ok(())
    }

    fn group_by_shard(&self, ids: &[VertexId]) -> BTreeMap<usize, Vec<VertexId>> {
        let mut groups: BTreeMap<usize, Vec<VertexId>> = BTreeMap::new();
        for id in ids {
            groups.entry(self.shard_of(*id)).or_default().push(*id);
        }
        groups
    }

    /// Requested source/dest props grouped per tag, request order preserved.
    fn tag_prop_groups(props: &[PropDef], dest: bool) -> Vec<(TagId, Vec<String>)> {
        let mut groups: Vec<(TagId, Vec<String>)> = Vec::new();
        for p in props {
            let (tag_id, name) = match (p, dest) {
                (PropDef::Source { tag_id, name }, false) => (*tag_id, name),
                (PropDef::Dest { tag_id, name }, true) => (*tag_id, name),
                _ => continue,
            };
            match groups.iter_mut().find(|(t, _)| *t == tag_id) {
                Some((_, names)) => {
                    if !names.iter().any(|n| n == name) {
                        names.push(name.clone());
                    }
                }
                None => groups.push((tag_id, vec![name.clone()])),
            }
        }
        groups
    }

    fn edge_prop_groups(props: &[PropDef]) -> Vec<(EdgeType, Vec<String>)> {
        let mut groups: Vec<(EdgeType, Vec<String>)> = Vec::new();
        for p in props {
            if let PropDef::Edge { edge_type, name } = p {
                match groups.iter_mut().find(|(t, _)| t == edge_type) {
                    Some((_, names)) => {
                        if !names.iter().any(|n| n == name) {
                            names.push(name.clone());
                        }
                    }
                    None => groups.push((*edge_type, vec![name.clone()])),
                }
            }
        }
        groups
    }

    /// Response schema for the requested columns of one tag: declared types
    /// and defaults come from the space schema; unknown names are dropped.
    fn tag_response_schema(&self, tag_id: TagId, names: &[String]) -> Result<Arc<SchemaDescriptor>> {
        let full = self.schema.tag_schema(self.space, tag_id)?;
        let mut out = SchemaDescriptor::new();
        for name in names {
            if let Some(idx) = full.field_index(name) {
                let f = &full.fields()[idx];
                out.append(&f.name, f.prop_type, f.default.clone());
            }
        }
        Ok(Arc::new(out))
    }

    fn edge_response_schema(
        &self,
        edge_type: EdgeType,
        names: &[String],
    ) -> Result<Arc<SchemaDescriptor>> {
        let full = self.schema.edge_schema(self.space, edge_type.abs())?;
        let mut out = SchemaDescriptor::new();
        for name in names {
            match name.as_str() {
                meta::SRC | meta::DST => out.append(name, PropertyType::Vid, None),
                meta::RANK | meta::TYPE => out.append(name, PropertyType::Int, None),
                _ => {
                    if let Some(idx) = full.field_index(name) {
                        let f = &full.fields()[idx];
                        out.append(&f.name, f.prop_type, f.default.clone());
                    }
                }
            }
        }
        Ok(Arc::new(out))
    }

    fn edge_field_value(
        &self,
        edge: &StoredEdge,
        neighbor: VertexId,
        name: &str,
    ) -> Result<PropertyValue> {
        match name {
            meta::SRC => Ok(PropertyValue::Int(edge.src)),
            meta::DST => Ok(PropertyValue::Int(neighbor)),
            meta::RANK => Ok(PropertyValue::Int(edge.ranking)),
            meta::TYPE => Ok(PropertyValue::Int(edge.edge_type as i64)),
            _ => match edge.props.get(name) {
                Some(v) => Ok(v.clone()),
                None => self
                    .schema
                    .edge_schema(self.space, edge.edge_type)?
                    .default_value(name),
            },
        }
    }

    fn build_neighbors_response(
        &self,
        inner: &Inner,
        srcs: &[VertexId],
        edge_types: &[EdgeType],
        props: &[PropDef],
        filter: Option<&Expr>,
    ) -> Result<QueryResponse> {
        let mut resp = QueryResponse::default();

        let tag_groups = Self::tag_prop_groups(props, false);
        for (tag_id, names) in &tag_groups {
            resp.vertex_schema
                .insert(*tag_id, self.tag_response_schema(*tag_id, names)?);
        }
        let edge_groups = Self::edge_prop_groups(props);
        for (ty, names) in &edge_groups {
            resp.edge_schema
                .insert(*ty, self.edge_response_schema(*ty, names)?);
        }

        for &src in srcs {
            let mut vdata = VertexData {
                vertex_id: src,
                tag_data: Vec::new(),
                edge_data: Vec::new(),
            };

            if let Some(tags) = inner.vertices.get(&src) {
                for (tag_id, names) in &tag_groups {
                    let Some(stored) = tags.get(tag_id) else {
                        continue;
                    };
                    let schema = &resp.vertex_schema[tag_id];
                    let mut values = Vec::with_capacity(schema.num_fields());
                    for field in schema.fields() {
                        match stored.get(&field.name) {
                            Some(v) => values.push(v.clone()),
                            None => values.push(schema.default_value(&field.name)?),
                        }
                    }
                    vdata.tag_data.push(TagData {
                        tag_id: *tag_id,
                        data: encode_row(schema, &values)?,
                    });
                }
            }

            for &ty in edge_types {
                let logical = ty.abs();
                let index = if ty > 0 {
                    inner.out_index.get(&src)
                } else {
                    inner.in_index.get(&src)
                };
                let Some(schema) = resp.edge_schema.get(&ty) else {
                    continue;
                };
                let mut records = Vec::new();
                for &idx in index.into_iter().flatten() {
                    let edge = &inner.edges[idx];
                    if edge.edge_type != logical {
                        continue;
                    }
                    let neighbor = if ty > 0 { edge.dst } else { edge.src };
                    if let Some(expr) = filter {
                        let ctx = ServerRowContext {
                            store: self,
                            inner,
                            edge,
                            neighbor,
                        };
                        // Rows failing the filter (or its evaluation) are
                        // dropped here, exactly like rows filtered remotely.
                        match expr.eval(&ctx) {
                            Ok(v) if v.as_bool() => {}
                            _ => continue,
                        }
                    }
                    let mut values = Vec::with_capacity(schema.num_fields());
                    for field in schema.fields() {
                        values.push(self.edge_field_value(edge, neighbor, &field.name)?);
                    }
                    records.push(EdgeRecord {
                        dst: neighbor,
                        props: encode_row(schema, &values)?,
                    });
                }
                resp.total_edges += records.len() as u64;
                vdata.edge_data.push(EdgeData {
                    edge_type: ty,
                    edges: records,
                });
            }

            resp.vertices.push(vdata);
        }
        Ok(resp)
    }

    fn do_get_neighbors(
        &self,
        space: SpaceId,
        src_ids: Vec<VertexId>,
        edge_types: Vec<EdgeType>,
        push_down_filter: Option<String>,
        props: Vec<PropDef>,
    ) -> Result<ShardedResponse<QueryResponse>> {
        self.check_space(space)?;
        self.neighbors_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_filter.write() = push_down_filter.clone();

        let filter: Option<Expr> = match &push_down_filter {
            Some(repr) => Some(
                serde_json::from_str(repr)
                    .map_err(|e| StrideError::Remote(format!("bad push-down filter: {}", e)))?,
            ),
            None => None,
        };

        let inner = self.inner.read();
        let groups = self.group_by_shard(&src_ids);
        let mut out = ShardedResponse::new(groups.len());
        for (shard, srcs) in groups {
            if inner.failing_shards.contains(&shard) {
                debug!(shard, "injected partition failure");
                out.push_failure(shard as PartitionId, PartError::RpcFailure);
                continue;
            }
            let resp =
                self.build_neighbors_response(&inner, &srcs, &edge_types, &props, filter.as_ref())?;
            out.push_latency(HostLatency {
                host: format!("shard-{}", shard),
                latency_us: 120,
                exec_us: 45,
            });
            out.push_response(resp);
        }
        Ok(out)
    }

    fn do_get_vertex_props(
        &self,
        space: SpaceId,
        ids: Vec<VertexId>,
        props: Vec<PropDef>,
    ) -> Result<ShardedResponse<QueryResponse>> {
        self.check_space(space)?;
        self.vertex_props_calls.fetch_add(1, Ordering::Relaxed);

        let inner = self.inner.read();
        let groups = self.group_by_shard(&ids);
        let tag_groups = Self::tag_prop_groups(&props, true);
        let mut out = ShardedResponse::new(groups.len());
        for (shard, ids) in groups {
            if inner.failing_shards.contains(&shard) {
                out.push_failure(shard as PartitionId, PartError::RpcFailure);
                continue;
            }
            let mut resp = QueryResponse::default();
            for (tag_id, names) in &tag_groups {
                resp.vertex_schema
                    .insert(*tag_id, self.tag_response_schema(*tag_id, names)?);
            }
            for id in ids {
                let mut vdata = VertexData {
                    vertex_id: id,
                    tag_data: Vec::new(),
                    edge_data: Vec::new(),
                };
                if let Some(tags) = inner.vertices.get(&id) {
                    for (tag_id, _) in &tag_groups {
                        let Some(stored) = tags.get(tag_id) else {
                            continue;
                        };
                        let schema = &resp.vertex_schema[tag_id];
                        let mut values = Vec::with_capacity(schema.num_fields());
                        for field in schema.fields() {
                            match stored.get(&field.name) {
                                Some(v) => values.push(v.clone()),
                                None => values.push(schema.default_value(&field.name)?),
                            }
                        }
                        vdata.tag_data.push(TagData {
                            tag_id: *tag_id,
                            data: encode_row(schema, &values)?,
                        });
                    }
                }
                resp.vertices.push(vdata);
            }
            out.push_response(resp);
        }
        Ok(out)
    }

    fn do_get_edge_props(
        &self,
        space: SpaceId,
        keys: Vec<EdgeKey>,
        props: Vec<PropDef>,
    ) -> Result<ShardedResponse<EdgePropResponse>> {
        self.check_space(space)?;
        self.edge_props_calls.fetch_add(1, Ordering::Relaxed);

        let Some(edge_type) = keys.first().map(|k| k.edge_type) else {
            return Ok(ShardedResponse::new(0));
        };
        // Reserved meta columns always lead; requested user props follow.
        let mut names: Vec<String> = vec![
            meta::SRC.to_string(),
            meta::DST.to_string(),
            meta::RANK.to_string(),
            meta::TYPE.to_string(),
        ];
        for p in &props {
            if let PropDef::Edge { name, .. } = p {
                if !meta::is_meta(name) && !names.iter().any(|n| n == name) {
                    names.push(name.clone());
                }
            }
        }
        let schema = self.edge_response_schema(edge_type, &names)?;

        let inner = self.inner.read();
        let src_ids: Vec<VertexId> = keys.iter().map(|k| k.src).collect();
        let groups = self.group_by_shard(&src_ids);
        let mut out = ShardedResponse::new(groups.len());
        for (shard, _) in groups {
            if inner.failing_shards.contains(&shard) {
                out.push_failure(shard as PartitionId, PartError::RpcFailure);
                continue;
            }
            let mut data = Vec::new();
            for key in keys.iter().filter(|k| self.shard_of(k.src) == shard) {
                let found = inner
                    .out_index
                    .get(&key.src)
                    .into_iter()
                    .flatten()
                    .map(|&i| &inner.edges[i])
                    .find(|e| {
                        e.dst == key.dst
                            && e.edge_type == key.edge_type
                            && e.ranking == key.ranking
                    });
                let Some(edge) = found else {
                    continue;
                };
                let mut values = Vec::with_capacity(schema.num_fields());
                for field in schema.fields() {
                    values.push(self.edge_field_value(edge, edge.dst, &field.name)?);
                }
                data.push(encode_row(&schema, &values)?);
            }
            out.push_response(EdgePropResponse {
                schema: Some(schema.clone()),
                data,
            });
        }
        Ok(out)
    }
}

impl GraphStorageClient for MemoryGraphStore {
    fn get_neighbors(
        &self,
        space: SpaceId,
        src_ids: Vec<VertexId>,
        edge_types: Vec<EdgeType>,
        push_down_filter: Option<String>,
        props: Vec<PropDef>,
    ) -> BoxFuture<'_, Result<ShardedResponse<QueryResponse>>> {
        let result = self.do_get_neighbors(space, src_ids, edge_types, push_down_filter, props);
        Box::pin(futures::future::ready(result))
    }

    fn get_vertex_props(
        &self,
        space: SpaceId,
        ids: Vec<VertexId>,
        props: Vec<PropDef>,
    ) -> BoxFuture<'_, Result<ShardedResponse<QueryResponse>>> {
        let result = self.do_get_vertex_props(space, ids, props);
        Box::pin(futures::future::ready(result))
    }

    fn get_edge_props(
        &self,
        space: SpaceId,
        keys: Vec<EdgeKey>,
        props: Vec<PropDef>,
    ) -> BoxFuture<'_, Result<ShardedResponse<EdgePropResponse>>> {
        let result = self.do_get_edge_props(space, keys, props);
        Box::pin(futures::future::ready(result))
    }
}

/// Evaluation context of a push-down filter: one candidate edge plus its
/// source vertex. Destination, pipeline and variable properties are not
/// reachable at the storage tier.
struct ServerRowContext<'a> {
    store: &'a MemoryGraphStore,
    inner: &'a Inner,
    edge: &'a StoredEdge,
    neighbor: VertexId,
}

impl EvalContext for ServerRowContext<'_> {
    fn src_tag_prop(&self, tag: &str, prop: &str) -> Result<PropertyValue> {
        let tag_id = self.store.schema.tag_id(self.store.space, tag)?;
        if let Some(v) = self
            .inner
            .vertices
            .get(&self.edge.src)
            .and_then(|tags| tags.get(&tag_id))
            .and_then(|props| props.get(prop))
        {
            return Ok(v.clone());
        }
        self.store
            .schema
            .tag_schema(self.store.space, tag_id)?
            .default_value(prop)
    }

    fn alias_prop(&self, edge: &str, prop: &str) -> Result<PropertyValue> {
        let ty = self.store.schema.edge_type(self.store.space, edge)?;
        if ty.abs() != self.edge.edge_type {
            return self
                .store
                .schema
                .edge_schema(self.store.space, ty.abs())?
                .default_value(prop);
        }
        self.store.edge_field_value(self.edge, self.neighbor, prop)
    }

    fn edge_dst_id(&self, edge: &str) -> Result<PropertyValue> {
        let ty = self.store.schema.edge_type(self.store.space, edge)?;
        if ty.abs() != self.edge.edge_type {
            return Ok(PropertyValue::Int(0));
        }
        Ok(PropertyValue::Int(self.neighbor))
    }

    fn edge_src_id(&self, edge: &str) -> Result<PropertyValue> {
        let ty = self.store.schema.edge_type(self.store.space, edge)?;
        if ty.abs() != self.edge.edge_type {
            return Ok(PropertyValue::Int(0));
        }
        Ok(PropertyValue::Int(self.edge.src))
    }

    fn edge_rank(&self, edge: &str) -> Result<PropertyValue> {
        let ty = self.store.schema.edge_type(self.store.space, edge)?;
        if ty.abs() != self.edge.edge_type {
            return Ok(PropertyValue::Int(0));
        }
        Ok(PropertyValue::Int(self.edge.ranking))
    }

    fn edge_type_of(&self, edge: &str) -> Result<PropertyValue> {
        let ty = self.store.schema.edge_type(self.store.space, edge)?;
        if ty.abs() != self.edge.edge_type {
            return Ok(PropertyValue::Int(0));
        }
        Ok(PropertyValue::Int(self.edge.edge_type as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stride_common::core::value::PropertyType;

    fn fixture() -> MemoryGraphStore {
        let mut space = SpaceSchema::new(1);
        space.add_tag(
            "person",
            SchemaDescriptor::new()
                .with_default("name", PropertyType::String, PropertyValue::Str("".into()))
                .with_field("age", PropertyType::Int),
        );
        space.add_edge(
            "follow",
            SchemaDescriptor::new().with_field("since", PropertyType::Int),
        );
        let store = MemoryGraphStore::new(1, 2, Arc::new(space));
        store
            .add_vertex(1, "person", vec![("name", "one".into()), ("age", PropertyValue::Int(20))])
            .unwrap();
        store.add_vertex(2, "person", vec![("name", "two".into())]).unwrap();
        store
            .add_edge(1, 2, "follow", 0, vec![("since", PropertyValue::Int(2020))])
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_neighbors_forward() {
        let store = fixture();
        let follow = store.schema.edge_type(1, "follow").unwrap();
        let resp = store
            .get_neighbors(
                1,
                vec![1],
                vec![follow],
                None,
                vec![PropDef::Edge {
                    edge_type: follow,
                    name: meta::DST.into(),
                }],
            )
            .await
            .unwrap();
        assert_eq!(resp.completeness(), 100);
        let q = &resp.responses()[0];
        assert_eq!(q.total_edges, 1);
        assert_eq!(q.vertices[0].edge_data[0].edges[0].dst, 2);
    }

    #[tokio::test]
    async fn test_neighbors_reverse_sees_incoming() {
        let store = fixture();
        let follow = store.schema.edge_type(1, "follow").unwrap();
        let resp = store
            .get_neighbors(
                1,
                vec![2],
                vec![-follow],
                None,
                vec![PropDef::Edge {
                    edge_type: -follow,
                    name: meta::DST.into(),
                }],
            )
            .await
            .unwrap();
        let q = &resp.responses()[0];
        // The neighbor of 2 along reverse `follow` is the forward source 1.
        assert_eq!(q.vertices[0].edge_data[0].edges[0].dst, 1);
    }

    #[tokio::test]
    async fn test_failed_shard_reported() {
        let store = fixture();
        let follow = store.schema.edge_type(1, "follow").unwrap();
        store.fail_shard(1); // vertex 1 lives on shard 1
        let resp = store
            .get_neighbors(1, vec![1, 2], vec![follow], None, vec![])
            .await
            .unwrap();
        assert_eq!(resp.completeness(), 50);
        assert_eq!(resp.failed_parts().len(), 1);
    }

    #[tokio::test]
    async fn test_edge_props_lookup() {
        let store = fixture();
        let follow = store.schema.edge_type(1, "follow").unwrap();
        let resp = store
            .get_edge_props(
                1,
                vec![EdgeKey {
                    src: 1,
                    dst: 2,
                    edge_type: follow,
                    ranking: 0,
                }],
                vec![PropDef::Edge {
                    edge_type: follow,
                    name: "since".into(),
                }],
            )
            .await
            .unwrap();
        let prop_resp = &resp.responses()[0];
        let schema = prop_resp.schema.clone().unwrap();
        let reader = crate::codec::RowReader::decode(schema, &prop_resp.data[0]).unwrap();
        assert_eq!(reader.prop("since").unwrap(), PropertyValue::Int(2020));
        assert_eq!(reader.prop(meta::SRC).unwrap(), PropertyValue::Int(1));
        assert_eq!(reader.prop(meta::DST).unwrap(), PropertyValue::Int(2));
    }
}
