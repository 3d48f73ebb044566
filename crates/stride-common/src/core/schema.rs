// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

use crate::core::ids::{EdgeType, SpaceId, TagId};
use crate::core::value::{PropertyType, PropertyValue};
use crate::error::{Result, StrideError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One column of a schema: name, declared type and optional default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub prop_type: PropertyType,
    #[serde(default)]
    pub default: Option<PropertyValue>,
}

/// Ordered field list that decodes a property row. Also answers
/// default-value lookups for fields absent from an encoded row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    fields: Vec<SchemaField>,
}

impl SchemaDescriptor {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn with_field(mut self, name: &str, prop_type: PropertyType) -> Self {
        self.append(name, prop_type, None);
        self
    }

    pub fn with_default(
        mut self,
        name: &str,
        prop_type: PropertyType,
        default: PropertyValue,
    ) -> Self {
        self.append(name, prop_type, Some(default));
        self
    }

    pub fn append(&mut self, name: &str, prop_type: PropertyType, default: Option<PropertyValue>) {
        self.fields.push(SchemaField {
            name: name.to_string(),
            prop_type,
            default,
        });
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Declared type of a field, `Unknown` when the field does not exist.
    pub fn field_type(&self, name: &str) -> PropertyType {
        self.field_index(name)
            .map(|i| self.fields[i].prop_type)
            .unwrap_or(PropertyType::Unknown)
    }

    /// Default for a field: the explicit default when declared, otherwise the
    /// zero value of the declared type.
    pub fn default_value(&self, name: &str) -> Result<PropertyValue> {
        let idx = self
            .field_index(name)
            .ok_or_else(|| StrideError::name_not_found("property", name))?;
        let field = &self.fields[idx];
        if let Some(default) = &field.default {
            return Ok(default.clone());
        }
        field
            .prop_type
            .zero_value()
            .ok_or_else(|| StrideError::Internal(format!("no default for field `{}'", name)))
    }
}

/// Read-only schema lookup consumed by the executor. Implementations cache
/// whatever they need; every method is synchronous.
pub trait SchemaManager: Send + Sync {
    fn tag_id(&self, space: SpaceId, name: &str) -> Result<TagId>;
    fn edge_type(&self, space: SpaceId, name: &str) -> Result<EdgeType>;
    fn edge_name(&self, space: SpaceId, edge_type: EdgeType) -> Result<String>;
    /// All edge names of a space, in definition order.
    fn all_edges(&self, space: SpaceId) -> Result<Vec<String>>;
    fn tag_schema(&self, space: SpaceId, tag: TagId) -> Result<Arc<SchemaDescriptor>>;
    /// Schema of the logical (positive) edge type.
    fn edge_schema(&self, space: SpaceId, edge_type: EdgeType) -> Result<Arc<SchemaDescriptor>>;
}

/// In-memory schema for a single space. Backs tests and embedded use; a
/// meta-service-backed implementation satisfies the same trait in a full
/// deployment.
#[derive(Debug, Default)]
pub struct SpaceSchema {
    space: SpaceId,
    tags: HashMap<String, (TagId, Arc<SchemaDescriptor>)>,
    tags_by_id: HashMap<TagId, Arc<SchemaDescriptor>>,
    edges: HashMap<String, (EdgeType, Arc<SchemaDescriptor>)>,
    edges_by_type: HashMap<EdgeType, (String, Arc<SchemaDescriptor>)>,
    edge_order: Vec<String>,
    next_tag: TagId,
    next_edge: EdgeType,
}

impl SpaceSchema {
    pub fn new(space: SpaceId) -> Self {
        Self {
            space,
            next_tag: 1,
            next_edge: 1,
            ..Default::default()
        }
    }

    pub fn space(&self) -> SpaceId {
        self.space
    }

    pub fn add_tag(&mut self, name: &str, schema: SchemaDescriptor) -> TagId {
        let id = self.next_tag;
        self.next_tag += 1;
        let schema = Arc::new(schema);
        self.tags.insert(name.to_string(), (id, schema.clone()));
        self.tags_by_id.insert(id, schema);
        id
    }

    pub fn add_edge(&mut self, name: &str, schema: SchemaDescriptor) -> EdgeType {
        let ty = self.next_edge;
        self.next_edge += 1;
        let schema = Arc::new(schema);
        self.edges.insert(name.to_string(), (ty, schema.clone()));
        self.edges_by_type
            .insert(ty, (name.to_string(), schema));
        self.edge_order.push(name.to_string());
        ty
    }

    fn check_space(&self, space: SpaceId) -> Result<()> {
        if space != self.space {
            return Err(StrideError::name_not_found("space", space.to_string()));
        }
        Ok(())
    }
}

impl SchemaManager for SpaceSchema {
    fn tag_id(&self, space: SpaceId, name: &str) -> Result<TagId> {
        self.check_space(space)?;
        self.tags
            .get(name)
            .map(|(id, _)| *id)
            .ok_or_else(|| StrideError::name_not_found("tag", name))
    }

    fn edge_type(&self, space: SpaceId, name: &str) -> Result<EdgeType> {
        self.check_space(space)?;
        self.edges
            .get(name)
            .map(|(ty, _)| *ty)
            .ok_or_else(|| StrideError::name_not_found("edge", name))
    }

    fn edge_name(&self, space: SpaceId, edge_type: EdgeType) -> Result<String> {
        self.check_space(space)?;
        self.edges_by_type
            .get(&edge_type.abs())
            .map(|(name, _)| name.clone())
            .ok_or_else(|| StrideError::name_not_found("edge", edge_type.to_string()))
    }

    fn all_edges(&self, space: SpaceId) -> Result<Vec<String>> {
        self.check_space(space)?;
        Ok(self.edge_order.clone())
    }

    fn tag_schema(&self, space: SpaceId, tag: TagId) -> Result<Arc<SchemaDescriptor>> {
        self.check_space(space)?;
        self.tags_by_id
            .get(&tag)
            .cloned()
            .ok_or_else(|| StrideError::name_not_found("tag", tag.to_string()))
    }

    fn edge_schema(&self, space: SpaceId, edge_type: EdgeType) -> Result<Arc<SchemaDescriptor>> {
        self.check_space(space)?;
        self.edges_by_type
            .get(&edge_type.abs())
            .map(|(_, s)| s.clone())
            .ok_or_else(|| StrideError::name_not_found("edge", edge_type.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> SchemaDescriptor {
        SchemaDescriptor::new()
            .with_default("name", PropertyType::String, PropertyValue::Str("".into()))
            .with_field("age", PropertyType::Int)
    }

    #[test]
    fn test_default_value_fallback() {
        let schema = person();
        assert_eq!(
            schema.default_value("name").unwrap(),
            PropertyValue::Str("".into())
        );
        // No explicit default: zero of the declared type.
        assert_eq!(schema.default_value("age").unwrap(), PropertyValue::Int(0));
        assert!(matches!(
            schema.default_value("missing"),
            Err(StrideError::NameNotFound { .. })
        ));
    }

    #[test]
    fn test_space_schema_lookup() {
        let mut space = SpaceSchema::new(1);
        let tag = space.add_tag("person", person());
        let follow = space.add_edge("follow", SchemaDescriptor::new());
        let serve = space.add_edge("serve", SchemaDescriptor::new());

        assert_eq!(space.tag_id(1, "person").unwrap(), tag);
        assert_eq!(space.edge_type(1, "follow").unwrap(), follow);
        assert_eq!(space.edge_name(1, -serve).unwrap(), "serve");
        assert_eq!(space.all_edges(1).unwrap(), vec!["follow", "serve"]);
        assert!(space.tag_id(2, "person").is_err());
        assert!(space.edge_type(1, "likes").is_err());
    }
}
