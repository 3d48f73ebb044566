// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

//! Typed row sets passed between pipeline stages, and the id-keyed index
//! that lets later hops resolve `$-.x` / `$var.x` against their root row.

use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use stride_common::core::ids::VertexId;
use stride_common::core::value::{PropertyType, PropertyValue};
use stride_common::error::{Result, StrideError};

#[derive(Clone, Debug, PartialEq)]
pub struct InterimResult {
    column_names: Vec<String>,
    column_types: Vec<PropertyType>,
    rows: Vec<Vec<PropertyValue>>,
}

impl InterimResult {
    pub fn new(column_names: Vec<String>) -> Self {
        let column_types = vec![PropertyType::Unknown; column_names.len()];
        Self {
            column_names,
            column_types,
            rows: Vec::new(),
        }
    }

    pub fn with_types(column_names: Vec<String>, column_types: Vec<PropertyType>) -> Self {
        Self {
            column_names,
            column_types,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<PropertyValue>) {
        self.rows.push(row);
    }

    pub fn has_data(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn column_types(&self) -> &[PropertyType] {
        &self.column_types
    }

    pub fn rows(&self) -> &[Vec<PropertyValue>] {
        &self.rows
    }

    fn column_index(&self, column: &str) -> Result<usize> {
        self.column_names
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| StrideError::name_not_found("column", column))
    }

    /// Read one column as vertex ids. Every value must be an integer.
    pub fn vids(&self, column: &str) -> Result<Vec<VertexId>> {
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .map(|row| {
                row[idx].as_int().map_err(|_| StrideError::Type {
                    expected: "integer".into(),
                    actual: row[idx].type_tag().to_string(),
                })
            })
            .collect()
    }

    /// Index rows by the id in `column` so a row can be recovered from its
    /// root vertex id later. The first row wins on duplicate ids.
    pub fn build_index(&self, column: &str) -> Result<RowIndex> {
        let idx = self.column_index(column)?;
        let mut by_vid: FxHashMap<VertexId, Vec<PropertyValue>> = FxHashMap::default();
        for row in &self.rows {
            let vid = row[idx].as_int()?;
            by_vid.entry(vid).or_insert_with(|| row.clone());
        }
        let col_index = self
            .column_names
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Ok(RowIndex {
            col_index,
            col_types: self.column_types.clone(),
            by_vid,
        })
    }
}

/// Column-addressable view of inbound rows, keyed by root vertex id.
#[derive(Debug)]
pub struct RowIndex {
    col_index: FxHashMap<String, usize>,
    col_types: Vec<PropertyType>,
    by_vid: FxHashMap<VertexId, Vec<PropertyValue>>,
}

impl RowIndex {
    pub fn column_with_vid(&self, vid: VertexId, column: &str) -> Result<PropertyValue> {
        let idx = *self
            .col_index
            .get(column)
            .ok_or_else(|| StrideError::name_not_found("column", column))?;
        let row = self.by_vid.get(&vid).ok_or_else(|| {
            StrideError::Expression(format!("no input row for vertex {}", vid))
        })?;
        Ok(row[idx].clone())
    }

    pub fn column_type(&self, column: &str) -> PropertyType {
        self.col_index
            .get(column)
            .map(|i| self.col_types[*i])
            .unwrap_or(PropertyType::Unknown)
    }
}

/// Named results of earlier statements, shared across a session.
#[derive(Debug, Default)]
pub struct VariableHolder {
    vars: RwLock<FxHashMap<String, Arc<InterimResult>>>,
}

impl VariableHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: &str, result: Arc<InterimResult>) {
        self.vars.write().insert(name.to_string(), result);
    }

    pub fn get(&self, name: &str) -> Option<Arc<InterimResult>> {
        self.vars.read().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InterimResult {
        let mut r = InterimResult::with_types(
            vec!["vid".into(), "age".into()],
            vec![PropertyType::Vid, PropertyType::Int],
        );
        r.push_row(vec![PropertyValue::Int(1), PropertyValue::Int(30)]);
        r.push_row(vec![PropertyValue::Int(2), PropertyValue::Int(40)]);
        r
    }

    #[test]
    fn test_vids() {
        let r = sample();
        assert_eq!(r.vids("vid").unwrap(), vec![1, 2]);
        assert!(r.vids("nope").is_err());
    }

    #[test]
    fn test_vids_type_error() {
        let mut r = InterimResult::new(vec!["vid".into()]);
        r.push_row(vec![PropertyValue::Str("1".into())]);
        assert!(matches!(r.vids("vid"), Err(StrideError::Type { .. })));
    }

    #[test]
    fn test_index_lookup() {
        let index = sample().build_index("vid").unwrap();
        assert_eq!(
            index.column_with_vid(2, "age").unwrap(),
            PropertyValue::Int(40)
        );
        assert_eq!(index.column_type("age"), PropertyType::Int);
        assert!(index.column_with_vid(9, "age").is_err());
        assert!(index.column_with_vid(1, "nope").is_err());
    }

    #[test]
    fn test_variable_holder() {
        let holder = VariableHolder::new();
        assert!(holder.get("a").is_none());
        holder.set("a", Arc::new(sample()));
        assert!(holder.get("a").unwrap().has_data());
    }
}
