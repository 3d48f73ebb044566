// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

//! Terminal query output with statically typed columns.

use stride_common::core::value::{PropertyType, PropertyValue};

#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ColumnValue {
    Bool(bool),
    Integer(i64),
    Id(i64),
    SinglePrecision(f32),
    DoublePrecision(f64),
    Str(String),
    Timestamp(i64),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    pub columns: Vec<ColumnValue>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionResponse {
    pub column_names: Vec<String>,
    pub rows: Vec<Row>,
}

/// Place a runtime value into the typed column slot inferred for its
/// expression. When inference said `Unknown` (or the value disagrees with
/// the inferred type), the value's runtime tag decides.
pub fn column_value(static_type: PropertyType, value: &PropertyValue) -> ColumnValue {
    match (static_type, value) {
        (PropertyType::Bool, PropertyValue::Bool(b)) => ColumnValue::Bool(*b),
        (PropertyType::Int, PropertyValue::Int(i)) => ColumnValue::Integer(*i),
        (PropertyType::Vid, PropertyValue::Int(i)) => ColumnValue::Id(*i),
        (PropertyType::Timestamp, PropertyValue::Int(i)) => ColumnValue::Timestamp(*i),
        (PropertyType::Float, PropertyValue::Double(d)) => ColumnValue::SinglePrecision(*d as f32),
        (PropertyType::Float, PropertyValue::Int(i)) => ColumnValue::SinglePrecision(*i as f32),
        (PropertyType::Double, PropertyValue::Double(d)) => ColumnValue::DoublePrecision(*d),
        (PropertyType::Double, PropertyValue::Int(i)) => ColumnValue::DoublePrecision(*i as f64),
        (PropertyType::String, PropertyValue::Str(s)) => ColumnValue::Str(s.clone()),
        // Runtime-tag fallback.
        (_, PropertyValue::Bool(b)) => ColumnValue::Bool(*b),
        (_, PropertyValue::Int(i)) => ColumnValue::Integer(*i),
        (_, PropertyValue::Double(d)) => ColumnValue::DoublePrecision(*d),
        (_, PropertyValue::Str(s)) => ColumnValue::Str(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_typing() {
        assert_eq!(
            column_value(PropertyType::Vid, &PropertyValue::Int(7)),
            ColumnValue::Id(7)
        );
        assert_eq!(
            column_value(PropertyType::Timestamp, &PropertyValue::Int(1)),
            ColumnValue::Timestamp(1)
        );
        assert_eq!(
            column_value(PropertyType::Float, &PropertyValue::Double(1.5)),
            ColumnValue::SinglePrecision(1.5)
        );
    }

    #[test]
    fn test_runtime_fallback() {
        assert_eq!(
            column_value(PropertyType::Unknown, &PropertyValue::Int(7)),
            ColumnValue::Integer(7)
        );
        // Inference disagreed with the runtime value: the value wins.
        assert_eq!(
            column_value(PropertyType::Int, &PropertyValue::Str("x".into())),
            ColumnValue::Str("x".into())
        );
    }
}
