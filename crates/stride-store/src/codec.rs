// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

//! Binary row codec. A row is the bincode framing of its values in schema
//! field order; the schema is carried out of band and supplies defaults for
//! fields a (shorter, older) row does not contain.

use std::sync::Arc;
use stride_common::core::schema::SchemaDescriptor;
use stride_common::core::value::PropertyValue;
use stride_common::error::{Result, StrideError};

/// Encode `values` against `schema`, validating arity and types.
pub fn encode_row(schema: &SchemaDescriptor, values: &[PropertyValue]) -> Result<Vec<u8>> {
    if values.len() != schema.num_fields() {
        return Err(StrideError::Internal(format!(
            "row arity {} does not match schema arity {}",
            values.len(),
            schema.num_fields()
        )));
    }
    for (field, value) in schema.fields().iter().zip(values) {
        if !field.prop_type.admits(value) {
            return Err(StrideError::Type {
                expected: field.prop_type.to_string(),
                actual: value.type_tag().to_string(),
            });
        }
    }
    bincode::serialize(values).map_err(|e| StrideError::Internal(format!("row encode: {}", e)))
}

/// Decoded view of one property row.
pub struct RowReader {
    schema: Arc<SchemaDescriptor>,
    values: Vec<PropertyValue>,
}

impl RowReader {
    pub fn decode(schema: Arc<SchemaDescriptor>, bytes: &[u8]) -> Result<Self> {
        let values: Vec<PropertyValue> = bincode::deserialize(bytes)
            .map_err(|e| StrideError::Remote(format!("malformed row: {}", e)))?;
        if values.len() > schema.num_fields() {
            return Err(StrideError::Remote(format!(
                "row carries {} values but schema has {} fields",
                values.len(),
                schema.num_fields()
            )));
        }
        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> &Arc<SchemaDescriptor> {
        &self.schema
    }

    /// Value of a field by name. Fields beyond the encoded row fall back to
    /// the schema default; unknown names are an error.
    pub fn prop(&self, name: &str) -> Result<PropertyValue> {
        match self.schema.field_index(name) {
            Some(idx) if idx < self.values.len() => Ok(self.values[idx].clone()),
            Some(_) => self.schema.default_value(name),
            None => Err(StrideError::name_not_found("property", name)),
        }
    }

    pub fn values(&self) -> &[PropertyValue] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stride_common::core::value::PropertyType;

    fn schema() -> Arc<SchemaDescriptor> {
        Arc::new(
            SchemaDescriptor::new()
                .with_field("since", PropertyType::Int)
                .with_default("note", PropertyType::String, PropertyValue::Str("-".into())),
        )
    }

    #[test]
    fn test_encode_decode() {
        let s = schema();
        let bytes =
            encode_row(&s, &[PropertyValue::Int(2020), PropertyValue::Str("x".into())]).unwrap();
        let reader = RowReader::decode(s, &bytes).unwrap();
        assert_eq!(reader.prop("since").unwrap(), PropertyValue::Int(2020));
        assert_eq!(reader.prop("note").unwrap(), PropertyValue::Str("x".into()));
        assert!(reader.prop("nope").is_err());
    }

    #[test]
    fn test_short_row_uses_defaults() {
        let s = schema();
        // A row encoded before `note` was added to the schema.
        let old = Arc::new(SchemaDescriptor::new().with_field("since", PropertyType::Int));
        let bytes = encode_row(&old, &[PropertyValue::Int(1999)]).unwrap();
        let reader = RowReader::decode(s, &bytes).unwrap();
        assert_eq!(reader.prop("since").unwrap(), PropertyValue::Int(1999));
        assert_eq!(reader.prop("note").unwrap(), PropertyValue::Str("-".into()));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let s = schema();
        let res = encode_row(
            &s,
            &[PropertyValue::Str("2020".into()), PropertyValue::Str("x".into())],
        );
        assert!(matches!(res, Err(StrideError::Type { .. })));
    }
}
