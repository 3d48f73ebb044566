// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

//! Static type inference for yield expressions.

use crate::interim::RowIndex;
use stride_common::core::ids::SpaceId;
use stride_common::core::schema::SchemaManager;
use stride_common::core::value::PropertyType;
use stride_common::expr::Expr;

/// Infer the column type of an expression. `Unknown` is a legitimate answer
/// and makes the response writer fall back to the runtime tag.
pub fn calculate_expr_type(
    expr: &Expr,
    schema: &dyn SchemaManager,
    space: SpaceId,
    input_index: Option<&RowIndex>,
) -> PropertyType {
    match expr {
        Expr::Literal(_) | Expr::FunctionCall { .. } | Expr::Unary { .. } => PropertyType::Unknown,
        Expr::TypeCast { target, .. } => *target,
        Expr::Binary { op, .. } => {
            if op.is_relational() || op.is_logical() {
                PropertyType::Bool
            } else {
                PropertyType::Unknown
            }
        }
        Expr::SrcProp { tag, prop } | Expr::DstProp { tag, prop } => schema
            .tag_id(space, tag)
            .and_then(|id| schema.tag_schema(space, id))
            .map(|s| s.field_type(prop))
            .unwrap_or(PropertyType::Unknown),
        Expr::EdgeDstId { .. } | Expr::EdgeSrcId { .. } => PropertyType::Vid,
        Expr::EdgeRank { .. } | Expr::EdgeTypeOf { .. } => PropertyType::Int,
        Expr::AliasProp { edge, prop } => schema
            .edge_type(space, edge)
            .and_then(|ty| schema.edge_schema(space, ty.abs()))
            .map(|s| s.field_type(prop))
            .unwrap_or(PropertyType::Unknown),
        Expr::InputProp { prop } | Expr::VariableProp { prop, .. } => input_index
            .map(|index| index.column_type(prop))
            .unwrap_or(PropertyType::Unknown),
    }
}
