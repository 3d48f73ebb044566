// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

pub mod ast;
pub mod context;
pub mod exec;
pub mod holders;
pub mod interim;
pub mod response;
pub mod typing;

// Re-exports for convenience
pub use ast::{
    FromClause, OverClause, OverEdge, OverEdges, StepClause, TraverseQuery, YieldClause,
    YieldColumn,
};
pub use exec::{EmitMode, TraverseExecutor, TraverseOutput};
pub use interim::{InterimResult, RowIndex, VariableHolder};
pub use response::{ColumnValue, ExecutionResponse, Row};
pub use typing::calculate_expr_type;
