// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

pub mod config;
pub mod error;
pub mod expr;

pub mod core {
    pub mod ids;
    pub mod schema;
    pub mod value;
}

// Re-exports for convenience
pub use config::ExecConfig;
pub use core::ids::{EdgeRanking, EdgeType, SpaceId, TagId, VertexId};
pub use core::schema::{SchemaDescriptor, SchemaField, SchemaManager, SpaceSchema};
pub use core::value::{PropertyType, PropertyValue};
pub use error::{Result, StrideError};
pub use expr::{BinaryOp, EvalContext, Expr, UnaryOp};
