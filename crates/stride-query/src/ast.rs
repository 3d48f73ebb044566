// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

//! The query tree the executor receives. Parsing and semantic analysis
//! happen upstream; names are still unresolved here.

use stride_common::expr::Expr;

/// Hop count clause. `upto` marks the bounded variant, which the executor
/// rejects.
#[derive(Clone, Debug, PartialEq)]
pub struct StepClause {
    pub steps: u32,
    pub upto: bool,
}

impl Default for StepClause {
    fn default() -> Self {
        Self {
            steps: 1,
            upto: false,
        }
    }
}

/// Where the start set comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum FromClause {
    /// Literal id expressions, including `near(...)` geo expansion.
    Instant(Vec<Expr>),
    /// A column of the previous pipeline stage (`$-.column`).
    Pipe { column: String },
    /// A column of a named variable (`$var.column`).
    Variable { var: String, column: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverEdge {
    pub name: String,
    pub alias: Option<String>,
}

impl OverEdge {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum OverEdges {
    /// `OVER *`: every edge type of the space.
    All,
    Edges(Vec<OverEdge>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverClause {
    pub edges: OverEdges,
    pub reversely: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct YieldColumn {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl YieldColumn {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn named(expr: Expr, alias: &str) -> Self {
        Self {
            expr,
            alias: Some(alias.to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct YieldClause {
    pub columns: Vec<YieldColumn>,
    pub distinct: bool,
}

/// A whole traversal statement.
#[derive(Clone, Debug, PartialEq)]
pub struct TraverseQuery {
    pub step: StepClause,
    pub from: FromClause,
    pub over: OverClause,
    pub filter: Option<Expr>,
    pub yield_clause: Option<YieldClause>,
}
