// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
#[non_exhaustive]
pub enum StrideError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("`{0}' not supported yet")]
    Unsupported(String),

    /// Unknown tag, edge, variable or column.
    #[error("{kind} `{name}' not found")]
    NameNotFound { kind: &'static str, name: String },

    #[error("type error: expected {expected}, got {actual}")]
    Type { expected: String, actual: String },

    #[error("edge alias `{0}' was dup")]
    DuplicateAlias(String),

    /// Evaluation failure in a filter or yield expression.
    #[error("expression error: {0}")]
    Expression(String),

    /// RPC exception, zero completeness or malformed remote record.
    #[error("remote error: {0}")]
    Remote(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl StrideError {
    pub fn name_not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NameNotFound {
            kind,
            name: name.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StrideError>;
