// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

//! Start-set resolution: literal ids win, otherwise the named variable or
//! the inbound pipeline rows supply the frontier and the root-keyed index.

use super::{FromMode, TraverseExecutor};
use stride_common::error::{Result, StrideError};

impl TraverseExecutor {
    pub(crate) fn setup_starts(&mut self) -> Result<()> {
        if !self.starts.is_empty() {
            return Ok(());
        }
        let (inputs, column) = match &self.from_mode {
            FromMode::Instant => return Ok(()),
            FromMode::Pipe { column } => (self.inputs.clone(), column.clone()),
            FromMode::Variable { var, column } => {
                let result = self
                    .variables
                    .as_ref()
                    .and_then(|holder| holder.get(var))
                    .ok_or_else(|| StrideError::name_not_found("variable", var.clone()))?;
                (Some(result), column.clone())
            }
        };

        // Empty input is not an error: the query finishes with an empty,
        // correctly-shaped result and no storage request.
        let Some(inputs) = inputs else {
            return Ok(());
        };
        if !inputs.has_data() {
            return Ok(());
        }

        self.starts = inputs.vids(&column)?;
        self.row_index = Some(inputs.build_index(&column)?);
        Ok(())
    }
}
