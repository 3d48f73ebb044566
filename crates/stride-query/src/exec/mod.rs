// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

//! The traversal executor: a step-driven pipeline of prepare, start
//! resolution, the hop loop, enrichment fetches and row materialization.
//! Each stage is an awaited async fn; accumulators are owned by the
//! executor and only touched between awaits.

mod enrich;
mod materialize;
mod prepare;
mod start;
mod step;

use crate::ast::{TraverseQuery, YieldColumn};
use crate::context::ExpressionContext;
use crate::holders::{BackTracker, EdgeHolder, VertexHolder};
use crate::interim::{InterimResult, RowIndex, VariableHolder};
use crate::response::ExecutionResponse;
use fxhash::FxHashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use stride_common::config::ExecConfig;
use stride_common::core::ids::{EdgeType, SpaceId, VertexId};
use stride_common::core::schema::SchemaManager;
use stride_common::error::{Result, StrideError};
use stride_common::expr::Expr;
use stride_store::client::GraphStorageClient;
use tracing::{debug, error};

/// Whether the result feeds another pipeline stage or leaves the system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitMode {
    Response,
    Interim,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TraverseOutput {
    Response(ExecutionResponse),
    Interim(InterimResult),
}

pub(crate) enum FromMode {
    Instant,
    Pipe { column: String },
    Variable { var: String, column: String },
}

pub struct TraverseExecutor {
    pub(crate) space: SpaceId,
    pub(crate) schema: Arc<dyn SchemaManager>,
    pub(crate) storage: Arc<dyn GraphStorageClient>,
    pub(crate) config: ExecConfig,
    pub(crate) query: TraverseQuery,
    pub(crate) emit: EmitMode,
    pub(crate) inputs: Option<Arc<InterimResult>>,
    pub(crate) variables: Option<Arc<VariableHolder>>,

    // State produced by preparation and mutated across hops.
    pub(crate) ectx: ExpressionContext,
    pub(crate) steps: u32,
    pub(crate) cur_step: u32,
    pub(crate) reversely: bool,
    pub(crate) edge_types: Vec<EdgeType>,
    pub(crate) from_mode: FromMode,
    pub(crate) starts: Vec<VertexId>,
    pub(crate) yields: Vec<YieldColumn>,
    /// Set when `OVER *` with an empty yield list synthesized the
    /// destination-id columns during preparation.
    pub(crate) synthesized_yields: bool,
    pub(crate) distinct: bool,
    pub(crate) distinct_push_down: bool,
    pub(crate) filter: Option<Expr>,
    pub(crate) pushdown_repr: Option<String>,
    pub(crate) filter_pushed: bool,
    pub(crate) back_tracker: Option<BackTracker>,
    pub(crate) vertex_holder: VertexHolder,
    pub(crate) edge_holder: Option<EdgeHolder>,
    pub(crate) row_index: Option<RowIndex>,
    pub(crate) cancelled: AtomicBool,
}

impl TraverseExecutor {
    pub fn new(
        space: SpaceId,
        schema: Arc<dyn SchemaManager>,
        storage: Arc<dyn GraphStorageClient>,
        config: ExecConfig,
        query: TraverseQuery,
    ) -> Self {
        Self {
            space,
            schema,
            storage,
            config,
            query,
            emit: EmitMode::Response,
            inputs: None,
            variables: None,
            ectx: ExpressionContext::new(),
            steps: 1,
            cur_step: 1,
            reversely: false,
            edge_types: Vec::new(),
            from_mode: FromMode::Instant,
            starts: Vec::new(),
            yields: Vec::new(),
            synthesized_yields: false,
            distinct: false,
            distinct_push_down: false,
            filter: None,
            pushdown_repr: None,
            filter_pushed: false,
            back_tracker: None,
            vertex_holder: VertexHolder::new(),
            edge_holder: None,
            row_index: None,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Bind the previous pipeline stage's rows (`$-` references).
    pub fn with_input(mut self, input: Arc<InterimResult>) -> Self {
        self.inputs = Some(input);
        self
    }

    /// Bind the session's named variables (`$var` references).
    pub fn with_variables(mut self, variables: Arc<VariableHolder>) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Emit an [`InterimResult`] for a following stage instead of a terminal
    /// response.
    pub fn emit_interim(mut self) -> Self {
        self.emit = EmitMode::Interim;
        self
    }

    pub async fn execute(mut self) -> Result<TraverseOutput> {
        debug!(
            steps = self.query.step.steps,
            reversely = self.query.over.reversely,
            "executing traversal"
        );
        self.prepare_clauses().map_err(|e| self.fail(e))?;
        debug!(
            edge_types = self.edge_types.len(),
            distinct = self.distinct,
            distinct_push_down = self.distinct_push_down,
            "clauses prepared"
        );
        self.setup_starts().map_err(|e| self.fail(e))?;
        if self.starts.is_empty() {
            return Ok(self.empty_output());
        }
        if self.distinct {
            let mut seen = FxHashSet::default();
            self.starts.retain(|id| seen.insert(*id));
        }

        let Some(final_resp) = self.run_steps().await? else {
            return Ok(self.empty_output());
        };
        if !self.enrich(&final_resp).await? {
            return Ok(self.empty_output());
        }
        self.finish(final_resp)
    }

    /// Marks the chain failed. Continuations observe the flag through
    /// [`Self::check_cancelled`] and return early instead of issuing
    /// further requests.
    pub(crate) fn fail(&self, e: StrideError) -> StrideError {
        self.cancelled.store(true, Ordering::Release);
        error!(error = %e, "traversal failed");
        e
    }

    pub(crate) fn check_cancelled(&self) -> Result<()> {
        if self.cancelled.load(Ordering::Acquire) {
            return Err(StrideError::Internal("query cancelled".into()));
        }
        Ok(())
    }

    pub(crate) fn result_column_names(&self) -> Vec<String> {
        self.yields
            .iter()
            .map(|col| {
                col.alias
                    .clone()
                    .unwrap_or_else(|| col.expr.to_string())
            })
            .collect()
    }

    /// Empty result carrying the declared column schema. No RPC required.
    pub(crate) fn empty_output(&self) -> TraverseOutput {
        let names = self.result_column_names();
        match self.emit {
            EmitMode::Interim => TraverseOutput::Interim(InterimResult::new(names)),
            EmitMode::Response => TraverseOutput::Response(ExecutionResponse {
                column_names: names,
                rows: Vec::new(),
            }),
        }
    }
}
