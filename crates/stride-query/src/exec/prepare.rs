// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

//! Clause preparation: synchronous, deterministic, and fatal on error. No
//! storage request is issued before every clause has been resolved.

use super::{FromMode, TraverseExecutor};
use crate::ast::{FromClause, OverEdges, YieldColumn};
use crate::holders::{BackTracker, EdgeHolder};
use stride_common::error::{Result, StrideError};
use stride_common::expr::{Expr, NullContext};
use tracing::debug;

/// Aggregates are only legal under GROUP BY, which this executor does not
/// implement.
fn is_aggregate(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "count" | "sum" | "avg" | "max" | "min" | "std" | "collect" | "bit_and" | "bit_or"
            | "bit_xor"
    )
}

/// A predicate can run remotely only if every reference is resolvable at
/// the storage tier: destination, pipeline and variable properties are not.
fn can_push_down(expr: &Expr) -> bool {
    match expr {
        Expr::DstProp { .. } | Expr::InputProp { .. } | Expr::VariableProp { .. } => false,
        Expr::Literal(_)
        | Expr::SrcProp { .. }
        | Expr::AliasProp { .. }
        | Expr::EdgeDstId { .. }
        | Expr::EdgeSrcId { .. }
        | Expr::EdgeRank { .. }
        | Expr::EdgeTypeOf { .. } => true,
        Expr::FunctionCall { args, .. } => args.iter().all(can_push_down),
        Expr::TypeCast { expr, .. } | Expr::Unary { expr, .. } => can_push_down(expr),
        Expr::Binary { left, right, .. } => can_push_down(left) && can_push_down(right),
    }
}

impl TraverseExecutor {
    pub(crate) fn prepare_clauses(&mut self) -> Result<()> {
        self.prepare_step()?;
        self.prepare_from()?;
        self.prepare_over()?;
        self.prepare_where()?;
        self.prepare_yield()?;
        self.prepare_needed_props()?;
        self.prepare_distinct()?;
        Ok(())
    }

    fn prepare_step(&mut self) -> Result<()> {
        if self.query.step.upto {
            return Err(StrideError::Unsupported("UPTO".into()));
        }
        if self.query.step.steps == 0 {
            return Err(StrideError::Syntax("step count must be positive".into()));
        }
        self.steps = self.query.step.steps;
        if self.steps != 1 {
            self.back_tracker = Some(BackTracker::new());
        }
        Ok(())
    }

    fn prepare_from(&mut self) -> Result<()> {
        match &self.query.from {
            FromClause::Instant(exprs) => {
                for expr in exprs {
                    let value = expr.eval(&NullContext)?;
                    if let Expr::FunctionCall { name, .. } = expr {
                        if name == "near" {
                            // Geo expansion yields a comma-separated id list.
                            for part in value.as_str()?.split(',') {
                                let part = part.trim();
                                if part.is_empty() {
                                    continue;
                                }
                                let id = part.parse::<i64>().map_err(|_| StrideError::Type {
                                    expected: "integer".into(),
                                    actual: format!("`{}'", part),
                                })?;
                                self.starts.push(id);
                            }
                            continue;
                        }
                    }
                    if !value.is_int() {
                        return Err(StrideError::Type {
                            expected: "integer".into(),
                            actual: value.type_tag().to_string(),
                        });
                    }
                    self.starts.push(value.as_int()?);
                }
                self.from_mode = FromMode::Instant;
            }
            FromClause::Pipe { column } => {
                if column == "*" {
                    return Err(StrideError::Syntax(
                        "can not use `*' to reference a vertex id column".into(),
                    ));
                }
                self.from_mode = FromMode::Pipe {
                    column: column.clone(),
                };
            }
            FromClause::Variable { var, column } => {
                if column == "*" {
                    return Err(StrideError::Syntax(
                        "can not use `*' to reference a vertex id column".into(),
                    ));
                }
                self.from_mode = FromMode::Variable {
                    var: var.clone(),
                    column: column.clone(),
                };
            }
        }
        Ok(())
    }

    fn prepare_over(&mut self) -> Result<()> {
        self.reversely = self.query.over.reversely;
        if self.reversely {
            self.edge_holder = Some(EdgeHolder::new());
        }
        match &self.query.over.edges {
            OverEdges::All => {
                self.ectx.set_over_all();
                for name in self.schema.all_edges(self.space)? {
                    let ty = self.schema.edge_type(self.space, &name)?;
                    let ty = if self.reversely { -ty } else { ty };
                    self.edge_types.push(ty);
                    if !self.ectx.add_edge(&name, ty) {
                        return Err(StrideError::DuplicateAlias(name));
                    }
                }
            }
            OverEdges::Edges(edges) => {
                for edge in edges {
                    let ty = self.schema.edge_type(self.space, &edge.name)?;
                    let ty = if self.reversely { -ty } else { ty };
                    self.edge_types.push(ty);
                    let alias = edge.alias.as_ref().unwrap_or(&edge.name);
                    if !self.ectx.add_edge(alias, ty) {
                        return Err(StrideError::DuplicateAlias(alias.clone()));
                    }
                }
            }
        }
        if self.edge_types.is_empty() {
            return Err(StrideError::Syntax("over clause resolved no edges".into()));
        }
        Ok(())
    }

    fn prepare_where(&mut self) -> Result<()> {
        let Some(filter) = &self.query.filter else {
            return Ok(());
        };
        self.ectx.collect(filter);
        if can_push_down(filter) {
            let repr = serde_json::to_string(filter)
                .map_err(|e| StrideError::Internal(format!("serialize filter: {}", e)))?;
            self.pushdown_repr = Some(repr);
        } else {
            debug!("filter references local-only properties, evaluating locally");
        }
        self.filter = Some(filter.clone());
        Ok(())
    }

    fn prepare_yield(&mut self) -> Result<()> {
        if let Some(clause) = &self.query.yield_clause {
            for col in &clause.columns {
                if let Expr::FunctionCall { name, .. } = &col.expr {
                    if is_aggregate(name) {
                        return Err(StrideError::Syntax(
                            "do not support aggregated query without group by".into(),
                        ));
                    }
                }
            }
            self.distinct = clause.distinct;
            self.yields = clause.columns.clone();
        }

        // `OVER *` with an empty yield list projects each edge's
        // destination id, in schema order. Synthesizing here means the
        // empty-result short-circuits still carry the declared columns.
        if self.ectx.is_over_all() && self.yields.is_empty() {
            for &ty in &self.edge_types {
                let name = self.schema.edge_name(self.space, ty.abs())?;
                self.yields
                    .push(YieldColumn::new(Expr::EdgeDstId { edge: name }));
            }
            self.synthesized_yields = true;
        }
        Ok(())
    }

    fn prepare_needed_props(&mut self) -> Result<()> {
        let Self { ectx, yields, .. } = self;
        for col in yields.iter() {
            ectx.collect(&col.expr);
        }

        if self.ectx.has_variable_prop() {
            let FromMode::Variable { var, .. } = &self.from_mode else {
                return Err(StrideError::Syntax(
                    "a variable must be referred in FROM before used in WHERE or YIELD".into(),
                ));
            };
            let vars = self.ectx.variables();
            if vars.len() > 1 {
                return Err(StrideError::Syntax("only one variable allowed to use".into()));
            }
            if vars[0] != *var {
                return Err(StrideError::Syntax(format!(
                    "variable name not match: `{}' vs. `{}'",
                    vars[0], var
                )));
            }
        }

        if self.ectx.has_input_prop() && !matches!(self.from_mode, FromMode::Pipe { .. }) {
            return Err(StrideError::Syntax(
                "`$-' must be referred in FROM before used in WHERE or YIELD".into(),
            ));
        }

        for tag in self.ectx.tag_names() {
            let id = self
                .schema
                .tag_id(self.space, &tag)
                .map_err(|_| StrideError::name_not_found("tag", tag.clone()))?;
            self.ectx.set_tag_id(&tag, id);
        }
        Ok(())
    }

    fn prepare_distinct(&mut self) -> Result<()> {
        // Push-down is unsafe when destination properties contribute to
        // uniqueness: they are only fetched after the final hop.
        self.distinct_push_down = !((self.ectx.has_src_tag_prop() || self.ectx.has_edge_prop())
            && self.ectx.has_dst_tag_prop());
        Ok(())
    }
}
