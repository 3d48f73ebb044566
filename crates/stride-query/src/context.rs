// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

//! Per-query bookkeeping of every property an expression tree touches,
//! bucketed by source. Filled during preparation, consulted when building
//! storage requests and when gating push-down and DISTINCT decisions.

use fxhash::{FxHashMap, FxHashSet};
use stride_common::core::ids::{EdgeType, TagId};
use stride_common::expr::Expr;
use stride_store::wire::meta;

#[derive(Debug, Default)]
pub struct ExpressionContext {
    src_tag_props: Vec<(String, String)>,
    dst_tag_props: Vec<(String, String)>,
    alias_props: Vec<(String, String)>,
    input_props: Vec<String>,
    variable_props: Vec<(String, String)>,
    edge_map: FxHashMap<String, EdgeType>,
    tag_map: FxHashMap<String, TagId>,
    over_all_edge: bool,
}

fn push_unique(bucket: &mut Vec<(String, String)>, a: &str, b: &str) {
    if !bucket.iter().any(|(x, y)| x == a && y == b) {
        bucket.push((a.to_string(), b.to_string()));
    }
}

impl ExpressionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an edge alias. Returns false on a duplicate.
    pub fn add_edge(&mut self, alias: &str, edge_type: EdgeType) -> bool {
        if self.edge_map.contains_key(alias) {
            return false;
        }
        self.edge_map.insert(alias.to_string(), edge_type);
        true
    }

    /// The signed type an alias was registered with.
    pub fn edge_type(&self, alias: &str) -> Option<EdgeType> {
        self.edge_map.get(alias).copied()
    }

    pub fn set_over_all(&mut self) {
        self.over_all_edge = true;
    }

    pub fn is_over_all(&self) -> bool {
        self.over_all_edge
    }

    pub fn set_tag_id(&mut self, tag: &str, id: TagId) {
        self.tag_map.insert(tag.to_string(), id);
    }

    pub fn tag_id(&self, tag: &str) -> Option<TagId> {
        self.tag_map.get(tag).copied()
    }

    /// Every tag name referenced by a source- or destination-tag property.
    pub fn tag_names(&self) -> Vec<String> {
        let mut seen = FxHashSet::default();
        let mut names = Vec::new();
        for (tag, _) in self.src_tag_props.iter().chain(&self.dst_tag_props) {
            if seen.insert(tag.clone()) {
                names.push(tag.clone());
            }
        }
        names
    }

    /// Walk an expression and record every property reference.
    pub fn collect(&mut self, expr: &Expr) {
        match expr {
            Expr::SrcProp { tag, prop } => push_unique(&mut self.src_tag_props, tag, prop),
            Expr::DstProp { tag, prop } => push_unique(&mut self.dst_tag_props, tag, prop),
            Expr::AliasProp { edge, prop } => push_unique(&mut self.alias_props, edge, prop),
            // Rank must travel in the edge row; dst/src/type are answered
            // straight from the record.
            Expr::EdgeRank { edge } => push_unique(&mut self.alias_props, edge, meta::RANK),
            Expr::EdgeDstId { .. } | Expr::EdgeSrcId { .. } | Expr::EdgeTypeOf { .. } => {}
            Expr::InputProp { prop } => {
                if !self.input_props.iter().any(|p| p == prop) {
                    self.input_props.push(prop.clone());
                }
            }
            Expr::VariableProp { var, prop } => {
                push_unique(&mut self.variable_props, var, prop)
            }
            Expr::Literal(_) => {}
            Expr::FunctionCall { args, .. } => {
                for arg in args {
                    self.collect(arg);
                }
            }
            Expr::TypeCast { expr, .. } | Expr::Unary { expr, .. } => self.collect(expr),
            Expr::Binary { left, right, .. } => {
                self.collect(left);
                self.collect(right);
            }
        }
    }

    pub fn src_tag_props(&self) -> &[(String, String)] {
        &self.src_tag_props
    }

    pub fn dst_tag_props(&self) -> &[(String, String)] {
        &self.dst_tag_props
    }

    pub fn alias_props(&self) -> &[(String, String)] {
        &self.alias_props
    }

    pub fn has_src_tag_prop(&self) -> bool {
        !self.src_tag_props.is_empty()
    }

    pub fn has_dst_tag_prop(&self) -> bool {
        !self.dst_tag_props.is_empty()
    }

    pub fn has_edge_prop(&self) -> bool {
        !self.alias_props.is_empty()
    }

    pub fn has_input_prop(&self) -> bool {
        !self.input_props.is_empty()
    }

    pub fn has_variable_prop(&self) -> bool {
        !self.variable_props.is_empty()
    }

    /// Distinct variable names referenced through `$var.prop`.
    pub fn variables(&self) -> Vec<String> {
        let mut seen = FxHashSet::default();
        let mut names = Vec::new();
        for (var, _) in &self.variable_props {
            if seen.insert(var.clone()) {
                names.push(var.clone());
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stride_common::expr::BinaryOp;

    #[test]
    fn test_collect_buckets() {
        let mut ctx = ExpressionContext::new();
        let e = Expr::binary(
            Expr::src_prop("person", "age"),
            BinaryOp::Gt,
            Expr::alias_prop("follow", "since"),
        );
        ctx.collect(&e);
        ctx.collect(&Expr::dst_prop("person", "name"));
        ctx.collect(&Expr::input_prop("age"));
        ctx.collect(&Expr::input_prop("age")); // deduped

        assert_eq!(ctx.src_tag_props(), &[("person".into(), "age".into())]);
        assert_eq!(ctx.alias_props(), &[("follow".into(), "since".into())]);
        assert!(ctx.has_dst_tag_prop());
        assert_eq!(ctx.input_props.len(), 1);
        assert_eq!(ctx.tag_names(), vec!["person"]);
    }

    #[test]
    fn test_edge_meta_collection() {
        let mut ctx = ExpressionContext::new();
        ctx.collect(&Expr::edge_dst_id("follow"));
        assert!(!ctx.has_edge_prop());

        ctx.collect(&Expr::EdgeRank {
            edge: "follow".into(),
        });
        assert_eq!(ctx.alias_props(), &[("follow".into(), meta::RANK.into())]);
    }

    #[test]
    fn test_duplicate_alias() {
        let mut ctx = ExpressionContext::new();
        assert!(ctx.add_edge("follow", 1));
        assert!(!ctx.add_edge("follow", 2));
        assert_eq!(ctx.edge_type("follow"), Some(1));
    }
}
