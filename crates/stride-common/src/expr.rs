// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

//! Expression tree shared by the executor and the storage tier.
//!
//! The tree is what travels in a push-down filter (serde-serialized), so it
//! lives here rather than in the query crate: the storage side deserializes
//! and evaluates it against its own [`EvalContext`].

use crate::core::value::{PropertyType, PropertyValue};
use crate::error::{Result, StrideError};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// A prepared expression as handed to the executor. Property references are
/// already split by source: source tag (`$^.tag.prop`), destination tag
/// (`$$.tag.prop`), edge alias (`edge.prop`), pipeline input (`$-.prop`) and
/// named variable (`$var.prop`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(PropertyValue),
    SrcProp { tag: String, prop: String },
    DstProp { tag: String, prop: String },
    AliasProp { edge: String, prop: String },
    InputProp { prop: String },
    VariableProp { var: String, prop: String },
    EdgeDstId { edge: String },
    EdgeSrcId { edge: String },
    EdgeRank { edge: String },
    EdgeTypeOf { edge: String },
    FunctionCall { name: String, args: Vec<Expr> },
    TypeCast { target: PropertyType, expr: Box<Expr> },
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary { left: Box<Expr>, op: BinaryOp, right: Box<Expr> },
}

/// Uniform lookup surface for the heterogeneous property sources an
/// expression can touch. Every method defaults to "not available here";
/// contexts override what they can serve.
pub trait EvalContext {
    fn edge_dst_id(&self, edge: &str) -> Result<PropertyValue> {
        Err(unavailable("edge", edge))
    }
    fn edge_src_id(&self, edge: &str) -> Result<PropertyValue> {
        Err(unavailable("edge", edge))
    }
    fn edge_rank(&self, edge: &str) -> Result<PropertyValue> {
        Err(unavailable("edge", edge))
    }
    fn edge_type_of(&self, edge: &str) -> Result<PropertyValue> {
        Err(unavailable("edge", edge))
    }
    fn src_tag_prop(&self, tag: &str, prop: &str) -> Result<PropertyValue> {
        Err(unavailable(tag, prop))
    }
    fn dst_tag_prop(&self, tag: &str, prop: &str) -> Result<PropertyValue> {
        Err(unavailable(tag, prop))
    }
    fn alias_prop(&self, edge: &str, prop: &str) -> Result<PropertyValue> {
        Err(unavailable(edge, prop))
    }
    fn input_prop(&self, prop: &str) -> Result<PropertyValue> {
        Err(unavailable("$-", prop))
    }
    fn variable_prop(&self, var: &str, prop: &str) -> Result<PropertyValue> {
        Err(unavailable(var, prop))
    }
}

fn unavailable(scope: &str, name: &str) -> StrideError {
    StrideError::Expression(format!(
        "`{}.{}' not available in this context",
        scope, name
    ))
}

/// Context with no property sources at all; literal-only evaluation.
pub struct NullContext;

impl EvalContext for NullContext {}

impl Expr {
    pub fn eval(&self, ctx: &dyn EvalContext) -> Result<PropertyValue> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::SrcProp { tag, prop } => ctx.src_tag_prop(tag, prop),
            Expr::DstProp { tag, prop } => ctx.dst_tag_prop(tag, prop),
            Expr::AliasProp { edge, prop } => ctx.alias_prop(edge, prop),
            Expr::InputProp { prop } => ctx.input_prop(prop),
            Expr::VariableProp { var, prop } => ctx.variable_prop(var, prop),
            Expr::EdgeDstId { edge } => ctx.edge_dst_id(edge),
            Expr::EdgeSrcId { edge } => ctx.edge_src_id(edge),
            Expr::EdgeRank { edge } => ctx.edge_rank(edge),
            Expr::EdgeTypeOf { edge } => ctx.edge_type_of(edge),
            Expr::FunctionCall { name, args } => eval_function(name, args, ctx),
            Expr::TypeCast { target, expr } => eval_cast(*target, &expr.eval(ctx)?),
            Expr::Unary { op, expr } => eval_unary(*op, &expr.eval(ctx)?),
            Expr::Binary { left, op, right } => {
                eval_binary(&left.eval(ctx)?, *op, &right.eval(ctx)?)
            }
        }
    }

    /// Convenience constructors keep test and caller code readable.
    pub fn literal(v: impl Into<PropertyValue>) -> Expr {
        Expr::Literal(v.into())
    }

    pub fn alias_prop(edge: &str, prop: &str) -> Expr {
        Expr::AliasProp {
            edge: edge.to_string(),
            prop: prop.to_string(),
        }
    }

    pub fn src_prop(tag: &str, prop: &str) -> Expr {
        Expr::SrcProp {
            tag: tag.to_string(),
            prop: prop.to_string(),
        }
    }

    pub fn dst_prop(tag: &str, prop: &str) -> Expr {
        Expr::DstProp {
            tag: tag.to_string(),
            prop: prop.to_string(),
        }
    }

    pub fn input_prop(prop: &str) -> Expr {
        Expr::InputProp {
            prop: prop.to_string(),
        }
    }

    pub fn edge_dst_id(edge: &str) -> Expr {
        Expr::EdgeDstId {
            edge: edge.to_string(),
        }
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }
}

fn eval_function(name: &str, args: &[Expr], ctx: &dyn EvalContext) -> Result<PropertyValue> {
    match name {
        // Geo expansion happens upstream; by the time the executor sees the
        // call it already denotes a comma-separated id string.
        "near" => {
            let arg = args
                .first()
                .ok_or_else(|| StrideError::Expression("near() takes one argument".into()))?;
            let v = arg.eval(ctx)?;
            v.as_str().map(|s| PropertyValue::Str(s.to_string()))
        }
        "abs" => {
            let arg = args
                .first()
                .ok_or_else(|| StrideError::Expression("abs() takes one argument".into()))?;
            match arg.eval(ctx)? {
                PropertyValue::Int(i) => Ok(PropertyValue::Int(i.abs())),
                PropertyValue::Double(d) => Ok(PropertyValue::Double(d.abs())),
                other => Err(StrideError::Type {
                    expected: "numeric".into(),
                    actual: other.type_tag().to_string(),
                }),
            }
        }
        other => Err(StrideError::Expression(format!(
            "unknown function `{}'",
            other
        ))),
    }
}

fn eval_cast(target: PropertyType, value: &PropertyValue) -> Result<PropertyValue> {
    let fail = || StrideError::Type {
        expected: target.to_string(),
        actual: value.type_tag().to_string(),
    };
    match target {
        PropertyType::Bool => Ok(PropertyValue::Bool(value.as_bool())),
        PropertyType::Int | PropertyType::Vid | PropertyType::Timestamp => match value {
            PropertyValue::Int(i) => Ok(PropertyValue::Int(*i)),
            PropertyValue::Double(d) => Ok(PropertyValue::Int(*d as i64)),
            PropertyValue::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(PropertyValue::Int)
                .map_err(|_| fail()),
            PropertyValue::Bool(b) => Ok(PropertyValue::Int(*b as i64)),
        },
        PropertyType::Float | PropertyType::Double => match value {
            PropertyValue::Int(i) => Ok(PropertyValue::Double(*i as f64)),
            PropertyValue::Double(d) => Ok(PropertyValue::Double(*d)),
            PropertyValue::Str(s) => s
                .trim()
                .parse::<f64>()
                .map(PropertyValue::Double)
                .map_err(|_| fail()),
            PropertyValue::Bool(_) => Err(fail()),
        },
        PropertyType::String => Ok(PropertyValue::Str(value.to_string())),
        PropertyType::Unknown => Err(fail()),
    }
}

fn eval_unary(op: UnaryOp, value: &PropertyValue) -> Result<PropertyValue> {
    match op {
        UnaryOp::Not => Ok(PropertyValue::Bool(!value.as_bool())),
        UnaryOp::Neg => match value {
            PropertyValue::Int(i) => Ok(PropertyValue::Int(-i)),
            PropertyValue::Double(d) => Ok(PropertyValue::Double(-d)),
            other => Err(StrideError::Type {
                expected: "numeric".into(),
                actual: other.type_tag().to_string(),
            }),
        },
    }
}

fn eval_binary(left: &PropertyValue, op: BinaryOp, right: &PropertyValue) -> Result<PropertyValue> {
    use PropertyValue::*;
    match op {
        BinaryOp::Add => match (left, right) {
            (Int(a), Int(b)) => Ok(Int(a.wrapping_add(*b))),
            (Str(a), Str(b)) => Ok(Str(format!("{}{}", a, b))),
            _ => Ok(Double(left.as_double()? + right.as_double()?)),
        },
        BinaryOp::Sub => match (left, right) {
            (Int(a), Int(b)) => Ok(Int(a.wrapping_sub(*b))),
            _ => Ok(Double(left.as_double()? - right.as_double()?)),
        },
        BinaryOp::Mul => match (left, right) {
            (Int(a), Int(b)) => Ok(Int(a.wrapping_mul(*b))),
            _ => Ok(Double(left.as_double()? * right.as_double()?)),
        },
        BinaryOp::Div => match (left, right) {
            (Int(a), Int(b)) => {
                if *b == 0 {
                    Err(StrideError::Expression("division by zero".into()))
                } else {
                    Ok(Int(a / b))
                }
            }
            _ => {
                let d = right.as_double()?;
                if d == 0.0 {
                    Err(StrideError::Expression("division by zero".into()))
                } else {
                    Ok(Double(left.as_double()? / d))
                }
            }
        },
        BinaryOp::Mod => match (left, right) {
            (Int(a), Int(b)) => {
                if *b == 0 {
                    Err(StrideError::Expression("modulo by zero".into()))
                } else {
                    Ok(Int(a % b))
                }
            }
            _ => Err(StrideError::Type {
                expected: "int".into(),
                actual: format!("{} % {}", left.type_tag(), right.type_tag()),
            }),
        },
        BinaryOp::Eq => compare(left, right).map(|o| Bool(o == std::cmp::Ordering::Equal)),
        BinaryOp::Ne => compare(left, right).map(|o| Bool(o != std::cmp::Ordering::Equal)),
        BinaryOp::Lt => compare(left, right).map(|o| Bool(o.is_lt())),
        BinaryOp::Le => compare(left, right).map(|o| Bool(o.is_le())),
        BinaryOp::Gt => compare(left, right).map(|o| Bool(o.is_gt())),
        BinaryOp::Ge => compare(left, right).map(|o| Bool(o.is_ge())),
        BinaryOp::And => Ok(Bool(left.as_bool() && right.as_bool())),
        BinaryOp::Or => Ok(Bool(left.as_bool() || right.as_bool())),
    }
}

fn compare(left: &PropertyValue, right: &PropertyValue) -> Result<std::cmp::Ordering> {
    use PropertyValue::*;
    match (left, right) {
        (Int(a), Int(b)) => Ok(a.cmp(b)),
        (Str(a), Str(b)) => Ok(a.cmp(b)),
        (Bool(a), Bool(b)) => Ok(a.cmp(b)),
        _ => {
            let (a, b) = (left.as_double()?, right.as_double()?);
            a.partial_cmp(&b)
                .ok_or_else(|| StrideError::Expression("incomparable values".into()))
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(PropertyValue::Str(s)) => write!(f, "\"{}\"", s),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::SrcProp { tag, prop } => write!(f, "$^.{}.{}", tag, prop),
            Expr::DstProp { tag, prop } => write!(f, "$$.{}.{}", tag, prop),
            Expr::AliasProp { edge, prop } => write!(f, "{}.{}", edge, prop),
            Expr::InputProp { prop } => write!(f, "$-.{}", prop),
            Expr::VariableProp { var, prop } => write!(f, "${}.{}", var, prop),
            Expr::EdgeDstId { edge } => write!(f, "{}._dst", edge),
            Expr::EdgeSrcId { edge } => write!(f, "{}._src", edge),
            Expr::EdgeRank { edge } => write!(f, "{}._rank", edge),
            Expr::EdgeTypeOf { edge } => write!(f, "{}._type", edge),
            Expr::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::TypeCast { target, expr } => write!(f, "({}){}", target, expr),
            Expr::Unary { op, expr } => match op {
                UnaryOp::Not => write!(f, "!({})", expr),
                UnaryOp::Neg => write!(f, "-({})", expr),
            },
            Expr::Binary { left, op, right } => {
                write!(f, "({}{}{})", left, op.symbol(), right)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_arithmetic() {
        let e = Expr::binary(Expr::literal(2i64), BinaryOp::Add, Expr::literal(3i64));
        assert_eq!(e.eval(&NullContext).unwrap(), PropertyValue::Int(5));

        let e = Expr::binary(Expr::literal(1i64), BinaryOp::Div, Expr::literal(0i64));
        assert!(matches!(
            e.eval(&NullContext),
            Err(StrideError::Expression(_))
        ));
    }

    #[test]
    fn test_mixed_numeric_promotion() {
        let e = Expr::binary(Expr::literal(2i64), BinaryOp::Mul, Expr::literal(1.5f64));
        assert_eq!(e.eval(&NullContext).unwrap(), PropertyValue::Double(3.0));
    }

    #[test]
    fn test_relational_and_logical() {
        let lt = Expr::binary(Expr::literal(2i64), BinaryOp::Lt, Expr::literal(3i64));
        let and = Expr::binary(lt.clone(), BinaryOp::And, Expr::literal(true));
        assert_eq!(and.eval(&NullContext).unwrap(), PropertyValue::Bool(true));
    }

    #[test]
    fn test_cast() {
        let e = Expr::TypeCast {
            target: PropertyType::Int,
            expr: Box::new(Expr::literal("42")),
        };
        assert_eq!(e.eval(&NullContext).unwrap(), PropertyValue::Int(42));

        let bad = Expr::TypeCast {
            target: PropertyType::Int,
            expr: Box::new(Expr::literal("forty-two")),
        };
        assert!(bad.eval(&NullContext).is_err());
    }

    #[test]
    fn test_prop_refs_need_context() {
        let e = Expr::src_prop("person", "age");
        assert!(e.eval(&NullContext).is_err());
    }

    #[test]
    fn test_display_round() {
        let e = Expr::binary(
            Expr::alias_prop("follow", "since"),
            BinaryOp::Ge,
            Expr::literal(2020i64),
        );
        assert_eq!(e.to_string(), "(follow.since>=2020)");
        assert_eq!(Expr::edge_dst_id("follow").to_string(), "follow._dst");
        assert_eq!(Expr::input_prop("age").to_string(), "$-.age");
    }

    #[test]
    fn test_serde_round_trip() {
        let e = Expr::binary(
            Expr::src_prop("person", "age"),
            BinaryOp::Gt,
            Expr::literal(30i64),
        );
        let s = serde_json::to_string(&e).unwrap();
        let back: Expr = serde_json::from_str(&s).unwrap();
        assert_eq!(e, back);
    }
}
