// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Models and evaluation of terms in them.

use crate::syntax::{BinOp, NOp, NumOp, NumRel, Sort, Term, UOp};
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// The value of a term in a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
pub enum Value {
    #[allow(missing_docs)]
    Bool(bool),
    #[allow(missing_docs)]
    Int(i64),
}

impl Value {
    /// The sort this value belongs to.
    pub fn sort(&self) -> Sort {
        match self {
            Value::Bool(_) => Sort::Bool,
            Value::Int(_) => Sort::Int,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
        }
    }
}

/// An error encountered while evaluating a term.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The model has no value for a variable of the term.
    #[error("no value for {0}")]
    Unbound(String),
    /// An operator was applied to a value of the wrong sort.
    #[error("expected a {expected} value in {term}")]
    WrongSort {
        #[allow(missing_docs)]
        expected: Sort,
        #[allow(missing_docs)]
        term: String,
    },
    /// Arithmetic left the 64-bit range.
    #[error("arithmetic overflow in {0}")]
    Overflow(String),
    /// Primed terms only have meaning relative to a transition.
    #[error("cannot evaluate primed term {0}")]
    Primed(String),
}

/// An assignment of values to variable names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Model {
    /// Values by (full, possibly versioned) variable name
    pub values: BTreeMap<String, Value>,
}

impl FromIterator<(String, Value)> for Model {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Model {
            values: iter.into_iter().collect(),
        }
    }
}

impl Model {
    /// Evaluate a term.
    pub fn eval(&self, t: &Term) -> Result<Value, EvalError> {
        match t {
            Term::Literal(b) => Ok(Value::Bool(*b)),
            Term::Int(n) => Ok(Value::Int(*n)),
            Term::Id(name) => self
                .values
                .get(name)
                .copied()
                .ok_or_else(|| EvalError::Unbound(name.clone())),
            Term::UnaryOp(UOp::Not, x) => Ok(Value::Bool(!self.eval_bool(x)?)),
            Term::UnaryOp(UOp::Prime, _) => Err(EvalError::Primed(t.to_string())),
            Term::BinOp(op, x, y) => {
                let b = match op {
                    BinOp::Equals => self.eval(x)? == self.eval(y)?,
                    BinOp::NotEquals => self.eval(x)? != self.eval(y)?,
                    BinOp::Implies => !self.eval_bool(x)? || self.eval_bool(y)?,
                    BinOp::Iff => self.eval_bool(x)? == self.eval_bool(y)?,
                };
                Ok(Value::Bool(b))
            }
            Term::NAryOp(NOp::And, ts) => {
                for t in ts {
                    if !self.eval_bool(t)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Term::NAryOp(NOp::Or, ts) => {
                for t in ts {
                    if self.eval_bool(t)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            Term::NumOp(op, x, y) => {
                let (a, b) = (self.eval_int(x)?, self.eval_int(y)?);
                let n = match op {
                    NumOp::Add => a.checked_add(b),
                    NumOp::Sub => a.checked_sub(b),
                    NumOp::Mul => a.checked_mul(b),
                };
                n.map(Value::Int)
                    .ok_or_else(|| EvalError::Overflow(t.to_string()))
            }
            Term::NumRel(rel, x, y) => {
                let (a, b) = (self.eval_int(x)?, self.eval_int(y)?);
                Ok(Value::Bool(match rel {
                    NumRel::Lt => a < b,
                    NumRel::Leq => a <= b,
                    NumRel::Geq => a >= b,
                    NumRel::Gt => a > b,
                }))
            }
            Term::Ite { cond, then, else_ } => {
                if self.eval_bool(cond)? {
                    self.eval(then)
                } else {
                    self.eval(else_)
                }
            }
        }
    }

    /// Evaluate a formula.
    pub fn eval_bool(&self, t: &Term) -> Result<bool, EvalError> {
        match self.eval(t)? {
            Value::Bool(b) => Ok(b),
            Value::Int(_) => Err(EvalError::WrongSort {
                expected: Sort::Bool,
                term: t.to_string(),
            }),
        }
    }

    fn eval_int(&self, t: &Term) -> Result<i64, EvalError> {
        match self.eval(t)? {
            Value::Int(n) => Ok(n),
            Value::Bool(_) => Err(EvalError::WrongSort {
                expected: Sort::Int,
                term: t.to_string(),
            }),
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self
            .values
            .iter()
            .map(|(name, v)| format!("{name} = {v}"))
            .join(", ");
        write!(f, "{values}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::term;

    fn model() -> Model {
        [
            ("x@0".to_string(), Value::Int(3)),
            ("x@1".to_string(), Value::Int(2)),
            ("b".to_string(), Value::Bool(false)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_eval() {
        let m = model();
        assert_eq!(m.eval_bool(&term("x@1 = x@0 - 1")), Ok(true));
        assert_eq!(m.eval_bool(&term("b | x@0 * 2 > 5")), Ok(true));
        assert_eq!(m.eval_bool(&term("b -> y > 0")), Ok(true));
        assert_eq!(
            m.eval(&term("if b then x@0 else x@1 + 10")),
            Ok(Value::Int(12))
        );
        insta::assert_display_snapshot!(m, @"b = false, x@0 = 3, x@1 = 2");
    }

    #[test]
    fn test_errors() {
        let m = model();
        assert_eq!(
            m.eval(&term("y > 0")),
            Err(EvalError::Unbound("y".to_string()))
        );
        assert!(matches!(
            m.eval(&term("b + 1")),
            Err(EvalError::WrongSort { .. })
        ));
        assert!(matches!(
            m.eval(&term("9223372036854775807 + x@0")),
            Err(EvalError::Overflow(_))
        ));
        assert!(matches!(m.eval(&term("x'")), Err(EvalError::Primed(_))));
    }
}
