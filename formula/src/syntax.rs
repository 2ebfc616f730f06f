// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The AST for terms and problem files.

use itertools::Itertools;
use serde::Serialize;
use std::{collections::BTreeSet, fmt};

/// A Sort represents a collection of values: booleans or mathematical
/// integers.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, Serialize, PartialOrd, Ord)]
pub enum Sort {
    /// Boolean sort
    Bool,
    /// Unbounded integers
    Int,
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sort::Bool => "bool",
            Sort::Int => "int",
        };
        write!(f, "{s}")
    }
}

/// Unary operators
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, Serialize, PartialOrd, Ord)]
pub enum UOp {
    /// Boolean negation
    Not,
    /// Gives the value of the argument in the successor state. Only appears in
    /// surface syntax; [`crate::versions::unprime`] replaces it with versions.
    Prime,
}

/// Binary operators
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, Serialize, PartialOrd, Ord)]
pub enum BinOp {
    Equals,
    NotEquals,
    Implies,
    Iff,
}

/// N-ary logical operators
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, Serialize, PartialOrd, Ord)]
pub enum NOp {
    And,
    Or,
}

/// Integer arithmetic
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, Serialize, PartialOrd, Ord)]
pub enum NumOp {
    Add,
    Sub,
    Mul,
}

/// Integer comparisons
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, Serialize, PartialOrd, Ord)]
pub enum NumRel {
    Lt,
    Leq,
    Geq,
    Gt,
}

impl NumRel {
    /// The comparison that holds exactly when this one does not.
    pub fn negate(self) -> Self {
        match self {
            NumRel::Lt => NumRel::Geq,
            NumRel::Leq => NumRel::Gt,
            NumRel::Geq => NumRel::Lt,
            NumRel::Gt => NumRel::Leq,
        }
    }
}

/// Quantifier-free term or formula.
///
/// Variables are plain identifiers. A variable of a program state at SSA
/// version `n` is written `x@n` (see [`crate::versions`]); names without a
/// version are version-free.
///
/// Terms are immutable trees compared structurally: two sub-terms that print
/// the same are the same term.
#[derive(PartialEq, Eq, Clone, Debug, Hash, Serialize, PartialOrd, Ord)]
pub enum Term {
    /// A constant true or false
    Literal(bool),
    /// An integer constant
    Int(i64),
    /// A reference to a variable
    Id(String),
    /// An applied unary operation
    UnaryOp(UOp, Box<Term>),
    /// An applied binary operation
    BinOp(BinOp, Box<Term>, Box<Term>),
    /// An applied n-ary operation
    NAryOp(NOp, Vec<Term>),
    /// An applied arithmetic operation
    NumOp(NumOp, Box<Term>, Box<Term>),
    /// An integer comparison
    NumRel(NumRel, Box<Term>, Box<Term>),
    /// If-then-else
    Ite {
        /// A boolean conditional
        cond: Box<Term>,
        /// Value of the Ite when `cond` is true
        then: Box<Term>,
        /// Value of the Ite when `cond` is false
        else_: Box<Term>,
    },
}

impl From<&Term> for Term {
    /// This is mostly for smart constructor, making it possible to
    /// pass either Term or &Term with an automatic clone if needed
    fn from(value: &Self) -> Self {
        value.clone()
    }
}

/// Smart constructors for Term. These generally take arguments by reference and
/// clone them.
impl Term {
    /// Smart constructor for Literal(true)
    pub fn true_() -> Self {
        Self::Literal(true)
    }

    /// Smart constructor for Literal(false)
    pub fn false_() -> Self {
        Self::Literal(false)
    }

    /// Smart constructor for Id
    pub fn id(name: &str) -> Self {
        Self::Id(name.to_string())
    }

    /// Smart constructor for integer constants
    pub fn int(value: i64) -> Self {
        Self::Int(value)
    }

    //////////////////
    // Unary operations: Not, Prime
    //////////////////

    /// Smart constructor for not. Note this does not push negation inwards, but
    /// it does cancel double negation, negates constants and flips comparisons.
    pub fn not<T>(t: T) -> Self
    where
        T: Into<Term>,
    {
        let t = t.into();
        match t {
            Self::Literal(b) => Self::Literal(!b),
            Self::UnaryOp(UOp::Not, body) => *body,
            Self::BinOp(BinOp::Equals, lhs, rhs) => Self::BinOp(BinOp::NotEquals, lhs, rhs),
            Self::BinOp(BinOp::NotEquals, lhs, rhs) => Self::BinOp(BinOp::Equals, lhs, rhs),
            Self::NumRel(rel, lhs, rhs) => Self::NumRel(rel.negate(), lhs, rhs),
            _ => Self::UnaryOp(UOp::Not, Box::new(t)),
        }
    }

    /// Smart constructor for prime.
    pub fn prime<T>(t: T) -> Self
    where
        T: Into<Term>,
    {
        Self::UnaryOp(UOp::Prime, Box::new(t.into()))
    }

    //////////////////
    // Binary operations: Equals, NotEquals, Implies, Iff
    //////////////////

    /// Smart constructor for `lhs = rhs`
    pub fn equals<T1, T2>(lhs: T1, rhs: T2) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
    {
        Self::BinOp(BinOp::Equals, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    /// Smart constructor for `lhs != rhs`
    pub fn not_equals<T1, T2>(lhs: T1, rhs: T2) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
    {
        Self::BinOp(BinOp::NotEquals, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    /// Smart constructor for `lhs -> rhs`
    pub fn implies<T1, T2>(lhs: T1, rhs: T2) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
    {
        Self::BinOp(BinOp::Implies, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    /// Smart constructor for `lhs <-> rhs`
    pub fn iff<T1, T2>(lhs: T1, rhs: T2) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
    {
        Self::BinOp(BinOp::Iff, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    //////////////////
    // Arithmetic
    //////////////////

    /// Smart constructor for an arithmetic operation
    pub fn num_op<T1, T2>(op: NumOp, lhs: T1, rhs: T2) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
    {
        Self::NumOp(op, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    /// Smart constructor for an integer comparison
    pub fn num_rel<T1, T2>(rel: NumRel, lhs: T1, rhs: T2) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
    {
        Self::NumRel(rel, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    //////////////////
    // N-ary operations: And, Or
    //////////////////

    /// Helper function for [`Self::and`] and [`Self::or`]
    fn flatten_terms_of_op(ts: Vec<Term>, op: NOp) -> Vec<Term> {
        ts.into_iter()
            .flat_map(|t| match t {
                Self::NAryOp(op2, ts2) if op == op2 => ts2,
                _ => vec![t],
            })
            .collect()
    }

    /// Smart constructor for And. Zero and one conjuncts are handled specially, and
    /// conjuncts that are And are flattened (but not recursively).
    pub fn and<I>(ts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Term>,
    {
        let mut ts = ts.into_iter().map(|x| x.into()).collect_vec();
        match ts.len() {
            0 => Self::true_(),
            1 => ts.remove(0),
            _ => Self::NAryOp(NOp::And, Self::flatten_terms_of_op(ts, NOp::And)),
        }
    }

    /// Smart constructor for Or. Zero and one disjuncts are handled specially,
    /// and disjuncts that are Or are flattened (but not recursively).
    pub fn or<I>(ts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Term>,
    {
        let mut ts = ts.into_iter().map(|x| x.into()).collect_vec();
        match ts.len() {
            0 => Self::false_(),
            1 => ts.remove(0),
            _ => Self::NAryOp(NOp::Or, Self::flatten_terms_of_op(ts, NOp::Or)),
        }
    }

    /// Smart constructor for if-then-else
    pub fn ite<T1, T2, T3>(cond: T1, then: T2, else_: T3) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
        T3: Into<Term>,
    {
        Self::Ite {
            cond: Box::new(cond.into()),
            then: Box::new(then.into()),
            else_: Box::new(else_.into()),
        }
    }

    //////////////////
    // Queries
    //////////////////

    /// The immediate sub-terms, left to right.
    pub fn children(&self) -> Vec<&Term> {
        match self {
            Term::Literal(_) | Term::Int(_) | Term::Id(_) => vec![],
            Term::UnaryOp(_, t) => vec![t.as_ref()],
            Term::BinOp(_, x, y) | Term::NumOp(_, x, y) | Term::NumRel(_, x, y) => {
                vec![x.as_ref(), y.as_ref()]
            }
            Term::NAryOp(_, ts) => ts.iter().collect(),
            Term::Ite { cond, then, else_ } => {
                vec![cond.as_ref(), then.as_ref(), else_.as_ref()]
            }
        }
    }

    /// Rebuild this term with new immediate sub-terms, given in the order
    /// [`Self::children`] returns them.
    pub fn with_children(&self, children: Vec<Term>) -> Term {
        let mut it = children.into_iter();
        let mut next = || Box::new(it.next().expect("wrong number of children"));
        match self {
            Term::Literal(_) | Term::Int(_) | Term::Id(_) => self.clone(),
            Term::UnaryOp(op, _) => Term::UnaryOp(*op, next()),
            Term::BinOp(op, _, _) => {
                let x = next();
                Term::BinOp(*op, x, next())
            }
            Term::NumOp(op, _, _) => {
                let x = next();
                Term::NumOp(*op, x, next())
            }
            Term::NumRel(rel, _, _) => {
                let x = next();
                Term::NumRel(*rel, x, next())
            }
            Term::NAryOp(op, _) => Term::NAryOp(*op, it.collect()),
            Term::Ite { .. } => {
                let cond = next();
                let then = next();
                Term::Ite {
                    cond,
                    then,
                    else_: next(),
                }
            }
        }
    }

    /// All variable names occurring in the term.
    pub fn ids(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        let mut stack = vec![self];
        while let Some(t) = stack.pop() {
            if let Term::Id(name) = t {
                ids.insert(name.clone());
            }
            stack.extend(t.children());
        }
        ids
    }

    /// The number of nodes in the term.
    pub fn size(&self) -> usize {
        1 + self.children().into_iter().map(Term::size).sum::<usize>()
    }

    /// Whether this is an atomic formula: a variable, an (in)equality or a
    /// comparison.
    pub fn is_atom(&self) -> bool {
        matches!(
            self,
            Term::Id(_) | Term::BinOp(BinOp::Equals | BinOp::NotEquals, _, _) | Term::NumRel(..)
        )
    }
}

/// Byte offsets of a fragment of a problem file.
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A value with an optional source location.
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Debug, Serialize)]
pub struct Spanned<T> {
    pub x: T,
    pub span: Option<Span>,
}

/// A declared state variable.
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Debug, Hash, Serialize)]
pub struct VarDecl {
    pub name: String,
    pub sort: Sort,
}

/// The declared state variables of a problem.
#[derive(PartialEq, Eq, Clone, Debug, Default, Serialize)]
pub struct Signature {
    /// Declarations, in source order
    pub vars: Vec<VarDecl>,
}

impl Signature {
    /// The declared sort of a version-free variable name, if any.
    pub fn sort_of(&self, name: &str) -> Option<Sort> {
        self.vars.iter().find(|d| d.name == name).map(|d| d.sort)
    }

    /// Declared names in source order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|d| d.name.as_str())
    }
}

/// A weakening problem: a candidate (and/or a set of candidate clauses), a
/// transition relation in primed notation and an optional strengthening.
#[derive(PartialEq, Eq, Clone, Debug, Serialize)]
pub struct Problem {
    #[allow(missing_docs)]
    pub signature: Signature,
    /// The predicate to weaken, if given
    pub candidate: Option<Spanned<Term>>,
    /// Candidate clauses for clause-subset weakening
    pub clauses: Vec<Spanned<Term>>,
    /// One loop iteration; `x'` denotes `x` in the successor state
    pub transition: Spanned<Term>,
    /// A fact assumed in every query without being weakened
    pub strengthening: Option<Spanned<Term>>,
}

impl Problem {
    /// Every term of the problem.
    pub fn terms(&self) -> impl Iterator<Item = &Spanned<Term>> {
        self.candidate
            .iter()
            .chain(self.clauses.iter())
            .chain([&self.transition])
            .chain(self.strengthening.iter())
    }
}
