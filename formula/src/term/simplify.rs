// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Bottom-up constant folding and local simplification.

use crate::syntax::{BinOp, NOp, NumOp, NumRel, Term, UOp};
use itertools::Itertools;

/// Simplify a term. The result is equivalent to the input: boolean constants
/// are propagated, nested conjunctions and disjunctions are flattened,
/// duplicate operands are removed and arithmetic on constants is evaluated.
pub fn simplify(t: &Term) -> Term {
    match t {
        Term::Literal(_) | Term::Int(_) | Term::Id(_) => t.clone(),
        Term::UnaryOp(UOp::Not, x) => Term::not(simplify(x)),
        Term::UnaryOp(UOp::Prime, x) => Term::prime(simplify(x)),
        Term::NAryOp(op, ts) => nary(*op, ts.iter().map(simplify).collect()),
        Term::BinOp(op, x, y) => binary(*op, simplify(x), simplify(y)),
        Term::NumOp(op, x, y) => arith(*op, simplify(x), simplify(y)),
        Term::NumRel(rel, x, y) => compare(*rel, simplify(x), simplify(y)),
        Term::Ite { cond, then, else_ } => {
            let (then, else_) = (simplify(then), simplify(else_));
            match simplify(cond) {
                Term::Literal(true) => then,
                Term::Literal(false) => else_,
                _ if then == else_ => then,
                cond => Term::ite(cond, then, else_),
            }
        }
    }
}

fn nary(op: NOp, ts: Vec<Term>) -> Term {
    // the unit of `op`, and the constant that absorbs it
    let (unit, zero) = match op {
        NOp::And => (true, false),
        NOp::Or => (false, true),
    };
    let mut args: Vec<Term> = vec![];
    for t in ts {
        match t {
            Term::NAryOp(op2, ts2) if op2 == op => args.extend(ts2),
            t => args.push(t),
        }
    }
    let args = args
        .into_iter()
        .filter(|t| *t != Term::Literal(unit))
        .unique()
        .collect_vec();
    let absorbed = args.contains(&Term::Literal(zero))
        || args
            .iter()
            .any(|t| !matches!(t, Term::Literal(_)) && args.contains(&Term::not(t)));
    if absorbed {
        return Term::Literal(zero);
    }
    match op {
        NOp::And => Term::and(args),
        NOp::Or => Term::or(args),
    }
}

fn binary(op: BinOp, x: Term, y: Term) -> Term {
    match (op, x, y) {
        (BinOp::Equals, x, y) if x == y => Term::true_(),
        (BinOp::NotEquals, x, y) if x == y => Term::false_(),
        (BinOp::Equals, Term::Int(a), Term::Int(b)) => Term::Literal(a == b),
        (BinOp::NotEquals, Term::Int(a), Term::Int(b)) => Term::Literal(a != b),
        (BinOp::Equals | BinOp::Iff, Term::Literal(b), t)
        | (BinOp::Equals | BinOp::Iff, t, Term::Literal(b)) => {
            if b {
                t
            } else {
                Term::not(t)
            }
        }
        (BinOp::NotEquals, Term::Literal(b), t) | (BinOp::NotEquals, t, Term::Literal(b)) => {
            if b {
                Term::not(t)
            } else {
                t
            }
        }
        (BinOp::Iff, x, y) if x == y => Term::true_(),
        (BinOp::Implies, Term::Literal(false), _) | (BinOp::Implies, _, Term::Literal(true)) => {
            Term::true_()
        }
        (BinOp::Implies, Term::Literal(true), y) => y,
        (BinOp::Implies, x, Term::Literal(false)) => Term::not(x),
        (BinOp::Implies, x, y) if x == y => Term::true_(),
        (op, x, y) => Term::BinOp(op, Box::new(x), Box::new(y)),
    }
}

fn arith(op: NumOp, x: Term, y: Term) -> Term {
    match (op, x, y) {
        (op, Term::Int(a), Term::Int(b)) => {
            let folded = match op {
                NumOp::Add => a.checked_add(b),
                NumOp::Sub => a.checked_sub(b),
                NumOp::Mul => a.checked_mul(b),
            };
            match folded {
                Some(n) => Term::Int(n),
                None => Term::num_op(op, Term::Int(a), Term::Int(b)),
            }
        }
        (NumOp::Add, Term::Int(0), t) | (NumOp::Add | NumOp::Sub, t, Term::Int(0)) => t,
        (NumOp::Mul, Term::Int(1), t) | (NumOp::Mul, t, Term::Int(1)) => t,
        (NumOp::Mul, Term::Int(0), _) | (NumOp::Mul, _, Term::Int(0)) => Term::Int(0),
        (NumOp::Sub, x, y) if x == y => Term::Int(0),
        (op, x, y) => Term::num_op(op, x, y),
    }
}

fn compare(rel: NumRel, x: Term, y: Term) -> Term {
    match (x, y) {
        (Term::Int(a), Term::Int(b)) => Term::Literal(match rel {
            NumRel::Lt => a < b,
            NumRel::Leq => a <= b,
            NumRel::Geq => a >= b,
            NumRel::Gt => a > b,
        }),
        (x, y) if x == y => Term::Literal(matches!(rel, NumRel::Leq | NumRel::Geq)),
        (x, y) => Term::num_rel(rel, x, y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::term;

    fn simp(s: &str) -> Term {
        simplify(&term(s))
    }

    #[test]
    fn test_constants() {
        assert_eq!(simp("(true | x > 0) & (false | y = 5)"), term("y = 5"));
        assert_eq!(simp("(false | x > 0) & (true | y = 5)"), term("x > 0"));
        assert_eq!(simp("(true | a) & (true | b)"), term("true"));
        assert_eq!(simp("a & false"), term("false"));
        assert_eq!(simp("!(true & a)"), term("!a"));
        assert_eq!(simp("if 1 < 2 then x else y"), term("x"));
        assert_eq!(simp("a -> false"), term("!a"));
        assert_eq!(simp("b = true"), term("b"));
    }

    #[test]
    fn test_structure() {
        assert_eq!(simp("a & (b & a) & c"), term("a & b & c"));
        assert_eq!(simp("a | !a"), term("true"));
        assert_eq!(simp("x < 3 & x >= 3"), term("false"));
        assert_eq!(simp("x = x"), term("true"));
        assert_eq!(simp("x < x"), term("false"));
    }

    #[test]
    fn test_arith() {
        assert_eq!(simp("x + (2 * 3 - 6) > 1 + 1"), term("x > 2"));
        assert_eq!(simp("x - x = 0"), term("true"));
        assert_eq!(simp("-3 * -4 = 12"), term("true"));
        assert_eq!(
            simp("9223372036854775807 + 1 > 0"),
            term("9223372036854775807 + 1 > 0")
        );
    }
}
