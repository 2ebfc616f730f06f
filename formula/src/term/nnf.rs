// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Negation normal form.
//!
//! Negations are pushed down to atoms, implications and equivalences are
//! expanded and boolean if-then-else is split into its two cases. Atoms are
//! left alone, including any if-then-else nested inside them, and negated
//! comparisons are flipped (`!(x < 1)` becomes `x >= 1`).

use crate::syntax::{BinOp, NOp, Term, UOp};

/// Convert a formula to negation normal form.
pub fn nnf(t: &Term) -> Term {
    push_negation(t, false)
}

fn push_negation(t: &Term, negated: bool) -> Term {
    match t {
        Term::Literal(b) => Term::Literal(b ^ negated),
        Term::UnaryOp(UOp::Not, x) => push_negation(x, !negated),
        Term::NAryOp(op, ts) => {
            let ts = ts.iter().map(|t| push_negation(t, negated));
            match (op, negated) {
                (NOp::And, false) | (NOp::Or, true) => Term::and(ts),
                (NOp::Or, false) | (NOp::And, true) => Term::or(ts),
            }
        }
        Term::BinOp(BinOp::Implies, x, y) => {
            if negated {
                Term::and([push_negation(x, false), push_negation(y, true)])
            } else {
                Term::or([push_negation(x, true), push_negation(y, false)])
            }
        }
        Term::BinOp(BinOp::Iff, x, y) => Term::or([
            Term::and([push_negation(x, false), push_negation(y, negated)]),
            Term::and([push_negation(x, true), push_negation(y, !negated)]),
        ]),
        Term::Ite { cond, then, else_ } => Term::or([
            Term::and([push_negation(cond, false), push_negation(then, negated)]),
            Term::and([push_negation(cond, true), push_negation(else_, negated)]),
        ]),
        _ => {
            if negated {
                Term::not(t)
            } else {
                t.clone()
            }
        }
    }
}

/// Whether negations only apply to atoms and the only connectives are `&`
/// and `|`.
pub fn is_nnf(t: &Term) -> bool {
    match t {
        Term::Literal(_) => true,
        Term::UnaryOp(UOp::Not, x) => x.is_atom(),
        Term::NAryOp(_, ts) => ts.iter().all(is_nnf),
        Term::BinOp(BinOp::Implies | BinOp::Iff, _, _) | Term::Ite { .. } => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::term;

    #[test]
    fn test_nnf() {
        assert_eq!(nnf(&term("!(a & !b)")), term("!a | b"));
        assert_eq!(nnf(&term("!(x < 1 | y = 2)")), term("x >= 1 & y != 2"));
        assert_eq!(nnf(&term("a -> b")), term("!a | b"));
        assert_eq!(nnf(&term("!(a -> b)")), term("a & !b"));
        assert_eq!(nnf(&term("a <-> b")), term("a & b | !a & !b"));
        assert_eq!(nnf(&term("!(a <-> b)")), term("a & !b | !a & b"));
        assert_eq!(nnf(&term("!!(if c then p else q)")), term("c & p | !c & q"));
        assert_eq!(
            nnf(&term("!((if c then x else y) > 0)")),
            term("(if c then x else y) <= 0")
        );
        assert_eq!(nnf(&term("!true | false")), term("false | false"));
    }

    #[test]
    fn test_is_nnf() {
        for s in [
            "!(a & !b)",
            "a <-> (b | !c)",
            "!(x > 0 -> if a then b else c)",
        ] {
            let t = term(s);
            assert!(!is_nnf(&t));
            assert!(is_nnf(&nnf(&t)), "{s} is not in nnf after conversion");
        }
    }
}
