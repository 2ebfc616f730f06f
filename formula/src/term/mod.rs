// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Utilities for manipulating [`crate::syntax::Term`]s.

use crate::syntax::{NOp, Term};

pub mod nnf;
pub mod semicnf;
pub mod simplify;
pub mod subst;

/// The top-level conjuncts of a term, with nested conjunctions flattened.
pub fn conjuncts(t: &Term) -> Vec<Term> {
    match t {
        Term::NAryOp(NOp::And, ts) => ts.iter().flat_map(conjuncts).collect(),
        Term::Literal(true) => vec![],
        _ => vec![t.clone()],
    }
}

/// The top-level disjuncts of a term, with nested disjunctions flattened.
pub fn disjuncts(t: &Term) -> Vec<Term> {
    match t {
        Term::NAryOp(NOp::Or, ts) => ts.iter().flat_map(disjuncts).collect(),
        Term::Literal(false) => vec![],
        _ => vec![t.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::term;

    #[test]
    fn test_conjuncts() {
        assert_eq!(
            conjuncts(&term("a & (b | c) & true & (d & e)")),
            vec![term("a"), term("b | c"), term("d"), term("e")]
        );
        assert!(conjuncts(&term("true")).is_empty());
        assert_eq!(disjuncts(&term("a | (b & c)")), vec![term("a"), term("b & c")]);
    }
}
