// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Convert formulas to semi-CNF.
//!
//! A semi-CNF of a formula is a set of clauses whose conjunction is equivalent
//! to it, where no clause is itself a conjunction. Unlike a full CNF
//! conversion, disjunctions are only distributed over conjunctions while the
//! number of produced clauses stays within a limit; past that limit the
//! disjunction is kept whole as a single clause. Before distributing, the
//! conjuncts shared by every disjunct are factored out, so
//! `(a & b) | (a & c)` yields the clauses `a` and `b | c`.

use crate::syntax::{NOp, Term};
use crate::term::{nnf::nnf, simplify::simplify};
use itertools::Itertools;

/// The default bound on the number of clauses produced by distributing a
/// single disjunction.
pub const DEFAULT_EXPANSION_LIMIT: usize = 32;

/// Convert `t` to a list of clauses. The conjunction of the result is
/// equivalent to `t`, and no element is a conjunction. `true` has no clauses.
pub fn to_semi_cnf(t: &Term, limit: usize) -> Vec<Term> {
    clauses(&simplify(&nnf(t)), limit)
        .into_iter()
        .unique()
        .collect()
}

fn cartesian_product(v: &[Vec<Term>]) -> Vec<Vec<Term>> {
    if v.is_empty() {
        return vec![vec![]];
    }

    let mut result: Vec<Vec<Term>> = vec![];

    for i in &v[0] {
        for rest in cartesian_product(&v[1..]) {
            let mut prod = vec![i.clone()];
            prod.extend(rest);
            result.push(prod);
        }
    }

    result
}

fn clauses(t: &Term, limit: usize) -> Vec<Term> {
    match t {
        Term::Literal(true) => vec![],
        Term::NAryOp(NOp::And, ts) => ts.iter().flat_map(|t| clauses(t, limit)).collect(),
        Term::NAryOp(NOp::Or, ts) => {
            let parts: Vec<Vec<Term>> = ts.iter().map(|t| clauses(t, limit)).collect();
            let common: Vec<Term> = match parts.split_first() {
                Some((first, rest)) => first
                    .iter()
                    .filter(|c| rest.iter().all(|p| p.contains(c)))
                    .unique()
                    .cloned()
                    .collect(),
                None => vec![],
            };
            let rest: Vec<Vec<Term>> = parts
                .into_iter()
                .map(|p| p.into_iter().filter(|c| !common.contains(c)).collect())
                .collect();

            let mut result = common;
            // some disjunct is implied by the common part
            if rest.iter().any(|p: &Vec<Term>| p.is_empty()) {
                return result;
            }
            let expansion = rest
                .iter()
                .try_fold(1usize, |n, p| n.checked_mul(p.len()))
                .filter(|n| *n <= limit);
            match expansion {
                Some(_) => result.extend(
                    cartesian_product(&rest)
                        .into_iter()
                        .map(|ds| Term::or(ds.into_iter().unique())),
                ),
                None => result.push(Term::or(rest.into_iter().map(Term::and))),
            }
            result
        }
        _ => vec![t.clone()],
    }
}
