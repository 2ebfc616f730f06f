// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Encoding of terms as SMT-LIB s-expressions.

use formula::syntax::{BinOp, NOp, NumOp, NumRel, Sort, Term, UOp};
use smtlib::sexp::{app, atom_s, int, Sexp};

pub fn sort(s: Sort) -> Sexp {
    match s {
        Sort::Bool => atom_s("Bool"),
        Sort::Int => atom_s("Int"),
    }
}

fn nary(op: &str, unit: bool, mut args: Vec<Sexp>) -> Sexp {
    // solvers disagree on whether (and) and (or x) are well-formed
    match args.len() {
        0 => atom_s(if unit { "true" } else { "false" }),
        1 => args.swap_remove(0),
        _ => app(op, args),
    }
}

fn term_primes(t: &Term, num_primes: usize) -> Sexp {
    let term = |t: &Term| term_primes(t, num_primes);
    match t {
        Term::Literal(b) => atom_s(if *b { "true" } else { "false" }),
        Term::Int(n) => int(*n),
        Term::Id(s) => atom_s(format!("{s}{}", "'".repeat(num_primes))),
        Term::UnaryOp(UOp::Not, arg) => app("not", [term(arg)]),
        Term::UnaryOp(UOp::Prime, arg) => term_primes(arg, num_primes + 1),
        Term::BinOp(op, arg1, arg2) => {
            let args = [term(arg1), term(arg2)];
            match op {
                BinOp::Equals => app("=", args),
                BinOp::NotEquals => app("distinct", args),
                BinOp::Implies => app("=>", args),
                BinOp::Iff => app("=", args),
            }
        }
        Term::NAryOp(op, args) => {
            let args = args.iter().map(term).collect::<Vec<_>>();
            match op {
                NOp::And => nary("and", true, args),
                NOp::Or => nary("or", false, args),
            }
        }
        Term::NumOp(op, arg1, arg2) => {
            let head = match op {
                NumOp::Add => "+",
                NumOp::Sub => "-",
                NumOp::Mul => "*",
            };
            app(head, [term(arg1), term(arg2)])
        }
        Term::NumRel(rel, arg1, arg2) => {
            let head = match rel {
                NumRel::Lt => "<",
                NumRel::Leq => "<=",
                NumRel::Geq => ">=",
                NumRel::Gt => ">",
            };
            app(head, [term(arg1), term(arg2)])
        }
        Term::Ite { cond, then, else_ } => app("ite", [term(cond), term(then), term(else_)]),
    }
}

pub fn term(t: &Term) -> Sexp {
    term_primes(t, 0)
}

pub fn negated_term(t: &Term) -> Sexp {
    app("not", [term(t)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use formula::parser::term as parse;

    #[test]
    fn test_encode() {
        insta::assert_display_snapshot!(
            term(&parse("x@1 = x@0 - 1 & (y@0 >= -2 | b@0 -> c)")),
            @"(and (= x@1 (- x@0 1)) (=> (or (>= y@0 (- 2)) b@0) c))"
        );
        insta::assert_display_snapshot!(
            term(&parse("!(b | c') & x != y")),
            @"(and (not (or b |c'|)) (distinct x y))"
        );
        insta::assert_display_snapshot!(term(&Term::and::<[Term; 0]>([])), @"true");
        insta::assert_display_snapshot!(term(&Term::NAryOp(NOp::Or, vec![])), @"false");
    }
}
