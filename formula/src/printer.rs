// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Print terms in the syntax accepted by [`crate::parser`].

use std::fmt;

use crate::syntax::*;

fn precedence(t: &Term) -> usize {
    use crate::syntax::{BinOp::*, NOp::*, NumOp::*, Term::*, UOp::*};

    match t {
        BinOp(Implies | Iff, _, _) => 10,
        Ite { .. } => 30,
        NAryOp(Or, _) => 40,
        NAryOp(And, _) => 50,
        BinOp(Equals | NotEquals, _, _) | NumRel(..) => 60,
        NumOp(Add | Sub, _, _) => 65,
        NumOp(Mul, _, _) => 67,
        UnaryOp(Not, _) => 70,
        Int(n) if *n < 0 => 70,
        UnaryOp(Prime, _) => 80,
        Literal(_) | Int(_) | Id(_) => 1000,
    }
}

fn parens(add_parens: bool, s: String) -> String {
    if add_parens {
        format!("({s})")
    } else {
        s
    }
}

fn binary(t: &Term, op: &str, arg1: &Term, arg2: &Term, right_associative: bool) -> String {
    // handling of precedence is based on
    // https://stackoverflow.com/questions/6277747/pretty-print-expression-with-as-few-parentheses-as-possible
    let use_left_paren = precedence(t) > precedence(arg1)
        || (precedence(t) == precedence(arg1) && right_associative);
    let use_right_paren = precedence(t) > precedence(arg2)
        || (precedence(t) == precedence(arg2) && !right_associative);
    let left = parens(use_left_paren, term(arg1));
    let right = parens(use_right_paren, term(arg2));
    format!("{left} {op} {right}")
}

/// Render a term.
pub fn term(t: &Term) -> String {
    match t {
        Term::Literal(false) => "false".to_string(),
        Term::Literal(true) => "true".to_string(),
        Term::Int(n) => n.to_string(),
        Term::Id(i) => i.to_string(),
        Term::UnaryOp(op, arg) => {
            let arg = parens(precedence(t) > precedence(arg), term(arg));
            match op {
                UOp::Not => format!("!{arg}"),
                UOp::Prime => format!("{arg}'"),
            }
        }
        Term::BinOp(op, arg1, arg2) => {
            let (op, right_associative) = match op {
                BinOp::Equals => ("=", false),
                BinOp::NotEquals => ("!=", false),
                BinOp::Implies => ("->", true),
                BinOp::Iff => ("<->", false),
            };
            binary(t, op, arg1, arg2, right_associative)
        }
        Term::NumOp(op, arg1, arg2) => {
            let op = match op {
                NumOp::Add => "+",
                NumOp::Sub => "-",
                NumOp::Mul => "*",
            };
            binary(t, op, arg1, arg2, false)
        }
        Term::NumRel(rel, arg1, arg2) => {
            let rel = match rel {
                NumRel::Lt => "<",
                NumRel::Leq => "<=",
                NumRel::Geq => ">=",
                NumRel::Gt => ">",
            };
            binary(t, rel, arg1, arg2, false)
        }
        Term::NAryOp(op, args) => {
            let args = args
                .iter()
                .map(|arg| parens(precedence(t) >= precedence(arg), term(arg)))
                .collect::<Vec<_>>();
            let op = match op {
                NOp::And => "&",
                NOp::Or => "|",
            };
            args.join(&format!(" {op} "))
        }
        Term::Ite { cond, then, else_ } => {
            let cond = term(cond);
            let then = parens(precedence(t) >= precedence(then), term(then));
            let else_ = parens(precedence(t) > precedence(else_), term(else_));
            format!("if {cond} then {then} else {else_}")
        }
    }
}

/// Render a problem in the problem-file syntax, one item per line.
pub fn problem(p: &Problem) -> String {
    let mut lines = p
        .signature
        .vars
        .iter()
        .map(|decl| format!("var {}: {}", decl.name, decl.sort))
        .collect::<Vec<_>>();
    if let Some(candidate) = &p.candidate {
        lines.push(format!("candidate {}", candidate.x));
    }
    for clause in &p.clauses {
        lines.push(format!("clause {}", clause.x));
    }
    lines.push(format!("transition {}", p.transition.x));
    if let Some(strengthening) = &p.strengthening {
        lines.push(format!("strengthening {}", strengthening.x));
    }
    lines.join("\n")
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", term(self))
    }
}
