// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Parser for terms and problem files.

use crate::syntax::*;
use codespan_reporting::diagnostic::{Diagnostic, Label};
use peg::{error::ParseError, str::LineCol};

enum Item {
    Var(VarDecl),
    Candidate(Spanned<Term>),
    Clause(Spanned<Term>),
    Transition(Spanned<Term>),
    Strengthening(Spanned<Term>),
}

fn build_problem(items: Vec<Item>) -> Result<Problem, &'static str> {
    let mut signature = Signature::default();
    let mut candidate = None;
    let mut clauses = vec![];
    let mut transition = None;
    let mut strengthening = None;
    for item in items {
        match item {
            Item::Var(decl) => {
                if signature.sort_of(&decl.name).is_some() {
                    return Err("variable declared only once");
                }
                signature.vars.push(decl);
            }
            Item::Candidate(t) => {
                if candidate.replace(t).is_some() {
                    return Err("at most one candidate");
                }
            }
            Item::Clause(t) => clauses.push(t),
            Item::Transition(t) => {
                if transition.replace(t).is_some() {
                    return Err("exactly one transition");
                }
            }
            Item::Strengthening(t) => {
                if strengthening.replace(t).is_some() {
                    return Err("at most one strengthening");
                }
            }
        }
    }
    Ok(Problem {
        signature,
        candidate,
        clauses,
        transition: transition.ok_or("a transition")?,
        strengthening,
    })
}

fn negative(t: Term) -> Term {
    match t {
        Term::Int(n) => Term::Int(-n),
        _ => Term::num_op(NumOp::Sub, Term::Int(0), t),
    }
}

peg::parser! {

grammar parser() for str {
    use NumOp::*;
    use NumRel::*;

    rule ident_start() = ['a'..='z' | 'A'..='Z' | '_']
    rule ident_char() = ident_start() / ['0'..='9']
    rule version() = "@" ['0'..='9']+
    pub(super) rule ident() -> String
    = s:$(quiet!{ident_start() ident_char()* version()?} / expected!("identifier"))
    { s.to_string() }

    rule nl() = quiet!{ ['\n' | '\r'] } / expected!("newline")
    rule comment() = "#" [^'\n' | '\r']* (nl() / ![_])
    rule ws_no_nl() = quiet!{ [' ' | '\t' ] / comment() }
    rule whitespace() = quiet! { ws_no_nl() / nl() }
    rule word_boundary() = !ident_char()
    rule _ = whitespace()*
    rule __ = word_boundary() _

    rule integer() -> i64
    = n:$(quiet!{['0'..='9']+} / expected!("integer")) {? n.parse().or(Err("integer that fits in 64 bits")) }

    pub(super) rule term() -> Term = precedence!{
        x:@ _ "->" _ y:(@) { Term::implies(x, y) }
        x:(@) _ "<->" _ y:@ { Term::iff(x, y) }
        --
        "if" __ cond:term() __ "then" __ then:term() __ "else" __  else_:(@) {
            Term::ite(cond, then, else_)
        }
        --
        x:(@) _ "|" _ y:@ { Term::or([x, y]) }
        --
        x:(@) _ "&" _ y:@ { Term::and([x, y]) }
        --
        x:(@) _ "=" _ y:@ { Term::equals(x, y) }
        x:(@) _ "!=" _ y:@ { Term::not_equals(x, y) }
        x:(@) _ "<=" _ y:@ { Term::num_rel(Leq, x, y) }
        x:(@) _ ">=" _ y:@ { Term::num_rel(Geq, x, y) }
        x:(@) _ "<" !['-' | '='] _ y:@ { Term::num_rel(Lt, x, y) }
        x:(@) _ ">" _ y:@ { Term::num_rel(Gt, x, y) }
        --
        x:(@) _ "+" _ y:@ { Term::num_op(Add, x, y) }
        x:(@) _ "-" !">" _ y:@ { Term::num_op(Sub, x, y) }
        --
        x:(@) _ "*" _ y:@ { Term::num_op(Mul, x, y) }
        --
        "!" _ x:@ { Term::UnaryOp(UOp::Not, Box::new(x)) }
        "-" _ x:@ { negative(x) }
        --
        t:(@) "'" { Term::prime(t) }
        --
        n:integer() { Term::Int(n) }
        s:ident() { match s.as_str() {
            "false" => Term::Literal(false),
            "true" => Term::Literal(true),
            _ => Term::Id(s),
        } }
        "(" _ t:term() _ ")" { t }
    }

    rule sort() -> Sort
    = ("bool" word_boundary() { Sort::Bool }) /
      ("int" word_boundary() { Sort::Int })

    rule var_decl() -> VarDecl
    = "var" __ name:ident() _ ":" _ sort:sort() { VarDecl { name, sort } }

    // matches whitespace with at least one newline
    rule newline_separator()
    = quiet!{ ws_no_nl()* (comment() / nl()) _ } / expected!("newline separator")

    rule newline_separated<T>(e: rule<T>) -> Vec<T>
    = e() ** newline_separator()

    rule spanned<T>(e: rule<T>) -> Spanned<T>
    = start:position!() x:e() end:position!()
      { Spanned {x, span: Some(Span{start,end}) } }

    rule item() -> Item
    = d:var_decl() { Item::Var(d) } /
      "candidate" __ t:spanned(<term()>) { Item::Candidate(t) } /
      "clause" __ t:spanned(<term()>) { Item::Clause(t) } /
      "transition" __ t:spanned(<term()>) { Item::Transition(t) } /
      "strengthening" __ t:spanned(<term()>) { Item::Strengthening(t) }

    pub(super) rule problem() -> Problem
    = _ items:newline_separated(<item()>) _ {? build_problem(items) }
  }
}

/// Parse a single term, panicking on invalid input. Meant for tests and
/// literal terms in code.
pub fn term(s: &str) -> Term {
    parser::term(s).expect("test term should parse")
}

/// Parse a problem file.
pub fn parse_problem(s: &str) -> Result<Problem, ParseError<LineCol>> {
    parser::problem(s)
}

/// Convert an opaque FileId and error to a readable `Diagnostic`
pub fn parse_error_diagnostic<FileId>(
    file_id: FileId,
    e: &ParseError<LineCol>,
) -> Diagnostic<FileId> {
    Diagnostic::error()
        .with_message("could not parse file")
        .with_labels(vec![Label::primary(
            file_id,
            e.location.offset..e.location.offset + 1,
        )
        .with_message(format!("expected {}", e.expected))])
}
