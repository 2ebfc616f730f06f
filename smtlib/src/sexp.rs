// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! A custom s-expression data type and parsing.
//!
//! This implementation supports comments as part of the grammar, since they are
//! needed to fully parse the output of some solvers.

use peg::str::LineCol;
use serde::Serialize;
use std::fmt;

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, PartialOrd, Ord)]
pub enum Atom {
    I(u64),
    S(String),
}

/// A value in some interpreted universe: a Boolean or an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretedValue {
    /// A Boolean value
    Bool(bool),
    /// An integer value
    Int(i64),
}

/// An s-expression which also tracks comments.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, PartialOrd, Ord)]
pub enum Sexp {
    Atom(Atom),
    Comment(String),
    List(Vec<Sexp>),
}

/// Construct an sexp atom from a string.
pub fn atom_s<S: AsRef<str>>(s: S) -> Sexp {
    Sexp::Atom(Atom::S(s.as_ref().to_string()))
}

/// Construct an sexp atom from a non-negative integer.
pub fn atom_i(i: u64) -> Sexp {
    Sexp::Atom(Atom::I(i))
}

/// Construct the SMT-LIB numeral for an integer, which for negative numbers is
/// the application `(- n)`.
pub fn int(i: i64) -> Sexp {
    if i < 0 {
        app("-", [atom_i(i.unsigned_abs())])
    } else {
        atom_i(i.unsigned_abs())
    }
}

/// Construct an sexp list from an iteratable.
pub fn sexp_l<I>(i: I) -> Sexp
where
    I: IntoIterator<Item = Sexp>,
{
    Sexp::List(i.into_iter().collect())
}

/// Construct an sexp list with a string atom as its "head" element, followed by
/// an iterable of remaining arguments.
pub fn app<I>(head: &str, args: I) -> Sexp
where
    I: IntoIterator<Item = Sexp>,
{
    let mut ss = vec![atom_s(head)];
    ss.extend(args);
    Sexp::List(ss)
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::I(i) => write!(f, "{i}"),
            Atom::S(s) => {
                if s.contains([' ', '\"', '\'']) {
                    write!(f, "|{s}|")
                } else if s.contains('|') {
                    write!(f, "\"{s}\"")
                } else {
                    write!(f, "{s}")
                }
            }
        }
    }
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexp::Atom(s) => write!(f, "{s}"),
            Sexp::Comment(s) => write!(f, ";{s}"),
            Sexp::List(ss) => {
                write!(f, "(")?;
                let mut after_comment = true;
                for s in ss {
                    match s {
                        Sexp::Comment(_) => {
                            write!(f, "\n{s}\n")?;
                            after_comment = true;
                        }
                        _ => {
                            if !after_comment {
                                write!(f, " ")?;
                            }
                            write!(f, "{s}")?;
                            after_comment = false;
                        }
                    }
                }
                write!(f, ")")
            }
        }
    }
}

impl Sexp {
    /// Return the inner elements if self is a Sexp::List
    pub fn list(&self) -> Option<&[Sexp]> {
        if let Sexp::List(ss) = self {
            Some(ss)
        } else {
            None
        }
    }

    /// Return the inner string if self is a string atom.
    pub fn atom_s(&self) -> Option<&str> {
        if let Sexp::Atom(Atom::S(s)) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Return the inner integer if self is an integer atom.
    pub fn atom_i(&self) -> Option<u64> {
        if let Sexp::Atom(Atom::I(i)) = self {
            Some(*i)
        } else {
            None
        }
    }

    /// Return the head and tail if self is of the form `(head rest..)`.
    pub fn app(&self) -> Option<(&str, &[Sexp])> {
        let (head, rest) = self.list()?.split_first()?;
        Some((head.atom_s()?, rest))
    }

    /// Interpret a value printed by a solver: `true`, `false`, a numeral or
    /// a negated numeral `(- n)`.
    pub fn interpreted_value(&self) -> Option<InterpretedValue> {
        match self {
            Sexp::Atom(Atom::I(i)) => i64::try_from(*i).ok().map(InterpretedValue::Int),
            Sexp::Atom(Atom::S(s)) => match s.as_str() {
                "true" => Some(InterpretedValue::Bool(true)),
                "false" => Some(InterpretedValue::Bool(false)),
                _ => None,
            },
            _ => match self.app()? {
                ("-", [arg]) => match arg.interpreted_value()? {
                    InterpretedValue::Int(i) => Some(InterpretedValue::Int(-i)),
                    InterpretedValue::Bool(_) => None,
                },
                _ => None,
            },
        }
    }
}

peg::parser! {
grammar parser() for str {
  rule ident_start() = ['a'..='z' | 'A'..='Z' | '_' | '\'' | '<' | '>' | ':' | '=' | '$' | '@' | '+' | '-' | '*' | '~' | '/']
  rule ident_char() = ident_start() / ['0'..='9' | '!' | '#' | '%' | '.' | '?' | '^' | '&']
  rule ident() = quiet! { ident_start() ident_char()* } / expected!("atom")

  rule whitespace() = [' ' | '\t' | '\n' | '\r']
  rule _ = whitespace()*

  rule quoted_atom() -> Atom
  = "\"" s:$([^'"']*) "\"" { Atom::S(s.to_string()) }

  rule pipe_quoted_atom() -> Atom
  = "|" s:$([^'|']*) "|" { Atom::S(s.to_string()) }

  rule unquoted_atom() -> Atom
  = s:$(ident()) { Atom::S(s.to_string()) }

  rule int_atom() -> Atom
  = i:$(['0'..='9']+) {? i.parse().map(Atom::I).or(Err("numeral that fits in 64 bits")) }

  rule atom() -> Sexp
  = s:(quoted_atom() /
       pipe_quoted_atom() /
       unquoted_atom() /
       int_atom()) { Sexp::Atom(s) }

  rule comment() -> Sexp
  = ";" s:$(([^'\n']*)) ['\n'] { Sexp::Comment(s.to_string()) }

  rule list() -> Sexp
  = "(" _ ss:(sexp() ** _) _ ")" { Sexp::List(ss) }

  rule sexp() -> Sexp
  = atom() / comment() / list()

  /// Parse an sexp but be tolerant to whitespace around it.
  pub(super) rule sexp_whitespace() -> Sexp
  = _ s:sexp() _ { s }

  /// Parse a sequence of sexps.
  pub(super) rule sexps() -> Vec<Sexp>
  = _ ss:(sexp() ** _) _ { ss }
}
}

/// Parse an sexp.
///
/// Allows whitespace before or after.
pub fn parse(s: &str) -> Result<Sexp, peg::error::ParseError<LineCol>> {
    parser::sexp_whitespace(s)
}

/// Parse a sequence of sexps, separated by whitespace.
pub fn parse_many(s: &str) -> Result<Vec<Sexp>, peg::error::ParseError<LineCol>> {
    parser::sexps(s)
}
