// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Infer and check sorts.
//!
//! The main entry point is [infer_sorts]. Variables need not be declared:
//! their sorts are discovered by unification from the way they are used. All
//! versions of a variable (`x`, `x@0`, `x@1`, ...) share one sort, which comes
//! from the [`Signature`] when the version-free name is declared there.

use crate::syntax::*;
use crate::versions::base_name;
use ena::unify::{InPlace, UnificationTable, UnifyKey, UnifyValue};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// An error encountered during sort checking
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SortError {
    /// Sort inference detected a conflict between two sorts.
    #[error("could not unify {0} and {1}")]
    UnificationFail(Sort, Sort),
    /// Sort checking detected a mismatch between the expected and actual sorts of a term.
    #[error("expected {expected} but found {found} in {term}")]
    ExpectedButFoundSorts {
        /// Expected sort coming from the context of the term
        expected: Sort,
        #[allow(missing_docs)]
        found: Sort,
        /// The offending term
        term: String,
    },
    /// Sort inference finished without gaining enough information to figure out
    /// the sort of the given variable.
    #[error("could not solve for the sort of {0}")]
    UnsolvedSort(String),
}

/// The sort of every name occurring in some terms, keyed by the full
/// (possibly versioned) name.
pub type Sorts = BTreeMap<String, Sort>;

/// Check that every term is a well-sorted formula and return the sort of
/// every variable occurring in them.
pub fn infer_sorts<'a, I>(signature: &Signature, terms: I) -> Result<Sorts, SortError>
where
    I: IntoIterator<Item = &'a Term>,
{
    let mut context = Context {
        signature,
        names: HashMap::new(),
        occurrences: BTreeMap::new(),
        vars: UnificationTable::new(),
    };

    for term in terms {
        let sort = context.sort_of_term(term)?;
        context.expect(Sort::Bool, &sort, term)?;
    }

    let mut sorts = Sorts::new();
    for (name, base) in &context.occurrences {
        let sort = match &context.names[base] {
            AbstractSort::Known(sort) => *sort,
            AbstractSort::Unknown(var) => context
                .vars
                .probe_value(*var)
                .0
                .ok_or_else(|| SortError::UnsolvedSort(name.clone()))?,
        };
        sorts.insert(name.clone(), sort);
    }
    Ok(sorts)
}

#[derive(Clone, Debug)]
enum AbstractSort {
    Known(Sort),
    Unknown(SortVar),
}

// wrappers to implement ena::unify traits on
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
struct SortVar(u32);
#[derive(Clone, Debug, PartialEq)]
struct OptionSort(Option<Sort>);

impl UnifyKey for SortVar {
    type Value = OptionSort;
    fn index(&self) -> u32 {
        self.0
    }
    fn from_index(u: u32) -> SortVar {
        SortVar(u)
    }
    fn tag() -> &'static str {
        "SortVar"
    }
}

impl UnifyValue for OptionSort {
    type Error = SortError;
    fn unify_values(a: &OptionSort, b: &OptionSort) -> Result<OptionSort, SortError> {
        match (&a.0, &b.0) {
            (None, None) => Ok(OptionSort(None)),
            (None, a @ Some(_)) | (a @ Some(_), None) => Ok(OptionSort(*a)),
            (Some(x), Some(y)) if x == y => Ok(OptionSort(Some(*x))),
            (Some(x), Some(y)) => Err(SortError::UnificationFail(*x, *y)),
        }
    }
}

struct Context<'a> {
    signature: &'a Signature,
    // version-free name to its sort
    names: HashMap<String, AbstractSort>,
    // full name to version-free name
    occurrences: BTreeMap<String, String>,
    vars: UnificationTable<InPlace<SortVar>>,
}

impl Context<'_> {
    fn name(&mut self, name: &str) -> AbstractSort {
        let base = base_name(name).to_string();
        self.occurrences.insert(name.to_string(), base.clone());
        if let Some(sort) = self.names.get(&base) {
            return sort.clone();
        }
        let sort = match self.signature.sort_of(&base) {
            Some(sort) => AbstractSort::Known(sort),
            None => AbstractSort::Unknown(self.vars.new_key(OptionSort(None))),
        };
        self.names.insert(base, sort.clone());
        sort
    }

    // check that `found` can be `expected`, resolving it if it is unknown
    fn expect(
        &mut self,
        expected: Sort,
        found: &AbstractSort,
        term: &Term,
    ) -> Result<(), SortError> {
        match found {
            AbstractSort::Known(s) if *s == expected => Ok(()),
            AbstractSort::Known(s) => Err(SortError::ExpectedButFoundSorts {
                expected,
                found: *s,
                term: term.to_string(),
            }),
            AbstractSort::Unknown(v) => self.vars.unify_var_value(*v, OptionSort(Some(expected))),
        }
    }

    fn unify(&mut self, a: &AbstractSort, b: &AbstractSort) -> Result<(), SortError> {
        match (a, b) {
            (AbstractSort::Known(a), AbstractSort::Known(b)) if a == b => Ok(()),
            (AbstractSort::Known(a), AbstractSort::Known(b)) => {
                Err(SortError::UnificationFail(*a, *b))
            }
            (AbstractSort::Unknown(i), AbstractSort::Unknown(j)) => self.vars.unify_var_var(*i, *j),
            (AbstractSort::Known(a), AbstractSort::Unknown(i))
            | (AbstractSort::Unknown(i), AbstractSort::Known(a)) => {
                self.vars.unify_var_value(*i, OptionSort(Some(*a)))
            }
        }
    }

    fn expect_term(&mut self, expected: Sort, term: &Term) -> Result<(), SortError> {
        let found = self.sort_of_term(term)?;
        self.expect(expected, &found, term)
    }

    fn sort_of_term(&mut self, term: &Term) -> Result<AbstractSort, SortError> {
        match term {
            Term::Literal(_) => Ok(AbstractSort::Known(Sort::Bool)),
            Term::Int(_) => Ok(AbstractSort::Known(Sort::Int)),
            Term::Id(name) => Ok(self.name(name)),
            Term::UnaryOp(UOp::Not, x) => {
                self.expect_term(Sort::Bool, x)?;
                Ok(AbstractSort::Known(Sort::Bool))
            }
            Term::UnaryOp(UOp::Prime, x) => self.sort_of_term(x),
            Term::BinOp(BinOp::Equals | BinOp::NotEquals, x, y) => {
                let a = self.sort_of_term(x)?;
                let b = self.sort_of_term(y)?;
                self.unify(&a, &b)?;
                Ok(AbstractSort::Known(Sort::Bool))
            }
            Term::BinOp(BinOp::Implies | BinOp::Iff, x, y) => {
                self.expect_term(Sort::Bool, x)?;
                self.expect_term(Sort::Bool, y)?;
                Ok(AbstractSort::Known(Sort::Bool))
            }
            Term::NAryOp(NOp::And | NOp::Or, xs) => {
                for x in xs {
                    self.expect_term(Sort::Bool, x)?;
                }
                Ok(AbstractSort::Known(Sort::Bool))
            }
            Term::NumOp(_, x, y) => {
                self.expect_term(Sort::Int, x)?;
                self.expect_term(Sort::Int, y)?;
                Ok(AbstractSort::Known(Sort::Int))
            }
            Term::NumRel(_, x, y) => {
                self.expect_term(Sort::Int, x)?;
                self.expect_term(Sort::Int, y)?;
                Ok(AbstractSort::Known(Sort::Bool))
            }
            Term::Ite { cond, then, else_ } => {
                self.expect_term(Sort::Bool, cond)?;
                let a = self.sort_of_term(then)?;
                let b = self.sort_of_term(else_)?;
                self.unify(&a, &b)?;
                Ok(a)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_problem, term};

    fn infer(s: &str) -> Result<Sorts, SortError> {
        infer_sorts(&Signature::default(), [&term(s)])
    }

    #[test]
    fn test_inference() {
        let sorts = infer("x@0 > 0 & (b | y = x@1)").unwrap();
        assert_eq!(sorts["x@0"], Sort::Int);
        assert_eq!(sorts["x@1"], Sort::Int);
        assert_eq!(sorts["y"], Sort::Int);
        assert_eq!(sorts["b"], Sort::Bool);

        let sorts = infer("(if c then p else q) = (z < 1)").unwrap();
        assert_eq!(sorts["p"], Sort::Bool);
        assert_eq!(sorts["q"], Sort::Bool);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            infer("x + 1 = 2 & x"),
            Err(SortError::ExpectedButFoundSorts { .. }) | Err(SortError::UnificationFail(..))
        ));
        assert_eq!(infer("x = y"), Err(SortError::UnsolvedSort("x".to_string())));
        assert!(infer("1 + 2").is_err());
    }

    #[test]
    fn test_declared() {
        let problem = parse_problem("var x: int\nvar y: int\ntransition x' = y").unwrap();
        let terms = [problem.transition.x];
        let sorts = infer_sorts(&problem.signature, &terms).unwrap();
        assert_eq!(sorts["x"], Sort::Int);
        assert_eq!(sorts["y"], Sort::Int);

        let problem = parse_problem("var x: bool\ntransition x' = x + 1").unwrap();
        assert!(infer_sorts(&problem.signature, [&problem.transition.x]).is_err());
    }
}
