// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Perform substitutions of Id terms by other terms.

use std::collections::HashMap;

use crate::syntax::Term;

/// A map from identifiers to Terms.
pub type Substitution = HashMap<String, Term>;

/// Rebuild a term, replacing each `Id(name)` for which `f` returns a term.
pub fn map_ids<F>(term: &Term, f: &mut F) -> Term
where
    F: FnMut(&str) -> Option<Term>,
{
    match term {
        Term::Id(name) => f(name).unwrap_or_else(|| term.clone()),
        Term::Literal(_) | Term::Int(_) => term.clone(),
        _ => term.with_children(
            term.children()
                .into_iter()
                .map(|t| map_ids(t, &mut *f))
                .collect(),
        ),
    }
}

/// Perform a substitution.
pub fn substitute(term: &Term, substitution: &Substitution) -> Term {
    map_ids(term, &mut |name| substitution.get(name).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::term;

    #[test]
    fn test_substitute() {
        let substitution: Substitution = [
            ("g0".to_string(), Term::true_()),
            ("x".to_string(), term("y + 1")),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            substitute(&term("(g0 | x > 0) & (g1 | x = z)"), &substitution),
            term("(true | y + 1 > 0) & (g1 | y + 1 = z)")
        );
    }
}
