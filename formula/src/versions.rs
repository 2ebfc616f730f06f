// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Versioned (SSA) names and path formulas.
//!
//! A program variable `x` at version `n` is the name `x@n`. A [`VersionMap`]
//! records the current version of every variable at some program point, and a
//! [`PathFormula`] pairs a formula over versioned names with the version map
//! it was built against. A transition relation over one loop iteration is a
//! path formula whose version map assigns every variable the transition
//! updates a newer version than the start state.

use crate::syntax::{Term, UOp};
use crate::term::subst::map_ids;
use itertools::Itertools;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const VERSION_SEPARATOR: char = '@';

/// The name of `name` at version `version`.
pub fn versioned_name(name: &str, version: usize) -> String {
    format!("{name}{VERSION_SEPARATOR}{version}")
}

/// Split a name into its version-free part and its version, if it has one.
pub fn split_version(name: &str) -> (&str, Option<usize>) {
    match name.rsplit_once(VERSION_SEPARATOR) {
        Some((base, version)) if !base.is_empty() => match version.parse() {
            Ok(version) => (base, Some(version)),
            Err(_) => (name, None),
        },
        _ => (name, None),
    }
}

/// The version-free part of a name.
pub fn base_name(name: &str) -> &str {
    split_version(name).0
}

/// The current version of each variable at some program point.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct VersionMap(BTreeMap<String, usize>);

impl VersionMap {
    /// An empty version map.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current version of a version-free name.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.0.get(name).copied()
    }

    /// Set the current version of a version-free name.
    pub fn set(&mut self, name: &str, version: usize) {
        self.0.insert(name.to_string(), version);
    }

    #[allow(missing_docs)]
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(name, v)| (name.as_str(), *v))
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `name` is versioned and its version is not the current one.
    pub fn is_dead(&self, name: &str) -> bool {
        match split_version(name) {
            (base, Some(version)) => self.get(base) != Some(version),
            (_, None) => false,
        }
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for VersionMap {
    fn from_iter<T: IntoIterator<Item = (S, usize)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(n, v)| (n.into(), v)).collect())
    }
}

impl fmt::Display for VersionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.iter().map(|(n, v)| format!("{n}: {v}")).join(", ");
        write!(f, "{{{entries}}}")
    }
}

/// Rename every variable whose version-free name the map knows to its current
/// version in the map. Other names are left untouched.
pub fn instantiate(term: &Term, versions: &VersionMap) -> Term {
    map_ids(term, &mut |name| {
        let base = base_name(name);
        versions
            .get(base)
            .map(|v| Term::Id(versioned_name(base, v)))
    })
}

/// Drop the version of every variable.
pub fn uninstantiate(term: &Term) -> Term {
    map_ids(term, &mut |name| match split_version(name) {
        (base, Some(_)) => Some(Term::id(base)),
        (_, None) => None,
    })
}

/// The versioned names in `term` whose version is not the current one under
/// `versions`: intermediate values, or values a transition has overwritten.
pub fn dead_names(term: &Term, versions: &VersionMap) -> BTreeSet<String> {
    term.ids()
        .into_iter()
        .filter(|name| versions.is_dead(name))
        .collect()
}

/// A formula over versioned names together with the version map it was built
/// against.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct PathFormula {
    #[allow(missing_docs)]
    pub formula: Term,
    #[allow(missing_docs)]
    pub versions: VersionMap,
}

impl PathFormula {
    /// Pair `formula` with the versions it was built against.
    pub fn new(formula: Term, versions: VersionMap) -> Self {
        Self { formula, versions }
    }

    /// Instantiate a version-free formula at `versions`.
    pub fn at(formula: &Term, versions: &VersionMap) -> Self {
        Self::new(instantiate(formula, versions), versions.clone())
    }
}

impl fmt::Display for PathFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.formula, self.versions)
    }
}

/// Eliminate primes from a transition relation written over version-free
/// names: `x` becomes `x@v` and `x'` becomes `x@(v+1)`, where `v` is the
/// version of `x` in `start` (0 when absent). The resulting version map
/// advances exactly the variables that occur primed, so a variable the
/// transition never mentions primed keeps its value.
pub fn unprime(term: &Term, start: &VersionMap) -> PathFormula {
    fn go(term: &Term, start: &VersionMap, primes: usize, end: &mut VersionMap) -> Term {
        match term {
            Term::Id(name) => match split_version(name) {
                (_, Some(_)) => term.clone(),
                (base, None) => {
                    let version = start.get(base).unwrap_or(0) + primes;
                    if end.get(base).map_or(true, |v| v < version) {
                        end.set(base, version);
                    }
                    Term::Id(versioned_name(base, version))
                }
            },
            Term::UnaryOp(UOp::Prime, t) => go(t, start, primes + 1, end),
            _ => term.with_children(
                term.children()
                    .into_iter()
                    .map(|t| go(t, start, primes, end))
                    .collect(),
            ),
        }
    }

    let mut end = start.clone();
    let formula = go(term, start, 0, &mut end);
    PathFormula::new(formula, end)
}
