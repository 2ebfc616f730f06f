// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Selector annotation: pair each unit of a formula with a fresh boolean
//! guard, so that the solver can switch units off.
//!
//! A unit `u` becomes `(g | u)`. Assuming `g` drops the unit, assuming `!g`
//! makes it hold. The disjunction is built directly rather than through
//! [`Term::or`], so that it is never flattened into a surrounding
//! disjunction and stays recognizable after renaming.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use itertools::Itertools;
use serde::Serialize;

use formula::{
    syntax::{NOp, Term},
    term::{simplify::simplify, subst::Substitution},
};

use crate::conf::AnnotationMode;

/// Name prefix of guard variables.
pub const SELECTOR_PREFIX: &str = "_FS_SEL_VAR_";

/// A guard (selector) variable, identified by a number unique within one
/// [`GuardMap`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Guard(pub(crate) usize);

impl Guard {
    /// The number in the guard's name.
    pub fn id(&self) -> usize {
        self.0
    }

    /// The name of the guard variable.
    pub fn name(&self) -> String {
        format!("{SELECTOR_PREFIX}{}", self.0)
    }

    /// The guard variable as a term.
    pub fn term(&self) -> Term {
        Term::Id(self.name())
    }

    /// Recognize a guard variable by its name.
    pub fn from_name(name: &str) -> Option<Guard> {
        name.strip_prefix(SELECTOR_PREFIX)?.parse().ok().map(Guard)
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SELECTOR_PREFIX}{}", self.0)
    }
}

/// The guards of one annotated formula and the units they annotate. Built
/// fresh for every weakening, with ids counting from 0.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuardMap {
    units: BTreeMap<Guard, Term>,
    guards: HashMap<Term, Guard>,
}

impl GuardMap {
    /// The guard of `unit`, minting a new one if it has none yet.
    fn guard(&mut self, unit: &Term) -> Guard {
        if let Some(g) = self.guards.get(unit) {
            return *g;
        }
        let g = Guard(self.units.len());
        self.units.insert(g, unit.clone());
        self.guards.insert(unit.clone(), g);
        g
    }

    /// The unit annotated by `g`.
    pub fn unit(&self, g: &Guard) -> Option<&Term> {
        self.units.get(g)
    }

    /// The guard annotating `unit`.
    pub fn guard_of(&self, unit: &Term) -> Option<Guard> {
        self.guards.get(unit).copied()
    }

    /// Guards in order of creation.
    pub fn guards(&self) -> impl Iterator<Item = Guard> + '_ {
        self.units.keys().copied()
    }

    /// The guards with their units, in guard order.
    pub fn iter(&self) -> impl Iterator<Item = (Guard, &Term)> {
        self.units.iter().map(|(g, t)| (*g, t))
    }

    /// The number of guards.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the annotated formula has no guards.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// If `t` is an annotation `(g | u)` built by this map (or a renaming of
    /// one), return its guard and the annotated term.
    pub fn annotation_parts<'a>(&self, t: &'a Term) -> Option<(Guard, &'a Term)> {
        match t {
            Term::NAryOp(NOp::Or, ts) => match ts.as_slice() {
                [Term::Id(name), unit] => {
                    let g = Guard::from_name(name)?;
                    self.units.contains_key(&g).then_some((g, unit))
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// The solver assumptions selecting the units that are kept: abstracted
    /// guards are true and all others false.
    pub fn assumptions(&self, abstracted: &BTreeSet<Guard>) -> BTreeMap<String, bool> {
        self.guards()
            .map(|g| (g.name(), abstracted.contains(&g)))
            .collect()
    }

    /// Eliminate the guards from an annotated formula, dropping the units of
    /// `abstracted` guards and keeping the others.
    pub fn abstract_guards(&self, annotated: &Term, abstracted: &BTreeSet<Guard>) -> Term {
        let substitution: Substitution = self
            .assumptions(abstracted)
            .into_iter()
            .map(|(name, b)| (name, Term::Literal(b)))
            .collect();
        simplify(&formula::term::subst::substitute(annotated, &substitution))
    }
}

fn annotation(g: Guard, unit: Term) -> Term {
    Term::NAryOp(NOp::Or, vec![g.term(), unit])
}

/// Annotate a formula at the given granularity.
pub fn annotate(t: &Term, mode: AnnotationMode) -> (Term, GuardMap) {
    match mode {
        AnnotationMode::Literals => annotate_literals(t),
        AnnotationMode::Conjunctions => annotate_conjunctions(formula::term::conjuncts(t)),
    }
}

/// Give every literal its own guard. Conjunctions and disjunctions are
/// rebuilt around their annotated operands, boolean constants are left alone
/// and every other maximal sub-formula (in negation normal form: an atom or
/// a negated atom) is a unit. Equal sub-formulas share one guard.
pub fn annotate_literals(t: &Term) -> (Term, GuardMap) {
    let mut map = GuardMap::default();
    let mut memo: HashMap<&Term, Term> = HashMap::new();
    let mut stack = vec![(t, false)];
    while let Some((s, expanded)) = stack.pop() {
        if memo.contains_key(s) {
            continue;
        }
        match s {
            Term::Literal(_) => {
                memo.insert(s, s.clone());
            }
            Term::NAryOp(op, ts) => {
                if expanded {
                    let ts = ts.iter().map(|t| memo[t].clone()).collect();
                    memo.insert(s, Term::NAryOp(*op, ts));
                } else {
                    stack.push((s, true));
                    // reversed, so that guards are numbered left to right
                    stack.extend(ts.iter().rev().map(|t| (t, false)));
                }
            }
            _ => {
                let g = map.guard(s);
                memo.insert(s, annotation(g, s.clone()));
            }
        }
    }
    let annotated = memo[t].clone();
    (annotated, map)
}

/// Give every conjunct one guard. Equal conjuncts share it.
pub fn annotate_conjunctions<I>(conjuncts: I) -> (Term, GuardMap)
where
    I: IntoIterator<Item = Term>,
{
    let mut map = GuardMap::default();
    let annotated = conjuncts
        .into_iter()
        .unique()
        .map(|t| annotation(map.guard(&t), t))
        .collect_vec();
    (Term::and(annotated), map)
}
