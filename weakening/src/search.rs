// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The state shared by the search strategies: the set of guards chosen for
//! abstraction and the inductiveness oracle that checks a choice.

use std::collections::{btree_set, BTreeSet};

use formula::{
    semantics::Model,
    sorts::{infer_sorts, Sorts},
    syntax::{Signature, Term},
};
use solver::basics::{BasicCanceler, BasicSolver, BasicSolverResp, MultiCanceler, QueryConf};

use crate::{
    annotate::{Guard, GuardMap},
    error::WeakeningError,
    stats::{Phase, WeakeningStatistics},
};

/// Guards chosen for removal. Owned by the strategy that grows it and
/// returned as its result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AbstractionSet(BTreeSet<Guard>);

impl AbstractionSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a guard. Returns whether it was new.
    pub fn insert(&mut self, g: Guard) -> bool {
        self.0.insert(g)
    }

    /// Remove a guard, re-admitting its unit.
    pub fn remove(&mut self, g: &Guard) -> bool {
        self.0.remove(g)
    }

    /// Whether `g` is abstracted.
    pub fn contains(&self, g: &Guard) -> bool {
        self.0.contains(g)
    }

    /// The number of abstracted guards.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no guard is abstracted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The abstracted guards in order.
    pub fn iter(&self) -> btree_set::Iter<'_, Guard> {
        self.0.iter()
    }

    /// The abstracted guards as a plain set.
    pub fn as_set(&self) -> &BTreeSet<Guard> {
        &self.0
    }
}

impl FromIterator<Guard> for AbstractionSet {
    fn from_iter<T: IntoIterator<Item = Guard>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Guard> for AbstractionSet {
    fn extend<T: IntoIterator<Item = Guard>>(&mut self, iter: T) {
        self.0.extend(iter)
    }
}

impl IntoIterator for AbstractionSet {
    type Item = Guard;
    type IntoIter = btree_set::IntoIter<Guard>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// The outcome of an inductiveness check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Answer {
    /// The candidate selected by the abstraction set is inductive.
    Inductive,
    /// A counterexample to induction.
    Counterexample(Model),
}

/// Checks whether the candidate selected by an abstraction set is inductive,
/// by asking the solver whether the weakening query is satisfiable with the
/// abstracted guards true and all others false.
pub struct Oracle<'a, S: BasicSolver> {
    solver: &'a S,
    cancelers: Option<&'a MultiCanceler<S::Canceler>>,
    stats: &'a WeakeningStatistics,
    map: &'a GuardMap,
    query: Term,
    sorts: Sorts,
}

impl<'a, S: BasicSolver> Oracle<'a, S> {
    /// An oracle for `query`, whose guards are those of `map`. Sorts not
    /// fixed by `signature` are inferred from the query.
    pub fn new(
        solver: &'a S,
        cancelers: Option<&'a MultiCanceler<S::Canceler>>,
        stats: &'a WeakeningStatistics,
        signature: &Signature,
        map: &'a GuardMap,
        query: Term,
    ) -> Result<Self, WeakeningError> {
        let sorts = infer_sorts(signature, [&query])?;
        Ok(Self {
            solver,
            cancelers,
            stats,
            map,
            query,
            sorts,
        })
    }

    /// The statistics queries are recorded in.
    pub fn stats(&self) -> &WeakeningStatistics {
        self.stats
    }

    /// Check the candidate with the units of `abstracted` dropped.
    pub fn check(&self, abstracted: &AbstractionSet) -> Result<Answer, WeakeningError> {
        if self.cancelers.is_some_and(|c| c.is_canceled()) {
            return Err(WeakeningError::Interrupted);
        }
        let assumptions = self.map.assumptions(abstracted.as_set());
        let query_conf = QueryConf {
            sorts: &self.sorts,
            cancelers: self.cancelers.cloned(),
            save_tee: true,
        };
        self.stats.record(|stats| stats.queries += 1);
        let start = std::time::Instant::now();
        let resp = self
            .solver
            .check_sat(&query_conf, &[self.query.clone()], &assumptions);
        self.stats.elapsed(Phase::Solver, start);
        match resp? {
            BasicSolverResp::Unsat => Ok(Answer::Inductive),
            BasicSolverResp::Sat(model) => Ok(Answer::Counterexample(model)),
            BasicSolverResp::Unknown(reason) => Err(WeakeningError::SolverFailure(format!(
                "solver returned unknown: {reason}"
            ))),
        }
    }
}
