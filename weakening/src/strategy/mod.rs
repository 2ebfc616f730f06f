// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The searches that choose which guards to abstract.

use formula::{syntax::Term, versions::PathFormula};
use solver::basics::BasicSolver;

use crate::{
    annotate::GuardMap,
    conf::Strategy,
    error::WeakeningError,
    search::{AbstractionSet, Oracle},
};

pub mod cex;
pub mod destructive;
pub mod syntactic;

/// Everything a strategy may look at.
pub struct WeakeningTask<'a, S: BasicSolver> {
    /// The guards of the annotated candidate
    pub map: &'a GuardMap,
    /// The transition relation of one loop iteration
    pub transition: &'a PathFormula,
    /// The annotated candidate at the start versions
    pub annotated: &'a Term,
    /// The annotated candidate instantiated at the transition's versions
    pub primed: &'a Term,
    /// Checks candidates against the weakening query
    pub oracle: Oracle<'a, S>,
}

/// Run `strategy` starting from the guards that must be abstracted anyway.
/// The result always contains `mandatory`.
pub fn select_guards_to_abstract<S: BasicSolver>(
    strategy: Strategy,
    task: &WeakeningTask<S>,
    mandatory: AbstractionSet,
) -> Result<AbstractionSet, WeakeningError> {
    match strategy {
        Strategy::Syntactic => Ok(syntactic::weaken(task.map, task.transition, mandatory)),
        Strategy::Destructive => destructive::weaken(task.map, &task.oracle, mandatory),
        Strategy::Cex { removal } => cex::weaken(
            task.map,
            &task.oracle,
            task.annotated,
            task.primed,
            removal,
            mandatory,
        ),
    }
}
