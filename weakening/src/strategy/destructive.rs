// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Destructive weakening: start from the empty (trivially inductive)
//! candidate and greedily re-admit units, one solver call each.

use itertools::Itertools;
use solver::basics::BasicSolver;

use crate::{
    annotate::GuardMap,
    error::WeakeningError,
    search::{AbstractionSet, Answer, Oracle},
};

/// Try the non-mandatory units in order (by unit, then by guard), keeping
/// each one that leaves the candidate inductive.
pub fn weaken<S: BasicSolver>(
    map: &GuardMap,
    oracle: &Oracle<S>,
    mandatory: AbstractionSet,
) -> Result<AbstractionSet, WeakeningError> {
    let order = map
        .iter()
        .filter(|(g, _)| !mandatory.contains(g))
        .sorted_by(|(g1, u1), (g2, u2)| u1.cmp(u2).then(g1.cmp(g2)))
        .map(|(g, _)| g)
        .collect_vec();
    let mut abstracted: AbstractionSet = map.guards().collect();
    for g in order {
        abstracted.remove(&g);
        match oracle.check(&abstracted)? {
            Answer::Inductive => {
                log::debug!("re-admitted {g}");
            }
            Answer::Counterexample(_) => {
                abstracted.insert(g);
            }
        }
    }
    Ok(abstracted)
}
