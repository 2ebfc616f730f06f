// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Syntactic weakening: drop every unit over a variable the transition
//! assigns to. Makes no solver calls.

use formula::versions::{split_version, PathFormula};

use crate::{annotate::GuardMap, search::AbstractionSet};

/// Whether the transition gives `name` a version other than its own.
fn changed(transition: &PathFormula, name: &str) -> bool {
    match split_version(name) {
        (base, Some(version)) => transition
            .versions
            .get(base)
            .is_some_and(|v| v != version),
        (_, None) => false,
    }
}

/// Abstract the units that mention a variable the transition changes.
pub fn weaken(
    map: &GuardMap,
    transition: &PathFormula,
    mandatory: AbstractionSet,
) -> AbstractionSet {
    let mut abstracted = mandatory;
    for (g, unit) in map.iter() {
        if unit.ids().iter().any(|name| changed(transition, name)) {
            abstracted.insert(g);
        }
    }
    abstracted
}
