// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Guards whose units mention intermediate variables: versions of a variable
//! that are not its current version at the point the candidate describes.
//! Such units cannot be compared across a transition and are always dropped.

use std::collections::BTreeSet;

use formula::versions::{dead_names, VersionMap};

use crate::annotate::{Guard, GuardMap};

/// The guards whose unit mentions a name that is dead under `versions`.
pub fn mark_intermediate(map: &GuardMap, versions: &VersionMap) -> BTreeSet<Guard> {
    map.iter()
        .filter(|(g, unit)| {
            let dead = dead_names(unit, versions);
            if !dead.is_empty() {
                log::debug!("{g} annotates {unit}, which has intermediate variables {dead:?}");
            }
            !dead.is_empty()
        })
        .map(|(g, _)| g)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::annotate_literals;
    use formula::parser::term;

    #[test]
    fn test_intermediate() {
        let (_, map) = annotate_literals(&term("x@1 > 0 & t@3 = x@1 & (y@0 < 2 | z > 1)"));
        let versions: VersionMap = [("x", 1), ("t", 4), ("y", 0)].into_iter().collect();
        let marked = mark_intermediate(&map, &versions);
        let units = marked
            .iter()
            .map(|g| map.unit(g).unwrap().to_string())
            .collect::<Vec<_>>();
        // z is version-free, so it is never dead
        assert_eq!(units, vec!["t@3 = x@1"]);
    }
}
