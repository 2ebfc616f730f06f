// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Cumulative statistics of a weakening manager. They are only written by
//! the engine and only read for reporting.

use std::{
    fmt,
    sync::Mutex,
    time::{Duration, Instant},
};

use serde::{Serialize, Serializer};

fn secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// A snapshot of the counters and timers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WeakeningStats {
    /// Calls to either weakening operation
    pub weakenings: usize,
    /// Weakenings answered without annotating (a constant candidate)
    pub trivial: usize,
    /// Guards created by annotation
    pub guards: usize,
    /// Guards abstracted because they mention intermediate variables
    pub intermediate: usize,
    /// Guards abstracted in final results, including intermediate ones
    pub abstracted: usize,
    /// Satisfiability queries issued
    pub queries: usize,
    /// Rounds of counterexample-guided search
    pub cex_iterations: usize,
    /// Time spent normalizing and annotating candidates
    #[serde(serialize_with = "secs")]
    pub annotation_time: Duration,
    /// Time spent choosing the guards to abstract, solver time included
    #[serde(serialize_with = "secs")]
    pub search_time: Duration,
    /// Time spent waiting for the solver
    #[serde(serialize_with = "secs")]
    pub solver_time: Duration,
}

/// A timed phase of weakening.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Normalization and annotation
    Annotation,
    /// The strategy's search, solver calls included
    Search,
    /// A single solver call
    Solver,
}

/// Statistics shared by every call of one manager.
#[derive(Debug, Default)]
pub struct WeakeningStatistics(Mutex<WeakeningStats>);

impl WeakeningStatistics {
    /// Update the counters.
    pub fn record<F>(&self, f: F)
    where
        F: FnOnce(&mut WeakeningStats),
    {
        let mut stats = self.0.lock().unwrap();
        f(&mut stats)
    }

    /// Add the time elapsed since `start` to `phase`.
    pub fn elapsed(&self, phase: Phase, start: Instant) {
        let dur = start.elapsed();
        self.record(|stats| {
            let total = match phase {
                Phase::Annotation => &mut stats.annotation_time,
                Phase::Search => &mut stats.search_time,
                Phase::Solver => &mut stats.solver_time,
            };
            *total += dur;
        })
    }

    /// The current values.
    pub fn snapshot(&self) -> WeakeningStats {
        self.0.lock().unwrap().clone()
    }
}

impl fmt::Display for WeakeningStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<22}: {:>6} ({} trivial)",
            "weakenings", self.weakenings, self.trivial
        )?;
        writeln!(
            f,
            "{:<22}: {:>6} ({} abstracted, {} intermediate)",
            "guards", self.guards, self.abstracted, self.intermediate
        )?;
        writeln!(f, "{:<22}: {:>6}", "solver queries", self.queries)?;
        writeln!(f, "{:<22}: {:>6}", "cex iterations", self.cex_iterations)?;
        writeln!(
            f,
            "{:<22}: {:.3}s",
            "annotation",
            self.annotation_time.as_secs_f64()
        )?;
        writeln!(f, "{:<22}: {:.3}s", "search", self.search_time.as_secs_f64())?;
        write!(f, "  {:<20}: {:.3}s", "solver", self.solver_time.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report() {
        let stats = WeakeningStatistics::default();
        stats.record(|s| {
            s.weakenings += 2;
            s.trivial += 1;
            s.guards += 3;
            s.abstracted += 1;
            s.queries += 2;
            s.cex_iterations += 2;
        });
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.queries, 2);
        insta::assert_display_snapshot!(snapshot, @r###"
        weakenings            :      2 (1 trivial)
        guards                :      3 (1 abstracted, 0 intermediate)
        solver queries        :      2
        cex iterations        :      2
        annotation            : 0.000s
        search                : 0.000s
          solver              : 0.000s
        "###);
    }
}
