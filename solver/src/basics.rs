// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Traits defining a very basic interface to SMT solvers and a few implementations of them.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use formula::{semantics::Model, sorts::Sorts, syntax::Term};
use smtlib::proc::{SatResp, SmtPid, SolverError};

use crate::conf::SolverConf;

/// Check the following SMT query with the given solver configuration.
/// The query is defined by the query configuration, a sequence of assertions,
/// and a map from boolean variables to the value they should be assumed to
/// take.
fn check_sat_conf(
    solver_conf: &SolverConf,
    query_conf: &QueryConf<SmtPid>,
    assertions: &[Term],
    assumptions: &BTreeMap<String, bool>,
) -> Result<BasicSolverResp, SolverError> {
    let assertion_sizes: Vec<_> = assertions.iter().map(|t| t.size()).collect();
    let start_time = std::time::Instant::now();
    let log_result = |res: String| {
        log::debug!(
            "            {:?}(timeout={}) returned {res} after {}ms ({} assertions: max_size={}, sum_size={}; {} assumptions)",
            solver_conf.solver_type(),
            solver_conf.get_timeout_ms().unwrap_or(0) / 1000,
            start_time.elapsed().as_millis(),
            assertions.len(),
            assertion_sizes.iter().max().unwrap_or(&0),
            assertion_sizes.iter().sum::<usize>(),
            assumptions.len(),
        );
    };
    let mut solver = solver_conf.solver(query_conf.sorts)?;
    if query_conf
        .cancelers
        .as_ref()
        .is_some_and(|c| !c.add_canceler(solver.pid()))
    {
        return Err(SolverError::Killed);
    }

    for t in assertions {
        solver.assert(t)?;
    }
    solver.comment_with(|| {
        let assumed = assumptions.iter().filter(|(_, b)| **b).count();
        format!("{assumed} of {} assumptions true", assumptions.len())
    });

    let resp = match solver.check_sat(assumptions) {
        Ok(SatResp::Sat) => {
            let get_model_start = std::time::Instant::now();
            let res = solver.get_model().map(BasicSolverResp::Sat);
            match &res {
                Ok(_) => log_result(format!(
                    "SAT({}ms)",
                    get_model_start.elapsed().as_millis()
                )),
                Err(err) => log_result(format!("error: {err}")),
            }
            res
        }
        Ok(SatResp::Unsat) => {
            log_result("UNSAT".to_string());
            Ok(BasicSolverResp::Unsat)
        }
        Ok(SatResp::Unknown(reason)) => {
            log_result(format!("unknown: {reason}"));
            Ok(BasicSolverResp::Unknown(reason))
        }
        Err(err) => {
            log_result(format!("error: {err}"));
            Err(err)
        }
    };

    if query_conf.save_tee {
        solver.save_tee();
    }

    resp
}

/// Defines a configuration for performing a solver query.
pub struct QueryConf<'a, C: BasicCanceler> {
    /// The sort of every variable occurring in the query
    pub sorts: &'a Sorts,
    /// Optional [`MultiCanceler`] which can be used to cancel the query at any time
    pub cancelers: Option<MultiCanceler<C>>,
    /// Whether to save the solver tee after the query
    pub save_tee: bool,
}

/// A basic solver response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasicSolverResp {
    /// A sat response together with a satisfying assignment to every variable
    Sat(Model),
    /// An unsat response
    Unsat,
    /// An unknown response together with a reason
    Unknown(String),
}

/// A basic solver interface
pub trait BasicSolver: Sync + Send {
    /// A canceler type for this solver, able to cancel queries at any time
    type Canceler: BasicCanceler;

    /// Check the satisfiability of the following query using the solver.
    /// The query is defined by a query configuration, a sequence of assertions,
    /// and a map from boolean variables to whether they should be assumed
    /// to be true or false. Assumptions hold for this query only.
    fn check_sat(
        &self,
        query_conf: &QueryConf<Self::Canceler>,
        assertions: &[Term],
        assumptions: &BTreeMap<String, bool>,
    ) -> Result<BasicSolverResp, SolverError>;
}

/// A basic canceler object, able to cancel queries at any time
pub trait BasicCanceler: Sync + Send {
    /// Cancel the query associated with this canceler.
    fn cancel(&self);

    /// Check whether the canceler has been canceled.
    fn is_canceled(&self) -> bool;
}

/// Maintains a set of [`BasicCanceler`]'s which can be used to cancel queries whenever necessary.
/// Composed of a `bool` which tracks whether the set has been canceled, followed by the
/// [`BasicCanceler`]'s of the solvers it tracks.
///
/// Note that this can be used recursively to create hierarchical cancellation, since [`MultiCanceler`]
/// itself implements [`BasicCanceler`].
pub struct MultiCanceler<C: BasicCanceler>(Arc<RwLock<(bool, Vec<C>)>>);

impl<C: BasicCanceler> Clone for MultiCanceler<C> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<C: BasicCanceler> Default for MultiCanceler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: BasicCanceler> MultiCanceler<C> {
    /// Create a new empty set of solver cancelers.
    pub fn new() -> Self {
        MultiCanceler(Arc::new(RwLock::new((false, vec![]))))
    }

    /// Add the given canceler to the set of cancelers.
    ///
    /// Returns `true` if the [`BasicCanceler`] was added, or `false` if the set has already been canceled.
    pub fn add_canceler(&self, canceler: C) -> bool {
        if self.is_canceled() {
            return false;
        }

        let mut cancelers = self.0.write().unwrap();
        if cancelers.0 {
            false
        } else {
            cancelers.1.push(canceler);
            true
        }
    }
}

impl<C: BasicCanceler> BasicCanceler for MultiCanceler<C> {
    /// Cancel all solvers tracked by this set of cancelers.
    fn cancel(&self) {
        let mut cancelers = self.0.write().unwrap();
        cancelers.0 = true;
        for canceler in cancelers.1.drain(..) {
            canceler.cancel();
        }
    }

    fn is_canceled(&self) -> bool {
        let cancelers = self.0.read().unwrap();
        cancelers.0
    }
}

/// A canceler for solvers that never run a query that can be interrupted
/// from outside; such solvers poll their [`MultiCanceler`] instead.
pub struct NeverCanceler;

impl BasicCanceler for NeverCanceler {
    fn cancel(&self) {}

    fn is_canceled(&self) -> bool {
        false
    }
}

/// A basic solver which uses a single solver configuration
pub struct SingleSolver(SolverConf);

/// A set of solvers used in a fallback fashion: on each query the solvers
/// are tried sequentially until (1) one of them returns a sat/unsat/error response,
/// (2) the query is canceled, or (3) all solvers return unknown.
pub struct FallbackSolvers(Vec<SolverConf>);

impl BasicCanceler for SmtPid {
    fn cancel(&self) {
        self.kill()
    }

    fn is_canceled(&self) -> bool {
        self.is_killed()
    }
}

impl SingleSolver {
    /// Create a new solver with the given configuration.
    pub fn new(conf: SolverConf) -> Self {
        Self(conf)
    }
}

impl BasicSolver for SingleSolver {
    type Canceler = SmtPid;

    fn check_sat(
        &self,
        query_conf: &QueryConf<Self::Canceler>,
        assertions: &[Term],
        assumptions: &BTreeMap<String, bool>,
    ) -> Result<BasicSolverResp, SolverError> {
        check_sat_conf(&self.0, query_conf, assertions, assumptions)
    }
}

impl FallbackSolvers {
    /// Create a new set of fallback solvers with the given configurations.
    pub fn new(confs: Vec<SolverConf>) -> Self {
        Self(confs)
    }
}

impl BasicSolver for FallbackSolvers {
    type Canceler = SmtPid;

    fn check_sat(
        &self,
        query_conf: &QueryConf<Self::Canceler>,
        assertions: &[Term],
        assumptions: &BTreeMap<String, bool>,
    ) -> Result<BasicSolverResp, SolverError> {
        let mut unknowns: Vec<String> = vec![];
        for solver_conf in &self.0 {
            match check_sat_conf(solver_conf, query_conf, assertions, assumptions) {
                Ok(BasicSolverResp::Unknown(reason)) => {
                    unknowns.push(reason);
                }
                res => return res,
            }
        }

        Ok(BasicSolverResp::Unknown(unknowns.join("\n")))
    }
}
