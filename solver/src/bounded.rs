// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! An in-process solver that searches for models with every integer variable
//! drawn from a fixed range.
//!
//! The answers are relative to the bounds: [`BasicSolverResp::Unsat`] means
//! there is no model in range, not that there is no model at all. This makes
//! the solver useful for small examples and for testing without an SMT
//! binary installed.

use std::collections::BTreeMap;

use formula::{
    semantics::{EvalError, Model, Value},
    syntax::{Sort, Term},
    term::conjuncts,
};
use smtlib::proc::SolverError;

use crate::{
    basics::{BasicCanceler, BasicSolver, BasicSolverResp, NeverCanceler, QueryConf},
    timing::{self, TimeType},
};

/// How often the search polls its cancelers.
const CANCEL_POLL_STEPS: usize = 1024;

/// A solver that enumerates all assignments with integers in `lo..=hi`,
/// pruning partial assignments that already falsify a conjunct.
#[derive(Debug, Clone)]
pub struct BoundedSolver {
    lo: i64,
    hi: i64,
    max_steps: usize,
}

impl Default for BoundedSolver {
    fn default() -> Self {
        Self::new(-8, 8)
    }
}

impl BoundedSolver {
    /// A solver searching integers in `lo..=hi`.
    pub fn new(lo: i64, hi: i64) -> Self {
        Self {
            lo,
            hi,
            max_steps: 1_000_000,
        }
    }

    /// Give up with an unknown answer after `max_steps` partial assignments.
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    fn domain(&self, sort: Sort) -> Vec<Value> {
        match sort {
            Sort::Bool => vec![Value::Bool(false), Value::Bool(true)],
            Sort::Int => (self.lo..=self.hi).map(Value::Int).collect(),
        }
    }
}

enum Outcome {
    Found,
    Exhausted,
    GaveUp,
    Canceled,
}

struct Search<'a, C: BasicCanceler> {
    solver: &'a BoundedSolver,
    cancelers: Option<&'a C>,
    vars: Vec<(String, Sort)>,
    /// The conjuncts that become fully assigned with each variable
    checks: Vec<Vec<&'a Term>>,
    model: Model,
    steps: usize,
}

impl<C: BasicCanceler> Search<'_, C> {
    fn holds(&self, conjuncts: &[&Term]) -> Result<bool, SolverError> {
        for t in conjuncts {
            match self.model.eval_bool(t) {
                Ok(true) => (),
                Ok(false) | Err(EvalError::Overflow(_)) => return Ok(false),
                Err(err) => return Err(SolverError::InvalidQuery(err.to_string())),
            }
        }
        Ok(true)
    }

    fn run(&mut self, i: usize) -> Result<Outcome, SolverError> {
        if i == self.vars.len() {
            return Ok(Outcome::Found);
        }
        let (name, sort) = self.vars[i].clone();
        for value in self.solver.domain(sort) {
            self.steps += 1;
            if self.steps > self.solver.max_steps {
                return Ok(Outcome::GaveUp);
            }
            if self.steps % CANCEL_POLL_STEPS == 0
                && self.cancelers.is_some_and(|c| c.is_canceled())
            {
                return Ok(Outcome::Canceled);
            }
            self.model.values.insert(name.clone(), value);
            if self.holds(&self.checks[i])? {
                match self.run(i + 1)? {
                    Outcome::Exhausted => (),
                    outcome => return Ok(outcome),
                }
            }
        }
        self.model.values.remove(&name);
        Ok(Outcome::Exhausted)
    }
}

impl BoundedSolver {
    fn search<C: BasicCanceler>(
        &self,
        query_conf: &QueryConf<C>,
        assertions: &[Term],
        assumptions: &BTreeMap<String, bool>,
    ) -> Result<BasicSolverResp, SolverError> {
        let cancelers = query_conf.cancelers.as_ref();
        if cancelers.is_some_and(|c| c.is_canceled()) {
            return Err(SolverError::Killed);
        }

        let mut model = Model::default();
        for (name, value) in assumptions {
            if query_conf.sorts.get(name) == Some(&Sort::Int) {
                return Err(SolverError::InvalidQuery(format!(
                    "cannot assume integer variable {name}"
                )));
            }
            model.values.insert(name.clone(), Value::Bool(*value));
        }

        let conjuncts = assertions.iter().flat_map(conjuncts).collect::<Vec<_>>();
        for t in &conjuncts {
            for name in t.ids() {
                if !query_conf.sorts.contains_key(&name) && !model.values.contains_key(&name) {
                    return Err(SolverError::InvalidQuery(format!(
                        "undeclared variable {name}"
                    )));
                }
            }
        }

        // variables in small conjuncts first, so that pruning happens early
        let mut vars = query_conf
            .sorts
            .iter()
            .filter(|(name, _)| !model.values.contains_key(*name))
            .map(|(name, sort)| {
                let width = conjuncts
                    .iter()
                    .map(|t| t.ids())
                    .filter(|ids| ids.contains(name))
                    .map(|ids| ids.len())
                    .min()
                    .unwrap_or(usize::MAX);
                (width, name.clone(), *sort)
            })
            .collect::<Vec<_>>();
        vars.sort();
        let vars = vars
            .into_iter()
            .map(|(_, name, sort)| (name, sort))
            .collect::<Vec<_>>();

        let position = |name: &String| vars.iter().position(|(n, _)| n == name);
        let mut initial = vec![];
        let mut checks = vec![vec![]; vars.len()];
        for t in &conjuncts {
            match t.ids().iter().filter_map(position).max() {
                Some(i) => checks[i].push(t),
                None => initial.push(t),
            }
        }

        let mut search = Search {
            solver: self,
            cancelers,
            vars,
            checks,
            model,
            steps: 0,
        };
        if !search.holds(&initial)? {
            return Ok(BasicSolverResp::Unsat);
        }
        match search.run(0)? {
            Outcome::Found => Ok(BasicSolverResp::Sat(search.model)),
            Outcome::Exhausted => Ok(BasicSolverResp::Unsat),
            Outcome::GaveUp => Ok(BasicSolverResp::Unknown(format!(
                "no answer within {} steps",
                self.max_steps
            ))),
            Outcome::Canceled => Err(SolverError::Killed),
        }
    }
}

impl BasicSolver for BoundedSolver {
    type Canceler = NeverCanceler;

    fn check_sat(
        &self,
        query_conf: &QueryConf<Self::Canceler>,
        assertions: &[Term],
        assumptions: &BTreeMap<String, bool>,
    ) -> Result<BasicSolverResp, SolverError> {
        let start = timing::start();
        let resp = self.search(query_conf, assertions, assumptions);
        timing::elapsed(TimeType::Enumerate, start);
        log::debug!(
            "            bounded[{}..={}] returned {} after {}ms ({} assertions, {} assumptions)",
            self.lo,
            self.hi,
            match &resp {
                Ok(BasicSolverResp::Sat(_)) => "SAT".to_string(),
                Ok(BasicSolverResp::Unsat) => "UNSAT".to_string(),
                Ok(BasicSolverResp::Unknown(reason)) => format!("unknown: {reason}"),
                Err(err) => format!("error: {err}"),
            },
            start.elapsed().as_millis(),
            assertions.len(),
            assumptions.len(),
        );
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basics::MultiCanceler;
    use formula::{parser::term, sorts::infer_sorts, syntax::Signature};

    fn check(
        solver: &BoundedSolver,
        t: &str,
        assumptions: &[(&str, bool)],
    ) -> Result<BasicSolverResp, SolverError> {
        let t = term(t);
        let sorts = infer_sorts(&Signature::default(), [&t]).unwrap();
        let conf = QueryConf {
            sorts: &sorts,
            cancelers: None,
            save_tee: false,
        };
        let assumptions = assumptions
            .iter()
            .map(|(name, b)| (name.to_string(), *b))
            .collect();
        solver.check_sat(&conf, &[t], &assumptions)
    }

    #[test]
    fn test_sat() {
        let solver = BoundedSolver::default();
        let t = "x@1 = x@0 - 1 & x@0 > 0 & !(x@1 > 0)";
        match check(&solver, t, &[]).unwrap() {
            BasicSolverResp::Sat(model) => {
                assert_eq!(model.values["x@0"], Value::Int(1));
                assert_eq!(model.values["x@1"], Value::Int(0));
                assert_eq!(model.eval_bool(&term(t)), Ok(true));
            }
            resp => panic!("unexpected {resp:?}"),
        }
    }

    #[test]
    fn test_unsat() {
        let solver = BoundedSolver::default();
        let t = "x@1 = x@0 - 1 & x@0 > 0 & !(x@1 >= 0)";
        assert_eq!(check(&solver, t, &[]).unwrap(), BasicSolverResp::Unsat);
        assert_eq!(check(&solver, "false", &[]).unwrap(), BasicSolverResp::Unsat);
        // no model in range
        assert_eq!(
            check(&solver, "x > 100", &[]).unwrap(),
            BasicSolverResp::Unsat
        );
    }

    #[test]
    fn test_assumptions() {
        let solver = BoundedSolver::default();
        let t = "(g | x > 3) & (h | x < 2)";
        assert!(matches!(
            check(&solver, t, &[("g", true), ("h", true)]).unwrap(),
            BasicSolverResp::Sat(_)
        ));
        assert_eq!(
            check(&solver, t, &[("g", false), ("h", false)]).unwrap(),
            BasicSolverResp::Unsat
        );
        match check(&solver, t, &[("g", true), ("h", false)]).unwrap() {
            BasicSolverResp::Sat(model) => {
                assert_eq!(model.values["g"], Value::Bool(true));
                assert_eq!(model.values["h"], Value::Bool(false));
            }
            resp => panic!("unexpected {resp:?}"),
        }
        assert!(check(&solver, "x > 0", &[("x", true)]).is_err());
    }

    #[test]
    fn test_gives_up() {
        let solver = BoundedSolver::new(-100, 100).max_steps(50);
        assert!(matches!(
            check(&solver, "x * y = 97 & y * x = 98", &[]).unwrap(),
            BasicSolverResp::Unknown(_)
        ));
    }

    #[test]
    fn test_canceled() {
        let solver = BoundedSolver::default();
        let t = term("x > 0");
        let sorts = infer_sorts(&Signature::default(), [&t]).unwrap();
        let cancelers = MultiCanceler::new();
        cancelers.cancel();
        let conf = QueryConf {
            sorts: &sorts,
            cancelers: Some(cancelers),
            save_tee: false,
        };
        assert!(matches!(
            solver.check_sat(&conf, &[t], &BTreeMap::new()),
            Err(SolverError::Killed)
        ));
    }
}
