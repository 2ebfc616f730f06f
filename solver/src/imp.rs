// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! A running SMT solver that speaks in [`Term`]s.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use formula::{
    semantics::{Model, Value},
    sorts::Sorts,
    syntax::{Sort, Term},
};
use smtlib::{
    conf::SolverCmd,
    proc::{SatResp, SmtPid, SmtProc, SolverError},
    sexp::{atom_s, InterpretedValue},
};

use crate::{
    sexp,
    timing::{self, TimeType},
};

/// A [`Solver`] requires a Backend, which specifies how to start a particular
/// solver process.
pub trait Backend {
    /// Get a [`SolverCmd`] with all the info to launch instances of this solver.
    fn get_cmd(&self) -> SolverCmd;
}

/// A Solver provides an interface to a running SMT solver, allowing interaction
/// with it using [`Term`]s over a fixed set of declared variables.
pub struct Solver {
    proc: SmtProc,
    sorts: Sorts,
}

impl Solver {
    /// Start a Solver for a particular backend and declare every variable in
    /// `sorts`.
    ///
    /// The `tee` argument causes the SMT2 output sent to the solver to also be
    /// sent to a file, for debugging purposes.
    pub fn new<B: Backend>(
        sorts: &Sorts,
        backend: B,
        tee: Option<&Path>,
    ) -> Result<Self, SolverError> {
        let mut proc = SmtProc::new(backend.get_cmd(), tee)?;
        for (name, sort) in sorts {
            proc.send(&smtlib::sexp::app(
                "declare-const",
                [atom_s(name), sexp::sort(*sort)],
            ))?;
        }
        Ok(Self {
            proc,
            sorts: sorts.clone(),
        })
    }

    /// Get a handle for canceling the solver from another thread.
    pub fn pid(&self) -> SmtPid {
        self.proc.pid()
    }

    /// Send `(assert ...)` to the solver.
    pub fn assert(&mut self, t: &Term) -> Result<(), SolverError> {
        self.proc.assert(sexp::term(t))
    }

    /// Create a comment in the tee'd SMT file, if there is one.
    pub fn comment_with<F>(&mut self, comment: F)
    where
        F: FnOnce() -> String,
    {
        self.proc.comment_with(comment)
    }

    /// The `assumptions` map should map boolean variables to whether they
    /// should be assumed true or false. Variables that were not declared up
    /// front are declared as booleans.
    pub fn check_sat(
        &mut self,
        assumptions: &BTreeMap<String, bool>,
    ) -> Result<SatResp, SolverError> {
        for name in assumptions.keys() {
            match self.sorts.get(name) {
                Some(Sort::Bool) => (),
                Some(Sort::Int) => {
                    return Err(SolverError::InvalidQuery(format!(
                        "cannot assume integer variable {name}"
                    )))
                }
                None => {
                    self.proc.declare_const(name, "Bool")?;
                    self.sorts.insert(name.clone(), Sort::Bool);
                }
            }
        }
        let assumptions = assumptions
            .iter()
            .map(|(name, set_true)| {
                let ind = Term::id(name);
                if *set_true {
                    sexp::term(&ind)
                } else {
                    sexp::negated_term(&ind)
                }
            })
            .collect::<Vec<_>>();
        let start = timing::start();
        let r = self.proc.check_sat_assuming(&assumptions);
        timing::elapsed(
            TimeType::CheckSatCall {
                sat: matches!(r, Ok(SatResp::Sat)),
            },
            start,
        );
        r
    }

    /// After a sat response to check_sat, produce a model giving a value to
    /// every declared variable.
    pub fn get_model(&mut self) -> Result<Model, SolverError> {
        let names = self.sorts.keys().cloned().collect::<Vec<_>>();
        let start = timing::start();
        let values = self
            .proc
            .get_value(&names.iter().map(atom_s).collect::<Vec<_>>())?;
        timing::elapsed(TimeType::GetValue, start);
        if values.len() != names.len() {
            return Err(SolverError::Protocol(format!(
                "asked for {} values but got {}",
                names.len(),
                values.len()
            )));
        }
        names
            .into_iter()
            .zip(values)
            .map(|(name, (_, value))| {
                let value = match value.interpreted_value() {
                    Some(InterpretedValue::Bool(b)) => Value::Bool(b),
                    Some(InterpretedValue::Int(n)) => Value::Int(n),
                    None => {
                        return Err(SolverError::Protocol(format!(
                            "uninterpretable value {value} for {name}"
                        )))
                    }
                };
                Ok((name, value))
            })
            .collect()
    }

    /// Save the tee'd SMT file, if there is one.
    pub fn save_tee(&self) -> Option<PathBuf> {
        self.proc.save_tee()
    }
}
