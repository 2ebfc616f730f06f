// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Holds the configuration need to launch a solver.

use std::path::PathBuf;

use formula::sorts::Sorts;
use smtlib::proc::SolverError;

use crate::{
    backends::{GenericBackend, SolverType},
    imp::Solver,
};

/// Wrapper around the configuration needed to launch a solver.
#[derive(Debug, Clone)]
pub struct SolverConf {
    /// Which backend to use for launched solvers.
    pub backend: GenericBackend,
    /// The optional path to tee SMT output to.
    pub tee: Option<PathBuf>,
}

impl SolverConf {
    /// Launch a new solver with the given configuration, declaring the
    /// variables in `sorts`.
    pub fn solver(&self, sorts: &Sorts) -> Result<Solver, SolverError> {
        Solver::new(sorts, &self.backend, self.tee.as_deref())
    }

    /// The type of solver launched.
    pub fn solver_type(&self) -> SolverType {
        self.backend.get_solver_type()
    }

    /// The per-query timeout of launched solvers.
    pub fn get_timeout_ms(&self) -> Option<usize> {
        self.backend.get_timeout_ms()
    }
}
