// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Support for launching a solver (Z3 or CVC5) with the options each of them
//! needs.

use serde::Serialize;
use smtlib::conf::{CvcConf, SolverCmd, Z3Conf};

use crate::imp::Backend;

/// The type of solver being used
#[allow(missing_docs)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum SolverType {
    Z3,
    Cvc5,
}

#[derive(Debug, Clone, Default)]
struct GenericOptions {
    timeout_ms: Option<usize>,
    seed: usize,
}

/// A Backend for launching Z3/CVC5, with some hard-coded options.
#[derive(Debug, Clone)]
pub struct GenericBackend {
    solver_type: SolverType,
    bin: String,
    opts: GenericOptions,
}

impl GenericBackend {
    /// Create a Backend for a given type of solver and with a path to the
    /// solver binary.
    pub fn new(solver_type: SolverType, bin: &str) -> Self {
        Self {
            solver_type,
            bin: bin.to_string(),
            opts: Default::default(),
        }
    }

    /// Set the solver timeout. None disables the timeout.
    pub fn timeout_ms(&mut self, timeout_ms: Option<usize>) -> &mut Self {
        self.opts.timeout_ms = timeout_ms;
        self
    }

    /// Set the solver's random seed.
    pub fn seed(&mut self, seed: usize) -> &mut Self {
        self.opts.seed = seed;
        self
    }

    /// Get the solver type.
    pub fn get_solver_type(&self) -> SolverType {
        self.solver_type
    }

    /// Get the solver timeout.
    pub fn get_timeout_ms(&self) -> Option<usize> {
        self.opts.timeout_ms
    }
}

impl Backend for &GenericBackend {
    fn get_cmd(&self) -> SolverCmd {
        match self.solver_type {
            SolverType::Z3 => {
                let mut conf = Z3Conf::new(&self.bin);
                conf.timeout_ms(self.opts.timeout_ms);
                if self.opts.seed != 0 {
                    conf.seed(self.opts.seed);
                }
                conf.done()
            }
            SolverType::Cvc5 => {
                let mut conf = CvcConf::new_cvc5(&self.bin);
                conf.timeout_ms(self.opts.timeout_ms);
                if self.opts.seed != 0 {
                    conf.seed(self.opts.seed);
                }
                conf.done()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmdline() {
        let mut backend = GenericBackend::new(SolverType::Z3, "z3");
        backend.timeout_ms(Some(3000)).seed(7);
        let cmd = (&backend).get_cmd();
        assert_eq!(cmd.cmd, "z3");
        assert!(cmd
            .options
            .contains(&("timeout".to_string(), "3000".to_string())));
        assert!(cmd
            .options
            .contains(&("smt.random_seed".to_string(), "7".to_string())));

        let backend = GenericBackend::new(SolverType::Cvc5, "cvc5");
        assert_eq!(backend.get_timeout_ms(), None);
        assert_eq!((&backend).get_cmd().cmd, "cvc5");
    }
}
