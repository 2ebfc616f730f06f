// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Errors of the weakening engine.

use formula::sorts::SortError;
use smtlib::proc::SolverError;
use thiserror::Error;

/// An error that aborts a weakening. No partial result is ever returned
/// alongside one.
#[derive(Error, Debug)]
pub enum WeakeningError {
    /// The solver failed, answered unknown, or returned an unusable model.
    #[error("solver failure: {0}")]
    SolverFailure(String),
    /// The search was canceled at a query boundary.
    #[error("interrupted during search")]
    Interrupted,
    /// The configuration combines options that do not work together.
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
    /// The weakening query is not well sorted.
    #[error("{0}")]
    Sort(#[from] SortError),
}

impl From<SolverError> for WeakeningError {
    fn from(err: SolverError) -> Self {
        match err {
            SolverError::Killed => WeakeningError::Interrupted,
            err => WeakeningError::SolverFailure(err.to_string()),
        }
    }
}
