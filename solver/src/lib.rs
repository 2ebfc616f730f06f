// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Satisfiability checking of quantifier-free integer formulas.
//!
//! [basics] defines the [`basics::BasicSolver`] interface the rest of the
//! workspace programs against. It is implemented by SMT-LIB solvers launched
//! as external processes ([`basics::SingleSolver`],
//! [`basics::FallbackSolvers`]) and by an in-process bounded enumerator
//! ([`bounded::BoundedSolver`]) that needs no external binary.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod backends;
pub mod basics;
pub mod bounded;
pub mod conf;
pub mod imp;
mod sexp;
pub mod timing;
