// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Talk SMT-LIB2 to a solver process over its standard input and output.
//!
//! [proc::SmtProc] owns one solver process and exchanges [sexp::Sexp]s with
//! it. [conf] builds the command line for Z3 or CVC5 and [path] finds their
//! binaries.

// configure clippy
#![allow(clippy::needless_return)]
#![deny(clippy::uninlined_format_args)]
// documentation-related lints (only checked when running rustdoc)
#![warn(missing_docs)]
#![allow(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod conf;
pub mod path;
pub mod proc;
pub mod sexp;
mod tee;
