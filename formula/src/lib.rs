// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Quantifier-free formulas over booleans and integers, together with the
//! versioned (SSA) view of program states used by the weakening engine.

// configure clippy
#![allow(clippy::needless_return)]
#![allow(clippy::large_enum_variant)]
// documentation-related lints (only checked when running rustdoc)
#![warn(missing_docs)]
#![allow(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod parser;
pub mod printer;
pub mod semantics;
pub mod sorts;
pub mod syntax;
pub mod term;
pub mod versions;
