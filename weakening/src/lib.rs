// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Inductive weakening: given a candidate predicate at a loop head and a
//! transition relation for one iteration, find a sub-predicate of the
//! candidate that the loop preserves.
//!
//! Every unit of the candidate (a literal, or a conjunct) is paired with a
//! boolean guard by [annotate]. A strategy from [strategy] then searches for
//! a set of guards to abstract such that the kept units form an inductive
//! predicate, asking a [`solver::basics::BasicSolver`] to check each choice.
//! [`InductiveWeakeningManager`] runs the whole pipeline.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod annotate;
pub mod conf;
pub mod error;
pub mod intermediate;
pub mod manager;
pub mod search;
pub mod stats;
pub mod strategy;

pub use conf::{AnnotationMode, RemovalPolicy, WeakeningConf, WeakeningStrategy};
pub use error::WeakeningError;
pub use manager::InductiveWeakeningManager;
