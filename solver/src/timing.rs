// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Process-wide totals of the time spent in solver calls.

use std::{
    collections::BTreeMap,
    fmt,
    sync::Mutex,
    time::{Duration, Instant},
};

use lazy_static::lazy_static;

/// The kind of solver call being timed.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeType {
    CheckSatCall { sat: bool },
    GetValue,
    Enumerate,
}

impl TimeType {
    fn name(&self) -> &'static str {
        match self {
            TimeType::CheckSatCall { sat: false } => "check-sat (unsat)",
            TimeType::CheckSatCall { sat: true } => "check-sat (sat)",
            TimeType::GetValue => "get-value",
            TimeType::Enumerate => "bounded enumeration",
        }
    }
}

/// Total duration and number of calls.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Total {
    pub time: Duration,
    pub calls: usize,
}

/// Per-kind totals of timed calls.
///
/// `Sync` to support concurrent time recording.
#[derive(Debug, Default)]
pub struct Timings(Mutex<BTreeMap<TimeType, Total>>);

impl Timings {
    /// Record a call of kind `typ` that began at `start`.
    pub fn elapsed(&self, typ: TimeType, start: Instant) {
        let dur = start.elapsed();
        let mut totals = self.0.lock().unwrap();
        let total = totals.entry(typ).or_default();
        total.time += dur;
        total.calls += 1;
    }

    /// The totals recorded so far, by kind.
    pub fn totals(&self) -> BTreeMap<TimeType, Total> {
        self.0.lock().unwrap().clone()
    }
}

impl fmt::Display for Timings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let totals = self.totals();
        let time: Duration = totals.values().map(|t| t.time).sum();
        let calls: usize = totals.values().map(|t| t.calls).sum();
        write!(
            f,
            "{:<22}: {:.1}s {calls:>4} calls",
            "solver total",
            time.as_secs_f64()
        )?;
        for (typ, total) in &totals {
            write!(
                f,
                "\n  {:<20}: {:.1}s {:>4} calls",
                typ.name(),
                total.time.as_secs_f64(),
                total.calls
            )?;
        }
        Ok(())
    }
}

lazy_static! {
    /// The timings of every solver call made by this process.
    pub static ref TIMES: Timings = Timings::default();
}

/// Start timing a call.
pub fn start() -> Instant {
    Instant::now()
}

/// Record the time elapsed since `start` in [`TIMES`].
pub fn elapsed(typ: TimeType, start: Instant) {
    TIMES.elapsed(typ, start)
}

/// Print the report of [`TIMES`] to stdout.
pub fn report() {
    if cfg!(debug_assertions) {
        eprintln!("warning: this is a debug build, non-solver time will be worse");
    }
    println!("{}", *TIMES);
}
