// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Manage a running SMT process.
//!
//! This is a low-level generic API for SMT-LIB solvers; the solver-specific
//! parts are captured by the [`SolverCmd`] passed to launch the solver.
//!
//! A process can be canceled from another thread through its [`SmtPid`]. A
//! canceled process answers every later request with [`SolverError::Killed`].

use crate::conf::SolverCmd;
use crate::sexp::{self, app, atom_s, sexp_l, Sexp};
use crate::tee::Tee;
use nix::{errno::Errno, sys::signal, unistd::Pid};
use std::{
    ffi::OsStr,
    io::{self, BufRead, BufReader, ErrorKind, Write},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
    sync::{Arc, Mutex},
};
use thiserror::Error;

/// Lifecycle of a solver process, shared with its [`SmtPid`]s.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Status {
    /// Solver is running normally. If `in_call` is true, it is currently
    /// processing a `check-sat` or `get-value` call.
    Running { in_call: bool },
    /// A cancellation was requested while the solver was idle. Commands without
    /// a response are dropped and the next call that needs a response kills the
    /// solver instead of running.
    Stopping,
    /// The solver has been killed but needs a `.wait()` call to reap the process.
    NeedsWait,
    /// The solver has exited and the process has been reaped with `.wait()`.
    Terminated,
}

/// SmtProc wraps an instance of a solver process.
#[derive(Debug)]
pub struct SmtProc {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    tee: Option<Tee>,
    // shared with SmtPids, so they never signal a reaped (and possibly
    // reused) pid
    status: Arc<Mutex<Status>>,
}

/// A handle to the SMT process for cancelling an in-progress check.
#[derive(Debug, Clone)]
pub struct SmtPid {
    pid: Pid,
    status: Arc<Mutex<Status>>,
}

/// SatResp is a solver's response to a `(check-sat)` or similar command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResp {
    /// The query is satisfiable.
    Sat,
    /// The query is unsatisfiable.
    Unsat,
    /// Unknown whether the query is sat or unsat. The reason is the one given
    /// by `(get-info :reason-unknown)`, typically a timeout or incompleteness.
    Unknown(String),
}

/// An error from trying to call the solver
#[derive(Error, Debug)]
pub enum SolverError {
    /// I/O went wrong
    #[error("some I/O went wrong: {0}")]
    Io(#[from] io::Error),
    /// Solver returned an `(error ...)` response or exited
    #[error("solver returned an error:\n{0}")]
    UnexpectedClose(String),
    /// Solver output could not be understood
    #[error("unexpected solver response: {0}")]
    Protocol(String),
    /// The query cannot be posed to the solver
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// Solver killed specifically by SIGKILL signal, after a cancellation
    #[error("solver was killed")]
    Killed,
}

type Result<T> = std::result::Result<T, SolverError>;

// =============================
// State-machine related code
// =============================

impl Drop for SmtProc {
    fn drop(&mut self) {
        self.kill();
    }
}

impl SmtPid {
    /// Cancel the SMT process. A process in the middle of an expensive call
    /// is sent SIGKILL right away; an idle one is marked so that it stops at
    /// its next call.
    pub fn kill(&self) {
        let mut status = self.status.lock().unwrap();
        if let Status::Running { in_call } = *status {
            if !in_call {
                *status = Status::Stopping;
                return;
            }
            if let Err(errno) = signal::kill(self.pid, signal::Signal::SIGKILL) {
                // ESRCH: the process already exited on its own
                if errno != Errno::ESRCH {
                    log::error!("killing SMT process {} failed with {errno}", self.pid);
                }
            }
            *status = Status::NeedsWait;
        }
    }

    /// Whether the process has been canceled or has exited.
    pub fn is_killed(&self) -> bool {
        !matches!(*self.status.lock().unwrap(), Status::Running { .. })
    }
}

impl SmtProc {
    /// Create a new SMT process by running a solver.
    ///
    /// The optional `tee` argument records all SMT input in a directory, for
    /// debugging purposes.
    pub fn new(mut cmd: SolverCmd, tee: Option<&Path>) -> Result<Self> {
        cmd.option("produce-models", "true");
        let mut child = Command::new(OsStr::new(&cmd.cmd))
            .args(&cmd.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        let tee = tee.map(|dir| {
            let mut f = Tee::new(dir);
            f.append(&Sexp::Comment(cmd.cmdline()));
            f
        });
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(SolverError::Protocol("solver pipes unavailable".to_string()));
        };
        let mut proc = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            tee,
            status: Arc::new(Mutex::new(Status::Running { in_call: false })),
        };
        for (option, val) in &cmd.options {
            proc.send(&app(
                "set-option",
                [atom_s(format!(":{option}")), atom_s(val)],
            ))?;
        }
        proc.send(&app("set-logic", [atom_s(&cmd.logic)]))?;
        Ok(proc)
    }

    /// Get a handle to the process for cancellation.
    pub fn pid(&self) -> SmtPid {
        // Child guarantees a positive pid that fits in a pid_t
        let pid = Pid::from_raw(self.child.id() as i32);
        SmtPid {
            pid,
            status: self.status.clone(),
        }
    }

    /// Act on a pending cancellation while the solver is idle: reap the
    /// process and report [`SolverError::Killed`], or do nothing if the solver
    /// is running normally.
    fn handle_termination_status(&mut self, status: &mut Status) -> Result<()> {
        match *status {
            Status::Running { .. } => return Ok(()),
            Status::Stopping => {
                self.child.kill()?;
                self.child.wait()?;
            }
            Status::NeedsWait => {
                self.child.wait()?;
            }
            Status::Terminated => {}
        }
        *status = Status::Terminated;
        Err(SolverError::Killed)
    }

    fn check_killed(&mut self) -> Result<()> {
        let status_m = self.status.clone();
        let mut status = status_m.lock().unwrap();
        self.handle_termination_status(&mut status)
    }

    /// Mark whether the solver is inside an expensive call, during which a
    /// cancellation sends a signal.
    fn set_in_call(&mut self, in_call: bool) -> Result<()> {
        let status_m = self.status.clone();
        let mut status = status_m.lock().unwrap();
        self.handle_termination_status(&mut status)?;
        *status = Status::Running { in_call };
        Ok(())
    }

    /// A marker for determining end of solver response.
    const DONE: &'static str = "<<DONE>>";

    fn write_line(&mut self, line: &str) -> Result<()> {
        let written = writeln!(self.stdin, "{line}").and_then(|_| self.stdin.flush());
        if let Err(err) = written {
            if err.kind() == ErrorKind::BrokenPipe {
                self.check_killed()?;
            }
            return Err(SolverError::from(err));
        }
        Ok(())
    }

    /// Low-level mechanism to get a response. Note that this needs to be issued
    /// after each query that returns a response, since it sends a marker and
    /// waits for the solver to reach that marker.
    fn get_response(&mut self) -> Result<String> {
        self.write_line(&format!(r#"(echo "{}")"#, Self::DONE))?;
        // buf accumulates the entire response, which is read line-by-line
        // looking for the DONE marker.
        let mut buf = String::new();
        loop {
            let last_end = buf.len();
            let n = self.stdout.read_line(&mut buf)?;
            if n == 0 {
                self.check_killed()?;
                return Err(SolverError::UnexpectedClose(Self::parse_error(&buf)));
            }
            let last_line = buf[last_end..].trim_end();
            // Z3 doesn't put quotes and CVC does (quotes do follow SMT-LIB)
            if last_line == Self::DONE || last_line == format!("\"{}\"", Self::DONE) {
                return Ok(buf[..last_end].trim_end().to_string());
            }
        }
    }

    fn kill(&mut self) {
        _ = writeln!(self.stdin, "(exit)");
        _ = self.stdin.flush();
        _ = self.child.kill();
        _ = self.child.wait();
        *self.status.lock().unwrap() = Status::Terminated;
    }

    // ========================
    // Commands
    // ========================

    /// Send the solver a command that has no response. After a cancellation
    /// this silently does nothing.
    pub fn send(&mut self, data: &Sexp) -> Result<()> {
        if self.check_killed().is_err() {
            return Ok(());
        }
        if let Some(f) = &mut self.tee {
            f.append(data);
        }
        self.write_line(&data.to_string())
    }

    /// Send a command and parse its response as a single s-expression.
    fn send_with_reply(&mut self, data: &Sexp) -> Result<Sexp> {
        self.send(data)?;
        let resp = self.get_response()?;
        match sexp::parse(&resp) {
            Ok(s) => match s.app() {
                Some(("error", _)) => Err(SolverError::UnexpectedClose(Self::parse_error(&resp))),
                _ => Ok(s),
            },
            Err(err) => Err(SolverError::Protocol(format!("{resp}: {err}"))),
        }
    }

    /// Declare an uninterpreted constant.
    pub fn declare_const(&mut self, name: &str, sort: &str) -> Result<()> {
        self.send(&app("declare-const", [atom_s(name), atom_s(sort)]))
    }

    /// Assert a formula.
    pub fn assert(&mut self, e: Sexp) -> Result<()> {
        self.send(&app("assert", [e]))
    }

    /// Send the solver `(check-sat-assuming)` with some assumed literals
    /// (symbols or their negations). The assumptions do not affect subsequent
    /// use of the solver.
    pub fn check_sat_assuming(&mut self, assumptions: &[Sexp]) -> Result<SatResp> {
        let cmd = if assumptions.is_empty() {
            app("check-sat", [])
        } else {
            app("check-sat-assuming", [sexp_l(assumptions.to_vec())])
        };
        self.send(&cmd)?;
        self.set_in_call(true)?;
        let resp = self.get_response()?;
        let resp = match resp.as_str() {
            "unsat" => SatResp::Unsat,
            "sat" => SatResp::Sat,
            "unknown" => {
                self.set_in_call(false)?;
                let reason = self.get_info(":reason-unknown")?;
                if let Some(name) = self.save_tee() {
                    log::warn!("unknown response to {}", name.display());
                }
                return Ok(SatResp::Unknown(reason.to_string()));
            }
            _ => {
                self.check_killed()?;
                return Err(SolverError::UnexpectedClose(Self::parse_error(&resp)));
            }
        };
        self.set_in_call(false)?;
        Ok(resp)
    }

    /// Send the solver `(check-sat)`.
    pub fn check_sat(&mut self) -> Result<SatResp> {
        self.check_sat_assuming(&[])
    }

    /// Get the values of some terms (following a sat reply) as pairs of the
    /// term and its value.
    pub fn get_value(&mut self, terms: &[Sexp]) -> Result<Vec<(Sexp, Sexp)>> {
        if terms.is_empty() {
            return Ok(vec![]);
        }
        self.set_in_call(true)?;
        let resp = self.send_with_reply(&app("get-value", [sexp_l(terms.to_vec())]))?;
        self.set_in_call(false)?;
        let malformed = || SolverError::Protocol(format!("malformed get-value response {resp}"));
        resp.list()
            .ok_or_else(malformed)?
            .iter()
            .map(|pair| match pair.list() {
                Some([term, value]) => Ok((term.clone(), value.clone())),
                _ => Err(malformed()),
            })
            .collect()
    }

    /// Get some attribute using the SMT get-info command.
    pub fn get_info(&mut self, attribute: &str) -> Result<Sexp> {
        let resp = self.send_with_reply(&app("get-info", [atom_s(attribute)]))?;
        match resp.list() {
            Some([name, value]) if name.atom_s() == Some(attribute) => Ok(value.clone()),
            _ => Err(SolverError::Protocol(format!(
                "unexpected get-info response {resp}"
            ))),
        }
    }

    /// Extract the message of an `(error "msg")` response, or return the
    /// response itself if it has none.
    fn parse_error(resp: &str) -> String {
        // Z3 returns check-sat errors as:
        // (error "error msg")
        // sat
        //
        // Thus we parse the result as a sequence of sexps and look for the
        // error sexp.
        sexp::parse_many(resp)
            .ok()
            .and_then(|sexps| {
                sexps.iter().find_map(|s| match s.app() {
                    Some(("error", [msg])) => msg.atom_s().map(str::to_string),
                    _ => None,
                })
            })
            .unwrap_or_else(|| resp.to_string())
    }

    // =============
    // Tee support
    // =============

    /// Save the current tee file, if there is one. Returns the name of the
    /// created file (or None if there is no tee'd output setup).
    pub fn save_tee(&self) -> Option<PathBuf> {
        self.tee.as_ref().and_then(|tee| match tee.save() {
            Ok(name) => Some(name),
            Err(err) => {
                // not fatal
                log::error!("failed to save tee: {err}");
                None
            }
        })
    }

    /// Add a comment to the tee'd file.
    ///
    /// The comment is passed as a closure, which is not evaluated if there is
    /// no tee'd smt2 file.
    pub fn comment_with<F>(&mut self, comment: F)
    where
        F: FnOnce() -> String,
    {
        if let Some(f) = &mut self.tee {
            f.append(&Sexp::Comment(String::new()));
            f.append(&Sexp::Comment(comment()));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        conf::Z3Conf,
        path::solver_path,
        proc::{SatResp, SmtProc, SolverError},
        sexp::{app, atom_s, int, parse},
    };
    use eyre::Context;
    use std::{sync::mpsc, thread, time::Duration};

    fn z3() -> Option<SmtProc> {
        let z3 = Z3Conf::new(&solver_path("z3")).done();
        match SmtProc::new(z3, None) {
            Ok(proc) => Some(proc),
            Err(_) => {
                eprintln!("could not find z3, skipping test");
                None
            }
        }
    }

    #[test]
    fn test_check_sat_z3() {
        let Some(mut solver) = z3() else { return };
        let response = solver.check_sat().wrap_err("could not check-sat").unwrap();
        assert_eq!(response, SatResp::Sat);
    }

    #[test]
    fn test_get_value_z3() {
        let Some(mut solver) = z3() else { return };
        solver.declare_const("x@0", "Int").unwrap();
        solver.declare_const("g", "Bool").unwrap();
        solver
            .assert(parse("(and (< x@0 (- 2)) (> x@0 (- 4)) (not g))").unwrap())
            .unwrap();
        assert_eq!(solver.check_sat().unwrap(), SatResp::Sat);
        let values = solver.get_value(&[atom_s("x@0"), atom_s("g")]).unwrap();
        assert_eq!(
            values,
            vec![(atom_s("x@0"), int(-3)), (atom_s("g"), atom_s("false"))]
        );
    }

    #[test]
    fn test_check_sat_assuming_z3() {
        let Some(mut solver) = z3() else { return };
        solver.declare_const("a", "Bool").unwrap();
        solver.declare_const("b", "Bool").unwrap();
        solver.assert(parse("(or a b)").unwrap()).unwrap();
        let unsat = solver
            .check_sat_assuming(&[app("not", [atom_s("a")]), app("not", [atom_s("b")])])
            .unwrap();
        insta::assert_debug_snapshot!(unsat, @"Unsat");
        // assumptions do not persist
        assert_eq!(solver.check_sat().unwrap(), SatResp::Sat);
    }

    #[test]
    fn test_z3_ill_formed() {
        let Some(mut proc) = z3() else { return };
        // unbound symbol
        proc.assert(atom_s("p")).unwrap();
        let r = proc.check_sat();
        assert!(matches!(r, Err(SolverError::UnexpectedClose(_))), "{r:?}");
    }

    #[test]
    fn test_z3_kill() {
        let Some(mut proc) = z3() else { return };
        let pid = proc.pid();
        // floating-point multiplication is slow to bit-blast
        for line in [
            "(reset)",
            "(set-logic QF_FP)",
            "(declare-const a Float32)",
            "(declare-const b Float32)",
            "(declare-const r0 Float32)",
            "(declare-const r1 Float32)",
            "(assert (= r0 (fp.abs a)))",
            "(assert (= r1 (fp.abs b)))",
            "(assert (not (= (fp.mul RNE r0 r1) (fp.mul RNE (fp.abs a) (fp.abs b)))))",
        ] {
            proc.send(&parse(line).unwrap()).unwrap();
        }
        let (send, recv) = mpsc::channel();
        thread::spawn(move || {
            let r = proc.check_sat();
            send.send(r).unwrap();
        });
        // wait for check-sat to start
        thread::sleep(Duration::from_millis(100));
        pid.kill();
        match recv.recv().unwrap() {
            Ok(resp) => panic!("check-sat should not succeed, got {resp:?}"),
            Err(err) => assert!(matches!(err, SolverError::Killed), "wrong solver error {err}"),
        }
    }

    #[test]
    fn test_kill_before_check() {
        let Some(mut proc) = z3() else { return };
        let pid = proc.pid();
        proc.declare_const("a", "Bool").unwrap();

        // the solver is idle, so this only marks it as stopping
        pid.kill();
        proc.assert(atom_s("a")).unwrap();

        assert!(matches!(proc.check_sat(), Err(SolverError::Killed)));
        // every later call fails the same way
        assert!(matches!(proc.check_sat(), Err(SolverError::Killed)));
    }
}
