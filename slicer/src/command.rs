// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The slicer binary's command-line interface.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::Args;
use codespan_reporting::{
    diagnostic::{Diagnostic, Label},
    files::SimpleFile,
    term::{
        self as terminal,
        termcolor::{ColorChoice, StandardStream},
        Config,
    },
};
use path_slash::PathExt;

use formula::{
    parser::{parse_error_diagnostic, parse_problem},
    printer,
    sorts::{infer_sorts, SortError},
    syntax::{Problem, Term},
    term::semicnf::DEFAULT_EXPANSION_LIMIT,
    versions::{base_name, instantiate, unprime, PathFormula, VersionMap},
};
use smtlib::path::solver_path;
use solver::{
    backends::{self, GenericBackend},
    basics::{BasicSolver, FallbackSolvers, SingleSolver},
    bounded::BoundedSolver,
    conf::SolverConf,
    timing,
};
use weakening::{
    stats::WeakeningStats, AnnotationMode, InductiveWeakeningManager, RemovalPolicy,
    WeakeningConf, WeakeningError, WeakeningStrategy,
};

#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum SolverType {
    Z3,
    Cvc5,
    Bounded,
}

#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum ColorOutput {
    Never,
    Auto,
    Always,
}

#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum StrategyArg {
    Syntactic,
    Destructive,
    Cex,
    Factorization,
}

#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum AnnotationArg {
    Literals,
    Conjunctions,
}

#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum RemovalArg {
    First,
    All,
}

#[derive(Args, Clone, Debug, PartialEq, Eq)]
struct SolverArgs {
    // solver options are global, meaning they are allowed even after
    // subcommands
    #[arg(value_enum, long, default_value_t = SolverType::Z3, global = true)]
    /// Solver to use
    solver: SolverType,

    #[arg(long, global = true)]
    /// When an SMT solver answers unknown, retry the query with the other one
    fallback: bool,

    #[arg(long, global = true)]
    /// Save the SMT-LIB input of every query to this directory
    smt: Option<PathBuf>,

    #[arg(long, default_value_t = 600, global = true)]
    /// SMT solver timeout in seconds (0 for none)
    timeout: usize,

    #[arg(long, default_value_t = 0, global = true)]
    /// SMT solver random seed
    solver_seed: usize,

    #[arg(long, default_value_t = 8, global = true)]
    /// The bounded solver only tries integers between -N and N
    int_bound: i64,
}

#[derive(Args, Clone, Debug, PartialEq, Eq)]
struct ReportArgs {
    #[arg(long, global = true)]
    /// Print weakening statistics and solver timing
    time: bool,

    #[arg(long, global = true)]
    /// Print weakening statistics as JSON
    json: bool,
}

#[derive(Args, Clone, Debug, PartialEq, Eq)]
struct WeakenArgs {
    #[command(flatten)]
    solver: SolverArgs,

    #[command(flatten)]
    report: ReportArgs,

    #[arg(value_enum, long, default_value_t = StrategyArg::Cex)]
    /// How to decide which units of the candidate to drop
    strategy: StrategyArg,

    #[arg(value_enum, long)]
    /// Guard every literal or every conjunct of the candidate
    annotation: Option<AnnotationArg>,

    #[arg(value_enum, long)]
    /// Drop the first or all units blamed by each counterexample
    removal: Option<RemovalArg>,

    #[arg(long, default_value_t = DEFAULT_EXPANSION_LIMIT)]
    /// Most clauses produced by distributing one disjunction (factorization)
    semicnf_limit: usize,

    /// File name for a problem file with a candidate
    file: String,
}

#[derive(Args, Clone, Debug, PartialEq, Eq)]
struct ClausesArgs {
    #[command(flatten)]
    solver: SolverArgs,

    #[command(flatten)]
    report: ReportArgs,

    /// File name for a problem file with clauses
    file: String,
}

#[derive(clap::Subcommand, Clone, Debug, PartialEq, Eq)]
enum Command {
    /// Weaken the candidate of a problem until it is inductive
    Weaken(WeakenArgs),
    /// Find an inductive subset of the clauses of a problem
    Clauses(ClausesArgs),
    /// Parse and print a problem
    Print { file: String },
}

impl Command {
    fn file(&self) -> &str {
        match self {
            Command::Weaken(WeakenArgs { file, .. }) => file,
            Command::Clauses(ClausesArgs { file, .. }) => file,
            Command::Print { file } => file,
        }
    }
}

/// Weaken loop invariant candidates until the loop preserves them.
#[derive(clap::Parser, Debug)]
#[command(about, long_about=None)]
pub struct App {
    #[arg(value_enum, long, default_value_t = ColorOutput::Auto)]
    color: ColorOutput,

    #[command(subcommand)]
    command: Command,
}

impl SolverArgs {
    fn get_solver_conf(&self, solver_type: backends::SolverType) -> SolverConf {
        let bin = match solver_type {
            backends::SolverType::Z3 => solver_path("z3"),
            backends::SolverType::Cvc5 => solver_path("cvc5"),
        };
        let mut backend = GenericBackend::new(solver_type, &bin);
        backend
            .timeout_ms((self.timeout > 0).then_some(self.timeout * 1000))
            .seed(self.solver_seed);
        SolverConf {
            backend,
            tee: self.smt.clone(),
        }
    }

    /// The SMT solvers to try, in order.
    fn get_solver_confs(&self) -> Vec<SolverConf> {
        let mut types = vec![backends::SolverType::Z3, backends::SolverType::Cvc5];
        if self.solver == SolverType::Cvc5 {
            types.reverse();
        }
        if !self.fallback {
            types.truncate(1);
        }
        types
            .into_iter()
            .map(|typ| self.get_solver_conf(typ))
            .collect()
    }
}

impl WeakenArgs {
    fn get_weakening_conf(&self) -> WeakeningConf {
        WeakeningConf {
            strategy: match self.strategy {
                StrategyArg::Syntactic => WeakeningStrategy::Syntactic,
                StrategyArg::Destructive => WeakeningStrategy::Destructive,
                StrategyArg::Cex => WeakeningStrategy::Cex,
                StrategyArg::Factorization => WeakeningStrategy::Factorization,
            },
            annotation: self.annotation.map(|a| match a {
                AnnotationArg::Literals => AnnotationMode::Literals,
                AnnotationArg::Conjunctions => AnnotationMode::Conjunctions,
            }),
            removal: self.removal.map(|r| match r {
                RemovalArg::First => RemovalPolicy::First,
                RemovalArg::All => RemovalPolicy::All,
            }),
            semicnf_limit: self.semicnf_limit,
        }
    }
}

/// What to compute for a problem.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Task {
    Weaken,
    Clauses,
}

enum Output {
    Weakened(Term),
    Clauses(BTreeSet<Term>),
}

/// Every variable of the problem at version 0.
fn start_versions(problem: &Problem) -> VersionMap {
    problem
        .signature
        .names()
        .map(|name| name.to_string())
        .chain(problem.terms().flat_map(|t| t.x.ids()))
        .map(|name| (base_name(&name).to_string(), 0))
        .collect()
}

fn run<S: BasicSolver>(
    manager: InductiveWeakeningManager<S>,
    problem: &Problem,
    task: Task,
) -> Result<(Output, WeakeningStats), WeakeningError> {
    let manager = manager.with_signature(problem.signature.clone());
    let start = start_versions(problem);
    let transition = unprime(&problem.transition.x, &start);
    let strengthening = match &problem.strengthening {
        Some(s) => instantiate(&s.x, &start),
        None => Term::true_(),
    };
    let output = match task {
        Task::Weaken => {
            let candidate = match &problem.candidate {
                Some(c) => c.x.clone(),
                None => Term::true_(),
            };
            let candidate = PathFormula::at(&candidate, &start);
            Output::Weakened(manager.find_inductive_weakening(
                &candidate,
                &transition,
                &strengthening,
            )?)
        }
        Task::Clauses => {
            let clauses = problem.clauses.iter().map(|c| c.x.clone()).collect();
            Output::Clauses(manager.find_inductive_weakening_for_semi_cnf(
                &start,
                &clauses,
                &transition,
                &strengthening,
            )?)
        }
    };
    Ok((output, manager.stats()))
}

fn solve(
    args: &SolverArgs,
    conf: &WeakeningConf,
    problem: &Problem,
    task: Task,
) -> Result<(Output, WeakeningStats), WeakeningError> {
    match args.solver {
        SolverType::Bounded => {
            let solver = BoundedSolver::new(-args.int_bound, args.int_bound);
            run(InductiveWeakeningManager::new(conf, solver)?, problem, task)
        }
        SolverType::Z3 | SolverType::Cvc5 if args.fallback => {
            let solver = FallbackSolvers::new(args.get_solver_confs());
            run(InductiveWeakeningManager::new(conf, solver)?, problem, task)
        }
        SolverType::Z3 | SolverType::Cvc5 => {
            let mut confs = args.get_solver_confs();
            let solver = SingleSolver::new(confs.remove(0));
            run(InductiveWeakeningManager::new(conf, solver)?, problem, task)
        }
    }
}

fn report(args: &ReportArgs, stats: &WeakeningStats) {
    if args.time {
        println!("{stats}");
        timing::report();
    }
    if args.json {
        match serde_json::to_string_pretty(stats) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("could not serialize statistics: {err}"),
        }
    }
}

impl App {
    /// Run the command, exiting the process on any error.
    pub fn exec(self) {
        let file = match fs::read_to_string(self.command.file()) {
            Ok(file) => file,
            Err(err) => {
                eprintln!("could not read {}: {err}", self.command.file());
                process::exit(1);
            }
        };
        // We make sure paths look like Unix paths on all platforms, otherwise test snapshots don't match.
        let standardized_filename = Path::new(self.command.file()).to_slash_lossy();
        let files = SimpleFile::new(standardized_filename, &file);

        let writer = StandardStream::stderr(match &self.color {
            ColorOutput::Never => ColorChoice::Never,
            ColorOutput::Always => ColorChoice::Always,
            ColorOutput::Auto => ColorChoice::Auto,
        });
        let config = Config {
            start_context_lines: 3,
            end_context_lines: 3,
            ..Default::default()
        };
        let emit = |diagnostic: &Diagnostic<()>| {
            if let Err(err) = terminal::emit(&mut writer.lock(), &config, &files, diagnostic) {
                eprintln!("could not report error: {err}");
            }
        };

        let problem = match parse_problem(&file) {
            Ok(p) => p,
            Err(err) => {
                emit(&parse_error_diagnostic((), &err));
                process::exit(1);
            }
        };

        // sort check each term alone first, to point at the offending one
        for t in problem.terms() {
            match infer_sorts(&problem.signature, [&t.x]) {
                Ok(_) | Err(SortError::UnsolvedSort(_)) => (),
                Err(err) => {
                    eprintln!("sort checking error:");
                    let mut diagnostic = Diagnostic::error().with_message(format!("{err}"));
                    if let Some(span) = t.span {
                        diagnostic =
                            diagnostic.with_labels(vec![Label::primary((), span.start..span.end)]);
                    }
                    emit(&diagnostic);
                    process::exit(1);
                }
            }
        }
        if let Err(err) = infer_sorts(&problem.signature, problem.terms().map(|t| &t.x)) {
            eprintln!("sort checking error:");
            emit(&Diagnostic::error().with_message(format!("{err}")));
            process::exit(1);
        }

        let (solver_args, report_args, conf, task) = match &self.command {
            Command::Print { .. } => {
                println!("{}", printer::problem(&problem));
                return;
            }
            Command::Weaken(args) => {
                if problem.candidate.is_none() {
                    eprintln!("{} has no candidate to weaken", self.command.file());
                    process::exit(1);
                }
                (
                    &args.solver,
                    &args.report,
                    args.get_weakening_conf(),
                    Task::Weaken,
                )
            }
            Command::Clauses(args) => (
                &args.solver,
                &args.report,
                WeakeningConf::default(),
                Task::Clauses,
            ),
        };

        match solve(solver_args, &conf, &problem, task) {
            Ok((output, stats)) => {
                match output {
                    Output::Weakened(t) => println!("{t}"),
                    Output::Clauses(clauses) => {
                        for clause in &clauses {
                            println!("{clause}");
                        }
                    }
                }
                report(report_args, &stats);
            }
            Err(err) => {
                eprintln!("weakening failed: {err}");
                process::exit(1);
            }
        }
    }
}
