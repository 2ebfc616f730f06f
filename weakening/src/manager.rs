// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The weakening pipeline: normalize, annotate, mark the mandatory
//! abstractions, run a strategy and eliminate the guards.

use std::collections::BTreeSet;
use std::time::Instant;

use formula::{
    syntax::{Signature, Term},
    term::{nnf::nnf, semicnf::to_semi_cnf, simplify::simplify},
    versions::{instantiate, uninstantiate, PathFormula, VersionMap},
};
use solver::basics::{BasicSolver, MultiCanceler};

use crate::{
    annotate::{annotate, annotate_conjunctions, GuardMap},
    conf::{Plan, RemovalPolicy, Strategy, WeakeningConf},
    error::WeakeningError,
    intermediate::mark_intermediate,
    search::{AbstractionSet, Oracle},
    stats::{Phase, WeakeningStatistics, WeakeningStats},
    strategy::{select_guards_to_abstract, WeakeningTask},
};

/// Computes inductive weakenings with one solver and one configuration.
///
/// A manager may be reused for any number of weakenings, one at a time. Only
/// its statistics carry over from one call to the next.
pub struct InductiveWeakeningManager<S: BasicSolver> {
    plan: Plan,
    solver: S,
    signature: Signature,
    cancelers: Option<MultiCanceler<S::Canceler>>,
    stats: WeakeningStatistics,
}

impl<S: BasicSolver> InductiveWeakeningManager<S> {
    /// Validate `conf` and build a manager around `solver`.
    pub fn new(conf: &WeakeningConf, solver: S) -> Result<Self, WeakeningError> {
        let plan = conf.validate()?;
        log::debug!("weakening plan: {plan:?}");
        Ok(Self {
            plan,
            solver,
            signature: Signature::default(),
            cancelers: None,
            stats: WeakeningStatistics::default(),
        })
    }

    /// Declare variable sorts that cannot be inferred from use alone.
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    /// Observe `cancelers` before every query. Canceling them aborts a running
    /// weakening with [`WeakeningError::Interrupted`].
    pub fn with_cancelers(mut self, cancelers: MultiCanceler<S::Canceler>) -> Self {
        self.cancelers = Some(cancelers);
        self
    }

    /// What each weakening does, as validated from the configuration.
    pub fn plan(&self) -> &Plan {
        &self.plan
    }


    /// The statistics accumulated so far.
    pub fn stats(&self) -> WeakeningStats {
        self.stats.snapshot()
    }

    /// Compute a sub-formula of `candidate` that is inductive under
    /// `transition`, assuming `strengthening` in every query.
    ///
    /// `candidate` is versioned at the loop head, `transition` starts from the
    /// same versions and `strengthening` is instantiated at them too. The
    /// result is version-free.
    pub fn find_inductive_weakening(
        &self,
        candidate: &PathFormula,
        transition: &PathFormula,
        strengthening: &Term,
    ) -> Result<Term, WeakeningError> {
        self.stats.record(|stats| stats.weakenings += 1);
        log::debug!("weakening {candidate}");
        log::debug!("transition = {transition}");

        let normalized = match self.plan.semicnf_limit {
            Some(limit) => Term::and(to_semi_cnf(&candidate.formula, limit)),
            None => simplify(&nnf(&candidate.formula)),
        };
        if let Term::Literal(_) = normalized {
            self.stats.record(|stats| stats.trivial += 1);
            return Ok(normalized);
        }

        let start = Instant::now();
        let (annotated, map) = annotate(&normalized, self.plan.annotation);
        let mandatory: AbstractionSet = mark_intermediate(&map, &candidate.versions)
            .into_iter()
            .collect();
        self.stats.elapsed(Phase::Annotation, start);
        self.stats.record(|stats| {
            stats.guards += map.len();
            stats.intermediate += mandatory.len();
        });
        log::debug!(
            "annotated with {} guards ({} intermediate): {annotated}",
            map.len(),
            mandatory.len()
        );

        let abstracted = self.search(
            self.plan.strategy,
            &map,
            &annotated,
            transition,
            strengthening,
            mandatory,
        )?;
        let weakened = uninstantiate(&map.abstract_guards(&annotated, abstracted.as_set()));
        self.stats
            .record(|stats| stats.abstracted += abstracted.len());
        log::info!(
            "kept {} of {} units: {weakened}",
            map.len() - abstracted.len(),
            map.len()
        );
        Ok(weakened)
    }

    /// Compute a subset of `clauses` whose conjunction is inductive under
    /// `transition`. The clauses are version-free and instantiated at
    /// `start`, where `transition` starts. Each clause is kept or dropped
    /// whole.
    pub fn find_inductive_weakening_for_semi_cnf(
        &self,
        start: &VersionMap,
        clauses: &BTreeSet<Term>,
        transition: &PathFormula,
        strengthening: &Term,
    ) -> Result<BTreeSet<Term>, WeakeningError> {
        self.stats.record(|stats| stats.weakenings += 1);
        if clauses.is_empty() {
            self.stats.record(|stats| stats.trivial += 1);
            return Ok(BTreeSet::new());
        }

        let begin = Instant::now();
        let (annotated, map) =
            annotate_conjunctions(clauses.iter().map(|c| instantiate(c, start)));
        self.stats.elapsed(Phase::Annotation, begin);
        self.stats.record(|stats| stats.guards += map.len());

        let abstracted = self.search(
            Strategy::Cex {
                removal: RemovalPolicy::All,
            },
            &map,
            &annotated,
            transition,
            strengthening,
            AbstractionSet::new(),
        )?;
        self.stats
            .record(|stats| stats.abstracted += abstracted.len());

        let mut kept = BTreeSet::new();
        for clause in clauses {
            match map.guard_of(&instantiate(clause, start)) {
                Some(g) if abstracted.contains(&g) => log::info!("dropping clause {clause}"),
                _ => {
                    kept.insert(clause.clone());
                }
            }
        }
        Ok(kept)
    }

    /// Build the weakening query for `annotated` and run `strategy` on it. The
    /// result contains `mandatory`.
    fn search(
        &self,
        strategy: Strategy,
        map: &GuardMap,
        annotated: &Term,
        transition: &PathFormula,
        strengthening: &Term,
        mandatory: AbstractionSet,
    ) -> Result<AbstractionSet, WeakeningError> {
        let start = Instant::now();
        let primed = instantiate(annotated, &transition.versions);
        let query = Term::and([
            annotated.clone(),
            transition.formula.clone(),
            Term::not(primed.clone()),
            strengthening.clone(),
        ]);
        let task = WeakeningTask {
            map,
            transition,
            annotated,
            primed: &primed,
            oracle: Oracle::new(
                &self.solver,
                self.cancelers.as_ref(),
                &self.stats,
                &self.signature,
                map,
                query,
            )?,
        };
        let selected = select_guards_to_abstract(strategy, &task, mandatory.clone());
        self.stats.elapsed(Phase::Search, start);
        let mut abstracted = selected?;
        abstracted.extend(mandatory);
        Ok(abstracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::{AnnotationMode, WeakeningStrategy};
    use formula::{
        parser::term,
        sorts::infer_sorts,
        term::conjuncts,
        versions::{base_name, unprime},
    };
    use smtlib::proc::SolverError;
    use solver::{
        basics::{BasicCanceler, BasicSolverResp, NeverCanceler, QueryConf},
        bounded::BoundedSolver,
    };
    use std::collections::BTreeMap;
    use test_log::test;

    fn start_versions(ts: &[&Term]) -> VersionMap {
        ts.iter()
            .flat_map(|t| t.ids())
            .map(|name| (base_name(&name).to_string(), 0))
            .collect()
    }

    fn conf(strategy: WeakeningStrategy, removal: Option<RemovalPolicy>) -> WeakeningConf {
        WeakeningConf {
            strategy,
            removal,
            ..Default::default()
        }
    }

    fn all_confs() -> Vec<WeakeningConf> {
        vec![
            conf(WeakeningStrategy::Syntactic, None),
            conf(WeakeningStrategy::Destructive, None),
            conf(WeakeningStrategy::Cex, Some(RemovalPolicy::First)),
            conf(WeakeningStrategy::Cex, Some(RemovalPolicy::All)),
            conf(WeakeningStrategy::Factorization, None),
            WeakeningConf {
                annotation: Some(AnnotationMode::Conjunctions),
                ..Default::default()
            },
        ]
    }

    fn weaken_with<S: BasicSolver>(
        manager: &InductiveWeakeningManager<S>,
        candidate: &str,
        transition: &str,
        strengthening: &str,
    ) -> Result<Term, WeakeningError> {
        let (candidate, transition, strengthening) =
            (term(candidate), term(transition), term(strengthening));
        let start = start_versions(&[&candidate, &transition, &strengthening]);
        manager.find_inductive_weakening(
            &PathFormula::at(&candidate, &start),
            &unprime(&transition, &start),
            &instantiate(&strengthening, &start),
        )
    }

    fn weaken(conf: &WeakeningConf, candidate: &str, transition: &str) -> (Term, WeakeningStats) {
        let manager = InductiveWeakeningManager::new(conf, BoundedSolver::default()).unwrap();
        let weakened = weaken_with(&manager, candidate, transition, "true").unwrap();
        (weakened, manager.stats())
    }

    fn is_unsat(query: Term) -> bool {
        let sorts = infer_sorts(&Signature::default(), [&query]).unwrap();
        let resp = BoundedSolver::default()
            .check_sat(
                &QueryConf::<NeverCanceler> {
                    sorts: &sorts,
                    cancelers: None,
                    save_tee: false,
                },
                &[query],
                &BTreeMap::new(),
            )
            .unwrap();
        resp == BasicSolverResp::Unsat
    }

    /// Check that `weakened` follows from `candidate` and is inductive.
    fn check_sound(candidate: &str, transition: &str, weakened: &Term) {
        let (candidate, transition) = (term(candidate), term(transition));
        let start = start_versions(&[&candidate, &transition]);
        let transition = unprime(&transition, &start);
        let pre = instantiate(weakened, &start);
        let post = instantiate(weakened, &transition.versions);
        assert!(is_unsat(Term::and([
            instantiate(&candidate, &start),
            Term::not(pre.clone())
        ])));
        assert!(
            is_unsat(Term::and([pre, transition.formula, Term::not(post)])),
            "{weakened} is not inductive"
        );
    }

    #[test]
    fn test_drop_decreasing() {
        let (candidate, transition) = ("x > 0 & y = 5", "x' = x - 1 & y' = y");
        for conf in all_confs() {
            let (weakened, stats) = weaken(&conf, candidate, transition);
            check_sound(candidate, transition, &weakened);
            let expected = match conf.strategy {
                // y is assigned to, so syntactic weakening drops it too
                WeakeningStrategy::Syntactic => "true",
                _ => "y = 5",
            };
            assert_eq!(weakened.to_string(), expected, "{conf:?}");
            assert_eq!(stats.guards, 2);
        }
    }

    #[test]
    fn test_unassigned_survives_syntactic() {
        let conf = conf(WeakeningStrategy::Syntactic, None);
        let (weakened, stats) = weaken(&conf, "x > 0 & y = 5", "x' = x - 1");
        assert_eq!(weakened.to_string(), "y = 5");
        assert_eq!(stats.queries, 0);
    }

    #[test]
    fn test_constant_candidate() {
        for conf in all_confs() {
            let cases = [("true", "true"), ("false", "false"), ("x = x | true", "true")];
            for (candidate, expected) in cases {
                let (weakened, stats) = weaken(&conf, candidate, "x' = x + 1");
                assert_eq!(weakened.to_string(), expected);
                assert_eq!(stats.queries, 0);
                assert_eq!(stats.guards, 0);
                assert_eq!(stats.trivial, 1);
            }
        }
    }

    #[test]
    fn test_already_inductive() {
        let (candidate, transition) = ("x >= 0 & y = 5", "x' = x + 1 & y' = y");
        for conf in all_confs()
            .into_iter()
            .filter(|conf| conf.strategy != WeakeningStrategy::Syntactic)
        {
            let (weakened, stats) = weaken(&conf, candidate, transition);
            assert_eq!(weakened.to_string(), candidate, "{conf:?}");
            assert_eq!(stats.abstracted, 0);
        }
        let (_, stats) = weaken(&WeakeningConf::default(), candidate, transition);
        assert_eq!(stats.queries, 1);
        assert_eq!(stats.cex_iterations, 1);
    }

    #[test]
    fn test_syntactic_keeps_no_more() {
        let cases = [
            ("x >= 0 & y = 5", "x' = x + 1"),
            ("x > 0 & y = 5 & z < 3", "x' = x - 1 & z' = z + 1"),
            ("(x > 0 | y > 0) & b", "y' = y + 1 & b' = b"),
            ("x = y + 1 & !b", "x' = y + 1 & y' = y & b' = b"),
            // b is shared by both clauses and never changes
            ("(x > 0 | b) & (b | z > 0)", "x' = x - 1"),
            ("(b | x > 0) & (b | z > 0)", "x' = x - 1"),
        ];
        for (candidate, transition) in cases {
            let (syntactic, _) = weaken(
                &conf(WeakeningStrategy::Syntactic, None),
                candidate,
                transition,
            );
            let (cex, _) = weaken(&WeakeningConf::default(), candidate, transition);
            check_sound(candidate, transition, &syntactic);
            check_sound(candidate, transition, &cex);
            let kept: BTreeSet<Term> = conjuncts(&cex).into_iter().collect();
            assert!(
                conjuncts(&syntactic).iter().all(|c| kept.contains(c)),
                "{syntactic} keeps more than {cex}"
            );
        }

        for removal in [RemovalPolicy::First, RemovalPolicy::All] {
            let (cex, _) = weaken(
                &conf(WeakeningStrategy::Cex, Some(removal)),
                "(x > 0 | b) & (b | z > 0)",
                "x' = x - 1",
            );
            assert_eq!(cex.to_string(), "b | z > 0", "{removal:?}");
        }
    }

    #[test]
    fn test_disjunction() {
        // dropping either disjunct drops the whole disjunction
        let (candidate, transition) = ("(x > 0 | y > 0) & z = 1", "x' = x - 1 & y' = y + 1");
        for conf in all_confs() {
            let (weakened, _) = weaken(&conf, candidate, transition);
            check_sound(candidate, transition, &weakened);
            assert_eq!(weakened.to_string(), "z = 1", "{conf:?}");
        }
    }

    #[test]
    fn test_factorization() {
        let candidate = "(y = 5 & x > 0) | (y = 5 & x > 3)";
        let transition = "x' = x - 1 & y' = y";
        let (weakened, stats) = weaken(
            &conf(WeakeningStrategy::Factorization, None),
            candidate,
            transition,
        );
        check_sound(candidate, transition, &weakened);
        assert_eq!(weakened.to_string(), "y = 5");
        assert_eq!(stats.guards, 2);
        assert_eq!(stats.queries, 2);

        let manager = InductiveWeakeningManager::new(
            &conf(WeakeningStrategy::Factorization, None),
            BoundedSolver::default(),
        )
        .unwrap();
        assert_eq!(manager.plan().annotation, AnnotationMode::Conjunctions);
        assert_eq!(
            manager.plan().strategy,
            Strategy::Cex {
                removal: RemovalPolicy::First
            }
        );
        assert!(manager.plan().semicnf_limit.is_some());
    }

    #[test]
    fn test_strengthening() {
        let manager =
            InductiveWeakeningManager::new(&WeakeningConf::default(), BoundedSolver::default())
                .unwrap();
        let weakened = weaken_with(&manager, "x > 0 & y = 5", "x' = x + y", "y >= 0").unwrap();
        assert_eq!(weakened.to_string(), "x > 0 & y = 5");
        let weakened = weaken_with(&manager, "x > 0 & y = 5", "x' = x + y", "true").unwrap();
        assert_eq!(weakened.to_string(), "x > 0 & y = 5");
        let weakened = weaken_with(&manager, "x > 0", "x' = x + y", "true").unwrap();
        assert_eq!(weakened.to_string(), "true");
        let weakened = weaken_with(&manager, "x > 0", "x' = x + y", "y > 0").unwrap();
        assert_eq!(weakened.to_string(), "x > 0");
        assert_eq!(manager.stats().weakenings, 4);
    }

    #[test]
    fn test_intermediate_always_abstracted() {
        let versions: VersionMap = [("x", 0), ("y", 0), ("t", 2)].into_iter().collect();
        let candidate = PathFormula::new(term("x@0 > 0 & t@1 = 3 & y@0 = 5"), versions.clone());
        let transition = unprime(&term("x' = x + 1"), &versions);
        for conf in all_confs() {
            let manager = InductiveWeakeningManager::new(&conf, BoundedSolver::default()).unwrap();
            let weakened = manager
                .find_inductive_weakening(&candidate, &transition, &Term::true_())
                .unwrap();
            assert!(!weakened.ids().contains("t"), "{conf:?}: {weakened}");
            assert_eq!(manager.stats().intermediate, 1);
        }
        let manager =
            InductiveWeakeningManager::new(&WeakeningConf::default(), BoundedSolver::default())
                .unwrap();
        let weakened = manager
            .find_inductive_weakening(&candidate, &transition, &Term::true_())
            .unwrap();
        assert_eq!(weakened.to_string(), "x > 0 & y = 5");
    }

    #[test]
    fn test_query_bound() {
        let candidate = "a > 0 & b > 0 & c > 0 & d = 1 & e < 0";
        let transition = "a' = a - 1 & b' = b - 1 & c' = c - 1 & e' = e + 1";
        let confs = [
            conf(WeakeningStrategy::Cex, Some(RemovalPolicy::First)),
            conf(WeakeningStrategy::Cex, Some(RemovalPolicy::All)),
            conf(WeakeningStrategy::Destructive, None),
        ];
        for conf in confs {
            let manager = InductiveWeakeningManager::new(&conf, BoundedSolver::new(-3, 3)).unwrap();
            let weakened = weaken_with(&manager, candidate, transition, "true").unwrap();
            assert_eq!(weakened.to_string(), "d = 1");
            let stats = manager.stats();
            assert_eq!(stats.abstracted, 4);
            if conf.strategy == WeakeningStrategy::Destructive {
                assert_eq!(stats.queries, 5);
            } else {
                assert!(stats.queries <= 5, "{conf:?}: {} queries", stats.queries);
                assert_eq!(stats.queries, stats.cex_iterations);
            }
        }
    }

    #[test]
    fn test_semi_cnf_clauses() {
        let manager = InductiveWeakeningManager::new(
            &WeakeningConf::default(),
            BoundedSolver::new(-16, 16),
        )
        .unwrap();
        let clauses: BTreeSet<Term> = [term("x >= 0"), term("x < 10 | x = 10")]
            .into_iter()
            .collect();
        let start: VersionMap = [("x", 0)].into_iter().collect();
        let transition = unprime(&term("x' = x + 1"), &start);
        let kept = manager
            .find_inductive_weakening_for_semi_cnf(&start, &clauses, &transition, &Term::true_())
            .unwrap();
        assert_eq!(kept, [term("x >= 0")].into_iter().collect());

        // bounded from above by the strengthening, both clauses are inductive
        let kept = manager
            .find_inductive_weakening_for_semi_cnf(
                &start,
                &clauses,
                &transition,
                &term("x@0 < 10"),
            )
            .unwrap();
        assert_eq!(kept, clauses);

        let kept = manager
            .find_inductive_weakening_for_semi_cnf(
                &start,
                &BTreeSet::new(),
                &transition,
                &Term::true_(),
            )
            .unwrap();
        assert!(kept.is_empty());
    }

    struct Unknown;

    impl BasicSolver for Unknown {
        type Canceler = NeverCanceler;

        fn check_sat(
            &self,
            _query_conf: &QueryConf<Self::Canceler>,
            _assertions: &[Term],
            _assumptions: &BTreeMap<String, bool>,
        ) -> Result<BasicSolverResp, SolverError> {
            Ok(BasicSolverResp::Unknown("timeout".to_string()))
        }
    }

    struct Broken(fn() -> SolverError);

    impl BasicSolver for Broken {
        type Canceler = NeverCanceler;

        fn check_sat(
            &self,
            _query_conf: &QueryConf<Self::Canceler>,
            _assertions: &[Term],
            _assumptions: &BTreeMap<String, bool>,
        ) -> Result<BasicSolverResp, SolverError> {
            Err((self.0)())
        }
    }

    #[test]
    fn test_solver_failures() {
        let manager = InductiveWeakeningManager::new(&WeakeningConf::default(), Unknown).unwrap();
        let err = weaken_with(&manager, "x > 0", "x' = x - 1", "true").unwrap_err();
        assert!(matches!(err, WeakeningError::SolverFailure(_)), "{err}");

        let manager = InductiveWeakeningManager::new(
            &WeakeningConf::default(),
            Broken(|| SolverError::UnexpectedClose("".to_string())),
        )
        .unwrap();
        let err = weaken_with(&manager, "x > 0", "x' = x - 1", "true").unwrap_err();
        assert!(matches!(err, WeakeningError::SolverFailure(_)), "{err}");

        let manager =
            InductiveWeakeningManager::new(&WeakeningConf::default(), Broken(|| SolverError::Killed))
                .unwrap();
        let err = weaken_with(&manager, "x > 0", "x' = x - 1", "true").unwrap_err();
        assert!(matches!(err, WeakeningError::Interrupted), "{err}");

        // syntactic weakening never asks
        let manager = InductiveWeakeningManager::new(
            &conf(WeakeningStrategy::Syntactic, None),
            Broken(|| SolverError::Killed),
        )
        .unwrap();
        let weakened = weaken_with(&manager, "x > 0 & y = 1", "x' = x - 1", "true").unwrap();
        assert_eq!(weakened.to_string(), "y = 1");
    }

    #[test]
    fn test_canceled() {
        let cancelers = MultiCanceler::new();
        let manager =
            InductiveWeakeningManager::new(&WeakeningConf::default(), BoundedSolver::default())
                .unwrap()
                .with_cancelers(cancelers.clone());
        assert!(weaken_with(&manager, "x > 0", "x' = x - 1", "true").is_ok());
        cancelers.cancel();
        let err = weaken_with(&manager, "x > 0", "x' = x - 1", "true").unwrap_err();
        assert!(matches!(err, WeakeningError::Interrupted));
        // constant candidates need no query
        assert!(weaken_with(&manager, "true", "x' = x - 1", "true").is_ok());
    }

    /// Answers one query, then cancels the weakening it belongs to.
    struct CancelAfterFirst {
        solver: BoundedSolver,
        cancelers: MultiCanceler<NeverCanceler>,
    }

    impl BasicSolver for CancelAfterFirst {
        type Canceler = NeverCanceler;

        fn check_sat(
            &self,
            query_conf: &QueryConf<Self::Canceler>,
            assertions: &[Term],
            assumptions: &BTreeMap<String, bool>,
        ) -> Result<BasicSolverResp, SolverError> {
            let resp = self.solver.check_sat(query_conf, assertions, assumptions);
            self.cancelers.cancel();
            resp
        }
    }

    #[test]
    fn test_canceled_during_search() {
        for conf in [
            conf(WeakeningStrategy::Cex, Some(RemovalPolicy::First)),
            conf(WeakeningStrategy::Cex, Some(RemovalPolicy::All)),
            conf(WeakeningStrategy::Destructive, None),
        ] {
            let cancelers = MultiCanceler::new();
            let solver = CancelAfterFirst {
                solver: BoundedSolver::default(),
                cancelers: cancelers.clone(),
            };
            let manager = InductiveWeakeningManager::new(&conf, solver)
                .unwrap()
                .with_cancelers(cancelers);
            let err = weaken_with(&manager, "x > 0 & y = 5", "x' = x - 1 & y' = y", "true")
                .unwrap_err();
            assert!(matches!(err, WeakeningError::Interrupted), "{conf:?}: {err}");
            let stats = manager.stats();
            assert_eq!(stats.queries, 1, "{conf:?}");
            assert_eq!(stats.abstracted, 0, "{conf:?}");
        }
    }

    #[test]
    fn test_sort_error() {
        let manager =
            InductiveWeakeningManager::new(&WeakeningConf::default(), BoundedSolver::default())
                .unwrap();
        let err = weaken_with(&manager, "x > 0 & x", "x' = x - 1", "true").unwrap_err();
        assert!(matches!(err, WeakeningError::Sort(_)), "{err}");
    }

    #[test]
    fn test_unsupported() {
        let conf = WeakeningConf {
            strategy: WeakeningStrategy::Destructive,
            removal: Some(RemovalPolicy::First),
            ..Default::default()
        };
        assert!(matches!(
            InductiveWeakeningManager::new(&conf, BoundedSolver::default()),
            Err(WeakeningError::UnsupportedConfiguration(_))
        ));
    }
}
