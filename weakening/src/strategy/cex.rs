// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Counterexample-guided weakening: start from the strongest candidate and
//! drop the units blamed by each counterexample to induction, until the
//! candidate is inductive.

use formula::{
    semantics::Model,
    syntax::{NOp, Term},
};
use solver::basics::BasicSolver;

use crate::{
    annotate::{Guard, GuardMap},
    conf::RemovalPolicy,
    error::WeakeningError,
    search::{AbstractionSet, Answer, Oracle},
};

/// The kept guards to blame for a counterexample to induction. The search
/// descends the annotated candidate before (`annotated`) and after
/// (`primed`) the transition in lockstep, through sub-formulas the model
/// makes true before and false after: every such operand of a conjunction,
/// and one operand of a disjunction, the first that held before. A unit over
/// variables the transition leaves unchanged is never blamed. Listed left to
/// right without repetition.
pub fn blame(
    map: &GuardMap,
    annotated: &Term,
    primed: &Term,
    model: &Model,
    abstracted: &AbstractionSet,
) -> Result<Vec<Guard>, WeakeningError> {
    let holds = |t: &Term| {
        model.eval_bool(t).map_err(|err| {
            WeakeningError::SolverFailure(format!("could not evaluate counterexample: {err}"))
        })
    };
    let mut blamed = vec![];
    let mut stack = vec![(annotated, primed)];
    while let Some((pre, post)) = stack.pop() {
        if holds(post)? {
            continue;
        }
        if let Some((g, _)) = map.annotation_parts(post) {
            if !abstracted.contains(&g) && !blamed.contains(&g) {
                blamed.push(g);
            }
            continue;
        }
        match (pre, post) {
            (Term::NAryOp(NOp::And, pres), Term::NAryOp(NOp::And, posts)) => {
                stack.extend(pres.iter().zip(posts).rev());
            }
            // dropping one disjunct makes the whole disjunction true
            (Term::NAryOp(NOp::Or, pres), Term::NAryOp(NOp::Or, posts)) => {
                for (pre, post) in pres.iter().zip(posts) {
                    if holds(pre)? {
                        stack.push((pre, post));
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(blamed)
}

/// Grow `mandatory` with blamed guards until the candidate is inductive.
/// `removal` decides whether one or all blamed guards are dropped per round.
pub fn weaken<S: BasicSolver>(
    map: &GuardMap,
    oracle: &Oracle<S>,
    annotated: &Term,
    primed: &Term,
    removal: RemovalPolicy,
    mandatory: AbstractionSet,
) -> Result<AbstractionSet, WeakeningError> {
    let mut abstracted = mandatory;
    // the weakest candidate is `true`, which is inductive
    while abstracted.len() < map.len() {
        oracle.stats().record(|stats| stats.cex_iterations += 1);
        let model = match oracle.check(&abstracted)? {
            Answer::Inductive => break,
            Answer::Counterexample(model) => model,
        };
        log::debug!("counterexample to induction: {model}");
        let blamed = blame(map, annotated, primed, &model, &abstracted)?;
        let dropped = match removal {
            RemovalPolicy::First => &blamed[..blamed.len().min(1)],
            RemovalPolicy::All => &blamed[..],
        };
        if dropped.is_empty() {
            return Err(WeakeningError::SolverFailure(format!(
                "counterexample falsifies no kept unit: {model}"
            )));
        }
        for g in dropped {
            if let Some(unit) = map.unit(g) {
                log::debug!("dropping {g}: {unit}");
            }
        }
        abstracted.extend(dropped.iter().copied());
    }
    Ok(abstracted)
}
