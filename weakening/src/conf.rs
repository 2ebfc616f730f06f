// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration of the weakening engine.

use serde::Serialize;

use formula::term::semicnf::DEFAULT_EXPANSION_LIMIT;

use crate::error::WeakeningError;

/// Which search decides the literals to drop.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub enum WeakeningStrategy {
    /// Drop every literal over a variable the transition assigns to.
    Syntactic,
    /// Drop everything, then re-admit literals one at a time.
    Destructive,
    /// Drop the literals blamed by counterexamples to induction.
    #[default]
    Cex,
    /// Semi-CNF conversion followed by clause-level counterexample search.
    Factorization,
}

/// The granularity of selector annotation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub enum AnnotationMode {
    /// One selector per literal.
    #[default]
    Literals,
    /// One selector per top-level conjunct. Less granular.
    Conjunctions,
}

/// How many blamed literals the counterexample search drops per round.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub enum RemovalPolicy {
    /// Only the first blamed literal.
    First,
    /// Every blamed literal.
    #[default]
    All,
}

/// User-facing configuration of an [`crate::InductiveWeakeningManager`].
///
/// `annotation` and `removal` are optional so that a conflicting explicit
/// choice can be told apart from a default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WeakeningConf {
    /// Defaults to [`WeakeningStrategy::Cex`].
    pub strategy: WeakeningStrategy,
    /// Defaults to [`AnnotationMode::Literals`], or
    /// [`AnnotationMode::Conjunctions`] under factorization.
    pub annotation: Option<AnnotationMode>,
    /// Only meaningful for the counterexample-based strategies.
    pub removal: Option<RemovalPolicy>,
    /// The most clauses semi-CNF conversion may produce by distributing one
    /// disjunction.
    pub semicnf_limit: usize,
}

impl Default for WeakeningConf {
    fn default() -> Self {
        Self {
            strategy: WeakeningStrategy::default(),
            annotation: None,
            removal: None,
            semicnf_limit: DEFAULT_EXPANSION_LIMIT,
        }
    }
}

/// The search a [`Plan`] runs, carrying only the configuration it needs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Strategy {
    /// Abstract the units that mention a variable the transition changes
    Syntactic,
    /// Start from `true` and re-admit units one at a time
    Destructive,
    /// Drop the units blamed by counterexamples to induction
    Cex {
        /// How many blamed units one counterexample drops
        removal: RemovalPolicy,
    },
}

/// A validated configuration, resolved into what the orchestrator does.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// The search to run
    pub strategy: Strategy,
    /// The granularity of units
    pub annotation: AnnotationMode,
    /// Some(limit) to convert the candidate to semi-CNF, None for NNF
    pub semicnf_limit: Option<usize>,
}

impl WeakeningConf {
    /// Check the configuration and resolve it into a [`Plan`].
    pub fn validate(&self) -> Result<Plan, WeakeningError> {
        let unsupported =
            |msg: &str| Err(WeakeningError::UnsupportedConfiguration(msg.to_string()));
        if self.semicnf_limit == 0 {
            return unsupported("the semi-CNF expansion limit must be positive");
        }
        let annotation = self.annotation.unwrap_or_default();
        match self.strategy {
            WeakeningStrategy::Syntactic | WeakeningStrategy::Destructive
                if self.removal.is_some() =>
            {
                unsupported("a removal policy only applies to counterexample-based strategies")
            }
            WeakeningStrategy::Syntactic => Ok(Plan {
                strategy: Strategy::Syntactic,
                annotation,
                semicnf_limit: None,
            }),
            WeakeningStrategy::Destructive => Ok(Plan {
                strategy: Strategy::Destructive,
                annotation,
                semicnf_limit: None,
            }),
            WeakeningStrategy::Cex => Ok(Plan {
                strategy: Strategy::Cex {
                    removal: self.removal.unwrap_or_default(),
                },
                annotation,
                semicnf_limit: None,
            }),
            WeakeningStrategy::Factorization => {
                if self.annotation == Some(AnnotationMode::Literals) {
                    return unsupported("factorization requires conjunction annotation");
                }
                if self.removal == Some(RemovalPolicy::All) {
                    return unsupported("factorization requires the first removal policy");
                }
                Ok(Plan {
                    strategy: Strategy::Cex {
                        removal: RemovalPolicy::First,
                    },
                    annotation: AnnotationMode::Conjunctions,
                    semicnf_limit: Some(self.semicnf_limit),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let plan = WeakeningConf::default().validate().unwrap();
        assert_eq!(
            plan,
            Plan {
                strategy: Strategy::Cex {
                    removal: RemovalPolicy::All
                },
                annotation: AnnotationMode::Literals,
                semicnf_limit: None,
            }
        );
    }

    #[test]
    fn test_factorization() {
        let conf = WeakeningConf {
            strategy: WeakeningStrategy::Factorization,
            ..Default::default()
        };
        let plan = conf.validate().unwrap();
        assert_eq!(
            plan.strategy,
            Strategy::Cex {
                removal: RemovalPolicy::First
            }
        );
        assert_eq!(plan.annotation, AnnotationMode::Conjunctions);
        assert_eq!(plan.semicnf_limit, Some(DEFAULT_EXPANSION_LIMIT));

        for conf in [
            WeakeningConf {
                annotation: Some(AnnotationMode::Literals),
                ..conf.clone()
            },
            WeakeningConf {
                removal: Some(RemovalPolicy::All),
                ..conf.clone()
            },
            WeakeningConf {
                semicnf_limit: 0,
                ..conf.clone()
            },
        ] {
            assert!(matches!(
                conf.validate(),
                Err(WeakeningError::UnsupportedConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_removal_without_cex() {
        for strategy in [WeakeningStrategy::Syntactic, WeakeningStrategy::Destructive] {
            let conf = WeakeningConf {
                strategy,
                removal: Some(RemovalPolicy::First),
                ..Default::default()
            };
            assert!(matches!(
                conf.validate(),
                Err(WeakeningError::UnsupportedConfiguration(_))
            ));
        }
        let conf = WeakeningConf {
            strategy: WeakeningStrategy::Destructive,
            annotation: Some(AnnotationMode::Conjunctions),
            ..Default::default()
        };
        assert_eq!(conf.validate().unwrap().strategy, Strategy::Destructive);
    }
}
