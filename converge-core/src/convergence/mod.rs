//! Convergence engine — aggregates independent signals into one score.
//!
//! The engine renormalizes canonical weights over the signals actually
//! present, adds a bonus that grows with the number of agreeing kinds, and
//! caps the result below 100. A single signal carries no convergence
//! information, so fewer than `min_signals` kinds yields no result at all.

pub mod level;

pub use level::ConvergenceLevel;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ConvergenceConfig;
use crate::domain::{SignalKind, SignalSet};

/// One signal's share of a convergence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub kind: SignalKind,
    pub raw_score: f64,
    /// Canonical configured weight of the kind.
    pub weight: f64,
    /// `raw_score * weight / sum(weights present)`.
    pub weighted_contribution: f64,
}

/// Outcome of evaluating one ticker's signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceResult {
    pub ticker: String,
    pub score: f64,
    pub level: ConvergenceLevel,
    pub signal_count: usize,
    /// Renormalized weighted average before the bonus.
    pub weighted_average: f64,
    pub bonus: f64,
    /// Breakdown in canonical kind order.
    pub contributions: Vec<Contribution>,
}

impl ConvergenceResult {
    pub fn is_actionable(&self, min_level: ConvergenceLevel) -> bool {
        self.level >= min_level
    }

    /// Contribution of `kind`, if that signal was present.
    pub fn contribution(&self, kind: SignalKind) -> Option<&Contribution> {
        self.contributions.iter().find(|c| c.kind == kind)
    }

    /// One-line human summary, strongest contributor first.
    pub fn summary(&self) -> String {
        let mut parts: Vec<&Contribution> = self.contributions.iter().collect();
        parts.sort_by(|a, b| b.weighted_contribution.total_cmp(&a.weighted_contribution));
        let detail: Vec<String> = parts
            .iter()
            .map(|c| format!("{}={:.0}", c.kind, c.raw_score))
            .collect();
        format!(
            "{} {} {:.1} ({} signals: {})",
            self.ticker,
            self.level,
            self.score,
            self.signal_count,
            detail.join(", ")
        )
    }
}

/// Floor on `min_signals`: one signal is an opinion, not convergence.
pub const MIN_CONVERGING_SIGNALS: usize = 2;

/// Pure, stateless signal aggregator.
#[derive(Debug, Clone, Default)]
pub struct ConvergenceEngine {
    config: ConvergenceConfig,
}

impl ConvergenceEngine {
    pub fn new(config: ConvergenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConvergenceConfig {
        &self.config
    }

    /// Evaluate one ticker. Returns `None` when too few kinds are present.
    pub fn evaluate(&self, ticker: &str, signals: &SignalSet) -> Option<ConvergenceResult> {
        let signal_count = signals.len();
        if signal_count < self.config.min_signals.max(MIN_CONVERGING_SIGNALS) {
            tracing::debug!(ticker, signal_count, "insufficient evidence for convergence");
            return None;
        }

        let weights = &self.config.weights;
        let present_weight: f64 = signals.iter().map(|s| weights.weight(s.kind())).sum();
        if present_weight <= 0.0 {
            return None;
        }

        let contributions: Vec<Contribution> = signals
            .iter()
            .map(|s| {
                let weight = weights.weight(s.kind());
                Contribution {
                    kind: s.kind(),
                    raw_score: s.score(),
                    weight,
                    weighted_contribution: s.score() * weight / present_weight,
                }
            })
            .collect();

        let weighted_average: f64 = contributions.iter().map(|c| c.weighted_contribution).sum();
        let bonus = self.config.bonus_for(signal_count);
        let score = (weighted_average + bonus).clamp(0.0, self.config.max_score);
        let level = ConvergenceLevel::from_score(score, &self.config.levels);

        tracing::debug!(
            ticker,
            signal_count,
            weighted_average,
            bonus,
            score,
            %level,
            "convergence evaluated"
        );

        Some(ConvergenceResult {
            ticker: ticker.to_string(),
            score,
            level,
            signal_count,
            weighted_average,
            bonus,
            contributions,
        })
    }

    /// Evaluate many tickers; same results, in input order, as calling
    /// [`evaluate`](Self::evaluate) per ticker and keeping the `Some`s.
    pub fn evaluate_many(&self, batch: &[(String, SignalSet)]) -> Vec<ConvergenceResult> {
        batch
            .par_iter()
            .filter_map(|(ticker, signals)| self.evaluate(ticker, signals))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BonusStep;
    use crate::domain::Signal;

    fn set(pairs: &[(SignalKind, f64)]) -> SignalSet {
        pairs
            .iter()
            .map(|(k, s)| Signal::new(*k, *s, "test"))
            .collect()
    }

    #[test]
    fn single_signal_is_insufficient() {
        let engine = ConvergenceEngine::default();
        assert!(engine.evaluate("AAPL", &SignalSet::new()).is_none());
        assert!(engine
            .evaluate("AAPL", &set(&[(SignalKind::Institutional, 99.0)]))
            .is_none());
    }

    #[test]
    fn single_signal_never_converges_even_if_configured() {
        let engine = ConvergenceEngine::new(ConvergenceConfig {
            min_signals: 1,
            bonus: vec![BonusStep { min_signals: 1, bonus: 2.0 }],
            ..ConvergenceConfig::default()
        });
        assert!(engine
            .evaluate("AAPL", &set(&[(SignalKind::Institutional, 90.0)]))
            .is_none());
        assert!(engine
            .evaluate(
                "AAPL",
                &set(&[(SignalKind::Institutional, 90.0), (SignalKind::Scanner, 80.0)])
            )
            .is_some());
    }

    #[test]
    fn renormalizes_over_present_weights() {
        let engine = ConvergenceEngine::default();
        let result = engine
            .evaluate(
                "NVDA",
                &set(&[(SignalKind::Institutional, 80.0), (SignalKind::Scanner, 60.0)]),
            )
            .unwrap();
        // (80*0.35 + 60*0.25) / 0.60 = 71.666...
        assert!((result.weighted_average - 43.0 / 0.60).abs() < 1e-9);
        assert_eq!(result.bonus, 5.0);
        assert!((result.score - (43.0 / 0.60 + 5.0)).abs() < 1e-9);
        assert_eq!(result.level, ConvergenceLevel::High);
    }

    #[test]
    fn contributions_sum_to_weighted_average() {
        let engine = ConvergenceEngine::default();
        let result = engine
            .evaluate(
                "AMD",
                &set(&[
                    (SignalKind::News, 40.0),
                    (SignalKind::Catalyst, 90.0),
                    (SignalKind::Sector, 55.0),
                ]),
            )
            .unwrap();
        let sum: f64 = result.contributions.iter().map(|c| c.weighted_contribution).sum();
        assert!((sum - result.weighted_average).abs() < 1e-9);
        let kinds: Vec<SignalKind> = result.contributions.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![SignalKind::Catalyst, SignalKind::News, SignalKind::Sector]);
        assert_eq!(result.contribution(SignalKind::Catalyst).unwrap().weight, 0.20);
    }

    #[test]
    fn score_capped_below_certainty() {
        let engine = ConvergenceEngine::default();
        let all: Vec<(SignalKind, f64)> = SignalKind::ALL.iter().map(|k| (*k, 100.0)).collect();
        let result = engine.evaluate("SMCI", &set(&all)).unwrap();
        assert_eq!(result.score, 98.0);
        assert_eq!(result.level, ConvergenceLevel::Critical);
        assert_eq!(result.signal_count, 7);
    }

    #[test]
    fn zero_scores_stay_at_bonus() {
        let engine = ConvergenceEngine::default();
        let result = engine
            .evaluate("F", &set(&[(SignalKind::News, 0.0), (SignalKind::Sector, 0.0)]))
            .unwrap();
        assert_eq!(result.score, 5.0);
        assert_eq!(result.level, ConvergenceLevel::Low);
    }

    #[test]
    fn bonus_table_is_configurable() {
        let mut config = ConvergenceConfig::default();
        config.bonus = vec![
            BonusStep { min_signals: 2, bonus: 0.0 },
            BonusStep { min_signals: 3, bonus: 1.0 },
        ];
        let engine = ConvergenceEngine::new(config);
        let result = engine
            .evaluate("X", &set(&[(SignalKind::News, 60.0), (SignalKind::Sector, 60.0)]))
            .unwrap();
        assert!((result.score - 60.0).abs() < 1e-9);
        assert_eq!(result.level, ConvergenceLevel::Medium);
    }

    #[test]
    fn batch_matches_single_path() {
        let engine = ConvergenceEngine::default();
        let batch = vec![
            ("A".to_string(), set(&[(SignalKind::Scanner, 70.0), (SignalKind::News, 50.0)])),
            ("B".to_string(), set(&[(SignalKind::Scanner, 70.0)])),
            ("C".to_string(), set(&[(SignalKind::Institutional, 90.0), (SignalKind::Catalyst, 85.0), (SignalKind::Pattern, 75.0)])),
        ];
        let many = engine.evaluate_many(&batch);
        let single: Vec<ConvergenceResult> = batch
            .iter()
            .filter_map(|(t, s)| engine.evaluate(t, s))
            .collect();
        assert_eq!(many, single);
        assert_eq!(many.len(), 2);
        assert_eq!(many[0].ticker, "A");
        assert_eq!(many[1].ticker, "C");
    }

    #[test]
    fn summary_lists_strongest_first() {
        let engine = ConvergenceEngine::default();
        let result = engine
            .evaluate(
                "MSFT",
                &set(&[(SignalKind::News, 90.0), (SignalKind::Institutional, 60.0)]),
            )
            .unwrap();
        let summary = result.summary();
        assert!(summary.starts_with("MSFT"));
        assert!(summary.find("institutional").unwrap() < summary.find("news").unwrap());
    }
}
