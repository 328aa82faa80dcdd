//! Catalyst urgency scoring, selection, and alerting.
//!
//! Urgency is a step function of days-to-event (non-increasing with
//! distance) plus a bonus for the impact tier, capped at the configured
//! maximum. Events already past are reported as [`Urgency::Expired`] so the
//! caller can drop them before convergence.

pub mod import;
pub mod store;

pub use store::{CatalystRepository, CatalystStore, InMemoryRepository, JsonFileRepository, StoreError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::CatalystConfig;
use crate::domain::{Catalyst, Signal, SignalKind};

/// Urgency of one catalyst as of a date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Urgency {
    /// The event date has passed. Not an error; filter it out.
    Expired,
    Scored(f64),
}

impl Urgency {
    pub fn score(&self) -> Option<f64> {
        match self {
            Urgency::Expired => None,
            Urgency::Scored(s) => Some(*s),
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Urgency::Expired)
    }
}

/// A catalyst together with its urgency as of some date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCatalyst {
    pub catalyst: Catalyst,
    pub days_until: i64,
    pub score: f64,
}

impl ScoredCatalyst {
    /// The catalyst as a convergence input of kind [`SignalKind::Catalyst`].
    pub fn to_signal(&self) -> Signal {
        let c = &self.catalyst;
        let reasoning = format!(
            "{} {} in {} day{} ({} impact)",
            c.ticker,
            c.catalyst_type,
            self.days_until,
            if self.days_until == 1 { "" } else { "s" },
            c.impact
        );
        Signal::new(SignalKind::Catalyst, self.score, reasoning)
            .with_payload("catalyst_type", c.catalyst_type.as_str())
            .with_payload("impact", c.impact.as_str())
            .with_payload("event_date", c.event_date.to_string())
            .with_payload("days_until", self.days_until)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalystScorer {
    config: CatalystConfig,
}

impl CatalystScorer {
    pub fn new(config: CatalystConfig) -> Self {
        Self { config }
    }

    /// Urgency of `catalyst` as of `as_of`.
    pub fn score(&self, catalyst: &Catalyst, as_of: NaiveDate) -> Urgency {
        let days_until = catalyst.days_until(as_of);
        if days_until < 0 {
            return Urgency::Expired;
        }
        let base = self.config.base_urgency(days_until);
        let bonus = self.config.impact_bonus.bonus(catalyst.impact);
        Urgency::Scored((base + bonus).clamp(0.0, self.config.max_score))
    }

    /// Score every unexpired catalyst, dropping expired ones.
    pub fn score_active<'a, I>(&self, catalysts: I, as_of: NaiveDate) -> Vec<ScoredCatalyst>
    where
        I: IntoIterator<Item = &'a Catalyst>,
    {
        catalysts
            .into_iter()
            .filter_map(|c| {
                self.score(c, as_of).score().map(|score| ScoredCatalyst {
                    catalyst: c.clone(),
                    days_until: c.days_until(as_of),
                    score,
                })
            })
            .collect()
    }

    /// The single highest-scoring unexpired catalyst for `ticker`.
    ///
    /// Catalysts are independent events, so the strongest one represents the
    /// ticker; they are never averaged. Ties go to the nearer event.
    pub fn best_catalyst(
        &self,
        catalysts: &[Catalyst],
        ticker: &str,
        as_of: NaiveDate,
    ) -> Option<ScoredCatalyst> {
        let for_ticker = catalysts
            .iter()
            .filter(|c| c.ticker.eq_ignore_ascii_case(ticker));
        self.score_active(for_ticker, as_of)
            .into_iter()
            .max_by(|a, b| {
                a.score
                    .total_cmp(&b.score)
                    .then_with(|| b.days_until.cmp(&a.days_until))
            })
    }

    /// The ticker's catalyst signal for the convergence engine, if any.
    pub fn catalyst_for_convergence(
        &self,
        catalysts: &[Catalyst],
        ticker: &str,
        as_of: NaiveDate,
    ) -> Option<Signal> {
        let best = self.best_catalyst(catalysts, ticker, as_of)?;
        tracing::debug!(
            ticker,
            catalyst_type = %best.catalyst.catalyst_type,
            days_until = best.days_until,
            score = best.score,
            "selected catalyst for convergence"
        );
        Some(best.to_signal())
    }

    /// Unexpired catalysts at most `days_threshold` days out, most urgent first.
    pub fn alerts(
        &self,
        catalysts: &[Catalyst],
        as_of: NaiveDate,
        days_threshold: i64,
    ) -> Vec<ScoredCatalyst> {
        let mut alerts: Vec<ScoredCatalyst> = self
            .score_active(catalysts, as_of)
            .into_iter()
            .filter(|s| s.days_until <= days_threshold)
            .collect();
        alerts.sort_by_key(|s| s.days_until);
        alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CatalystType, Impact};
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn in_days(ticker: &str, days: i64, impact: Impact) -> Catalyst {
        Catalyst::new(ticker, CatalystType::Earnings, today() + Duration::days(days), impact)
    }

    #[test]
    fn expired_is_a_sentinel() {
        let scorer = CatalystScorer::default();
        let urgency = scorer.score(&in_days("AAPL", -1, Impact::High), today());
        assert!(urgency.is_expired());
        assert_eq!(urgency.score(), None);
    }

    #[test]
    fn event_today_is_imminent() {
        let scorer = CatalystScorer::default();
        assert_eq!(
            scorer.score(&in_days("AAPL", 0, Impact::Low), today()),
            Urgency::Scored(100.0)
        );
    }

    #[test]
    fn band_plus_impact() {
        let scorer = CatalystScorer::default();
        // 10 days: band 75, medium +10
        assert_eq!(
            scorer.score(&in_days("X", 10, Impact::Medium), today()),
            Urgency::Scored(85.0)
        );
        // 45 days: band 55, low +5
        assert_eq!(
            scorer.score(&in_days("X", 45, Impact::Low), today()),
            Urgency::Scored(60.0)
        );
        // 400 days: floor 25, binary +30
        assert_eq!(
            scorer.score(&in_days("X", 400, Impact::Binary), today()),
            Urgency::Scored(55.0)
        );
    }

    #[test]
    fn best_catalyst_never_averages() {
        let scorer = CatalystScorer::default();
        let catalysts = vec![
            in_days("MRNA", 40, Impact::Low),
            in_days("MRNA", 12, Impact::Binary),
            in_days("MRNA", -3, Impact::Binary),
            in_days("PFE", 1, Impact::Binary),
        ];
        let best = scorer.best_catalyst(&catalysts, "mrna", today()).unwrap();
        assert_eq!(best.days_until, 12);
        assert_eq!(best.score, 100.0);
    }

    #[test]
    fn ties_prefer_nearer_event() {
        let scorer = CatalystScorer::default();
        // both clamp to 100
        let catalysts = vec![in_days("TSLA", 6, Impact::Binary), in_days("TSLA", 2, Impact::Binary)];
        let best = scorer.best_catalyst(&catalysts, "TSLA", today()).unwrap();
        assert_eq!(best.days_until, 2);
    }

    #[test]
    fn no_signal_when_all_expired() {
        let scorer = CatalystScorer::default();
        let catalysts = vec![in_days("GME", -10, Impact::High)];
        assert!(scorer.catalyst_for_convergence(&catalysts, "GME", today()).is_none());
    }

    #[test]
    fn convergence_signal_carries_event_payload() {
        let scorer = CatalystScorer::default();
        let catalysts = vec![in_days("NVDA", 5, Impact::High)];
        let signal = scorer.catalyst_for_convergence(&catalysts, "NVDA", today()).unwrap();
        assert_eq!(signal.kind(), SignalKind::Catalyst);
        assert_eq!(signal.score(), 100.0);
        assert_eq!(signal.payload()["days_until"], serde_json::json!(5));
        assert_eq!(signal.payload()["impact"], serde_json::json!("HIGH"));
        assert!(signal.reasoning().contains("EARNINGS in 5 days"));
    }

    #[test]
    fn alerts_filter_and_sort() {
        let scorer = CatalystScorer::default();
        let catalysts = vec![
            in_days("A", 20, Impact::Low),
            in_days("B", -2, Impact::High),
            in_days("C", 3, Impact::Medium),
            in_days("D", 8, Impact::Binary),
            in_days("E", 0, Impact::Low),
        ];
        let alerts = scorer.alerts(&catalysts, today(), 10);
        let tickers: Vec<&str> = alerts.iter().map(|a| a.catalyst.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["E", "C", "D"]);
    }
}
