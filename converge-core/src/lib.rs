//! Converge Core — signal convergence, catalyst urgency, pattern states, risk sizing.
//!
//! This crate is the decision core of a trading assistant:
//! - Domain types (signals, bars, catalysts, portfolio snapshots)
//! - Weighted, renormalized convergence of independent signal kinds
//! - Catalyst urgency scoring and a file-backed catalyst store
//! - Price/volume pattern state classification with pivotal levels
//! - Score-scaled position sizing and portfolio limit checks
//! - A decision pipeline tying the above into go / no-go
//!
//! Everything here is pure computation over explicit inputs. No I/O except
//! the catalyst store and config loading.

pub mod catalyst;
pub mod config;
pub mod convergence;
pub mod decision;
pub mod domain;
pub mod pattern;
pub mod sizing;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types are Send + Sync.
    ///
    /// Batch evaluation shares the engine across rayon workers and the
    /// catalyst store is shared across writer threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Signal>();
        require_sync::<domain::Signal>();
        require_send::<domain::SignalSet>();
        require_sync::<domain::SignalSet>();
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Catalyst>();
        require_sync::<domain::Catalyst>();
        require_send::<domain::PortfolioState>();
        require_sync::<domain::PortfolioState>();
        require_send::<domain::TradeCandidate>();
        require_sync::<domain::TradeCandidate>();

        // Config
        require_send::<config::ScoringConfig>();
        require_sync::<config::ScoringConfig>();

        // Engines
        require_send::<convergence::ConvergenceEngine>();
        require_sync::<convergence::ConvergenceEngine>();
        require_send::<convergence::ConvergenceResult>();
        require_sync::<convergence::ConvergenceResult>();
        require_send::<catalyst::CatalystScorer>();
        require_sync::<catalyst::CatalystScorer>();
        require_send::<pattern::PatternClassifier>();
        require_sync::<pattern::PatternClassifier>();
        require_send::<pattern::Classification>();
        require_sync::<pattern::Classification>();
        require_send::<sizing::RiskSizer>();
        require_sync::<sizing::RiskSizer>();
        require_send::<decision::DecisionPipeline>();
        require_sync::<decision::DecisionPipeline>();
        require_send::<decision::Decision>();
        require_sync::<decision::Decision>();

        // Store
        require_send::<catalyst::CatalystStore<catalyst::JsonFileRepository>>();
        require_sync::<catalyst::CatalystStore<catalyst::JsonFileRepository>>();
        require_send::<catalyst::CatalystStore<catalyst::InMemoryRepository>>();
        require_sync::<catalyst::CatalystStore<catalyst::InMemoryRepository>>();
    }

    /// Contract: the sizer sees portfolio state only through its arguments.
    #[test]
    fn sizer_takes_portfolio_explicitly() {
        fn _check(
            sizer: &sizing::RiskSizer,
            candidate: &domain::TradeCandidate,
            portfolio: &domain::PortfolioState,
        ) -> Result<sizing::PositionSizeRecommendation, sizing::SizingError> {
            sizer.size(candidate, 80.0, portfolio)
        }
    }
}
