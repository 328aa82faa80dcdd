//! Decision pipeline — signals and account state to a go / no-go with a size.
//!
//! Convergence first, then the actionable-level gate, then portfolio limits,
//! then sizing. The first stage that says no is the reason reported.

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::convergence::{ConvergenceEngine, ConvergenceLevel, ConvergenceResult};
use crate::domain::{PortfolioState, SignalSet, TradeCandidate};
use crate::sizing::{LimitViolation, PositionSizeRecommendation, RiskSizer, SizingError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum NoGoReason {
    /// Fewer signals than the convergence minimum.
    InsufficientEvidence,
    BelowThreshold(ConvergenceLevel),
    LimitBlocked(LimitViolation),
    ZeroShares,
}

impl std::fmt::Display for NoGoReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoGoReason::InsufficientEvidence => write!(f, "insufficient evidence"),
            NoGoReason::BelowThreshold(level) => write!(f, "convergence level {level} below threshold"),
            NoGoReason::LimitBlocked(violation) => write!(f, "limit blocked: {violation}"),
            NoGoReason::ZeroShares => write!(f, "sized to zero shares"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Go {
        convergence: ConvergenceResult,
        sizing: PositionSizeRecommendation,
    },
    NoGo {
        reason: NoGoReason,
        convergence: Option<ConvergenceResult>,
    },
}

impl Decision {
    pub fn is_go(&self) -> bool {
        matches!(self, Decision::Go { .. })
    }

    pub fn convergence(&self) -> Option<&ConvergenceResult> {
        match self {
            Decision::Go { convergence, .. } => Some(convergence),
            Decision::NoGo { convergence, .. } => convergence.as_ref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecisionPipeline {
    engine: ConvergenceEngine,
    sizer: RiskSizer,
    min_level: ConvergenceLevel,
}

impl Default for DecisionPipeline {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl DecisionPipeline {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            engine: ConvergenceEngine::new(config.convergence),
            sizer: RiskSizer::new(config.risk),
            min_level: config.decision.min_level,
        }
    }

    pub fn decide(
        &self,
        ticker: &str,
        signals: &SignalSet,
        candidate: &TradeCandidate,
        portfolio: &PortfolioState,
    ) -> Result<Decision, SizingError> {
        self.sizer.ensure_valid()?;
        let Some(convergence) = self.engine.evaluate(ticker, signals) else {
            return Ok(no_go(NoGoReason::InsufficientEvidence, None));
        };

        if !convergence.is_actionable(self.min_level) {
            return Ok(no_go(
                NoGoReason::BelowThreshold(convergence.level),
                Some(convergence),
            ));
        }

        let limits = self.sizer.check_limits(portfolio, candidate);
        if let Some(violation) = limits.reason {
            return Ok(no_go(NoGoReason::LimitBlocked(violation), Some(convergence)));
        }

        let sizing = self.sizer.size(candidate, convergence.score, portfolio)?;
        if sizing.max_shares == 0 {
            return Ok(no_go(NoGoReason::ZeroShares, Some(convergence)));
        }

        tracing::info!(
            ticker,
            score = convergence.score,
            level = %convergence.level,
            shares = sizing.max_shares,
            "go"
        );
        Ok(Decision::Go { convergence, sizing })
    }
}

fn no_go(reason: NoGoReason, convergence: Option<ConvergenceResult>) -> Decision {
    tracing::info!(%reason, "no-go");
    Decision::NoGo { reason, convergence }
}
