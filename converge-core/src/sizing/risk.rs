//! Risk sizer — score-scaled fixed-fractional sizing.

use serde::{Deserialize, Serialize};

use crate::config::RiskConfig;
use crate::domain::{PortfolioState, Side, TradeCandidate};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SizingError {
    #[error("stop {stop} is on the wrong side of entry {entry} for a {side} trade")]
    InvalidStop { side: Side, entry: f64, stop: f64 },

    #[error("price must be finite and > 0, got {0}")]
    InvalidPrice(f64),

    #[error("equity must be >= 0, got {0}")]
    NegativeEquity(f64),

    #[error("cash must be >= 0, got {0}")]
    NegativeCash(f64),

    #[error("convergence score must be in [0, 100], got {0}")]
    InvalidScore(f64),

    #[error("invalid risk config: {0}")]
    InvalidConfig(String),
}

/// Which constraint reduced the share count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingLimit {
    Cash,
    PositionCap,
    SectorCap,
    ZeroShares,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingWarning {
    pub limit: SizingLimit,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSizeRecommendation {
    pub ticker: String,
    pub side: Side,
    /// Whole shares after every clamp.
    pub max_shares: u64,
    /// Position value (`max_shares × entry`) over equity.
    pub recommended_fraction_of_equity: f64,
    pub risk_per_share: f64,
    /// Risk budget as a fraction of equity, from the convergence score.
    pub risk_fraction: f64,
    /// Shares the risk budget alone would buy.
    pub naive_shares: u64,
    /// Dollars lost at the stop with `max_shares`.
    pub total_risk_dollars: f64,
    pub warnings: Vec<SizingWarning>,
}

#[derive(Debug, Clone, Default)]
pub struct RiskSizer {
    pub(super) config: RiskConfig,
}

impl RiskSizer {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Fails when the fractions or caps this sizer was built with are out of range.
    pub fn ensure_valid(&self) -> Result<(), SizingError> {
        self.config
            .validate()
            .map_err(|e| SizingError::InvalidConfig(e.to_string()))
    }

    /// Size `candidate` for a convergence score against `portfolio`.
    ///
    /// # Formula
    /// ```text
    /// risk_per_share = |entry - stop|            (stop on the losing side)
    /// risk_fraction  = base + (max - base) * clamp((score - floor) / (100 - floor), 0, 1)
    /// naive_shares   = floor(equity * risk_fraction / risk_per_share)
    /// max_shares     = min(naive, cash / entry, position room / entry, sector room / entry)
    /// ```
    pub fn size(
        &self,
        candidate: &TradeCandidate,
        convergence_score: f64,
        portfolio: &PortfolioState,
    ) -> Result<PositionSizeRecommendation, SizingError> {
        self.ensure_valid()?;
        let entry = candidate.entry_price;
        let stop = candidate.stop_price;
        for price in [entry, stop] {
            if !price.is_finite() || price <= 0.0 {
                return Err(SizingError::InvalidPrice(price));
            }
        }
        if !(0.0..=100.0).contains(&convergence_score) {
            return Err(SizingError::InvalidScore(convergence_score));
        }
        if !(portfolio.equity >= 0.0) {
            return Err(SizingError::NegativeEquity(portfolio.equity));
        }
        if !(portfolio.cash >= 0.0) {
            return Err(SizingError::NegativeCash(portfolio.cash));
        }

        let risk_per_share = match candidate.side {
            Side::Long => entry - stop,
            Side::Short => stop - entry,
        };
        if risk_per_share <= 0.0 {
            return Err(SizingError::InvalidStop {
                side: candidate.side,
                entry,
                stop,
            });
        }

        let equity = portfolio.equity;
        let risk_fraction = self.config.risk_fraction(convergence_score);
        let naive_shares = whole_shares(equity * risk_fraction / risk_per_share);

        let mut shares = naive_shares;
        let mut warnings = Vec::new();
        let ticker = candidate.ticker.as_str();

        let mut clamp = |limit: SizingLimit, cap: u64, message: String| {
            if cap < shares {
                tracing::warn!(ticker, ?limit, from = shares, to = cap, "position size clamped");
                shares = cap;
                warnings.push(SizingWarning { limit, message });
            }
        };

        let cash_cap = whole_shares(portfolio.cash / entry);
        clamp(
            SizingLimit::Cash,
            cash_cap,
            format!("cash {:.2} covers {cash_cap} shares", portfolio.cash),
        );

        let position_room =
            equity * self.config.max_position_fraction - portfolio.position_value(ticker);
        let position_cap = whole_shares(position_room / entry);
        clamp(
            SizingLimit::PositionCap,
            position_cap,
            format!(
                "position cap {:.0}% of equity allows {position_cap} shares",
                self.config.max_position_fraction * 100.0
            ),
        );

        if let Some(sector) = candidate.sector.as_deref() {
            let sector_room =
                equity * self.config.max_sector_fraction - portfolio.sector_exposure(sector);
            let sector_cap = whole_shares(sector_room / entry);
            clamp(
                SizingLimit::SectorCap,
                sector_cap,
                format!(
                    "sector cap {:.0}% of equity in {sector} allows {sector_cap} shares",
                    self.config.max_sector_fraction * 100.0
                ),
            );
        }

        if shares == 0 {
            tracing::warn!(ticker, "position sized to zero shares");
            warnings.push(SizingWarning {
                limit: SizingLimit::ZeroShares,
                message: "no whole share fits the risk budget and caps".to_string(),
            });
        }

        let recommended_fraction_of_equity = if equity > 0.0 {
            shares as f64 * entry / equity
        } else {
            0.0
        };

        tracing::debug!(
            ticker,
            convergence_score,
            risk_fraction,
            naive_shares,
            shares,
            "position sized"
        );

        Ok(PositionSizeRecommendation {
            ticker: candidate.ticker.clone(),
            side: candidate.side,
            max_shares: shares,
            recommended_fraction_of_equity,
            risk_per_share,
            risk_fraction,
            naive_shares,
            total_risk_dollars: shares as f64 * risk_per_share,
            warnings,
        })
    }
}

/// Floor to whole shares; negative or non-finite room is zero.
fn whole_shares(x: f64) -> u64 {
    if x.is_finite() && x > 0.0 {
        x.floor() as u64
    } else {
        0
    }
}
