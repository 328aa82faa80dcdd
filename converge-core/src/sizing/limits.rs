//! Portfolio limit checks — may a new entry be opened at all?
//!
//! Checks run in a fixed order and the first violation is reported:
//! day-trade cap, open-position count, per-position cap, per-sector cap,
//! portfolio heat.

use serde::{Deserialize, Serialize};

use super::RiskSizer;
use crate::domain::{PortfolioState, TradeCandidate};

/// Why a new entry is blocked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "limit", rename_all = "snake_case")]
pub enum LimitViolation {
    DayTrades { used: u32, max: u32 },
    OpenPositions { open: usize, max: usize },
    PositionCap { ticker: String, value: f64, cap: f64 },
    SectorCap { sector: String, exposure: f64, cap: f64 },
    Heat { heat: f64, max: f64 },
}

impl std::fmt::Display for LimitViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitViolation::DayTrades { used, max } => {
                write!(f, "day trades used={used}, max={max}")
            }
            LimitViolation::OpenPositions { open, max } => {
                write!(f, "open positions={open}, max={max}")
            }
            LimitViolation::PositionCap { ticker, value, cap } => {
                write!(f, "{ticker} position value={value:.2}, cap={cap:.2}")
            }
            LimitViolation::SectorCap {
                sector,
                exposure,
                cap,
            } => write!(f, "{sector} sector exposure={exposure:.2}, cap={cap:.2}"),
            LimitViolation::Heat { heat, max } => {
                write!(f, "portfolio heat={heat:.4}, max={max:.4}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitCheck {
    pub allowed: bool,
    pub reason: Option<LimitViolation>,
}

impl LimitCheck {
    fn pass() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn blocked(reason: LimitViolation) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

impl RiskSizer {
    pub fn check_limits(&self, portfolio: &PortfolioState, candidate: &TradeCandidate) -> LimitCheck {
        match self.first_violation(portfolio, candidate) {
            Some(violation) => {
                tracing::info!(ticker = %candidate.ticker, %violation, "entry blocked by limit");
                LimitCheck::blocked(violation)
            }
            None => LimitCheck::pass(),
        }
    }

    fn first_violation(
        &self,
        portfolio: &PortfolioState,
        candidate: &TradeCandidate,
    ) -> Option<LimitViolation> {
        let cfg = &self.config;
        let equity = portfolio.equity;

        if equity < cfg.pdt_equity_threshold && portfolio.day_trades_used >= cfg.max_day_trades {
            return Some(LimitViolation::DayTrades {
                used: portfolio.day_trades_used,
                max: cfg.max_day_trades,
            });
        }

        // Adding to an existing position does not open a new slot.
        let open = portfolio.open_positions();
        if !portfolio.holds(&candidate.ticker) && open >= cfg.max_open_positions {
            return Some(LimitViolation::OpenPositions {
                open,
                max: cfg.max_open_positions,
            });
        }

        let position_cap = equity * cfg.max_position_fraction;
        let value = portfolio.position_value(&candidate.ticker);
        if value >= position_cap {
            return Some(LimitViolation::PositionCap {
                ticker: candidate.ticker.clone(),
                value,
                cap: position_cap,
            });
        }

        if let Some(sector) = candidate.sector.as_deref() {
            let sector_cap = equity * cfg.max_sector_fraction;
            let exposure = portfolio.sector_exposure(sector);
            if exposure >= sector_cap {
                return Some(LimitViolation::SectorCap {
                    sector: sector.to_string(),
                    exposure,
                    cap: sector_cap,
                });
            }
        }

        let heat = portfolio.heat();
        if heat >= cfg.max_heat {
            return Some(LimitViolation::Heat {
                heat,
                max: cfg.max_heat,
            });
        }

        None
    }
}
