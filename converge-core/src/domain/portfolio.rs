//! Portfolio state handed to the risk sizer — explicit, never global.

use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[default]
    Long,
    Short,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// An open position. `shares` is always positive; `side` carries direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub side: Side,
    pub shares: u64,
    pub entry_price: f64,
    pub market_price: f64,
    #[serde(default)]
    pub stop_price: Option<f64>,
}

impl Holding {
    /// Gross market value (always non-negative).
    pub fn market_value(&self) -> f64 {
        self.shares as f64 * self.market_price
    }

    /// Dollars lost if the stop is hit from the current price.
    ///
    /// A position without a stop is charged its full market value. A stop
    /// already through the current price contributes zero.
    pub fn open_risk(&self) -> f64 {
        match self.stop_price {
            Some(stop) => {
                let per_share = match self.side {
                    Side::Long => self.market_price - stop,
                    Side::Short => stop - self.market_price,
                };
                (per_share.max(0.0)) * self.shares as f64
            }
            None => self.market_value(),
        }
    }
}

/// Account snapshot: equity, cash, open positions, day trades used.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PortfolioState {
    pub equity: f64,
    pub cash: f64,
    #[serde(default)]
    pub positions: Vec<Holding>,
    /// Day trades used in the current rolling window.
    #[serde(default)]
    pub day_trades_used: u32,
}

impl PortfolioState {
    pub fn new(equity: f64, cash: f64) -> Self {
        Self {
            equity,
            cash,
            positions: Vec::new(),
            day_trades_used: 0,
        }
    }

    pub fn with_position(mut self, holding: Holding) -> Self {
        self.positions.push(holding);
        self
    }

    /// Market value already held in `ticker`.
    pub fn position_value(&self, ticker: &str) -> f64 {
        self.positions
            .iter()
            .filter(|h| h.ticker.eq_ignore_ascii_case(ticker))
            .map(Holding::market_value)
            .sum()
    }

    /// Market value held across all positions tagged with `sector`.
    pub fn sector_exposure(&self, sector: &str) -> f64 {
        self.positions
            .iter()
            .filter(|h| {
                h.sector
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(sector))
            })
            .map(Holding::market_value)
            .sum()
    }

    pub fn holds(&self, ticker: &str) -> bool {
        self.positions
            .iter()
            .any(|h| h.ticker.eq_ignore_ascii_case(ticker) && h.shares > 0)
    }

    pub fn open_positions(&self) -> usize {
        self.positions.iter().filter(|h| h.shares > 0).count()
    }

    /// Aggregate dollar risk across open positions.
    pub fn open_risk(&self) -> f64 {
        self.positions.iter().map(Holding::open_risk).sum()
    }

    /// Portfolio heat: open risk as a fraction of equity.
    pub fn heat(&self) -> f64 {
        if self.equity <= 0.0 {
            return 0.0;
        }
        self.open_risk() / self.equity
    }
}

/// A trade under consideration, shared by sizing and limit checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeCandidate {
    pub ticker: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub side: Side,
    pub entry_price: f64,
    pub stop_price: f64,
}

impl TradeCandidate {
    pub fn long(ticker: impl Into<String>, entry_price: f64, stop_price: f64) -> Self {
        Self {
            ticker: ticker.into(),
            sector: None,
            side: Side::Long,
            entry_price,
            stop_price,
        }
    }

    pub fn short(ticker: impl Into<String>, entry_price: f64, stop_price: f64) -> Self {
        Self {
            side: Side::Short,
            ..Self::long(ticker, entry_price, stop_price)
        }
    }

    pub fn in_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }
}
