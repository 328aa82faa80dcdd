//! Pattern / state classifier — price/volume history to a discrete state.
//!
//! State is derived, never stored: every call recomputes it from the raw
//! bars, so consecutive evaluations can only disagree, never transition
//! illegally. The intended progression is
//!
//! ```text
//! Consolidating → Breakout → Confirmed → Trending
//!                     │           └────→ NormalReaction (low-volume pullback)
//!                     └──────────────────→ Failed (no confirmation / back in range)
//! ```
//!
//! Bars are ordered oldest first. The classifier is also a signal producer:
//! every report carries a [`SignalKind::Pattern`] signal.

pub mod levels;

pub use levels::{find_levels, LevelKind, PivotLevel};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::PatternConfig;
use crate::domain::{Bar, PriceRange, Signal, SignalKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternState {
    Consolidating,
    Breakout,
    Confirmed,
    NormalReaction,
    Trending,
    Failed,
}

impl PatternState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consolidating => "CONSOLIDATING",
            Self::Breakout => "BREAKOUT",
            Self::Confirmed => "CONFIRMED",
            Self::NormalReaction => "NORMAL_REACTION",
            Self::Trending => "TRENDING",
            Self::Failed => "FAILED",
        }
    }

    /// Whether two consecutive evaluations disagree.
    ///
    /// No transition history is kept; callers that persist the previous
    /// state can use this to flag a change in character.
    pub fn is_character_change(previous: PatternState, current: PatternState) -> bool {
        previous != current
    }
}

impl std::fmt::Display for PatternState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why no state was assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoPatternReason {
    InsufficientHistory { required: usize, available: usize },
    /// Enough history, but neither a base nor a breakout from one.
    Unstructured,
}

/// Evidence behind a classified state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub ticker: String,
    pub state: PatternState,
    /// Date of the last bar evaluated.
    pub as_of: NaiveDate,
    /// Consolidation base: the active one, or the one broken out of.
    pub range: Option<PriceRange>,
    /// Bars since the breakout bar (0 = breakout on the last bar).
    pub bars_since_breakout: Option<usize>,
    /// Breakout bar volume over the base's mean volume.
    pub breakout_volume_ratio: Option<f64>,
    /// Last bar volume over the base's mean volume.
    pub latest_volume_ratio: f64,
    pub levels: Vec<PivotLevel>,
    pub signal: Signal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Classification {
    NoPattern(NoPatternReason),
    Pattern(Box<PatternReport>),
}

impl Classification {
    pub fn report(&self) -> Option<&PatternReport> {
        match self {
            Classification::Pattern(report) => Some(report.as_ref()),
            Classification::NoPattern(_) => None,
        }
    }

    pub fn state(&self) -> Option<PatternState> {
        self.report().map(|r| r.state)
    }

    /// The pattern signal for convergence, if a state was assigned.
    pub fn signal(&self) -> Option<Signal> {
        self.report().map(|r| r.signal.clone())
    }
}

/// Breakout located in the history.
struct BreakoutAt {
    index: usize,
    base: PriceRange,
    base_avg_volume: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PatternClassifier {
    config: PatternConfig,
}

impl PatternClassifier {
    pub fn new(config: PatternConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, ticker: &str, bars: &[Bar]) -> Classification {
        let required = self.config.min_history();
        let Some(last) = bars.last().filter(|_| bars.len() >= required) else {
            tracing::debug!(ticker, required, available = bars.len(), "insufficient history");
            return Classification::NoPattern(NoPatternReason::InsufficientHistory {
                required,
                available: bars.len(),
            });
        };

        let w = self.config.base_window;
        let n = bars.len();

        let Some(breakout) = self.find_breakout(bars) else {
            let recent = &bars[n - w..];
            return match PriceRange::of(recent) {
                Some(range) if range.width_pct() <= self.config.max_range_pct => {
                    let avg = mean_volume(recent);
                    let ratio = volume_ratio(last, avg);
                    self.report(ticker, bars, PatternState::Consolidating, Some(range), None, None, ratio)
                }
                _ => Classification::NoPattern(NoPatternReason::Unstructured),
            };
        };

        let base = breakout.base;
        let avg = breakout.base_avg_volume;
        let b = breakout.index;
        let latest_ratio = volume_ratio(last, avg);
        let breakout_ratio = volume_ratio(&bars[b], avg);
        let since = n - 1 - b;

        let window_end = (b + self.config.confirm_window).min(n);
        let confirmation = (b..window_end).find(|&i| {
            bars[i].close > base.high && volume_ratio(&bars[i], avg) >= self.config.confirm_volume_ratio
        });

        let state = match confirmation {
            None => {
                if last.close <= base.high || since >= self.config.confirm_window {
                    PatternState::Failed
                } else {
                    PatternState::Breakout
                }
            }
            Some(c) => {
                let highest_close = bars[b..n]
                    .iter()
                    .map(|bar| bar.close)
                    .fold(f64::NEG_INFINITY, f64::max);
                let t = self.config.trend_bars;
                let trending = n - 1 - c >= t
                    && bars[n - 1 - t..n].windows(2).all(|pair| pair[1].close > pair[0].close);

                // Reaction is tested before trend: a light-volume pullback off the
                // post-breakout high stays a reaction even after `trend_bars` higher closes.
                if last.close < base.low || (last.close <= base.high && latest_ratio >= 1.0) {
                    PatternState::Failed
                } else if last.close < highest_close && latest_ratio < 1.0 {
                    PatternState::NormalReaction
                } else if trending {
                    PatternState::Trending
                } else {
                    PatternState::Confirmed
                }
            }
        };

        self.report(
            ticker,
            bars,
            state,
            Some(base),
            Some(since),
            Some(breakout_ratio),
            latest_ratio,
        )
    }

    /// Earliest bar in the lookback that closes above a narrow base.
    fn find_breakout(&self, bars: &[Bar]) -> Option<BreakoutAt> {
        let w = self.config.base_window;
        let n = bars.len();
        let start = n.saturating_sub(self.config.breakout_lookback).max(w);

        (start..n).find_map(|i| {
            let base_bars = &bars[i - w..i];
            let base = PriceRange::of(base_bars)?;
            if base.width_pct() <= self.config.max_range_pct && bars[i].close > base.high {
                Some(BreakoutAt {
                    index: i,
                    base,
                    base_avg_volume: mean_volume(base_bars),
                })
            } else {
                None
            }
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn report(
        &self,
        ticker: &str,
        bars: &[Bar],
        state: PatternState,
        range: Option<PriceRange>,
        bars_since_breakout: Option<usize>,
        breakout_volume_ratio: Option<f64>,
        latest_volume_ratio: f64,
    ) -> Classification {
        let score = self.signal_score(state, breakout_volume_ratio);
        let levels = find_levels(
            bars,
            self.config.level_lookback,
            self.config.round_proximity_pct,
            range,
        );

        let mut reasoning = format!("{ticker} {state}");
        if let Some(r) = range {
            reasoning.push_str(&format!(" from base {:.2}-{:.2}", r.low, r.high));
        }
        if let Some(ratio) = breakout_volume_ratio {
            reasoning.push_str(&format!(", breakout volume {ratio:.1}x"));
        }

        let mut signal = Signal::new(SignalKind::Pattern, score, reasoning)
            .with_payload("state", state.as_str())
            .with_payload("latest_volume_ratio", latest_volume_ratio);
        if let Some(ratio) = breakout_volume_ratio {
            signal = signal.with_payload("breakout_volume_ratio", ratio);
        }
        if let Some(r) = range {
            signal = signal
                .with_payload("range_high", r.high)
                .with_payload("range_low", r.low);
        }

        let as_of = bars.last().map(|b| b.date).unwrap_or_default();
        tracing::debug!(ticker, %state, score, "pattern classified");

        Classification::Pattern(Box::new(PatternReport {
            ticker: ticker.to_string(),
            state,
            as_of,
            range,
            bars_since_breakout,
            breakout_volume_ratio,
            latest_volume_ratio,
            levels,
            signal,
        }))
    }

    /// State score plus a bonus for volume behind the breakout.
    fn signal_score(&self, state: PatternState, breakout_ratio: Option<f64>) -> f64 {
        let base = self.config.state_scores.score(state);
        let volume_bonus = match (state, breakout_ratio) {
            (
                PatternState::Breakout | PatternState::Confirmed | PatternState::Trending,
                Some(ratio),
            ) if ratio > 1.0 => ((ratio - 1.0) * self.config.volume_bonus_per_unit)
                .min(self.config.max_volume_bonus),
            _ => 0.0,
        };
        (base + volume_bonus).clamp(0.0, 100.0)
    }
}

fn mean_volume(bars: &[Bar]) -> f64 {
    if bars.is_empty() {
        return 0.0;
    }
    bars.iter().map(Bar::volume_f64).sum::<f64>() / bars.len() as f64
}

/// Volume relative to an average; zero when the average is degenerate.
fn volume_ratio(bar: &Bar, avg: f64) -> f64 {
    if avg > 0.0 {
        bar.volume_f64() / avg
    } else {
        0.0
    }
}
