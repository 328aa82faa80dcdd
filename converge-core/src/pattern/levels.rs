//! Pivotal price levels — decision points near the current price.
//!
//! Three sources: round numbers bracketing the last close, the trailing
//! high/low over a lookback, and the edges of an active consolidation base.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, PriceRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    RoundNumber,
    TrailingHigh,
    TrailingLow,
    RangeHigh,
    RangeLow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotLevel {
    pub price: f64,
    pub kind: LevelKind,
    /// Significance as a decision point, 0–100.
    pub strength: f64,
}

/// Grid spacing for round numbers at a given price.
pub fn round_step(price: f64) -> f64 {
    match price {
        p if p < 10.0 => 1.0,
        p if p < 50.0 => 5.0,
        p if p < 200.0 => 10.0,
        p if p < 1000.0 => 50.0,
        _ => 100.0,
    }
}

/// Bars whose high (for resistance) or low (for support) sit within 1% of `level`.
fn touches(bars: &[Bar], level: f64, resistance: bool) -> usize {
    bars.iter()
        .filter(|b| {
            let p = if resistance { b.high } else { b.low };
            level > 0.0 && ((p - level) / level).abs() <= 0.01
        })
        .count()
}

fn round_levels(close: f64, proximity_pct: f64) -> Vec<PivotLevel> {
    let step = round_step(close);
    let below = (close / step).floor() * step;
    let above = (close / step).ceil() * step;
    let mut candidates = vec![below];
    if above != below {
        candidates.push(above);
    }

    candidates
        .into_iter()
        .filter(|level| *level > 0.0)
        .filter_map(|level| {
            let distance = (close - level).abs() / close;
            if distance > proximity_pct {
                return None;
            }
            let major = ((level / (step * 10.0)).fract()).abs() < 1e-9;
            let proximity = 1.0 - distance / proximity_pct;
            let strength = 40.0 + if major { 20.0 } else { 0.0 } + 20.0 * proximity;
            Some(PivotLevel {
                price: level,
                kind: LevelKind::RoundNumber,
                strength: strength.clamp(0.0, 100.0),
            })
        })
        .collect()
}

/// Collect pivotal levels for the last bar of `bars`.
///
/// `base` is the consolidation range currently in force, if any.
pub fn find_levels(
    bars: &[Bar],
    lookback: usize,
    proximity_pct: f64,
    base: Option<PriceRange>,
) -> Vec<PivotLevel> {
    let Some(last) = bars.last() else {
        return Vec::new();
    };

    let mut levels = round_levels(last.close, proximity_pct);

    let window = &bars[bars.len().saturating_sub(lookback)..];
    if let Some(trailing) = PriceRange::of(window) {
        levels.push(PivotLevel {
            price: trailing.high,
            kind: LevelKind::TrailingHigh,
            strength: (70.0 + 5.0 * touches(window, trailing.high, true) as f64).min(100.0),
        });
        levels.push(PivotLevel {
            price: trailing.low,
            kind: LevelKind::TrailingLow,
            strength: (60.0 + 5.0 * touches(window, trailing.low, false) as f64).min(100.0),
        });
    }

    if let Some(range) = base {
        levels.push(PivotLevel {
            price: range.high,
            kind: LevelKind::RangeHigh,
            strength: 80.0,
        });
        levels.push(PivotLevel {
            price: range.low,
            kind: LevelKind::RangeLow,
            strength: 75.0,
        });
    }

    levels.sort_by(|a, b| {
        b.strength
            .total_cmp(&a.strength)
            .then_with(|| b.price.total_cmp(&a.price))
    });
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let d0 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| Bar::new(d0 + chrono::Duration::days(i as i64), *c, c + 1.0, c - 1.0, *c, 1_000))
            .collect()
    }

    #[test]
    fn steps_scale_with_price() {
        assert_eq!(round_step(4.2), 1.0);
        assert_eq!(round_step(42.0), 5.0);
        assert_eq!(round_step(142.0), 10.0);
        assert_eq!(round_step(420.0), 50.0);
        assert_eq!(round_step(4200.0), 100.0);
    }

    #[test]
    fn round_numbers_bracket_price() {
        let levels = round_levels(97.0, 0.10);
        let prices: Vec<f64> = levels.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![90.0, 100.0]);
        // 100 is a major level and nearer than 90
        assert!(levels[1].strength > levels[0].strength);
    }

    #[test]
    fn round_numbers_respect_proximity() {
        let levels = round_levels(97.0, 0.05);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].price, 100.0);
    }

    #[test]
    fn price_on_round_number_yields_single_level() {
        let levels = round_levels(100.0, 0.10);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].strength, 80.0);
    }

    #[test]
    fn trailing_and_range_levels() {
        let history = bars(&[100.0, 104.0, 101.0, 99.0, 102.0]);
        let base = PriceRange { high: 103.0, low: 98.5 };
        let levels = find_levels(&history, 60, 0.10, Some(base));
        let kinds: Vec<LevelKind> = levels.iter().map(|l| l.kind).collect();
        assert!(kinds.contains(&LevelKind::TrailingHigh));
        assert!(kinds.contains(&LevelKind::TrailingLow));
        assert!(kinds.contains(&LevelKind::RangeHigh));
        assert!(kinds.contains(&LevelKind::RangeLow));
        let high = levels.iter().find(|l| l.kind == LevelKind::TrailingHigh).unwrap();
        assert_eq!(high.price, 105.0);
        assert!(levels.windows(2).all(|w| w[0].strength >= w[1].strength));
    }
}
