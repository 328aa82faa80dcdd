//! Scoring configuration — every weight, band, and threshold as data.
//!
//! One [`ScoringConfig`] carries a section per component. Each component takes
//! its section at construction, so tests can swap tables without touching call
//! sites. Configs load from TOML (every section optional, falling back to the
//! defaults below) and are validated before use.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::convergence::ConvergenceLevel;
use crate::domain::{Impact, SignalKind};
use crate::pattern::PatternState;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid {section} config: {reason}")]
    Invalid {
        section: &'static str,
        reason: String,
    },
}

fn invalid(section: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        section,
        reason: reason.into(),
    }
}

/// Complete configuration for the decision core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub convergence: ConvergenceConfig,
    pub catalyst: CatalystConfig,
    pub pattern: PatternConfig,
    pub risk: RiskConfig,
    pub decision: DecisionConfig,
}

impl ScoringConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        let fingerprint = config.fingerprint()?;
        tracing::info!(path = %path.display(), %fingerprint, "loaded scoring config");
        Ok(config)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ScoringConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.convergence.validate()?;
        self.catalyst.validate()?;
        self.pattern.validate()?;
        self.risk.validate()?;
        Ok(())
    }

    /// Content hash of the config, stable across runs.
    ///
    /// Two configs with identical tables share a fingerprint, so a persisted
    /// result can be traced back to the tables that produced it.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}

// ── Convergence ──────────────────────────────────────────────────────

/// Canonical weight per signal kind. Weights sum to 1.0 across all seven kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub scanner: f64,
    pub institutional: f64,
    pub catalyst: f64,
    pub earnings: f64,
    pub news: f64,
    pub sector: f64,
    pub pattern: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            scanner: 0.25,
            institutional: 0.35,
            catalyst: 0.20,
            earnings: 0.07,
            news: 0.05,
            sector: 0.04,
            pattern: 0.04,
        }
    }
}

impl SignalWeights {
    pub fn weight(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::Scanner => self.scanner,
            SignalKind::Institutional => self.institutional,
            SignalKind::Catalyst => self.catalyst,
            SignalKind::Earnings => self.earnings,
            SignalKind::News => self.news,
            SignalKind::Sector => self.sector,
            SignalKind::Pattern => self.pattern,
        }
    }

    pub fn total(&self) -> f64 {
        SignalKind::ALL.iter().map(|k| self.weight(*k)).sum()
    }
}

/// Bonus added once at least `min_signals` kinds agree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BonusStep {
    pub min_signals: usize,
    pub bonus: f64,
}

/// Score boundaries between convergence levels (lower bound of each level).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            medium: 50.0,
            high: 70.0,
            critical: 85.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    pub weights: SignalWeights,
    /// Steps sorted by `min_signals`; the highest step reached applies.
    pub bonus: Vec<BonusStep>,
    pub min_signals: usize,
    pub max_score: f64,
    pub levels: LevelThresholds,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            bonus: vec![
                BonusStep { min_signals: 2, bonus: 5.0 },
                BonusStep { min_signals: 3, bonus: 10.0 },
                BonusStep { min_signals: 4, bonus: 15.0 },
            ],
            min_signals: 2,
            max_score: 98.0,
            levels: LevelThresholds::default(),
        }
    }
}

impl ConvergenceConfig {
    /// Bonus for `signal_count` agreeing kinds.
    pub fn bonus_for(&self, signal_count: usize) -> f64 {
        self.bonus
            .iter()
            .take_while(|step| step.min_signals <= signal_count)
            .last()
            .map_or(0.0, |step| step.bonus)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        const SECTION: &str = "convergence";
        for kind in SignalKind::ALL {
            let w = self.weights.weight(kind);
            if !(w > 0.0 && w.is_finite()) {
                return Err(invalid(SECTION, format!("weight for {kind} must be > 0, got {w}")));
            }
        }
        let total = self.weights.total();
        if (total - 1.0).abs() > 1e-6 {
            return Err(invalid(SECTION, format!("weights must sum to 1.0, got {total:.6}")));
        }
        if self.min_signals < 2 {
            return Err(invalid(SECTION, "min_signals must be >= 2"));
        }
        match self.bonus.first() {
            Some(first) if first.min_signals == self.min_signals => {}
            _ => {
                return Err(invalid(
                    SECTION,
                    "bonus table must start at min_signals",
                ))
            }
        }
        for pair in self.bonus.windows(2) {
            if pair[1].min_signals <= pair[0].min_signals || pair[1].bonus <= pair[0].bonus {
                return Err(invalid(
                    SECTION,
                    "bonus table must be strictly increasing in signal count and bonus",
                ));
            }
        }
        if self.bonus.iter().any(|s| s.bonus < 0.0) {
            return Err(invalid(SECTION, "bonuses must be non-negative"));
        }
        if !(self.max_score > 0.0 && self.max_score <= 100.0) {
            return Err(invalid(SECTION, "max_score must be in (0, 100]"));
        }
        let l = &self.levels;
        if !(0.0 < l.medium && l.medium < l.high && l.high < l.critical && l.critical <= self.max_score) {
            return Err(invalid(
                SECTION,
                "level thresholds must satisfy 0 < medium < high < critical <= max_score",
            ));
        }
        Ok(())
    }
}

// ── Catalyst ─────────────────────────────────────────────────────────

/// Base urgency for events at most `max_days` away.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UrgencyBand {
    pub max_days: i64,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactBonus {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub binary: f64,
}

impl Default for ImpactBonus {
    fn default() -> Self {
        Self {
            low: 5.0,
            medium: 10.0,
            high: 20.0,
            binary: 30.0,
        }
    }
}

impl ImpactBonus {
    pub fn bonus(&self, impact: Impact) -> f64 {
        match impact {
            Impact::Low => self.low,
            Impact::Medium => self.medium,
            Impact::High => self.high,
            Impact::Binary => self.binary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalystConfig {
    /// Bands sorted by `max_days`; the first band containing the event applies.
    pub bands: Vec<UrgencyBand>,
    /// Base urgency for events beyond the last band.
    pub beyond_score: f64,
    pub impact_bonus: ImpactBonus,
    pub max_score: f64,
}

impl Default for CatalystConfig {
    fn default() -> Self {
        Self {
            bands: vec![
                UrgencyBand { max_days: 3, score: 95.0 },
                UrgencyBand { max_days: 7, score: 85.0 },
                UrgencyBand { max_days: 14, score: 75.0 },
                UrgencyBand { max_days: 30, score: 65.0 },
                UrgencyBand { max_days: 60, score: 55.0 },
                UrgencyBand { max_days: 90, score: 45.0 },
                UrgencyBand { max_days: 180, score: 35.0 },
            ],
            beyond_score: 25.0,
            impact_bonus: ImpactBonus::default(),
            max_score: 100.0,
        }
    }
}

impl CatalystConfig {
    /// Base urgency for an unexpired event `days_until` days out.
    pub fn base_urgency(&self, days_until: i64) -> f64 {
        self.bands
            .iter()
            .find(|band| days_until <= band.max_days)
            .map_or(self.beyond_score, |band| band.score)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        const SECTION: &str = "catalyst";
        if self.bands.is_empty() {
            return Err(invalid(SECTION, "at least one urgency band is required"));
        }
        if self.bands[0].max_days < 0 {
            return Err(invalid(SECTION, "band max_days must be >= 0"));
        }
        for pair in self.bands.windows(2) {
            if pair[1].max_days <= pair[0].max_days {
                return Err(invalid(SECTION, "bands must be sorted by ascending max_days"));
            }
            if pair[1].score > pair[0].score {
                return Err(invalid(SECTION, "band scores must not increase with distance"));
            }
        }
        if let Some(last) = self.bands.last() {
            if self.beyond_score > last.score {
                return Err(invalid(SECTION, "beyond_score must not exceed the last band"));
            }
        }
        let b = &self.impact_bonus;
        if !(b.binary > b.high && b.high > b.medium && b.medium > b.low && b.low >= 0.0) {
            return Err(invalid(
                SECTION,
                "impact bonuses must satisfy binary > high > medium > low >= 0",
            ));
        }
        if !(self.max_score > 0.0 && self.max_score <= 100.0) {
            return Err(invalid(SECTION, "max_score must be in (0, 100]"));
        }
        Ok(())
    }
}

// ── Pattern ──────────────────────────────────────────────────────────

/// Signal score attached to each pattern state before the volume bonus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateScores {
    pub consolidating: f64,
    pub breakout: f64,
    pub confirmed: f64,
    pub normal_reaction: f64,
    pub trending: f64,
    pub failed: f64,
}

impl Default for StateScores {
    fn default() -> Self {
        Self {
            consolidating: 50.0,
            breakout: 60.0,
            confirmed: 75.0,
            normal_reaction: 65.0,
            trending: 80.0,
            failed: 20.0,
        }
    }
}

impl StateScores {
    pub fn score(&self, state: PatternState) -> f64 {
        match state {
            PatternState::Consolidating => self.consolidating,
            PatternState::Breakout => self.breakout,
            PatternState::Confirmed => self.confirmed,
            PatternState::NormalReaction => self.normal_reaction,
            PatternState::Trending => self.trending,
            PatternState::Failed => self.failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Bars forming a consolidation base.
    pub base_window: usize,
    /// Widest `(high - low) / low` still counted as consolidation.
    pub max_range_pct: f64,
    /// How many of the most recent bars are searched for a breakout.
    pub breakout_lookback: usize,
    /// Volume multiple of the base average that confirms a breakout.
    pub confirm_volume_ratio: f64,
    /// Bars a breakout may wait for volume before it is marked failed.
    pub confirm_window: usize,
    /// Consecutive higher closes that make a confirmed breakout a trend.
    pub trend_bars: usize,
    /// Lookback for trailing high/low pivot levels.
    pub level_lookback: usize,
    /// Round numbers within this fraction of price are reported.
    pub round_proximity_pct: f64,
    pub state_scores: StateScores,
    pub volume_bonus_per_unit: f64,
    pub max_volume_bonus: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            base_window: 20,
            max_range_pct: 0.12,
            breakout_lookback: 10,
            confirm_volume_ratio: 1.5,
            confirm_window: 3,
            trend_bars: 3,
            level_lookback: 60,
            round_proximity_pct: 0.10,
            state_scores: StateScores::default(),
            volume_bonus_per_unit: 10.0,
            max_volume_bonus: 15.0,
        }
    }
}

impl PatternConfig {
    /// Fewest bars the classifier needs: one full base plus the bar under test.
    pub fn min_history(&self) -> usize {
        self.base_window + 1
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        const SECTION: &str = "pattern";
        if self.base_window < 2 {
            return Err(invalid(SECTION, "base_window must be >= 2"));
        }
        if !(self.max_range_pct > 0.0) {
            return Err(invalid(SECTION, "max_range_pct must be > 0"));
        }
        if self.breakout_lookback == 0 || self.confirm_window == 0 || self.trend_bars == 0 {
            return Err(invalid(
                SECTION,
                "breakout_lookback, confirm_window and trend_bars must be >= 1",
            ));
        }
        if !(self.confirm_volume_ratio > 1.0) {
            return Err(invalid(SECTION, "confirm_volume_ratio must be > 1.0"));
        }
        if self.level_lookback == 0 {
            return Err(invalid(SECTION, "level_lookback must be >= 1"));
        }
        let s = &self.state_scores;
        if s.confirmed <= s.consolidating || s.breakout <= s.consolidating {
            return Err(invalid(
                SECTION,
                "breakout and confirmed must score above consolidating",
            ));
        }
        if self.volume_bonus_per_unit < 0.0 || self.max_volume_bonus < 0.0 {
            return Err(invalid(SECTION, "volume bonus settings must be non-negative"));
        }
        Ok(())
    }
}

// ── Risk ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Fraction of equity risked at the score floor.
    pub base_risk_fraction: f64,
    /// Fraction of equity risked at score 100; the hard ceiling.
    pub max_risk_fraction: f64,
    /// Convergence score at or below which only the base risk applies.
    pub score_floor: f64,
    pub max_position_fraction: f64,
    pub max_sector_fraction: f64,
    pub max_open_positions: usize,
    pub max_day_trades: u32,
    /// Day-trade cap only binds below this equity.
    pub pdt_equity_threshold: f64,
    /// Maximum portfolio heat (open risk / equity) before new entries stop.
    pub max_heat: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            base_risk_fraction: 0.005,
            max_risk_fraction: 0.02,
            score_floor: 50.0,
            max_position_fraction: 0.25,
            max_sector_fraction: 0.40,
            max_open_positions: 10,
            max_day_trades: 3,
            pdt_equity_threshold: 25_000.0,
            max_heat: 0.06,
        }
    }
}

impl RiskConfig {
    /// Risk budget as a fraction of equity for a convergence score.
    ///
    /// Linear from `base_risk_fraction` at the floor to `max_risk_fraction`
    /// at 100; never above the ceiling.
    pub fn risk_fraction(&self, convergence_score: f64) -> f64 {
        let span = 100.0 - self.score_floor;
        let t = if span > 0.0 {
            ((convergence_score - self.score_floor) / span).clamp(0.0, 1.0)
        } else {
            1.0
        };
        (self.base_risk_fraction + (self.max_risk_fraction - self.base_risk_fraction) * t)
            .min(self.max_risk_fraction)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        const SECTION: &str = "risk";
        if !(self.base_risk_fraction > 0.0 && self.base_risk_fraction <= self.max_risk_fraction) {
            return Err(invalid(
                SECTION,
                "base_risk_fraction must be > 0 and <= max_risk_fraction",
            ));
        }
        if !(self.max_risk_fraction < 1.0) {
            return Err(invalid(SECTION, "max_risk_fraction must be < 1.0"));
        }
        if !(0.0..100.0).contains(&self.score_floor) {
            return Err(invalid(SECTION, "score_floor must be in [0, 100)"));
        }
        for (name, v) in [
            ("max_position_fraction", self.max_position_fraction),
            ("max_sector_fraction", self.max_sector_fraction),
            ("max_heat", self.max_heat),
        ] {
            if !(v > 0.0 && v <= 1.0) {
                return Err(invalid(SECTION, format!("{name} must be in (0, 1]")));
            }
        }
        if self.max_sector_fraction < self.max_position_fraction {
            return Err(invalid(
                SECTION,
                "max_sector_fraction must be >= max_position_fraction",
            ));
        }
        if self.max_open_positions == 0 {
            return Err(invalid(SECTION, "max_open_positions must be >= 1"));
        }
        Ok(())
    }
}

// ── Decision ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Lowest convergence level that may proceed to sizing.
    pub min_level: ConvergenceLevel,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            min_level: ConvergenceLevel::Medium,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ScoringConfig::default().validate().unwrap();
    }

    #[test]
    fn default_weights_sum_to_one_and_rank_institutional_first() {
        let w = SignalWeights::default();
        assert!((w.total() - 1.0).abs() < 1e-9);
        assert!(w.institutional > w.scanner);
        assert!(w.scanner > w.catalyst);
        assert!(w.catalyst > w.earnings);
    }

    #[test]
    fn bonus_steps() {
        let c = ConvergenceConfig::default();
        assert_eq!(c.bonus_for(1), 0.0);
        assert_eq!(c.bonus_for(2), 5.0);
        assert_eq!(c.bonus_for(3), 10.0);
        assert_eq!(c.bonus_for(4), 15.0);
        assert_eq!(c.bonus_for(7), 15.0);
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let mut config = ScoringConfig::default();
        config.convergence.weights.news = 0.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"), "{err}");
    }

    #[test]
    fn rejects_min_signals_below_two() {
        let mut c = ConvergenceConfig::default();
        c.min_signals = 1;
        c.bonus.insert(0, BonusStep { min_signals: 1, bonus: 1.0 });
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_non_monotonic_bands() {
        let mut c = CatalystConfig::default();
        c.bands[2].score = 99.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_unordered_impact_bonus() {
        let mut c = CatalystConfig::default();
        c.impact_bonus.high = 40.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn risk_fraction_scales_with_score() {
        let r = RiskConfig::default();
        assert_eq!(r.risk_fraction(30.0), 0.005);
        assert_eq!(r.risk_fraction(50.0), 0.005);
        assert!((r.risk_fraction(75.0) - 0.0125).abs() < 1e-12);
        assert!((r.risk_fraction(100.0) - 0.02).abs() < 1e-12);
        assert!(r.risk_fraction(85.0) > r.risk_fraction(70.0));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[convergence.levels]
medium = 55.0
high = 72.0
critical = 88.0

[risk]
max_position_fraction = 0.10
"#;
        let config = ScoringConfig::from_toml(toml).unwrap();
        assert_eq!(config.convergence.levels.medium, 55.0);
        assert_eq!(config.convergence.weights, SignalWeights::default());
        assert_eq!(config.risk.max_position_fraction, 0.10);
        assert_eq!(config.risk.max_heat, 0.06);
        assert_eq!(config.catalyst, CatalystConfig::default());
    }

    #[test]
    fn invalid_toml_is_rejected_after_parse() {
        let toml = r#"
[risk]
base_risk_fraction = 0.05
max_risk_fraction = 0.02
"#;
        assert!(matches!(
            ScoringConfig::from_toml(toml),
            Err(ConfigError::Invalid { section: "risk", .. })
        ));
    }

    #[test]
    fn fingerprint_is_deterministic_and_sensitive() {
        let a = ScoringConfig::default();
        let mut b = a.clone();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        b.catalyst.beyond_score = 20.0;
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn toml_roundtrip() {
        let config = ScoringConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back = ScoringConfig::from_toml(&text).unwrap();
        assert_eq!(config, back);
    }
}
