//! Signal — one scored opinion about a ticker from one evidence source.
//!
//! Signals are produced outside the decision core (scanners, filing
//! collectors, calendar readers) and by the pattern classifier and catalyst
//! scorer inside it. Once built a signal cannot be changed: fields are private
//! and the score is clamped into `[0, 100]` at construction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowest and highest score any signal may carry.
pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// Evidence source of a signal.
///
/// Declaration order is the canonical order used for iteration and for the
/// contribution breakdown of a convergence result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    Scanner,
    Institutional,
    Catalyst,
    Earnings,
    News,
    Sector,
    Pattern,
}

impl SignalKind {
    /// All kinds in canonical order.
    pub const ALL: [SignalKind; 7] = [
        SignalKind::Scanner,
        SignalKind::Institutional,
        SignalKind::Catalyst,
        SignalKind::Earnings,
        SignalKind::News,
        SignalKind::Sector,
        SignalKind::Pattern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Scanner => "scanner",
            SignalKind::Institutional => "institutional",
            SignalKind::Catalyst => "catalyst",
            SignalKind::Earnings => "earnings",
            SignalKind::News => "news",
            SignalKind::Sector => "sector",
            SignalKind::Pattern => "pattern",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque producer-specific context attached to a signal.
pub type Payload = BTreeMap<String, serde_json::Value>;

/// An immutable, scored opinion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SignalRecord")]
pub struct Signal {
    kind: SignalKind,
    score: f64,
    reasoning: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    payload: Payload,
}

impl Signal {
    /// Build a signal. A NaN score is treated as zero evidence.
    pub fn new(kind: SignalKind, score: f64, reasoning: impl Into<String>) -> Self {
        Self {
            kind,
            score: clamp_score(score),
            reasoning: reasoning.into(),
            payload: Payload::new(),
        }
    }

    /// Attach one payload entry, consuming the signal.
    pub fn with_payload(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

/// Clamp a score into `[0, 100]`, mapping NaN to 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        MIN_SCORE
    } else {
        score.clamp(MIN_SCORE, MAX_SCORE)
    }
}

/// Wire shape of a signal; every deserialized signal is rebuilt through
/// [`Signal::new`] so the score bound holds for stored data too.
#[derive(Deserialize)]
struct SignalRecord {
    kind: SignalKind,
    score: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    payload: Payload,
}

impl From<SignalRecord> for Signal {
    fn from(raw: SignalRecord) -> Self {
        let mut signal = Signal::new(raw.kind, raw.score, raw.reasoning);
        signal.payload = raw.payload;
        signal
    }
}

/// Sparse map from signal kind to the signal of that kind.
///
/// Producers that failed or timed out are simply absent. Iteration follows
/// the canonical kind order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Signal>", into = "Vec<Signal>")]
pub struct SignalSet {
    signals: BTreeMap<SignalKind, Signal>,
}

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a signal under its own kind, returning any signal it replaced.
    pub fn insert(&mut self, signal: Signal) -> Option<Signal> {
        self.signals.insert(signal.kind(), signal)
    }

    /// Set or clear a kind explicitly. `None` marks the kind absent.
    pub fn set(&mut self, kind: SignalKind, signal: Option<Signal>) {
        match signal {
            Some(signal) if signal.kind() == kind => {
                self.signals.insert(kind, signal);
            }
            Some(signal) => {
                tracing::warn!(
                    expected = %kind,
                    actual = %signal.kind(),
                    "signal stored under its own kind, not the requested slot"
                );
                self.signals.insert(signal.kind(), signal);
            }
            None => {
                self.signals.remove(&kind);
            }
        }
    }

    pub fn get(&self, kind: SignalKind) -> Option<&Signal> {
        self.signals.get(&kind)
    }

    pub fn contains(&self, kind: SignalKind) -> bool {
        self.signals.contains_key(&kind)
    }

    /// Number of kinds present.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Present signals in canonical kind order.
    pub fn iter(&self) -> impl Iterator<Item = &Signal> {
        self.signals.values()
    }
}

impl FromIterator<Signal> for SignalSet {
    fn from_iter<I: IntoIterator<Item = Signal>>(iter: I) -> Self {
        let mut set = SignalSet::new();
        for signal in iter {
            set.insert(signal);
        }
        set
    }
}

impl From<Vec<Signal>> for SignalSet {
    fn from(signals: Vec<Signal>) -> Self {
        signals.into_iter().collect()
    }
}

impl From<SignalSet> for Vec<Signal> {
    fn from(set: SignalSet) -> Self {
        set.signals.into_values().collect()
    }
}
