//! Catalyst — a dated, categorized future event expected to move a price.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Category of catalyst event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatalystType {
    Earnings,
    RegulatoryDecision,
    ClinicalTrial,
    ContractAward,
    PolicyEvent,
    ProductLaunch,
    Merger,
    Manual,
}

impl CatalystType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalystType::Earnings => "EARNINGS",
            CatalystType::RegulatoryDecision => "REGULATORY_DECISION",
            CatalystType::ClinicalTrial => "CLINICAL_TRIAL",
            CatalystType::ContractAward => "CONTRACT_AWARD",
            CatalystType::PolicyEvent => "POLICY_EVENT",
            CatalystType::ProductLaunch => "PRODUCT_LAUNCH",
            CatalystType::Merger => "MERGER",
            CatalystType::Manual => "MANUAL",
        }
    }
}

impl std::fmt::Display for CatalystType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected price impact tier. `Binary` events resolve to a large move either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Impact {
    Low,
    Medium,
    High,
    Binary,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Low => "LOW",
            Impact::Medium => "MEDIUM",
            Impact::High => "HIGH",
            Impact::Binary => "BINARY",
        }
    }
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored catalyst record.
///
/// Records are flat so they round-trip through any document store
/// field-for-field. A record is replaced, never patched: `(ticker,
/// catalyst_type, event_date)` identifies it for re-insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalyst {
    pub ticker: String,
    pub catalyst_type: CatalystType,
    pub event_date: NaiveDate,
    pub impact: Impact,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: String,
}

impl Catalyst {
    pub fn new(
        ticker: impl Into<String>,
        catalyst_type: CatalystType,
        event_date: NaiveDate,
        impact: Impact,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            catalyst_type,
            event_date,
            impact,
            description: String::new(),
            source: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Calendar days from `as_of` to the event; negative once it has passed.
    pub fn days_until(&self, as_of: NaiveDate) -> i64 {
        (self.event_date - as_of).num_days()
    }

    pub fn is_expired(&self, as_of: NaiveDate) -> bool {
        self.days_until(as_of) < 0
    }

    /// Identity used for re-insertion.
    pub fn same_event(&self, other: &Catalyst) -> bool {
        self.ticker.eq_ignore_ascii_case(&other.ticker)
            && self.catalyst_type == other.catalyst_type
            && self.event_date == other.event_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn days_until_and_expiry() {
        let c = Catalyst::new("MRNA", CatalystType::RegulatoryDecision, date(2024, 6, 10), Impact::Binary);
        assert_eq!(c.days_until(date(2024, 6, 1)), 9);
        assert_eq!(c.days_until(date(2024, 6, 10)), 0);
        assert!(!c.is_expired(date(2024, 6, 10)));
        assert!(c.is_expired(date(2024, 6, 11)));
    }

    #[test]
    fn same_event_ignores_description_and_ticker_case() {
        let a = Catalyst::new("aapl", CatalystType::Earnings, date(2024, 7, 30), Impact::High);
        let b = Catalyst::new("AAPL", CatalystType::Earnings, date(2024, 7, 30), Impact::Medium)
            .with_description("Q3 call");
        assert!(a.same_event(&b));
        let c = Catalyst::new("AAPL", CatalystType::ProductLaunch, date(2024, 7, 30), Impact::High);
        assert!(!a.same_event(&c));
    }

    #[test]
    fn wire_format_uses_screaming_snake_case() {
        let c = Catalyst::new("LMT", CatalystType::ContractAward, date(2024, 9, 1), Impact::High)
            .with_source("sam.gov");
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"CONTRACT_AWARD\""));
        assert!(json.contains("\"HIGH\""));
        assert!(json.contains("\"2024-09-01\""));
    }
}
