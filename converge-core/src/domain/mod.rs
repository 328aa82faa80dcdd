//! Domain types shared by every scoring component.

pub mod bar;
pub mod catalyst;
pub mod portfolio;
pub mod signal;

pub use bar::{Bar, PriceRange};
pub use catalyst::{Catalyst, CatalystType, Impact};
pub use portfolio::{Holding, PortfolioState, Side, TradeCandidate};
pub use signal::{clamp_score, Payload, Signal, SignalKind, SignalSet, MAX_SCORE, MIN_SCORE};
