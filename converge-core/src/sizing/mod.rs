//! Position risk sizing and portfolio limit checks.
//!
//! Sizing turns a convergence score into a risk budget, divides it by the
//! per-share risk to the stop, then clamps against cash and concentration
//! caps. Limit checks answer the separate question of whether a new entry is
//! allowed at all.

mod limits;
mod risk;

pub use limits::{LimitCheck, LimitViolation};
pub use risk::{PositionSizeRecommendation, RiskSizer, SizingError, SizingLimit, SizingWarning};
