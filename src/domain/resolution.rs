//! Oracle verdicts.

use serde::{Deserialize, Serialize};

use super::money::Price;
use super::side::Side;

/// Outcome of asking the oracle about a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// The settle time has not been reached.
    NotYetDue,
    /// The outcome is known.
    Decided {
        winning_side: Side,
        /// `None` for admin decisions.
        observed: Option<Price>,
    },
    /// The data source could not produce a trustworthy value, or the market
    /// needs a manual decision.
    Unresolvable { reason: String },
}

impl Resolution {
    /// Verdict from an observation: YES iff the observed value reached the target.
    #[must_use]
    pub fn from_observation(observed: Price, target: Price) -> Self {
        Self::Decided {
            winning_side: decide(observed, target),
            observed: Some(observed),
        }
    }

    /// Admin-supplied verdict.
    #[must_use]
    pub const fn admin(winning_side: Side) -> Self {
        Self::Decided {
            winning_side,
            observed: None,
        }
    }

    pub fn unresolvable(reason: impl Into<String>) -> Self {
        Self::Unresolvable {
            reason: reason.into(),
        }
    }
}

/// `YES` iff `observed >= target`.
#[must_use]
pub fn decide(observed: Price, target: Price) -> Side {
    if observed >= target {
        Side::Yes
    } else {
        Side::No
    }
}
