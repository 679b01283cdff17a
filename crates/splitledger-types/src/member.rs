//! Member records and access capabilities.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Amount, Identity};

/// A participant's membership record.
///
/// Records are never deleted: removal and settlement only clear the stake
/// and the active flag, so expense history keeps pointing at real members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub identity: Identity,
    /// Refundable deposit currently held for this member.
    pub stake: Amount,
    pub active: bool,
}

impl Member {
    #[must_use]
    pub fn new(identity: Identity, stake: Amount) -> Self {
        Self {
            identity,
            stake,
            active: true,
        }
    }

    /// Clear the stake and deactivate. Returns the stake that was held.
    pub fn deactivate(&mut self) -> Amount {
        self.active = false;
        std::mem::take(&mut self.stake)
    }
}

/// A role checked at the entry of a mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// The group's distinguished administrator.
    Administrator,
    /// An identity on the join whitelist.
    Whitelisted,
    /// The payer of the expense being recorded.
    Payer,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Administrator => write!(f, "ADMINISTRATOR"),
            Self::Whitelisted => write!(f, "WHITELISTED"),
            Self::Payer => write!(f, "PAYER"),
        }
    }
}

/// Lifecycle of a group. `Open → Settled` is the only transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupPhase {
    #[default]
    Open,
    Settled,
}

impl GroupPhase {
    #[must_use]
    pub fn is_settled(self) -> bool {
        self == Self::Settled
    }
}

impl fmt::Display for GroupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Settled => write!(f, "SETTLED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deactivate_returns_stake() {
        let mut m = Member::new(Identity([3; 20]), Amount::new(500));
        assert!(m.active);
        assert_eq!(m.deactivate(), Amount::new(500));
        assert!(!m.active);
        assert!(m.stake.is_zero());
        assert_eq!(m.deactivate(), Amount::ZERO);
    }

    #[test]
    fn phase_defaults_to_open() {
        assert_eq!(GroupPhase::default(), GroupPhase::Open);
        assert!(!GroupPhase::Open.is_settled());
        assert!(GroupPhase::Settled.is_settled());
        assert_eq!(GroupPhase::Settled.to_string(), "SETTLED");
    }
}
