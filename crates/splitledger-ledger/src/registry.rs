//! Address registry: the join whitelist and the administrator identity.
//!
//! The registry is the leaf of the access model: it answers "may this
//! identity ever join?" and "is this caller the administrator?". Both
//! checks return a capability-tagged [`LedgerError::Unauthorized`].

use std::collections::HashSet;

use splitledger_types::{Capability, Identity, LedgerError, Result};

/// Whitelist plus administrator.
#[derive(Debug, Clone)]
pub struct AddressRegistry {
    administrator: Identity,
    whitelist: HashSet<Identity>,
}

impl AddressRegistry {
    /// Create a registry with an initial whitelist.
    #[must_use]
    pub fn new(administrator: Identity, whitelist: impl IntoIterator<Item = Identity>) -> Self {
        Self {
            administrator,
            whitelist: whitelist.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn administrator(&self) -> Identity {
        self.administrator
    }

    #[must_use]
    pub fn is_administrator(&self, identity: &Identity) -> bool {
        &self.administrator == identity
    }

    #[must_use]
    pub fn is_whitelisted(&self, identity: &Identity) -> bool {
        self.whitelist.contains(identity)
    }

    /// Fail unless `caller` is the administrator.
    pub fn require_administrator(&self, caller: Identity) -> Result<()> {
        if self.is_administrator(&caller) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                caller,
                required: Capability::Administrator,
            })
        }
    }

    /// Fail unless `identity` is on the whitelist.
    pub fn require_whitelisted(&self, identity: Identity) -> Result<()> {
        if self.is_whitelisted(&identity) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                caller: identity,
                required: Capability::Whitelisted,
            })
        }
    }

    /// Add an identity to the whitelist. Returns `false` if already present.
    pub fn admit(&mut self, identity: Identity) -> bool {
        self.whitelist.insert(identity)
    }

    /// Remove an identity from the whitelist. Active membership is not
    /// affected. Returns `false` if it was not present.
    pub fn revoke(&mut self, identity: &Identity) -> bool {
        self.whitelist.remove(identity)
    }

    /// Number of whitelisted identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.whitelist.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.whitelist.is_empty()
    }
}
