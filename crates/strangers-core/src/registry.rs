//! Active two-party sessions.

use std::collections::HashMap;

use strangers_common::UserId;

use crate::error::MatchError;

/// Symmetric user → partner mapping.
///
/// Both directions are always inserted and removed together, so
/// `partner_of(a) == Some(b)` holds exactly when `partner_of(b) == Some(a)`.
#[derive(Debug, Default, Clone)]
pub struct PairRegistry {
    partners: HashMap<UserId, UserId>,
}

impl PairRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session between `a` and `b`.
    pub fn pair(&mut self, a: UserId, b: UserId) -> Result<(), MatchError> {
        if a == b {
            return Err(MatchError::SelfPair(a));
        }
        if self.partners.contains_key(&a) {
            return Err(MatchError::AlreadyPaired(a));
        }
        if self.partners.contains_key(&b) {
            return Err(MatchError::AlreadyPaired(b));
        }
        self.partners.insert(a.clone(), b.clone());
        self.partners.insert(b, a);
        Ok(())
    }

    pub fn partner_of(&self, id: &UserId) -> Option<UserId> {
        self.partners.get(id).cloned()
    }

    pub fn is_paired(&self, id: &UserId) -> bool {
        self.partners.contains_key(id)
    }

    /// End the session `id` belongs to, returning the partner it had.
    pub fn unpair(&mut self, id: &UserId) -> Option<UserId> {
        let partner = self.partners.remove(id)?;
        self.partners.remove(&partner);
        Some(partner)
    }

    /// Number of active sessions (each counts once, not per side).
    pub fn session_count(&self) -> usize {
        self.partners.len() / 2
    }

    /// Every `(user, partner)` entry, both directions included.
    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &UserId)> {
        self.partners.iter()
    }
}
