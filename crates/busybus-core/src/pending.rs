//! Pending-call correlation table: `token → caller session`.
//!
//! An entry exists iff a CLICALL has been forwarded to a provider as
//! SRVCALL and no SRVREPLY (or provider death) has been observed yet. The
//! table is keyed by `(provider, token)` rather than `token` alone: tokens
//! are only unique per caller session, so two providers could plausibly see
//! the same token value routed to them from different callers at once, and
//! a reply is only ever looked up against the provider it came from.

use std::collections::HashMap;

use crate::registry::SessionId;

/// The live set of pending calls.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<(SessionId, u32), SessionId>,
}

impl PendingTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `token`, forwarded to `provider`, awaits a reply for
    /// `caller`.
    pub fn insert(&mut self, provider: SessionId, token: u32, caller: SessionId) {
        self.entries.insert((provider, token), caller);
    }

    /// Look up and remove the caller awaiting `token` from `provider`, as
    /// happens when its SRVREPLY arrives.
    pub fn take(&mut self, provider: SessionId, token: u32) -> Option<SessionId> {
        self.entries.remove(&(provider, token))
    }

    /// Remove every entry routed to `provider`, returning each orphaned
    /// caller along with the token its own CLICALL was assigned. Called
    /// when a provider session dies mid-call: each returned caller gets a
    /// METHODERR reply carrying its own token back, not a fabricated one.
    pub fn remove_by_provider(&mut self, provider: SessionId) -> Vec<(SessionId, u32)> {
        let mut orphaned = Vec::new();
        self.entries.retain(|&(p, token), &mut caller| {
            if p == provider {
                orphaned.push((caller, token));
                false
            } else {
                true
            }
        });
        orphaned
    }

    /// Number of outstanding calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no outstanding calls.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_take_round_trips() {
        let mut table = PendingTable::new();
        table.insert(2, 7, 1);
        assert_eq!(table.take(2, 7), Some(1));
        assert!(table.is_empty());
    }

    #[test]
    fn take_miss_returns_none() {
        let mut table = PendingTable::new();
        assert_eq!(table.take(2, 7), None);
    }

    #[test]
    fn remove_by_provider_only_affects_its_entries() {
        let mut table = PendingTable::new();
        table.insert(2, 1, 10);
        table.insert(2, 2, 11);
        table.insert(3, 1, 12);

        let mut orphaned = table.remove_by_provider(2);
        orphaned.sort_unstable();
        assert_eq!(orphaned, vec![(10, 1), (11, 2)]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.take(3, 1), Some(12));
    }

    #[test]
    fn distinct_providers_may_share_a_token_value() {
        let mut table = PendingTable::new();
        table.insert(2, 5, 100);
        table.insert(3, 5, 200);
        assert_eq!(table.take(2, 5), Some(100));
        assert_eq!(table.take(3, 5), Some(200));
    }
}
