use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use domain::{Peer, TorrentId};

/// Reconciliation key for one peer row: the remote reports peers per
/// torrent, and the same address can appear under several torrents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerKey {
    pub torrent: TorrentId,
    pub address: String,
}

impl PeerKey {
    pub fn new(torrent: TorrentId, address: impl Into<String>) -> Self {
        Self {
            torrent,
            address: address.into(),
        }
    }
}

/// Outcome of one roster refresh; key lists are sorted. Rows whose
/// fields are unchanged appear in no list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerDelta {
    pub added: Vec<PeerKey>,
    pub updated: Vec<PeerKey>,
    pub removed: Vec<PeerKey>,
}

impl PeerDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Current peer set across the inspected torrents.
///
/// Unlike torrent records, peers use absence-implies-gone semantics:
/// the remote always reports the complete current peer set, so a key
/// missing from the latest snapshot is dropped.
#[derive(Debug, Default)]
pub struct PeerRoster {
    rows: HashMap<PeerKey, Peer>,
}

impl PeerRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the roster with the latest complete snapshot and
    /// reports what changed.
    pub fn refresh<'a, I>(&mut self, snapshot: I) -> PeerDelta
    where
        I: IntoIterator<Item = (TorrentId, &'a [Peer])>,
    {
        let mut next: HashMap<PeerKey, Peer> = HashMap::new();

        for (torrent, peers) in snapshot {
            for peer in peers {
                next.insert(PeerKey::new(torrent, peer.address.clone()), peer.clone());
            }
        }

        let mut delta = PeerDelta::default();

        for (key, peer) in &next {
            match self.rows.get(key) {
                None => delta.added.push(key.clone()),
                Some(prior) if prior != peer => delta.updated.push(key.clone()),
                Some(_) => {}
            }
        }

        for key in self.rows.keys() {
            if !next.contains_key(key) {
                delta.removed.push(key.clone());
            }
        }

        delta.added.sort();
        delta.updated.sort();
        delta.removed.sort();

        if !delta.is_empty() {
            trace!(
                added = delta.added.len(),
                updated = delta.updated.len(),
                removed = delta.removed.len(),
                "peer roster refreshed"
            );
        }

        self.rows = next;
        delta
    }

    pub fn get(&self, key: &PeerKey) -> Option<&Peer> {
        self.rows.get(key)
    }

    pub fn keys(&self) -> Vec<PeerKey> {
        let mut keys: Vec<PeerKey> = self.rows.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
