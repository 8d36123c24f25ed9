use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use domain::{Priority, TorrentId};
use sync::{FileTreeModel, NodeId, PeerDelta, PeerRoster, TorrentTable, TreeEvent};

/// Detail-view state for the torrents currently under inspection.
///
/// The file tree is only populated while exactly one torrent is
/// inspected; a multi-selection still aggregates peers but shows no
/// file list. Changing the inspected set discards the tree so rows
/// from the previous torrent can never leak into the next one.
pub struct Inspector {
    inspected: BTreeSet<TorrentId>,
    tree: FileTreeModel,
    peers: PeerRoster,
    tree_built: bool,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspector {
    pub fn new() -> Self {
        Self {
            inspected: BTreeSet::new(),
            tree: FileTreeModel::new(),
            peers: PeerRoster::new(),
            tree_built: false,
        }
    }

    pub fn inspected(&self) -> &BTreeSet<TorrentId> {
        &self.inspected
    }

    /// The inspected torrent, when exactly one is selected.
    pub fn single_id(&self) -> Option<TorrentId> {
        if self.inspected.len() == 1 {
            self.inspected.iter().next().copied()
        } else {
            None
        }
    }

    pub fn tree(&self) -> &FileTreeModel {
        &self.tree
    }

    pub fn peers(&self) -> &PeerRoster {
        &self.peers
    }

    /// Replaces the inspected set. Returns true when the set actually
    /// changed, in which case the file tree has been reset and the
    /// caller should schedule a detail refresh.
    pub fn set_inspected(&mut self, ids: impl IntoIterator<Item = TorrentId>) -> bool {
        let next: BTreeSet<TorrentId> = ids.into_iter().collect();

        if next == self.inspected {
            return false;
        }

        debug!(count = next.len(), "inspected set changed");
        self.inspected = next;
        self.tree.clear();
        self.tree_built = false;
        true
    }

    /// Rebuilds the detail view from the table's current detail
    /// fields. Call after a detail batch was applied.
    pub fn refresh(&mut self, table: &TorrentTable) -> PeerDelta {
        self.refresh_tree(table);

        let snapshot = self
            .inspected
            .iter()
            .filter_map(|&id| table.get(id).map(|t| (id, t.peers.as_slice())));
        self.peers.refresh(snapshot)
    }

    /// Sets `wanted` on the given tree nodes, returning the file
    /// indices that actually flipped. The caller sends those to the
    /// remote source; the next full refresh confirms them.
    pub fn set_wanted(&mut self, ids: &[NodeId], wanted: bool) -> BTreeSet<i32> {
        self.tree.set_wanted(ids, wanted)
    }

    pub fn set_priority(&mut self, ids: &[NodeId], priority: Priority) -> BTreeSet<i32> {
        self.tree.set_priority(ids, priority)
    }

    pub fn drain_tree_events(&mut self) -> Vec<TreeEvent> {
        self.tree.drain_events()
    }

    fn refresh_tree(&mut self, table: &TorrentTable) {
        let Some(id) = self.single_id() else {
            return;
        };
        let Some(torrent) = table.get(id) else {
            return;
        };

        if torrent.files.is_empty() {
            return;
        }

        // fresher byte counts from the stats group, when present
        let have_by_index: HashMap<i32, u64> = torrent
            .file_stats
            .iter()
            .map(|s| (s.index, s.have))
            .collect();

        let bulk_refresh = !self.tree_built;

        for entry in &torrent.files {
            let have = have_by_index.get(&entry.index).copied().unwrap_or(entry.have);
            self.tree.add_file(
                entry.index,
                &entry.path,
                entry.wanted,
                entry.priority,
                entry.size,
                have,
                bulk_refresh,
            );
        }

        self.tree_built = true;
    }
}
