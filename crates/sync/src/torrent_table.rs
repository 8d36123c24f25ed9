use std::collections::{BTreeSet, HashMap};

use tracing::{debug, trace};

use domain::{Torrent, TorrentId, UpdateBatch};

/// How many polls a placeholder may sit without main info before it is
/// reported through `need_info`.
pub const DEFAULT_NEED_INFO_POLLS: u32 = 2;

#[derive(Debug, Default)]
struct TorrentSlot {
    torrent: Torrent,
    /// Set once the name has arrived; the record is unusable for
    /// display until then.
    has_main_info: bool,
    polls_without_info: u32,
}

/// Classification of one applied batch. The four sets are disjoint:
/// an id lands in `added` the moment its main info completes, in
/// `completed` on a done-state transition, otherwise in `changed` if
/// any field differs; placeholders only ever report via `need_info`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub added: BTreeSet<TorrentId>,
    pub changed: BTreeSet<TorrentId>,
    pub completed: BTreeSet<TorrentId>,
    pub need_info: BTreeSet<TorrentId>,
}

impl ApplyOutcome {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.changed.is_empty()
            && self.completed.is_empty()
            && self.need_info.is_empty()
    }
}

/// Authoritative local mirror of remote torrent state, keyed by the
/// remote-assigned id.
///
/// An entity is created on first sighting of its id, merged on every
/// batch that mentions it, and destroyed only on an explicit remove.
/// Absence from a batch means "unchanged", never "gone".
#[derive(Debug)]
pub struct TorrentTable {
    slots: HashMap<TorrentId, TorrentSlot>,
    need_info_polls: u32,
}

impl Default for TorrentTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TorrentTable {
    pub fn new() -> Self {
        Self::with_need_info_polls(DEFAULT_NEED_INFO_POLLS)
    }

    pub fn with_need_info_polls(need_info_polls: u32) -> Self {
        Self {
            slots: HashMap::new(),
            need_info_polls: need_info_polls.max(1),
        }
    }

    /// Merges a batch into the table and classifies the result.
    ///
    /// Unseen ids become placeholders; supplied fields overwrite
    /// stored values field-by-field. Ids whose every supplied value
    /// equals the stored one appear in no set.
    pub fn apply(&mut self, batch: &UpdateBatch) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();

        for (&id, update) in &batch.torrents {
            let slot = self.slots.entry(id).or_insert_with(|| {
                trace!(%id, "creating placeholder");
                TorrentSlot::default()
            });

            let had_info = slot.has_main_info;
            let merged = slot.torrent.merge(update);

            if merged.gained_main_info {
                slot.has_main_info = true;
                slot.polls_without_info = 0;
            }

            if !had_info && slot.has_main_info {
                outcome.added.insert(id);
            } else if had_info && merged.became_done {
                outcome.completed.insert(id);
            } else if had_info && merged.any_changed() {
                outcome.changed.insert(id);
            }
        }

        // Every apply counts as one poll against the placeholders,
        // whether or not the batch mentioned them.
        for (&id, slot) in &mut self.slots {
            if !slot.has_main_info {
                slot.polls_without_info += 1;

                if slot.polls_without_info >= self.need_info_polls {
                    outcome.need_info.insert(id);
                }
            }
        }

        if !outcome.is_empty() {
            debug!(
                added = outcome.added.len(),
                changed = outcome.changed.len(),
                completed = outcome.completed.len(),
                need_info = outcome.need_info.len(),
                "applied torrent batch"
            );
        }

        outcome
    }

    /// Drops entities on an explicit remove notification. A later
    /// sighting of the same id recreates a fresh placeholder.
    pub fn remove(&mut self, ids: &[TorrentId]) {
        for id in ids {
            if self.slots.remove(id).is_some() {
                trace!(%id, "removed torrent");
            }
        }
    }

    pub fn get(&self, id: TorrentId) -> Option<&Torrent> {
        self.slots.get(&id).map(|slot| &slot.torrent)
    }

    /// True once the record's main info has arrived.
    pub fn is_usable(&self, id: TorrentId) -> bool {
        self.slots.get(&id).is_some_and(|slot| slot.has_main_info)
    }

    pub fn all_ids(&self) -> Vec<TorrentId> {
        let mut ids: Vec<TorrentId> = self.slots.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
