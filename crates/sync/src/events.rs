use serde::{Deserialize, Serialize};

use domain::TorrentId;

/// Change notification fanned out after an update batch was applied to
/// the torrent table. Id lists are sorted and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableEvent {
    /// Main info became complete for these ids for the first time.
    TorrentsAdded(Vec<TorrentId>),
    /// At least one tracked field changed value.
    TorrentsChanged(Vec<TorrentId>),
    /// These ids crossed the not-done -> done boundary.
    TorrentsCompleted(Vec<TorrentId>),
    /// Placeholders whose main info is overdue; the consumer should
    /// issue a dedicated detail fetch.
    TorrentsNeedDetail(Vec<TorrentId>),
    /// Explicitly removed by the remote source.
    TorrentsRemoved(Vec<TorrentId>),
}

/// Change notification emitted by the file tree. Nodes are addressed
/// by their slash-joined path from the (unnamed) root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeEvent {
    NodeInserted {
        parent: String,
        row: usize,
    },
    NodeRemoved {
        parent: String,
        row: usize,
    },
    /// Inclusive column range that needs re-rendering for one node.
    NodeRangeChanged {
        node: String,
        first_col: usize,
        last_col: usize,
    },
}
