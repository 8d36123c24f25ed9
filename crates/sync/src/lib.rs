//! Client-side synchronization core: reconciles partial, delta-oriented
//! updates from a remote torrent session into a consistent local mirror
//! and computes minimal change sets for dependent views.

pub mod events;
pub mod file_tree;
pub mod peer_roster;
pub mod torrent_table;

pub use events::{TableEvent, TreeEvent};
pub use file_tree::{
    FileTreeModel, NodeId, COL_NAME, COL_PRIORITY, COL_PROGRESS, COL_SIZE, COL_WANTED,
    NUM_COLUMNS,
};
pub use peer_roster::{PeerDelta, PeerKey, PeerRoster};
pub use torrent_table::{ApplyOutcome, TorrentTable, DEFAULT_NEED_INFO_POLLS};
