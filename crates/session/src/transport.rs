use async_trait::async_trait;

use domain::{Priority, TorrentId, UpdateBatch};

use crate::errors::SessionError;

/// Which torrents a list refresh should cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSelection {
    All,
    /// Torrents with recent activity, as judged by the remote.
    Active,
    Ids(Vec<TorrentId>),
}

/// Which field group a list refresh should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyGroup {
    /// Main info + main stats, for all known torrents.
    MainAll,
    /// Main stats only, the cheap periodic poll.
    MainStats,
}

/// One list response: a keyed field batch plus whether it covered the
/// complete torrent set (ids absent from a complete list were removed
/// remotely and arrive through `batch.removed`). The session counts a
/// periodic full sweep as satisfied only when a complete-set response
/// actually lands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListUpdate {
    pub batch: UpdateBatch,
    pub full: bool,
}

/// Seam to the RPC layer. Implementations deliver already-decoded
/// keyed batches; serialization and HTTP are outside this crate.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch_list(
        &self,
        selection: IdSelection,
        keys: KeyGroup,
    ) -> Result<ListUpdate, SessionError>;

    /// Full field set including files, peers, and trackers for the
    /// given ids.
    async fn fetch_detail(&self, ids: &[TorrentId]) -> Result<UpdateBatch, SessionError>;

    async fn set_files_wanted(
        &self,
        id: TorrentId,
        file_indices: &[i32],
        wanted: bool,
    ) -> Result<(), SessionError>;

    async fn set_files_priority(
        &self,
        id: TorrentId,
        file_indices: &[i32],
        priority: Priority,
    ) -> Result<(), SessionError>;
}
