use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entities::{
    Activity, FileEntry, FileStat, Peer, Speed, Torrent, TorrentId, TrackerStat,
};

/// One field of a torrent record together with its new value.
///
/// The remote protocol sends sparse key/value pairs per entity; each
/// key is modelled as its own variant so a batch can never carry a
/// value of the wrong type for a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TorrentField {
    // main info
    Name(String),
    HashString(String),
    TotalSize(u64),
    PieceCount(u32),
    PieceSize(u64),
    AddedDate(i64),
    DateCreated(i64),
    Creator(String),
    Comment(String),
    IsPrivate(bool),
    DownloadDir(String),

    // main stats
    Activity(Activity),
    Error(Option<String>),
    Eta(Option<i64>),
    IsFinished(bool),
    IsStalled(bool),
    LeftUntilDone(u64),
    SizeWhenDone(u64),
    HaveValid(u64),
    HaveUnchecked(u64),
    MetadataPercentComplete(f64),
    PeersConnected(u32),
    PeersGettingFromUs(u32),
    PeersSendingToUs(u32),
    QueuePosition(i32),
    RecheckProgress(f64),
    DownloadSpeed(Speed),
    UploadSpeed(Speed),
    DownloadedEver(u64),
    UploadedEver(u64),
    ActivityDate(i64),

    // detail info
    Files(Vec<FileEntry>),
    Trackers(Vec<String>),

    // detail stats
    FileStats(Vec<FileStat>),
    Peers(Vec<Peer>),
    TrackerStats(Vec<TrackerStat>),
}

/// Value-less mirror of [`TorrentField`], used for change bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKey {
    Name,
    HashString,
    TotalSize,
    PieceCount,
    PieceSize,
    AddedDate,
    DateCreated,
    Creator,
    Comment,
    IsPrivate,
    DownloadDir,
    Activity,
    Error,
    Eta,
    IsFinished,
    IsStalled,
    LeftUntilDone,
    SizeWhenDone,
    HaveValid,
    HaveUnchecked,
    MetadataPercentComplete,
    PeersConnected,
    PeersGettingFromUs,
    PeersSendingToUs,
    QueuePosition,
    RecheckProgress,
    DownloadSpeed,
    UploadSpeed,
    DownloadedEver,
    UploadedEver,
    ActivityDate,
    Files,
    Trackers,
    FileStats,
    Peers,
    TrackerStats,
}

impl TorrentField {
    pub fn key(&self) -> FieldKey {
        match self {
            TorrentField::Name(_) => FieldKey::Name,
            TorrentField::HashString(_) => FieldKey::HashString,
            TorrentField::TotalSize(_) => FieldKey::TotalSize,
            TorrentField::PieceCount(_) => FieldKey::PieceCount,
            TorrentField::PieceSize(_) => FieldKey::PieceSize,
            TorrentField::AddedDate(_) => FieldKey::AddedDate,
            TorrentField::DateCreated(_) => FieldKey::DateCreated,
            TorrentField::Creator(_) => FieldKey::Creator,
            TorrentField::Comment(_) => FieldKey::Comment,
            TorrentField::IsPrivate(_) => FieldKey::IsPrivate,
            TorrentField::DownloadDir(_) => FieldKey::DownloadDir,
            TorrentField::Activity(_) => FieldKey::Activity,
            TorrentField::Error(_) => FieldKey::Error,
            TorrentField::Eta(_) => FieldKey::Eta,
            TorrentField::IsFinished(_) => FieldKey::IsFinished,
            TorrentField::IsStalled(_) => FieldKey::IsStalled,
            TorrentField::LeftUntilDone(_) => FieldKey::LeftUntilDone,
            TorrentField::SizeWhenDone(_) => FieldKey::SizeWhenDone,
            TorrentField::HaveValid(_) => FieldKey::HaveValid,
            TorrentField::HaveUnchecked(_) => FieldKey::HaveUnchecked,
            TorrentField::MetadataPercentComplete(_) => FieldKey::MetadataPercentComplete,
            TorrentField::PeersConnected(_) => FieldKey::PeersConnected,
            TorrentField::PeersGettingFromUs(_) => FieldKey::PeersGettingFromUs,
            TorrentField::PeersSendingToUs(_) => FieldKey::PeersSendingToUs,
            TorrentField::QueuePosition(_) => FieldKey::QueuePosition,
            TorrentField::RecheckProgress(_) => FieldKey::RecheckProgress,
            TorrentField::DownloadSpeed(_) => FieldKey::DownloadSpeed,
            TorrentField::UploadSpeed(_) => FieldKey::UploadSpeed,
            TorrentField::DownloadedEver(_) => FieldKey::DownloadedEver,
            TorrentField::UploadedEver(_) => FieldKey::UploadedEver,
            TorrentField::ActivityDate(_) => FieldKey::ActivityDate,
            TorrentField::Files(_) => FieldKey::Files,
            TorrentField::Trackers(_) => FieldKey::Trackers,
            TorrentField::FileStats(_) => FieldKey::FileStats,
            TorrentField::Peers(_) => FieldKey::Peers,
            TorrentField::TrackerStats(_) => FieldKey::TrackerStats,
        }
    }
}

/// Ordered partial update for one torrent. When a batch carries the
/// same field twice, the later entry wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TorrentUpdate(pub Vec<TorrentField>);

impl TorrentUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: TorrentField) {
        self.0.push(field);
    }

    pub fn with(mut self, field: TorrentField) -> Self {
        self.0.push(field);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<TorrentField> for TorrentUpdate {
    fn from_iter<I: IntoIterator<Item = TorrentField>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One update message from the remote source: zero or more torrents
/// with partial or full field sets, plus the ids the remote dropped.
/// Absence of an id from `torrents` means "unchanged", never "gone".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateBatch {
    pub torrents: HashMap<TorrentId, TorrentUpdate>,
    pub removed: Vec<TorrentId>,
}

impl UpdateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: TorrentId, update: TorrentUpdate) {
        self.torrents.insert(id, update);
    }

    pub fn with(mut self, id: TorrentId, update: TorrentUpdate) -> Self {
        self.torrents.insert(id, update);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.torrents.is_empty() && self.removed.is_empty()
    }
}

/// Result of merging one [`TorrentUpdate`] into a [`Torrent`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Field keys whose stored value actually changed. Writing a
    /// field to the value it already had does not count.
    pub changed: Vec<FieldKey>,
    /// Main info (the name) became complete on this merge.
    pub gained_main_info: bool,
    /// The record crossed the not-done -> done boundary on this merge.
    pub became_done: bool,
}

impl MergeOutcome {
    pub fn any_changed(&self) -> bool {
        !self.changed.is_empty()
    }
}

fn assign<T: Clone + PartialEq>(
    dst: &mut T,
    src: &T,
    key: FieldKey,
    changed: &mut Vec<FieldKey>,
) {
    if dst != src {
        *dst = src.clone();

        if !changed.contains(&key) {
            changed.push(key);
        }
    }
}

impl Torrent {
    /// Field-level merge: every supplied field overwrites the stored
    /// value, fields not supplied keep their prior value. Never fails;
    /// partial data is the steady state of the remote protocol.
    pub fn merge(&mut self, update: &TorrentUpdate) -> MergeOutcome {
        let had_name = self.has_name();
        let was_done = self.is_done();
        let mut changed = Vec::new();

        for field in &update.0 {
            let key = field.key();

            match field {
                TorrentField::Name(v) => assign(&mut self.name, v, key, &mut changed),
                TorrentField::HashString(v) => assign(&mut self.hash_string, v, key, &mut changed),
                TorrentField::TotalSize(v) => assign(&mut self.total_size, v, key, &mut changed),
                TorrentField::PieceCount(v) => assign(&mut self.piece_count, v, key, &mut changed),
                TorrentField::PieceSize(v) => assign(&mut self.piece_size, v, key, &mut changed),
                TorrentField::AddedDate(v) => assign(&mut self.added_date, v, key, &mut changed),
                TorrentField::DateCreated(v) => {
                    assign(&mut self.date_created, v, key, &mut changed)
                }
                TorrentField::Creator(v) => assign(&mut self.creator, v, key, &mut changed),
                TorrentField::Comment(v) => assign(&mut self.comment, v, key, &mut changed),
                TorrentField::IsPrivate(v) => assign(&mut self.is_private, v, key, &mut changed),
                TorrentField::DownloadDir(v) => {
                    assign(&mut self.download_dir, v, key, &mut changed)
                }
                TorrentField::Activity(v) => assign(&mut self.activity, v, key, &mut changed),
                TorrentField::Error(v) => assign(&mut self.error, v, key, &mut changed),
                TorrentField::Eta(v) => assign(&mut self.eta, v, key, &mut changed),
                TorrentField::IsFinished(v) => assign(&mut self.is_finished, v, key, &mut changed),
                TorrentField::IsStalled(v) => assign(&mut self.is_stalled, v, key, &mut changed),
                TorrentField::LeftUntilDone(v) => {
                    assign(&mut self.left_until_done, v, key, &mut changed)
                }
                TorrentField::SizeWhenDone(v) => {
                    assign(&mut self.size_when_done, v, key, &mut changed)
                }
                TorrentField::HaveValid(v) => assign(&mut self.have_valid, v, key, &mut changed),
                TorrentField::HaveUnchecked(v) => {
                    assign(&mut self.have_unchecked, v, key, &mut changed)
                }
                TorrentField::MetadataPercentComplete(v) => {
                    assign(&mut self.metadata_percent_complete, v, key, &mut changed)
                }
                TorrentField::PeersConnected(v) => {
                    assign(&mut self.peers_connected, v, key, &mut changed)
                }
                TorrentField::PeersGettingFromUs(v) => {
                    assign(&mut self.peers_getting_from_us, v, key, &mut changed)
                }
                TorrentField::PeersSendingToUs(v) => {
                    assign(&mut self.peers_sending_to_us, v, key, &mut changed)
                }
                TorrentField::QueuePosition(v) => {
                    assign(&mut self.queue_position, v, key, &mut changed)
                }
                TorrentField::RecheckProgress(v) => {
                    assign(&mut self.recheck_progress, v, key, &mut changed)
                }
                TorrentField::DownloadSpeed(v) => {
                    assign(&mut self.download_speed, v, key, &mut changed)
                }
                TorrentField::UploadSpeed(v) => {
                    assign(&mut self.upload_speed, v, key, &mut changed)
                }
                TorrentField::DownloadedEver(v) => {
                    assign(&mut self.downloaded_ever, v, key, &mut changed)
                }
                TorrentField::UploadedEver(v) => {
                    assign(&mut self.uploaded_ever, v, key, &mut changed)
                }
                TorrentField::ActivityDate(v) => {
                    assign(&mut self.activity_date, v, key, &mut changed)
                }
                TorrentField::Files(v) => assign(&mut self.files, v, key, &mut changed),
                TorrentField::Trackers(v) => assign(&mut self.trackers, v, key, &mut changed),
                TorrentField::FileStats(v) => assign(&mut self.file_stats, v, key, &mut changed),
                TorrentField::Peers(v) => assign(&mut self.peers, v, key, &mut changed),
                TorrentField::TrackerStats(v) => {
                    assign(&mut self.tracker_stats, v, key, &mut changed)
                }
            }
        }

        MergeOutcome {
            gained_main_info: !had_name && self.has_name(),
            became_done: !was_done && self.is_done(),
            changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins_per_field() {
        let mut t = Torrent::default();

        t.merge(
            &TorrentUpdate::new()
                .with(TorrentField::Name("alpha".into()))
                .with(TorrentField::TotalSize(100)),
        );
        t.merge(&TorrentUpdate::new().with(TorrentField::TotalSize(200)));

        assert_eq!(t.name, "alpha");
        assert_eq!(t.total_size, 200);
    }

    #[test]
    fn duplicate_key_in_one_update_later_wins() {
        let mut t = Torrent::default();

        t.merge(
            &TorrentUpdate::new()
                .with(TorrentField::TotalSize(100))
                .with(TorrentField::TotalSize(300)),
        );

        assert_eq!(t.total_size, 300);
    }

    #[test]
    fn equal_value_write_reports_no_change() {
        let mut t = Torrent::default();
        t.merge(&TorrentUpdate::new().with(TorrentField::TotalSize(100)));

        let outcome = t.merge(&TorrentUpdate::new().with(TorrentField::TotalSize(100)));
        assert!(!outcome.any_changed());
    }

    #[test]
    fn main_info_gain_fires_once() {
        let mut t = Torrent::default();

        let first = t.merge(&TorrentUpdate::new().with(TorrentField::Name("a".into())));
        assert!(first.gained_main_info);

        let second = t.merge(&TorrentUpdate::new().with(TorrentField::Name("a".into())));
        assert!(!second.gained_main_info);
        assert!(!second.any_changed());
    }

    #[test]
    fn done_transition_detected() {
        let mut t = Torrent::default();
        t.merge(
            &TorrentUpdate::new()
                .with(TorrentField::SizeWhenDone(100))
                .with(TorrentField::LeftUntilDone(40)),
        );

        let outcome = t.merge(&TorrentUpdate::new().with(TorrentField::LeftUntilDone(0)));
        assert!(outcome.became_done);

        let again = t.merge(&TorrentUpdate::new().with(TorrentField::LeftUntilDone(0)));
        assert!(!again.became_done);
    }
}
