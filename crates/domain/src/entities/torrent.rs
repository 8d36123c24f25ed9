use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entities::{FileEntry, FileStat, Peer, Speed, TrackerStat};

/// Stable identifier assigned by the remote session. Ids are never
/// reused for the lifetime of the remote process.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TorrentId(pub i32);

impl fmt::Display for TorrentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Activity state reported by the remote session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    #[default]
    Stopped,
    CheckWait,
    Checking,
    DownloadWait,
    Downloading,
    SeedWait,
    Seeding,
}

/// Local mirror of one remote torrent record.
///
/// Fields are grouped by update cost: main info arrives once and is
/// immutable afterwards, main stats arrive on every poll, and the
/// detail groups (files, trackers, peers) are only fetched while the
/// torrent is under active inspection. A record freshly created from
/// an id sighting is a placeholder until its main info lands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Torrent {
    // main info
    pub name: String,
    pub hash_string: String,
    pub total_size: u64,
    pub piece_count: u32,
    pub piece_size: u64,
    pub added_date: i64,
    pub date_created: i64,
    pub creator: String,
    pub comment: String,
    pub is_private: bool,
    pub download_dir: String,

    // main stats
    pub activity: Activity,
    pub error: Option<String>,
    pub eta: Option<i64>,
    pub is_finished: bool,
    pub is_stalled: bool,
    pub left_until_done: u64,
    pub size_when_done: u64,
    pub have_valid: u64,
    pub have_unchecked: u64,
    pub metadata_percent_complete: f64,
    pub peers_connected: u32,
    pub peers_getting_from_us: u32,
    pub peers_sending_to_us: u32,
    pub queue_position: i32,
    pub recheck_progress: f64,
    pub download_speed: Speed,
    pub upload_speed: Speed,
    pub downloaded_ever: u64,
    pub uploaded_ever: u64,
    pub activity_date: i64,

    // detail info
    pub files: Vec<FileEntry>,
    pub trackers: Vec<String>,

    // detail stats
    pub file_stats: Vec<FileStat>,
    pub peers: Vec<Peer>,
    pub tracker_stats: Vec<TrackerStat>,
}

impl Torrent {
    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn has_eta(&self) -> bool {
        self.eta.is_some()
    }

    pub fn have_total(&self) -> u64 {
        self.have_valid + self.have_unchecked
    }

    pub fn has_metadata(&self) -> bool {
        self.metadata_percent_complete >= 1.0
    }

    /// True once everything the user asked for has been downloaded.
    /// Requires a known `size_when_done` so a placeholder whose stats
    /// have not arrived yet never counts as done.
    pub fn is_done(&self) -> bool {
        self.size_when_done > 0 && self.left_until_done == 0
    }

    pub fn is_seed(&self) -> bool {
        self.total_size > 0 && self.have_valid >= self.total_size
    }

    pub fn percent_complete(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            self.have_total() as f64 / self.total_size as f64
        }
    }

    pub fn percent_done(&self) -> f64 {
        if self.size_when_done == 0 {
            0.0
        } else {
            (self.size_when_done - self.left_until_done) as f64 / self.size_when_done as f64
        }
    }

    pub fn ratio(&self) -> f64 {
        let divisor = if self.downloaded_ever > 0 {
            self.downloaded_ever
        } else {
            self.total_size
        };

        if divisor == 0 {
            0.0
        } else {
            self.uploaded_ever as f64 / divisor as f64
        }
    }

    pub fn is_paused(&self) -> bool {
        self.activity == Activity::Stopped
    }

    pub fn is_downloading(&self) -> bool {
        self.activity == Activity::Downloading
    }

    pub fn is_seeding(&self) -> bool {
        self.activity == Activity::Seeding
    }

    pub fn is_queued(&self) -> bool {
        matches!(self.activity, Activity::DownloadWait | Activity::SeedWait)
    }

    pub fn is_ready_to_transfer(&self) -> bool {
        matches!(self.activity, Activity::Downloading | Activity::Seeding)
    }
}
