pub mod file;
pub mod peer;
pub mod speed;
pub mod torrent;
pub mod tracker;

pub use file::{split_segments, FileEntry, FileStat, Priority, Wanted};
pub use peer::Peer;
pub use speed::Speed;
pub use torrent::{Activity, Torrent, TorrentId};
pub use tracker::TrackerStat;
