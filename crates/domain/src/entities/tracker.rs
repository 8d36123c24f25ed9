use serde::{Deserialize, Serialize};

/// Announce/scrape status of one tracker, refreshed with detail stats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerStat {
    pub id: i32,
    pub announce: String,
    pub host: String,
    pub tier: i32,
    pub is_backup: bool,
    pub seeder_count: i32,
    pub leecher_count: i32,
    pub download_count: i32,
    pub has_announced: bool,
    pub last_announce_succeeded: bool,
    pub last_announce_time: i64,
    pub last_announce_peer_count: i32,
    pub last_announce_result: String,
    pub next_announce_time: i64,
}
