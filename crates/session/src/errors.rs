use thiserror::Error;

use domain::TorrentId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Torrent not found with id: {0}")]
    TorrentNotFound(TorrentId),
}
