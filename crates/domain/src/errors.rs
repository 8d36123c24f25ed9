use thiserror::Error;

use crate::entities::TorrentId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid file path: {0:?}")]
    InvalidPath(String),

    #[error("Torrent not found with id: {0}")]
    TorrentNotFound(TorrentId),
}
