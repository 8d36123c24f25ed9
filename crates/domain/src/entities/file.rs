use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Download priority of a single file within a torrent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// Tri-state download-selection status of a directory aggregate:
/// `Yes` if every leaf descendant is wanted, `No` if none are,
/// `Mixed` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wanted {
    Yes,
    No,
    Mixed,
}

impl From<bool> for Wanted {
    fn from(wanted: bool) -> Self {
        if wanted {
            Wanted::Yes
        } else {
            Wanted::No
        }
    }
}

/// One file row from a full-fidelity ("bulk") file-list update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub index: i32,
    pub path: String,
    pub size: u64,
    pub have: u64,
    pub wanted: bool,
    pub priority: Priority,
}

impl FileEntry {
    pub fn new(index: i32, path: impl Into<String>, size: u64) -> Self {
        Self {
            index,
            path: path.into(),
            size,
            have: 0,
            wanted: true,
            priority: Priority::Normal,
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path.split('/').last()
    }

    /// Splits the path into its segment names. An empty path or an
    /// empty segment (leading, trailing, or doubled separator) makes
    /// the whole entry unusable.
    pub fn segments(&self) -> Result<Vec<&str>, DomainError> {
        split_segments(&self.path)
    }
}

/// Progress-only file row carried by partial stat polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub index: i32,
    pub have: u64,
}

pub fn split_segments(path: &str) -> Result<Vec<&str>, DomainError> {
    if path.is_empty() {
        return Err(DomainError::InvalidPath(path.to_string()));
    }

    let segments: Vec<&str> = path.split('/').collect();

    if segments.iter().any(|s| s.is_empty()) {
        return Err(DomainError::InvalidPath(path.to_string()));
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_splits_on_separator() {
        let entry = FileEntry::new(0, "album/disc 1/track.flac", 1);
        assert_eq!(entry.segments().unwrap(), vec!["album", "disc 1", "track.flac"]);
        assert_eq!(entry.file_name(), Some("track.flac"));
    }

    #[test]
    fn malformed_paths_are_rejected() {
        for path in ["", "/leading", "trailing/", "a//b"] {
            let entry = FileEntry::new(0, path, 1);
            assert!(entry.segments().is_err(), "path {:?} should be invalid", path);
        }
    }
}
