use serde::{Deserialize, Serialize};

use crate::entities::Speed;

/// Transient snapshot of one connected peer, as reported by the remote
/// session. The remote always sends the complete current peer set, so
/// snapshots are reconciled wholesale rather than merged field-wise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    pub address: String,
    pub port: u16,
    pub client_name: String,
    pub flags: String,
    pub progress: f64,
    pub rate_to_client: Speed,
    pub rate_to_peer: Speed,
    pub is_encrypted: bool,
    pub is_incoming: bool,
    pub is_downloading_from: bool,
    pub is_uploading_to: bool,
    pub client_is_choked: bool,
    pub client_is_interested: bool,
    pub peer_is_choked: bool,
    pub peer_is_interested: bool,
}

impl Peer {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            ..Default::default()
        }
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
