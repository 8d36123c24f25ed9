use serde::{Deserialize, Serialize};

/// Transfer rate reported by the remote session, in bytes per second.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Speed {
    bytes_per_second: u64,
}

impl Speed {
    pub fn from_bps(bytes_per_second: u64) -> Self {
        Self { bytes_per_second }
    }

    pub fn from_kbps(kilobytes_per_second: u64) -> Self {
        Self {
            bytes_per_second: kilobytes_per_second * 1000,
        }
    }

    pub fn bps(&self) -> u64 {
        self.bytes_per_second
    }

    pub fn kbps(&self) -> f64 {
        self.bytes_per_second as f64 / 1000.0
    }

    pub fn is_zero(&self) -> bool {
        self.bytes_per_second == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kbps_round_trip() {
        let s = Speed::from_kbps(12);
        assert_eq!(s.bps(), 12_000);
        assert_eq!(s.kbps(), 12.0);
        assert!(!s.is_zero());
        assert!(Speed::default().is_zero());
    }
}
