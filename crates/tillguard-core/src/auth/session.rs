//! Temporary unlock persistence
//!
//! A temporary unlock is stored as the absolute instant it runs out, not as a
//! duration, so a reloaded guard recomputes the remaining window instead of
//! restarting it.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::store::KeyValueStore;

/// Store key holding the expiry of the active temporary unlock
pub const UNLOCK_RECORD_KEY: &str = "temp_unlock_until";

/// Default temporary unlock window (1 hour)
pub const DEFAULT_TEMPORARY_UNLOCK_SECS: u64 = 3600;

/// Persisted expiry of a temporary unlock, in epoch milliseconds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnlockRecord {
    pub unlock_until_ms: i64,
}

impl UnlockRecord {
    /// Record for a window of `window` starting at `now_ms`
    pub fn starting_at(now_ms: i64, window: Duration) -> Self {
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        Self {
            unlock_until_ms: now_ms.saturating_add(window_ms),
        }
    }

    /// Parse the stored value (decimal epoch milliseconds)
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim()
            .parse::<i64>()
            .ok()
            .map(|unlock_until_ms| Self { unlock_until_ms })
    }

    /// Value written to the store
    pub fn encode(&self) -> String {
        self.unlock_until_ms.to_string()
    }

    /// Whole seconds left at `now_ms`, rounded up. None once expired.
    pub fn remaining_secs(&self, now_ms: i64) -> Option<u64> {
        let remaining_ms = self.unlock_until_ms.checked_sub(now_ms)?;
        if remaining_ms <= 0 {
            return None;
        }
        Some((remaining_ms as u64).div_ceil(1000))
    }

    /// Expiry as a UTC timestamp, for display
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.unlock_until_ms)
    }

    /// Read the record under `key`.
    ///
    /// An unparseable value reads as no record.
    pub fn load(store: &dyn KeyValueStore, key: &str) -> Result<Option<Self>, StoreError> {
        let raw = store.get(key)?;
        Ok(raw.as_deref().and_then(Self::parse))
    }

    /// Write the record under `key`
    pub fn save(&self, store: &dyn KeyValueStore, key: &str) -> Result<(), StoreError> {
        store.set(key, &self.encode())
    }

    /// Delete the record under `key`
    pub fn clear(store: &dyn KeyValueStore, key: &str) -> Result<(), StoreError> {
        store.remove(key)
    }
}

/// Format a countdown as MM:SS
pub fn format_countdown(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_record_window() {
        let record = UnlockRecord::starting_at(1_000, Duration::from_secs(3600));
        assert_eq!(record.unlock_until_ms, 3_601_000);
        assert_eq!(record.remaining_secs(1_000), Some(3600));
        assert_eq!(record.remaining_secs(1_001), Some(3600));
        assert_eq!(record.remaining_secs(2_000), Some(3599));
        assert_eq!(record.remaining_secs(3_601_000), None);
        assert_eq!(record.remaining_secs(9_999_999), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            UnlockRecord::parse("1700000000000"),
            Some(UnlockRecord {
                unlock_until_ms: 1_700_000_000_000
            })
        );
        assert_eq!(UnlockRecord::parse("soon"), None);
        assert_eq!(UnlockRecord::parse(""), None);
    }

    #[test]
    fn test_store_round_trip() {
        let store = MemoryStore::new();
        let record = UnlockRecord::starting_at(0, Duration::from_secs(60));

        record.save(&store, UNLOCK_RECORD_KEY).unwrap();
        assert_eq!(
            store.get(UNLOCK_RECORD_KEY).unwrap().as_deref(),
            Some("60000")
        );
        assert_eq!(
            UnlockRecord::load(&store, UNLOCK_RECORD_KEY).unwrap(),
            Some(record)
        );

        UnlockRecord::clear(&store, UNLOCK_RECORD_KEY).unwrap();
        assert_eq!(UnlockRecord::load(&store, UNLOCK_RECORD_KEY).unwrap(), None);
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(300), "05:00");
        assert_eq!(format_countdown(3599), "59:59");
        assert_eq!(format_countdown(7), "00:07");
    }
}
