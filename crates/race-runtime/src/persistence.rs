//! Snapshot Cache
//!
//! Keeps roster and leaderboard snapshots across restarts in an embedded
//! sled database. It is a cache, not a source of truth: a missing or
//! unreadable snapshot means "start from the seed roster".

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sled::Db;
use std::path::Path;

use crate::{participant::Participant, ranking::LeaderboardEntry};

const ROSTER_KEY: &str = "connectedUsers";
const CURRENT_RACE_KEY: &str = "currentRaceEntries";
const ALL_TIME_KEY: &str = "allTimeEntries";
const METADATA_KEY: &str = "metadata";

/// Bookkeeping about the last roster save
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    /// Unix timestamp of the save
    pub saved_at: i64,
    pub participant_count: u64,
}

/// Persistent key-value cache for race snapshots
pub struct SnapshotCache {
    db: Db,
    snapshots: sled::Tree,
}

impl SnapshotCache {
    /// Open or create a cache at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let db = sled::open(&path)?;
        let snapshots = db.open_tree("snapshots")?;

        tracing::info!("Opened snapshot cache at {:?}", path.as_ref());

        Ok(Self { db, snapshots })
    }

    fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.snapshots.insert(key, bytes)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.snapshots.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Store the roster and stamp the metadata record
    pub fn save_roster(&self, roster: &[Participant]) -> anyhow::Result<()> {
        self.put(ROSTER_KEY, roster)?;
        self.put(
            METADATA_KEY,
            &SnapshotMetadata {
                saved_at: chrono::Utc::now().timestamp(),
                participant_count: roster.len() as u64,
            },
        )
    }

    pub fn load_roster(&self) -> anyhow::Result<Option<Vec<Participant>>> {
        self.get(ROSTER_KEY)
    }

    pub fn save_current_race(&self, entries: &[LeaderboardEntry]) -> anyhow::Result<()> {
        self.put(CURRENT_RACE_KEY, entries)
    }

    pub fn load_current_race(&self) -> anyhow::Result<Option<Vec<LeaderboardEntry>>> {
        self.get(CURRENT_RACE_KEY)
    }

    pub fn clear_current_race(&self) -> anyhow::Result<()> {
        self.snapshots.remove(CURRENT_RACE_KEY)?;
        Ok(())
    }

    pub fn save_all_time(&self, entries: &[LeaderboardEntry]) -> anyhow::Result<()> {
        self.put(ALL_TIME_KEY, entries)
    }

    pub fn load_all_time(&self) -> anyhow::Result<Option<Vec<LeaderboardEntry>>> {
        self.get(ALL_TIME_KEY)
    }

    pub fn load_metadata(&self) -> anyhow::Result<Option<SnapshotMetadata>> {
        self.get(METADATA_KEY)
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> anyhow::Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{participant::seed_roster, ranking::current_race_ranking};
    use tempfile::tempdir;

    #[test]
    fn test_roster_round_trip_with_metadata() {
        let dir = tempdir().unwrap();
        let cache = SnapshotCache::open(dir.path()).unwrap();
        assert!(cache.load_roster().unwrap().is_none());

        cache.save_roster(&seed_roster()).unwrap();
        cache.flush().unwrap();

        assert_eq!(cache.load_roster().unwrap().unwrap(), seed_roster());
        let metadata = cache.load_metadata().unwrap().unwrap();
        assert_eq!(metadata.participant_count, 3);
        assert!(metadata.saved_at > 0);
    }

    #[test]
    fn test_clear_current_race_keeps_all_time() {
        let dir = tempdir().unwrap();
        let cache = SnapshotCache::open(dir.path()).unwrap();
        let entries = current_race_ranking(&seed_roster());

        cache.save_current_race(&entries).unwrap();
        cache.save_all_time(&entries).unwrap();
        cache.clear_current_race().unwrap();

        assert!(cache.load_current_race().unwrap().is_none());
        assert_eq!(cache.load_all_time().unwrap().unwrap(), entries);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let cache = SnapshotCache::open(dir.path()).unwrap();
            cache.save_roster(&seed_roster()).unwrap();
            cache.flush().unwrap();
        }
        let cache = SnapshotCache::open(dir.path()).unwrap();
        assert_eq!(cache.load_roster().unwrap().unwrap().len(), 3);
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = tempdir().unwrap();
        let cache = SnapshotCache::open(dir.path()).unwrap();
        cache.snapshots.insert(ROSTER_KEY, &b"not json"[..]).unwrap();
        assert!(cache.load_roster().is_err());
    }
}
