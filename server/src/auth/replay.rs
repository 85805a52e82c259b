//! Replay cache: fingerprints of recently seen Set payloads.
//!
//! Entries live for a fixed retention window measured from first sight,
//! independent of the payload's own timestamp. Requests never delete entries;
//! a background task sweeps expired ones.

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Default retention of a seen fingerprint (10 minutes).
pub const DEFAULT_RETENTION_SECS: u64 = 600;

#[derive(Clone)]
pub struct ReplayGuard {
    /// fingerprint -> seen until
    seen: Arc<DashMap<String, DateTime<Utc>>>,
    retention: TimeDelta,
}

impl ReplayGuard {
    /// Retentions beyond what chrono can represent saturate: such entries
    /// never expire.
    pub fn new(retention_secs: u64) -> Self {
        let retention = i64::try_from(retention_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        Self {
            seen: Arc::new(DashMap::new()),
            retention,
        }
    }

    /// Atomically admit `fingerprint` if it is absent or expired.
    ///
    /// Returns `false` when an unexpired entry exists. The entry lock is held
    /// across the check and the insert, so of two concurrent callers with the
    /// same fingerprint exactly one is admitted.
    pub fn check_and_insert(&self, fingerprint: &str, now: DateTime<Utc>) -> bool {
        let seen_until = now
            .checked_add_signed(self.retention)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        match self.seen.entry(fingerprint.to_string()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    return false;
                }
                entry.insert(seen_until);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(seen_until);
                true
            }
        }
    }

    /// Whether `fingerprint` is currently held.
    pub fn contains(&self, fingerprint: &str, now: DateTime<Utc>) -> bool {
        self.seen
            .get(fingerprint)
            .map(|until| *until > now)
            .unwrap_or(false)
    }

    /// Remove every expired entry. Returns the number removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.seen.len();
        self.seen.retain(|_, until| *until > now);
        before.saturating_sub(self.seen.len())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Spawn a background task that sweeps expired fingerprints every
/// `interval_secs` seconds.
pub fn spawn_replay_cleanup(guard: ReplayGuard, interval_secs: u64) {
    let interval = std::time::Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let purged = guard.purge_expired(Utc::now());
            if purged > 0 {
                tracing::info!("Replay cache cleanup: purged {} expired fingerprints", purged);
            } else {
                tracing::debug!("Replay cache cleanup: nothing expired ({} held)", guard.len());
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_second_sight_is_rejected() {
        let guard = ReplayGuard::new(600);
        assert!(guard.check_and_insert("abcd", at(0)));
        assert!(!guard.check_and_insert("abcd", at(1)));
        assert!(!guard.check_and_insert("abcd", at(599)));
        assert!(guard.check_and_insert("other", at(1)));
    }

    #[test]
    fn test_expired_entry_is_readmitted() {
        let guard = ReplayGuard::new(600);
        assert!(guard.check_and_insert("abcd", at(0)));
        assert!(guard.contains("abcd", at(599)));
        assert!(!guard.contains("abcd", at(600)));
        assert!(guard.check_and_insert("abcd", at(600)));
        // Readmission restarts the window.
        assert!(!guard.check_and_insert("abcd", at(1000)));
    }

    #[test]
    fn test_oversized_retention_saturates() {
        let now = Utc::now();
        for secs in [
            1_000_000_000_000_000,
            i64::MAX as u64 / 1000 + 1,
            i64::MAX as u64,
            u64::MAX,
        ] {
            let guard = ReplayGuard::new(secs);
            assert!(guard.check_and_insert("fp", now), "retention {}", secs);
            assert!(!guard.check_and_insert("fp", now), "retention {}", secs);
            assert!(guard.contains("fp", DateTime::<Utc>::MAX_UTC - TimeDelta::seconds(1)));
            assert_eq!(guard.purge_expired(now), 0);
        }
    }

    #[test]
    fn test_zero_retention_admits_again() {
        let guard = ReplayGuard::new(0);
        assert!(guard.check_and_insert("fp", at(0)));
        assert!(guard.check_and_insert("fp", at(0)));
    }

    #[test]
    fn test_purge_removes_only_expired() {
        let guard = ReplayGuard::new(600);
        guard.check_and_insert("old", at(0));
        guard.check_and_insert("new", at(500));
        assert_eq!(guard.purge_expired(at(700)), 1);
        assert_eq!(guard.len(), 1);
        assert!(guard.contains("new", at(700)));
    }

    #[test]
    fn test_concurrent_same_fingerprint_admits_one() {
        let guard = ReplayGuard::new(600);
        let threads = 16;
        let barrier = Barrier::new(threads);
        let now = at(0);

        let admitted: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        guard.check_and_insert("race", now) as usize
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(admitted, 1);
    }
}
