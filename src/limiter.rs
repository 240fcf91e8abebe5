//! Login attempt limiter
//!
//! In-memory failure counters with a timed lockout, keyed by client IP and by
//! account in two independent keyspaces. Each record carries its own mutex so
//! concurrent attempts for the same key serialize on the record, while the
//! outer map is only locked to insert or remove keys. State never survives a
//! process restart; a multi-instance deployment would put the same interface
//! over a shared counter store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};

/// Failures before a key is considered locked.
pub const MAX_FAILURES: u32 = 5;

/// Lockout window, measured from the last recorded failure.
pub const LOCKOUT_MINUTES: i64 = 15;

/// Time source, injectable so lockout expiry is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug)]
struct AttemptRecord {
    failures: u32,
    last_failure: DateTime<Utc>,
}

/// Per-keyspace failure tracker. Records are created lazily on first failure
/// and removed on success, on observed expiry, or by the periodic sweep.
pub struct AttemptTracker {
    records: RwLock<HashMap<String, Arc<Mutex<AttemptRecord>>>>,
    clock: Arc<dyn Clock>,
}

impl AttemptTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock,
        }
    }

    fn window() -> Duration {
        Duration::minutes(LOCKOUT_MINUTES)
    }

    pub fn record_failure(&self, key: &str) {
        let now = self.clock.now();

        let record = {
            let map = self
                .records
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            map.get(key).cloned()
        };

        let record = match record {
            Some(record) => record,
            None => {
                let mut map = self
                    .records
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                map.entry(key.to_string())
                    .or_insert_with(|| {
                        Arc::new(Mutex::new(AttemptRecord {
                            failures: 0,
                            last_failure: now,
                        }))
                    })
                    .clone()
            }
        };

        let mut record = record.lock().unwrap_or_else(PoisonError::into_inner);
        record.failures += 1;
        record.last_failure = now;

        if record.failures >= MAX_FAILURES {
            tracing::warn!(key, failures = record.failures, "login key locked");
        }
    }

    pub fn record_success(&self, key: &str) {
        let mut map = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.remove(key);
    }

    /// Whether the key is currently locked. An expired record is removed on
    /// observation and reported as not locked.
    pub fn is_locked(&self, key: &str) -> bool {
        let now = self.clock.now();

        let verdict = {
            let map = self
                .records
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match map.get(key) {
                None => return false,
                Some(record) => {
                    let record = record.lock().unwrap_or_else(PoisonError::into_inner);
                    if now - record.last_failure >= Self::window() {
                        None
                    } else {
                        Some(record.failures >= MAX_FAILURES)
                    }
                }
            }
        };

        match verdict {
            Some(locked) => locked,
            None => {
                self.record_success(key);
                false
            }
        }
    }

    /// Minutes until the lockout expires, rounded up; 0 when not locked.
    pub fn remaining_lockout_minutes(&self, key: &str) -> i64 {
        if !self.is_locked(key) {
            return 0;
        }

        let now = self.clock.now();
        let map = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(record) = map.get(key) else {
            return 0;
        };
        let record = record.lock().unwrap_or_else(PoisonError::into_inner);
        let remaining = (record.last_failure + Self::window()) - now;
        let seconds = remaining.num_seconds().max(0);
        (seconds + 59) / 60
    }

    /// Periodic maintenance: drop every record whose window has elapsed,
    /// including sub-threshold ones that no `is_locked` call would ever clean.
    pub fn sweep_expired(&self) {
        let now = self.clock.now();
        let mut map = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.retain(|_, record| {
            let record = record.lock().unwrap_or_else(PoisonError::into_inner);
            now - record.last_failure < Self::window()
        });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// The two keyspaces guarding authentication: blocking an address never
/// requires blocking the account, and vice versa.
pub struct LoginAttemptService {
    pub by_ip: AttemptTracker,
    pub by_account: AttemptTracker,
}

impl LoginAttemptService {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            by_ip: AttemptTracker::new(clock.clone()),
            by_account: AttemptTracker::new(clock),
        }
    }

    /// Remaining lockout for whichever keyspace blocks the attempt, if any.
    pub fn locked_minutes(&self, ip: Option<&str>, account: &str) -> Option<i64> {
        let ip_minutes = ip
            .filter(|key| self.by_ip.is_locked(key))
            .map(|key| self.by_ip.remaining_lockout_minutes(key));
        let account_minutes = self
            .by_account
            .is_locked(account)
            .then(|| self.by_account.remaining_lockout_minutes(account));

        match (ip_minutes, account_minutes) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn record_failure(&self, ip: Option<&str>, account: &str) {
        if let Some(ip) = ip {
            self.by_ip.record_failure(ip);
        }
        self.by_account.record_failure(account);
    }

    pub fn record_success(&self, ip: Option<&str>, account: &str) {
        if let Some(ip) = ip {
            self.by_ip.record_success(ip);
        }
        self.by_account.record_success(account);
    }

    pub fn sweep_expired(&self) {
        self.by_ip.sweep_expired();
        self.by_account.sweep_expired();
    }
}

impl Default for LoginAttemptService {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}
