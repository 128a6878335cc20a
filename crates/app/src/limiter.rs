//! Duplicate suppression and local send quota.
//!
//! The duplicate check always runs first: a record dropped as a duplicate
//! never consumes quota.

use console_relay_domain::LogLevel;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Limiter tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterSettings {
    /// Trailing window for duplicate counting.
    pub duplicate_window_ms: u64,
    /// Occurrences allowed per window.
    pub duplicate_threshold: u32,
    /// Upper bound on tracked signatures.
    pub max_signatures: usize,
    /// Sends permitted per quota window.
    pub quota_limit: u32,
    /// Quota window length.
    pub quota_window_ms: u64,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            duplicate_window_ms: 5_000,
            duplicate_threshold: 5,
            max_signatures: 512,
            quota_limit: 1_000,
            quota_window_ms: 60_000,
        }
    }
}

/// Verdict for one emission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitDecision {
    /// Ship it.
    Allow,
    /// Too many identical messages in the current window.
    Duplicate,
    /// Local quota exhausted until `reset_at_ms`.
    RateLimited {
        /// When the quota refills.
        reset_at_ms: u64,
    },
}

/// SHA-256 hex digest of `level|message`.
pub fn signature(level: LogLevel, message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(level.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(message.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Copy)]
struct SignatureEntry {
    window_start_ms: u64,
    last_seen_ms: u64,
    count: u32,
}

/// Bounded per-signature occurrence counter.
#[derive(Debug)]
pub struct DuplicateFilter {
    window_ms: u64,
    threshold: u32,
    max_signatures: usize,
    entries: HashMap<String, SignatureEntry>,
}

impl DuplicateFilter {
    /// Empty filter.
    pub fn new(window_ms: u64, threshold: u32, max_signatures: usize) -> Self {
        Self {
            window_ms,
            threshold,
            max_signatures: max_signatures.max(1),
            entries: HashMap::new(),
        }
    }

    /// Record one occurrence; false when it exceeds the threshold.
    pub fn admit(&mut self, signature: &str, now_ms: u64) -> bool {
        let window_ms = self.window_ms;
        if let Some(entry) = self.entries.get_mut(signature) {
            if now_ms.saturating_sub(entry.window_start_ms) < window_ms {
                entry.count = entry.count.saturating_add(1);
                entry.last_seen_ms = now_ms;
                return entry.count <= self.threshold;
            }
            *entry = SignatureEntry {
                window_start_ms: now_ms,
                last_seen_ms: now_ms,
                count: 1,
            };
            return true;
        }

        if self.entries.len() >= self.max_signatures {
            self.prune(now_ms);
        }
        self.entries.insert(
            signature.to_owned(),
            SignatureEntry {
                window_start_ms: now_ms,
                last_seen_ms: now_ms,
                count: 1,
            },
        );
        true
    }

    /// Number of tracked signatures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every signature.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // Expired windows go first, then least recently seen until there is room.
    fn prune(&mut self, now_ms: u64) {
        let window_ms = self.window_ms;
        self.entries
            .retain(|_, entry| now_ms.saturating_sub(entry.window_start_ms) < window_ms);

        while self.entries.len() >= self.max_signatures {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen_ms)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                },
                None => break,
            }
        }
    }
}

/// Local send quota, corrected by server feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuota {
    limit: u32,
    window_ms: u64,
    remaining: u32,
    reset_at_ms: Option<u64>,
}

impl RateQuota {
    /// Full quota.
    pub const fn new(limit: u32, window_ms: u64) -> Self {
        Self {
            limit,
            window_ms,
            remaining: limit,
            reset_at_ms: None,
        }
    }

    /// Take one unit; `Err(reset_at_ms)` when exhausted.
    pub fn try_acquire(&mut self, now_ms: u64) -> Result<(), u64> {
        if self.reset_at_ms.is_some_and(|reset_at| now_ms >= reset_at) {
            self.remaining = self.limit;
            self.reset_at_ms = None;
        }

        let window_ms = self.window_ms;
        let reset_at = *self
            .reset_at_ms
            .get_or_insert_with(|| now_ms.saturating_add(window_ms));
        if self.remaining == 0 {
            return Err(reset_at);
        }
        self.remaining -= 1;
        Ok(())
    }

    /// Adopt the server's remaining count after a 429 and restart the window.
    pub const fn apply_rate_limit(&mut self, remaining: u32, now_ms: u64) {
        self.remaining = remaining;
        self.reset_at_ms = Some(now_ms.saturating_add(self.window_ms));
    }

    /// Adopt the server's remaining count after an accepted send.
    pub const fn sync_remaining(&mut self, remaining: u32) {
        self.remaining = remaining;
    }

    /// Units left in the current window.
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// When the current window ends, if one is open.
    pub const fn reset_at_ms(&self) -> Option<u64> {
        self.reset_at_ms
    }
}

/// Duplicate filter and quota behind one facade.
#[derive(Debug)]
pub struct Limiter {
    settings: Mutex<LimiterSettings>,
    duplicates: Mutex<DuplicateFilter>,
    quota: Mutex<RateQuota>,
}

impl Limiter {
    /// Fresh limiter.
    pub fn new(settings: LimiterSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
            duplicates: Mutex::new(new_filter(&settings)),
            quota: Mutex::new(RateQuota::new(
                settings.quota_limit,
                settings.quota_window_ms,
            )),
        }
    }

    /// Decide whether a record with `signature` may be shipped at `now_ms`.
    pub fn should_emit(&self, signature: &str, now_ms: u64) -> LimitDecision {
        if !lock(&self.duplicates).admit(signature, now_ms) {
            return LimitDecision::Duplicate;
        }
        match lock(&self.quota).try_acquire(now_ms) {
            Ok(()) => LimitDecision::Allow,
            Err(reset_at_ms) => LimitDecision::RateLimited { reset_at_ms },
        }
    }

    /// Apply a 429 answer.
    pub fn apply_rate_limit(&self, remaining: u32, now_ms: u64) {
        lock(&self.quota).apply_rate_limit(remaining, now_ms);
    }

    /// Apply the quota reported on an accepted send.
    pub fn sync_remaining(&self, remaining: u32) {
        lock(&self.quota).sync_remaining(remaining);
    }

    /// Copy of the quota state.
    pub fn quota(&self) -> RateQuota {
        *lock(&self.quota)
    }

    /// Current settings.
    pub fn settings(&self) -> LimiterSettings {
        *lock(&self.settings)
    }

    /// Switch to new settings and start from a clean window.
    pub fn reconfigure(&self, settings: LimiterSettings) {
        *lock(&self.settings) = settings;
        self.reset();
    }

    /// Forget signatures and refill the quota.
    pub fn reset(&self) {
        let settings = self.settings();
        *lock(&self.duplicates) = new_filter(&settings);
        *lock(&self.quota) = RateQuota::new(settings.quota_limit, settings.quota_window_ms);
    }
}

fn new_filter(settings: &LimiterSettings) -> DuplicateFilter {
    DuplicateFilter::new(
        settings.duplicate_window_ms,
        settings.duplicate_threshold,
        settings.max_signatures,
    )
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
