use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A cached token is treated as expired this long before its real expiry.
pub fn expiry_margin() -> Duration {
    Duration::seconds(60)
}

/// Lifetime assumed when the minting service does not report one.
pub fn default_lifetime() -> Duration {
    Duration::minutes(10)
}

/// Time source for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

/// Process-lifetime map of minted tokens, one entry per key.
///
/// Keys are `owner/repo` or an installation id. Inserting replaces any
/// existing entry. Two concurrent misses for the same key will both mint.
pub struct TokenCache {
    entries: Mutex<HashMap<String, AccessToken>>,
    clock: Arc<dyn Clock>,
}

impl TokenCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The cached token value, unless it expires within the safety margin.
    pub fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        self.lock()
            .get(key)
            .filter(|token| token.expires_at - now > expiry_margin())
            .map(|token| token.value.clone())
    }

    pub fn insert(&self, key: impl Into<String>, token: AccessToken) {
        self.lock().insert(key.into(), token);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, AccessToken>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Clock that only moves when told to.
    pub(crate) struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(
                Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap(),
            )))
        }

        pub(crate) fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn token(value: &str, expires_at: DateTime<Utc>) -> AccessToken {
        AccessToken {
            value: value.to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_fresh_token_is_returned() {
        let clock = ManualClock::new();
        let cache = TokenCache::new(clock.clone());
        cache.insert("acme/widgets", token("t1", clock.now() + Duration::minutes(10)));
        assert_eq!(cache.get("acme/widgets").as_deref(), Some("t1"));
        assert_eq!(cache.get("acme/other"), None);
    }

    #[test]
    fn test_token_inside_margin_is_absent() {
        let clock = ManualClock::new();
        let cache = TokenCache::new(clock.clone());
        cache.insert("acme/widgets", token("t1", clock.now() + Duration::minutes(10)));

        clock.advance(Duration::minutes(9));
        assert_eq!(cache.get("acme/widgets"), None);

        cache.insert("acme/widgets", token("t2", clock.now() + Duration::seconds(61)));
        assert_eq!(cache.get("acme/widgets").as_deref(), Some("t2"));

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get("acme/widgets"), None);
    }

    #[test]
    fn test_insert_replaces_entry() {
        let clock = ManualClock::new();
        let cache = TokenCache::new(clock.clone());
        let later = clock.now() + Duration::hours(1);
        cache.insert("1234", token("old", later));
        cache.insert("1234", token("new", later));
        assert_eq!(cache.get("1234").as_deref(), Some("new"));
    }
}
