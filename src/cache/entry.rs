//! Cache entry type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached value with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached payload.
    pub value: serde_json::Value,
    /// When the entry stops being served.
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry expiring at `expires_at`.
    pub fn new(value: serde_json::Value, expires_at: DateTime<Utc>) -> Self {
        Self { value, expires_at }
    }

    /// Check if the entry has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check expiry against a given instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn fresh_entry_is_not_expired() {
        let entry = CacheEntry::new(json!({"a": 1}), Utc::now() + Duration::hours(1));
        assert!(!entry.is_expired());
    }

    #[test]
    fn past_entry_is_expired() {
        let entry = CacheEntry::new(json!(1), Utc::now() - Duration::seconds(1));
        assert!(entry.is_expired());
    }

    #[test]
    fn expiry_boundary_counts_as_expired() {
        let now = Utc::now();
        let entry = CacheEntry::new(json!(1), now);
        assert!(entry.is_expired_at(now));
        assert!(!entry.is_expired_at(now - Duration::milliseconds(1)));
    }

    #[test]
    fn serializes_expiry_as_rfc3339() {
        let expires_at = DateTime::parse_from_rfc3339("2030-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let entry = CacheEntry::new(json!("v"), expires_at);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("2030-01-02T03:04:05Z"));
    }
}
