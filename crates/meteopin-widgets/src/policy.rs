//! Cache freshness rule for widget readings.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::widget::Widget;

/// One hour
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(60 * 60);

/// True if the widget was never fetched, or its reading is older than
/// `cache_duration` at `now`.
pub fn needs_refresh(widget: &Widget, now: DateTime<Utc>, cache_duration: Duration) -> bool {
    let Some(updated_at) = widget.last_updated() else {
        return true;
    };

    let age_ms = now.timestamp_millis() - updated_at.timestamp_millis();
    let limit_ms = i64::try_from(cache_duration.as_millis()).unwrap_or(i64::MAX);
    age_ms > limit_ms
}

/// Fixed-duration refresh policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    cache_duration: Duration,
}

impl RefreshPolicy {
    pub fn new(cache_duration: Duration) -> Self {
        Self { cache_duration }
    }

    pub fn cache_duration(&self) -> Duration {
        self.cache_duration
    }

    pub fn needs_refresh(&self, widget: &Widget, now: DateTime<Utc>) -> bool {
        needs_refresh(widget, now, self.cache_duration)
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DURATION)
    }
}
