use serde::{Deserialize, Serialize};

/// Age below which a visitor counts as connected.
pub const CONNECTED_WINDOW_MS: i64 = 60_000;
/// Age below which a visitor counts as recently seen.
pub const RECENT_WINDOW_MS: i64 = 86_400_000;

/// Presence derived from how long ago a visitor last checked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Connected,
    Recently,
    Offline,
}

impl PresenceStatus {
    /// Pure function of `now - last_seen`. Timestamps in the future count as connected.
    pub fn derive(last_seen_ms: i64, now_ms: i64) -> Self {
        let age = now_ms.saturating_sub(last_seen_ms);
        if age < CONNECTED_WINDOW_MS {
            Self::Connected
        } else if age < RECENT_WINDOW_MS {
            Self::Recently
        } else {
            Self::Offline
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Connected => "Online",
            Self::Recently => "Away",
            Self::Offline => "Offline",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Connected => "status-online",
            Self::Recently => "status-away",
            Self::Offline => "status-offline",
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Short relative description of a last-seen timestamp ("just now", "5m ago", ...).
pub fn last_seen_label(last_seen_ms: i64, now_ms: i64) -> String {
    let secs = now_ms.saturating_sub(last_seen_ms) / 1000;
    if secs < 60 {
        return "just now".to_string();
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{mins}m ago");
    }
    let hours = secs / 3600;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    format!("{}d ago", secs / 86_400)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000_000;

    #[test]
    fn connected_below_one_minute() {
        assert_eq!(PresenceStatus::derive(NOW - 5_000, NOW), PresenceStatus::Connected);
        assert_eq!(PresenceStatus::derive(NOW - 59_999, NOW), PresenceStatus::Connected);
    }

    #[test]
    fn recently_from_one_minute_to_one_day() {
        assert_eq!(PresenceStatus::derive(NOW - 60_000, NOW), PresenceStatus::Recently);
        assert_eq!(
            PresenceStatus::derive(NOW - 86_399_999, NOW),
            PresenceStatus::Recently
        );
    }

    #[test]
    fn offline_from_one_day() {
        assert_eq!(PresenceStatus::derive(NOW - 86_400_000, NOW), PresenceStatus::Offline);
        assert_eq!(PresenceStatus::derive(NOW - 90_000_000, NOW), PresenceStatus::Offline);
        assert_eq!(PresenceStatus::derive(0, NOW), PresenceStatus::Offline);
    }

    #[test]
    fn future_timestamps_are_connected() {
        assert_eq!(PresenceStatus::derive(NOW + 10_000, NOW), PresenceStatus::Connected);
    }

    #[test]
    fn boundaries_hold_across_a_sweep() {
        for age in (0..200_000_000_i64).step_by(997_331) {
            let status = PresenceStatus::derive(NOW - age, NOW);
            let expected = if age < 60_000 {
                PresenceStatus::Connected
            } else if age < 86_400_000 {
                PresenceStatus::Recently
            } else {
                PresenceStatus::Offline
            };
            assert_eq!(status, expected, "age {age}");
        }
    }

    #[test]
    fn last_seen_labels() {
        assert_eq!(last_seen_label(NOW - 10_000, NOW), "just now");
        assert_eq!(last_seen_label(NOW - 5 * 60_000, NOW), "5m ago");
        assert_eq!(last_seen_label(NOW - 3 * 3_600_000, NOW), "3h ago");
        assert_eq!(last_seen_label(NOW - 2 * 86_400_000, NOW), "2d ago");
    }
}
