//! Text helpers shared by the front ends

use chrono::{DateTime, Utc};

/// "Just now", "5m ago", "3h ago", "2d ago"
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if minutes < 1 {
        "Just now".to_string()
    } else if hours < 1 {
        format!("{}m ago", minutes)
    } else if days < 1 {
        format!("{}h ago", hours)
    } else {
        format!("{}d ago", days)
    }
}

/// Clock time for a message bubble
pub fn message_time(at: DateTime<Utc>) -> String {
    at.format("%H:%M").to_string()
}

/// Typing indicator line, or `None` when nobody is typing
pub fn typing_line(names: &[String]) -> Option<String> {
    match names {
        [] => None,
        [one] => Some(format!("{} is typing...", one)),
        [first, second] => Some(format!("{} and {} are typing...", first, second)),
        [first, rest @ ..] => Some(format!("{} and {} others are typing...", first, rest.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_time_ago_buckets() {
        let now = Utc::now();
        assert_eq!(time_ago(now - Duration::seconds(30), now), "Just now");
        assert_eq!(time_ago(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(time_ago(now - Duration::hours(3), now), "3h ago");
        assert_eq!(time_ago(now - Duration::days(2), now), "2d ago");
        assert_eq!(time_ago(now + Duration::minutes(5), now), "Just now");
    }

    #[test]
    fn test_typing_line() {
        assert_eq!(typing_line(&[]), None);
        assert_eq!(typing_line(&["ada".into()]).as_deref(), Some("ada is typing..."));
        assert_eq!(
            typing_line(&["ada".into(), "bo".into(), "cy".into()]).as_deref(),
            Some("ada and 2 others are typing...")
        );
    }
}
