//! Buckets a user's chat list by recency for the sidebar history view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ChatSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryBucket {
    Today,
    Yesterday,
    Previous7Days,
    Previous30Days,
    Older,
}

impl HistoryBucket {
    /// Bucket for an activity time, counted in whole UTC calendar days.
    pub fn for_time(at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let days = (now.date_naive() - at.date_naive()).num_days();
        match days {
            i64::MIN..=0 => Self::Today,
            1 => Self::Yesterday,
            2..=7 => Self::Previous7Days,
            8..=30 => Self::Previous30Days,
            _ => Self::Older,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryGroup {
    pub bucket: HistoryBucket,
    pub chats: Vec<ChatSummary>,
}

/// Groups chats by `updated_at`. Buckets come out newest first, empty ones
/// are dropped, and the input order is kept within each bucket.
pub fn group_by_recency(chats: Vec<ChatSummary>, now: DateTime<Utc>) -> Vec<HistoryGroup> {
    let mut groups: Vec<HistoryGroup> = Vec::new();
    for chat in chats {
        let bucket = HistoryBucket::for_time(chat.updated_at, now);
        match groups.iter_mut().find(|g| g.bucket == bucket) {
            Some(group) => group.chats.push(chat),
            None => groups.push(HistoryGroup { bucket, chats: vec![chat] }),
        }
    }
    groups.sort_by_key(|g| g.bucket);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn chat(title: &str, updated_at: DateTime<Utc>) -> ChatSummary {
        ChatSummary {
            id: Uuid::new_v4(),
            title: title.to_string(),
            message_count: 1,
            created_at: updated_at,
            updated_at,
        }
    }

    #[test]
    fn buckets_by_calendar_day() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 9, 0, 0).unwrap();
        let late_yesterday = Utc.with_ymd_and_hms(2024, 5, 19, 23, 59, 0).unwrap();
        assert_eq!(HistoryBucket::for_time(now, now), HistoryBucket::Today);
        assert_eq!(HistoryBucket::for_time(late_yesterday, now), HistoryBucket::Yesterday);
        assert_eq!(HistoryBucket::for_time(now - Duration::days(7), now), HistoryBucket::Previous7Days);
        assert_eq!(HistoryBucket::for_time(now - Duration::days(8), now), HistoryBucket::Previous30Days);
        assert_eq!(HistoryBucket::for_time(now - Duration::days(31), now), HistoryBucket::Older);
        // Clock skew from the client side lands in today.
        assert_eq!(HistoryBucket::for_time(now + Duration::hours(30), now), HistoryBucket::Today);
    }

    #[test]
    fn groups_keep_order_and_skip_empty_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
        let chats = vec![
            chat("old", now - Duration::days(90)),
            chat("a", now),
            chat("week", now - Duration::days(3)),
            chat("b", now - Duration::hours(1)),
        ];

        let groups = group_by_recency(chats, now);
        let buckets: Vec<_> = groups.iter().map(|g| g.bucket).collect();
        assert_eq!(
            buckets,
            vec![HistoryBucket::Today, HistoryBucket::Previous7Days, HistoryBucket::Older]
        );
        let today: Vec<_> = groups[0].chats.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(today, vec!["a", "b"]);
    }
}
