use chrono::{DateTime, Utc};
use db::models::{comment::Comment, history::History, time_entry::TimeEntry};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One entry in a task's merged feed of history records, comments and time
/// entries. Read-side only; never persisted as its own entity.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type")]
pub enum WallItem {
    #[serde(rename = "history")]
    History(History),
    #[serde(rename = "comment")]
    Comment(Comment),
    #[serde(rename = "spentTime")]
    SpentTime(TimeEntry),
}

impl WallItem {
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::History(history) => history.created_at,
            Self::Comment(comment) => comment.created_at,
            Self::SpentTime(entry) => entry.created_at,
        }
    }
}

/// Merge the three feeds in fetch order (history, comments, time entries)
/// and sort ascending by creation time. The sort is stable, so ties on
/// `created_at` keep fetch order; wall ordering is display-only.
pub fn merge_wall(
    histories: Vec<History>,
    comments: Vec<Comment>,
    time_entries: Vec<TimeEntry>,
) -> Vec<WallItem> {
    let mut wall: Vec<WallItem> = histories
        .into_iter()
        .map(WallItem::History)
        .chain(comments.into_iter().map(WallItem::Comment))
        .chain(time_entries.into_iter().map(WallItem::SpentTime))
        .collect();
    wall.sort_by_key(WallItem::created_at);
    wall
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use sqlx::types::Json;
    use uuid::Uuid;

    use super::*;

    fn history_at(task_id: Uuid, created_at: DateTime<Utc>) -> History {
        History {
            id: Uuid::new_v4(),
            task_id,
            user_id: Uuid::new_v4(),
            updated_fields: Json(vec!["title".to_string()]),
            fields_values: Json(vec!["B".to_string()]),
            previous_values: Json(vec!["A".to_string()]),
            created_at,
        }
    }

    fn comment_at(task_id: Uuid, created_at: DateTime<Utc>) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            task_id,
            user_id: Uuid::new_v4(),
            text: "looks good".to_string(),
            created_at,
        }
    }

    fn entry_at(task_id: Uuid, created_at: DateTime<Utc>) -> TimeEntry {
        TimeEntry {
            id: Uuid::new_v4(),
            task_id,
            user_id: Uuid::new_v4(),
            spent_time: 30,
            created_at,
        }
    }

    #[test]
    fn wall_is_sorted_by_creation_time() {
        let task_id = Uuid::new_v4();
        let base = Utc::now();
        let wall = merge_wall(
            vec![history_at(task_id, base + TimeDelta::seconds(2))],
            vec![comment_at(task_id, base)],
            vec![entry_at(task_id, base + TimeDelta::seconds(1))],
        );

        let times: Vec<_> = wall.iter().map(WallItem::created_at).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        assert!(matches!(wall[0], WallItem::Comment(_)));
        assert!(matches!(wall[2], WallItem::History(_)));
    }

    #[test]
    fn ties_keep_fetch_order() {
        let task_id = Uuid::new_v4();
        let at = Utc::now();
        let wall = merge_wall(
            vec![history_at(task_id, at)],
            vec![comment_at(task_id, at)],
            vec![entry_at(task_id, at)],
        );
        assert!(matches!(wall[0], WallItem::History(_)));
        assert!(matches!(wall[1], WallItem::Comment(_)));
        assert!(matches!(wall[2], WallItem::SpentTime(_)));
    }

    #[test]
    fn discriminator_tags_survive_serialization() {
        let task_id = Uuid::new_v4();
        let item = WallItem::SpentTime(entry_at(task_id, Utc::now()));
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "spentTime");
        assert_eq!(value["spentTime"], 30);
    }
}
