use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// A personal to-do item. Always scoped to its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub note: String,
    pub due_at: DateTime<Utc>,
    pub done: bool,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    pub fn new(user_id: Uuid, title: String, note: String, due_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            note,
            due_at,
            done: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.done && self.due_at < now
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReminderValidationError {
    #[error("due_at must be in the future")]
    DueInPast,

    #[error("title is required")]
    EmptyTitle,
}

pub fn validate_new(
    title: &str,
    due_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), ReminderValidationError> {
    if title.trim().is_empty() {
        return Err(ReminderValidationError::EmptyTitle);
    }
    if due_at <= now {
        return Err(ReminderValidationError::DueInPast);
    }
    Ok(())
}

/// Optional query filters, mirroring
/// `?done=&overdue=&q=&from=&to=` on the reminders endpoint.
#[derive(Debug, Clone, Default)]
pub struct ReminderFilter {
    pub done: Option<bool>,
    pub overdue: bool,
    pub query: Option<String>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
}

impl ReminderFilter {
    /// Reference definition of the filter semantics. The SQL listing query
    /// must select exactly the reminders this accepts.
    pub fn matches(&self, r: &Reminder, now: DateTime<Utc>) -> bool {
        if let Some(done) = self.done {
            if r.done != done {
                return false;
            }
        }
        if self.overdue && !r.is_overdue(now) {
            return false;
        }
        if let Some(q) = &self.query {
            let q = q.to_lowercase();
            if !r.title.to_lowercase().contains(&q) && !r.note.to_lowercase().contains(&q) {
                return false;
            }
        }
        if let Some(from) = self.due_from {
            if r.due_at < from {
                return false;
            }
        }
        if let Some(to) = self.due_to {
            if r.due_at > to {
                return false;
            }
        }
        true
    }
}

/// Default listing order: open reminders first, then ascending due date,
/// then id for a stable tiebreak. Reference definition of the SQL
/// `ORDER BY done ASC, due_at ASC, id ASC`.
pub fn default_order(a: &Reminder, b: &Reminder) -> Ordering {
    a.done
        .cmp(&b.done)
        .then_with(|| a.due_at.cmp(&b.due_at))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reminder(title: &str, due_in_hours: i64, done: bool) -> Reminder {
        let mut r = Reminder::new(
            Uuid::new_v4(),
            title.to_string(),
            String::new(),
            Utc::now() + Duration::hours(due_in_hours),
        );
        r.done = done;
        r
    }

    #[test]
    fn test_due_at_must_be_future() {
        let now = Utc::now();
        assert!(validate_new("buy flags", now + Duration::minutes(5), now).is_ok());
        assert!(matches!(
            validate_new("buy flags", now - Duration::minutes(5), now),
            Err(ReminderValidationError::DueInPast)
        ));
        assert!(matches!(
            validate_new("buy flags", now, now),
            Err(ReminderValidationError::DueInPast)
        ));
        assert!(matches!(
            validate_new("  ", now + Duration::minutes(5), now),
            Err(ReminderValidationError::EmptyTitle)
        ));
    }

    #[test]
    fn test_overdue_filter() {
        let now = Utc::now();
        let overdue = reminder("call supplier", -2, false);
        let done_past = reminder("print manifests", -2, true);
        let upcoming = reminder("confirm bus", 2, false);

        let filter = ReminderFilter {
            overdue: true,
            ..Default::default()
        };
        assert!(filter.matches(&overdue, now));
        assert!(!filter.matches(&done_past, now));
        assert!(!filter.matches(&upcoming, now));
    }

    #[test]
    fn test_text_search_covers_title_and_note() {
        let now = Utc::now();
        let mut r = reminder("Call supplier", 1, false);
        r.note = "about Terminal 2".to_string();

        let by_title = ReminderFilter {
            query: Some("SUPPLIER".into()),
            ..Default::default()
        };
        let by_note = ReminderFilter {
            query: Some("terminal".into()),
            ..Default::default()
        };
        let miss = ReminderFilter {
            query: Some("invoice".into()),
            ..Default::default()
        };
        assert!(by_title.matches(&r, now));
        assert!(by_note.matches(&r, now));
        assert!(!miss.matches(&r, now));
    }

    #[test]
    fn test_default_ordering_open_first() {
        let mut items = vec![
            reminder("done early", 1, true),
            reminder("open late", 48, false),
            reminder("open early", 1, false),
        ];
        items.sort_by(default_order);

        assert_eq!(items[0].title, "open early");
        assert_eq!(items[1].title, "open late");
        assert_eq!(items[2].title, "done early");
    }
}
