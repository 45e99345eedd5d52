use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Notices kept per profile; older ones are dropped first.
pub const MAX_PENDING_NOTICES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct NotificationService {
    queues: Arc<Mutex<HashMap<Uuid, VecDeque<Notice>>>>,
}

impl NotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, profile_id: Uuid, level: NoticeLevel, title: &str, description: impl Into<String>) {
        let notice = Notice {
            level,
            title: title.to_string(),
            description: description.into(),
            created_at: Utc::now(),
        };
        tracing::debug!(%profile_id, level = ?notice.level, title = %notice.title, "notice queued");

        let mut queues = match self.queues.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let queue = queues.entry(profile_id).or_default();
        if queue.len() == MAX_PENDING_NOTICES {
            queue.pop_front();
        }
        queue.push_back(notice);
    }

    /// Removes and returns every pending notice, oldest first.
    pub fn drain(&self, profile_id: Uuid) -> Vec<Notice> {
        let mut queues = match self.queues.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        queues
            .remove(&profile_id)
            .map(Vec::from)
            .unwrap_or_default()
    }

    pub fn pending(&self, profile_id: Uuid) -> usize {
        let queues = match self.queues.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        queues.get(&profile_id).map_or(0, VecDeque::len)
    }
}
