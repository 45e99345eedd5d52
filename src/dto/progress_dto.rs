use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::watch::PlaybackOutcome;

#[derive(Debug, Clone, Deserialize)]
pub struct VideoProgressPayload {
    pub position_seconds: f64,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchOpened {
    pub lecture_id: Uuid,
    /// `false` for embedded players, whose playback is never observed.
    pub tracked: bool,
    pub already_watched: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    #[serde(flatten)]
    pub outcome: PlaybackOutcome,
    /// Set only when this report completed the lecture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<bool>,
}
