use serde::Serialize;
use uuid::Uuid;

use crate::utils::video::VideoSource;

/// Fraction of a video that counts as watched.
pub const COMPLETION_THRESHOLD: f64 = 0.90;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlaybackOutcome {
    /// Embedded player or unusable report; nothing tracked.
    Ignored,
    Watching { percentage: f64 },
    /// First crossing of the threshold in this viewing session.
    Completed { percentage: f64 },
    AlreadyCompleted { percentage: f64 },
}

/// One student's viewing session of one lecture.
#[derive(Debug, Clone)]
pub struct WatchSession {
    lecture_id: Uuid,
    student_id: Uuid,
    source: VideoSource,
    completed: bool,
    last_percentage: f64,
}

impl WatchSession {
    /// `already_watched` seeds the one-shot guard from the persisted flag.
    pub fn new(lecture_id: Uuid, student_id: Uuid, source: VideoSource, already_watched: bool) -> Self {
        Self {
            lecture_id,
            student_id,
            source,
            completed: already_watched,
            last_percentage: 0.0,
        }
    }

    pub fn lecture_id(&self) -> Uuid {
        self.lecture_id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn source(&self) -> VideoSource {
        self.source
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn last_percentage(&self) -> f64 {
        self.last_percentage
    }

    pub fn observe(&mut self, position: f64, duration: f64) -> PlaybackOutcome {
        if self.source == VideoSource::Embedded {
            return PlaybackOutcome::Ignored;
        }
        if !position.is_finite() || !duration.is_finite() || duration <= 0.0 || position < 0.0 {
            return PlaybackOutcome::Ignored;
        }

        let fraction = (position / duration).min(1.0);
        let percentage = (fraction * 100.0).round();
        self.last_percentage = percentage;

        if self.completed {
            return PlaybackOutcome::AlreadyCompleted { percentage };
        }
        if fraction >= COMPLETION_THRESHOLD {
            self.completed = true;
            return PlaybackOutcome::Completed { percentage };
        }
        PlaybackOutcome::Watching { percentage }
    }
}
