use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Watched flag for one (lecture, student) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoProgressEntry {
    pub lecture_id: Uuid,
    pub student_id: Uuid,
    pub watched: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseCompletion {
    pub course_id: Uuid,
    pub student_id: Uuid,
    pub total_lectures: usize,
    pub watched_lectures: usize,
    pub complete: bool,
}

impl CourseCompletion {
    /// A course is complete when it has lectures and every one of them is watched.
    pub fn compute(
        course_id: Uuid,
        student_id: Uuid,
        lecture_ids: &[Uuid],
        watched: &HashSet<Uuid>,
    ) -> Self {
        let watched_lectures = lecture_ids.iter().filter(|id| watched.contains(id)).count();
        Self {
            course_id,
            student_id,
            total_lectures: lecture_ids.len(),
            watched_lectures,
            complete: !lecture_ids.is_empty() && watched_lectures == lecture_ids.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_course_is_never_complete() {
        let watched: HashSet<Uuid> = [Uuid::new_v4()].into_iter().collect();
        let c = CourseCompletion::compute(Uuid::new_v4(), Uuid::new_v4(), &[], &watched);
        assert!(!c.complete);
        assert_eq!(c.total_lectures, 0);
    }

    #[test]
    fn complete_only_when_all_lectures_watched() {
        let lectures = vec![Uuid::new_v4(), Uuid::new_v4()];
        let mut watched: HashSet<Uuid> = HashSet::new();
        watched.insert(lectures[0]);
        watched.insert(Uuid::new_v4());

        let partial = CourseCompletion::compute(Uuid::nil(), Uuid::nil(), &lectures, &watched);
        assert!(!partial.complete);
        assert_eq!(partial.watched_lectures, 1);

        watched.insert(lectures[1]);
        let full = CourseCompletion::compute(Uuid::nil(), Uuid::nil(), &lectures, &watched);
        assert!(full.complete);
    }
}
