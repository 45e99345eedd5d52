use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: Uuid,
    /// Human-facing identifier printed on the certificate, `CERT-XXXXXXXX`.
    pub code: String,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub quiz_id: Uuid,
    pub student_name: String,
    pub course_title: String,
    pub instructor_name: String,
    pub issued_at: DateTime<Utc>,
}
