use std::sync::Arc;
use uuid::Uuid;

use crate::database::repository::CertificateRepository;
use crate::error::{Error, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::certificate::Certificate;
use crate::models::course::Course;
use crate::utils::time::now;
use crate::utils::token::generate_certificate_code;

#[derive(Clone)]
pub struct CertificateService {
    repo: Arc<dyn CertificateRepository>,
}

impl CertificateService {
    pub fn new(repo: Arc<dyn CertificateRepository>) -> Self {
        Self { repo }
    }

    /// Issues the course certificate for `student_id`, or returns the one
    /// already on file.
    pub async fn issue(
        &self,
        student_id: Uuid,
        student_name: &str,
        course: &Course,
        quiz_id: Uuid,
    ) -> Result<Certificate> {
        if let Some(existing) = self.repo.find_certificate(student_id, course.id).await? {
            return Ok(existing);
        }
        let certificate = Certificate {
            id: Uuid::new_v4(),
            code: generate_certificate_code(),
            student_id,
            course_id: course.id,
            quiz_id,
            student_name: student_name.to_string(),
            course_title: course.title.clone(),
            instructor_name: course.instructor_name.clone(),
            issued_at: now(),
        };
        let stored = self.repo.insert_certificate(&certificate).await?;
        if stored.id == certificate.id {
            tracing::info!(certificate = %stored.code, %student_id, course_id = %course.id, "certificate issued");
        }
        Ok(stored)
    }

    pub async fn list_mine(&self, user: &CurrentUser) -> Result<Vec<Certificate>> {
        self.repo.list_certificates(user.id).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Certificate> {
        self.repo
            .get_certificate(id)
            .await?
            .ok_or_else(|| Error::NotFound("Certificate not found".to_string()))
    }
}
