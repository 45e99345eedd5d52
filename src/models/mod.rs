pub mod certificate;
pub mod community;
pub mod course;
pub mod profile;
pub mod progress;
pub mod quiz;
pub mod quiz_attempt;
