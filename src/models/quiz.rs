use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PASSING_SCORE: u8 = 70;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub text: String,
    pub options: Vec<String>,
    pub correct_option_index: usize,
}

/// Reasons a quiz definition cannot be used for a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizDefinitionError {
    #[error("quiz has no questions")]
    NoQuestions,
    #[error("question {0} has no text")]
    BlankQuestion(usize),
    #[error("question {0} needs at least two options")]
    TooFewOptions(usize),
    #[error("question {0} has a blank option")]
    BlankOption(usize),
    #[error("question {index} marks option {correct} as correct but only has {options} options")]
    CorrectOutOfRange {
        index: usize,
        correct: usize,
        options: usize,
    },
    #[error("passing score {0} is outside 1..=100")]
    PassingScore(u8),
    #[error("time limit must be at least one minute")]
    TimeLimit,
}

impl Question {
    fn check(&self, index: usize) -> Result<(), QuizDefinitionError> {
        if self.text.trim().is_empty() {
            return Err(QuizDefinitionError::BlankQuestion(index));
        }
        if self.options.len() < 2 {
            return Err(QuizDefinitionError::TooFewOptions(index));
        }
        if self.options.iter().any(|o| o.trim().is_empty()) {
            return Err(QuizDefinitionError::BlankOption(index));
        }
        if self.correct_option_index >= self.options.len() {
            return Err(QuizDefinitionError::CorrectOutOfRange {
                index,
                correct: self.correct_option_index,
                options: self.options.len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub passing_score: u8,
    pub time_limit_minutes: Option<u32>,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quiz {
    /// Checks the invariants every stored or authored quiz must hold.
    pub fn check(&self) -> Result<(), QuizDefinitionError> {
        if self.questions.is_empty() {
            return Err(QuizDefinitionError::NoQuestions);
        }
        if !(1..=100).contains(&self.passing_score) {
            return Err(QuizDefinitionError::PassingScore(self.passing_score));
        }
        if self.time_limit_minutes == Some(0) {
            return Err(QuizDefinitionError::TimeLimit);
        }
        for (index, question) in self.questions.iter().enumerate() {
            question.check(index)?;
        }
        Ok(())
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Countdown budget for one attempt, in seconds.
    pub fn time_budget_seconds(&self, seconds_per_question: u32) -> u32 {
        match self.time_limit_minutes {
            Some(minutes) => minutes.saturating_mul(60),
            None => (self.questions.len() as u32).saturating_mul(seconds_per_question),
        }
    }

    pub fn summary(&self) -> QuizSummary {
        QuizSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            question_count: self.questions.len(),
            passing_score: self.passing_score,
            time_limit_minutes: self.time_limit_minutes,
        }
    }
}

/// Quiz listing entry; never carries answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub question_count: usize,
    pub passing_score: u8,
    pub time_limit_minutes: Option<u32>,
}

/// A question as shown to a student while answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: Uuid,
    pub text: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            text: q.text.clone(),
            options: q.options.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: usize) -> Question {
        Question {
            id: Uuid::new_v4(),
            text: "What does HTML stand for?".into(),
            options: vec![
                "Hyper Text Markup Language".into(),
                "Home Tool Markup Language".into(),
            ],
            correct_option_index: correct,
        }
    }

    fn quiz(questions: Vec<Question>) -> Quiz {
        let now = Utc::now();
        Quiz {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            title: "HTML Basics".into(),
            description: None,
            passing_score: DEFAULT_PASSING_SCORE,
            time_limit_minutes: None,
            questions,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn rejects_empty_quiz() {
        assert_eq!(quiz(vec![]).check(), Err(QuizDefinitionError::NoQuestions));
    }

    #[test]
    fn rejects_correct_index_out_of_range() {
        let err = quiz(vec![question(0), question(2)]).check().unwrap_err();
        assert_eq!(
            err,
            QuizDefinitionError::CorrectOutOfRange {
                index: 1,
                correct: 2,
                options: 2
            }
        );
    }

    #[test]
    fn time_budget_prefers_explicit_limit() {
        let mut q = quiz(vec![question(0), question(1)]);
        assert_eq!(q.time_budget_seconds(120), 240);
        q.time_limit_minutes = Some(5);
        assert_eq!(q.time_budget_seconds(120), 300);
    }
}
