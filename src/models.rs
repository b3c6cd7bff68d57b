use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CourseSnapshot {
    pub id: String,
    pub title: String,
    pub chapters: Vec<ChapterRef>,
    pub quizzes: Vec<QuizDef>,
}

impl CourseSnapshot {
    pub fn chapter(&self, chapter_id: &str) -> Option<&ChapterRef> {
        self.chapters.iter().find(|c| c.id == chapter_id)
    }

    pub fn quiz(&self, quiz_id: &str) -> Option<&QuizDef> {
        self.quizzes.iter().find(|q| q.id == quiz_id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChapterRef {
    pub id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QuizDef {
    pub id: String,
    pub questions: Vec<Question>,
    pub passing_score: u8, // 0..=100
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Question {
    pub id: String,
    pub options: Vec<String>,
    pub correct_option_index: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProgressRecord {
    pub learner_id: String,
    pub course_id: String,
    pub chapter_status: HashMap<String, ChapterStatus>,
    pub quiz_status: HashMap<String, QuizStatus>,
    pub completion_percentage: u8, // derived, see aggregate
    pub is_completed: bool,        // derived, sticky once true
    pub certificate: Option<Certificate>,
}

impl ProgressRecord {
    pub fn new(learner_id: &str, course_id: &str) -> Self {
        Self {
            learner_id: learner_id.to_string(),
            course_id: course_id.to_string(),
            chapter_status: HashMap::new(),
            quiz_status: HashMap::new(),
            completion_percentage: 0,
            is_completed: false,
            certificate: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChapterStatus {
    pub completed: bool,
    pub last_access_time: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QuizStatus {
    pub last_score: u8,
    pub passed: bool,
    // set once the quiz has passed on any attempt; a later failed attempt
    // updates last_score/passed but never clears this
    pub ever_passed: bool,
    pub attempts: u32,
    pub last_attempt_time: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Certificate {
    pub certificate_id: String,
    pub issued_at: DateTime<Utc>,
    pub artifact_ref: String, // e.g. "/content/certificates/<uuid>.html"
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CompleteChapterReq {
    pub learner_id: String,
    pub course_id: String,
    pub chapter_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SubmitQuizReq {
    pub learner_id: String,
    pub course_id: String,
    pub quiz_id: String,
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SubmittedAnswer {
    pub question_id: String,
    pub answer_index: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChapterProgressRes {
    pub completion_percentage: u8,
    pub is_completed: bool,
    pub certificate: Option<Certificate>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QuestionFeedback {
    pub question_id: String,
    pub is_correct: bool,
    pub correct_option_index: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QuizSubmitRes {
    pub score: u8,
    pub passed: bool,
    pub correct_count: usize,
    pub total_questions: usize,
    pub per_question_feedback: Vec<QuestionFeedback>,
    pub completion_percentage: u8,
    pub is_completed: bool,
    pub certificate: Option<Certificate>,
}
