// Course Definition Reader. Snapshots are validated at the read boundary so
// the engine only ever sees well-formed course data.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

use crate::error::EngineError;
use crate::models::CourseSnapshot;

#[async_trait]
pub trait CourseCatalog: Send + Sync {
    async fn snapshot(&self, course_id: &str) -> Result<CourseSnapshot, EngineError>;
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("duplicate chapter id: {0}")]
    DuplicateChapter(String),
    #[error("duplicate quiz id: {0}")]
    DuplicateQuiz(String),
    #[error("duplicate question id {question_id} in quiz {quiz_id}")]
    DuplicateQuestion {
        quiz_id: String,
        question_id: String,
    },
    #[error("more than one final quiz (second: {0})")]
    MultipleFinalQuizzes(String),
    #[error("question {question_id} in quiz {quiz_id} has no options")]
    NoOptions {
        quiz_id: String,
        question_id: String,
    },
    #[error("correct option {index} out of range for question {question_id} in quiz {quiz_id}")]
    CorrectOptionOutOfRange {
        quiz_id: String,
        question_id: String,
        index: usize,
    },
    #[error("passing score {score} out of range for quiz {quiz_id}")]
    PassingScoreOutOfRange { quiz_id: String, score: u8 },
}

pub fn validate_snapshot(snapshot: &CourseSnapshot) -> Result<(), SnapshotError> {
    let mut chapter_ids = HashSet::new();
    for c in &snapshot.chapters {
        if !chapter_ids.insert(c.id.as_str()) {
            return Err(SnapshotError::DuplicateChapter(c.id.clone()));
        }
    }

    let mut quiz_ids = HashSet::new();
    let mut final_seen = false;
    for q in &snapshot.quizzes {
        if !quiz_ids.insert(q.id.as_str()) {
            return Err(SnapshotError::DuplicateQuiz(q.id.clone()));
        }
        if q.is_final {
            if final_seen {
                return Err(SnapshotError::MultipleFinalQuizzes(q.id.clone()));
            }
            final_seen = true;
        }
        if q.passing_score > 100 {
            return Err(SnapshotError::PassingScoreOutOfRange {
                quiz_id: q.id.clone(),
                score: q.passing_score,
            });
        }
        let mut question_ids = HashSet::new();
        for question in &q.questions {
            if !question_ids.insert(question.id.as_str()) {
                return Err(SnapshotError::DuplicateQuestion {
                    quiz_id: q.id.clone(),
                    question_id: question.id.clone(),
                });
            }
            if question.options.is_empty() {
                return Err(SnapshotError::NoOptions {
                    quiz_id: q.id.clone(),
                    question_id: question.id.clone(),
                });
            }
            if question.correct_option_index >= question.options.len() {
                return Err(SnapshotError::CorrectOptionOutOfRange {
                    quiz_id: q.id.clone(),
                    question_id: question.id.clone(),
                    index: question.correct_option_index,
                });
            }
        }
    }
    Ok(())
}

// Catalog loaded once from a JSON file of CourseSnapshot entries.
pub struct MemoryCatalog {
    courses: HashMap<String, CourseSnapshot>,
}

impl MemoryCatalog {
    pub fn new(courses: impl IntoIterator<Item = CourseSnapshot>) -> anyhow::Result<Self> {
        let mut map = HashMap::new();
        for snapshot in courses {
            validate_snapshot(&snapshot)
                .map_err(|e| anyhow::anyhow!("course {}: {e}", snapshot.id))?;
            let id = snapshot.id.clone();
            if map.insert(id.clone(), snapshot).is_some() {
                anyhow::bail!("duplicate course id in catalog: {id}");
            }
        }
        Ok(Self { courses: map })
    }

    pub async fn from_file(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let courses: Vec<CourseSnapshot> = serde_json::from_slice(&bytes)?;
        Self::new(courses)
    }
}

#[async_trait]
impl CourseCatalog for MemoryCatalog {
    async fn snapshot(&self, course_id: &str) -> Result<CourseSnapshot, EngineError> {
        self.courses
            .get(course_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("course", course_id))
    }
}

// Reads course definitions from the catalog service. 404 is terminal;
// transport failures and bad payloads surface as retryable.
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl CourseCatalog for HttpCatalog {
    async fn snapshot(&self, course_id: &str) -> Result<CourseSnapshot, EngineError> {
        let url = format!("{}/courses/{}", self.base_url, course_id);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::Transient(format!("course catalog: {e}")))?;
        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(EngineError::not_found("course", course_id));
        }
        let res = res
            .error_for_status()
            .map_err(|e| EngineError::Transient(format!("course catalog: {e}")))?;
        let snapshot: CourseSnapshot = res
            .json()
            .await
            .map_err(|e| EngineError::Transient(format!("course catalog: {e}")))?;
        validate_snapshot(&snapshot).map_err(|e| {
            EngineError::Transient(format!("course catalog returned invalid course {course_id}: {e}"))
        })?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChapterRef, Question, QuizDef};

    fn course(id: &str) -> CourseSnapshot {
        CourseSnapshot {
            id: id.to_string(),
            title: "Course".into(),
            chapters: vec![ChapterRef { id: "ch1".into() }],
            quizzes: vec![QuizDef {
                id: "qz1".into(),
                questions: vec![Question {
                    id: "q1".into(),
                    options: vec!["a".into(), "b".into()],
                    correct_option_index: 1,
                }],
                passing_score: 80,
                is_final: true,
            }],
        }
    }

    #[tokio::test]
    async fn memory_catalog_resolves_known_courses() {
        let catalog = MemoryCatalog::new(vec![course("c1")]).unwrap();
        assert_eq!(catalog.snapshot("c1").await.unwrap().id, "c1");
        let err = catalog.snapshot("c2").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn rejects_two_final_quizzes() {
        let mut snap = course("c1");
        let mut second = snap.quizzes[0].clone();
        second.id = "qz2".into();
        snap.quizzes.push(second);
        assert_eq!(
            validate_snapshot(&snap),
            Err(SnapshotError::MultipleFinalQuizzes("qz2".into()))
        );
    }

    #[test]
    fn rejects_correct_option_out_of_range() {
        let mut snap = course("c1");
        snap.quizzes[0].questions[0].correct_option_index = 2;
        assert_eq!(
            validate_snapshot(&snap),
            Err(SnapshotError::CorrectOptionOutOfRange {
                quiz_id: "qz1".into(),
                question_id: "q1".into(),
                index: 2,
            })
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut snap = course("c1");
        snap.chapters.push(ChapterRef { id: "ch1".into() });
        assert_eq!(
            validate_snapshot(&snap),
            Err(SnapshotError::DuplicateChapter("ch1".into()))
        );
    }

    #[test]
    fn rejects_out_of_range_passing_score() {
        let mut snap = course("c1");
        snap.quizzes[0].passing_score = 101;
        assert_eq!(
            validate_snapshot(&snap),
            Err(SnapshotError::PassingScoreOutOfRange {
                quiz_id: "qz1".into(),
                score: 101,
            })
        );
    }

    #[tokio::test]
    async fn loads_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courses.json");
        std::fs::write(&path, serde_json::to_vec(&vec![course("c1")]).unwrap()).unwrap();
        let catalog = MemoryCatalog::from_file(&path).await.unwrap();
        assert_eq!(catalog.snapshot("c1").await.unwrap().title, "Course");
    }
}
