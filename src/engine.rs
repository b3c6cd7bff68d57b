// Engine facade: the two public operations. Each loads the course snapshot,
// validates the target against it, then funnels every write through one
// atomic store update that also recomputes derived state and runs the
// certification decider.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::aggregate;
use crate::catalog::CourseCatalog;
use crate::cert::{self, CertificateRenderer};
use crate::error::EngineError;
use crate::models::{
    ChapterProgressRes, ChapterStatus, ProgressRecord, QuizStatus, QuizSubmitRes, SubmittedAnswer,
};
use crate::scoring;
use crate::store::ProgressStore;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn display_name(&self, learner_id: &str) -> Result<String, EngineError>;
}

// Callers are authenticated upstream; the id doubles as the display name
// until a real directory is wired in.
pub struct PassthroughIdentity;

#[async_trait]
impl IdentityProvider for PassthroughIdentity {
    async fn display_name(&self, learner_id: &str) -> Result<String, EngineError> {
        Ok(learner_id.to_string())
    }
}

pub struct Engine {
    catalog: Arc<dyn CourseCatalog>,
    store: Arc<dyn ProgressStore>,
    renderer: Arc<dyn CertificateRenderer>,
    identity: Arc<dyn IdentityProvider>,
}

impl Engine {
    pub fn new(
        catalog: Arc<dyn CourseCatalog>,
        store: Arc<dyn ProgressStore>,
        renderer: Arc<dyn CertificateRenderer>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            catalog,
            store,
            renderer,
            identity,
        }
    }

    pub async fn complete_chapter(
        &self,
        learner_id: &str,
        course_id: &str,
        chapter_id: &str,
    ) -> Result<ChapterProgressRes, EngineError> {
        let snapshot = self.catalog.snapshot(course_id).await?;
        if snapshot.chapter(chapter_id).is_none() {
            return Err(EngineError::not_found("chapter", chapter_id));
        }
        let learner_name = self.identity.display_name(learner_id).await?;

        let renderer = Arc::clone(&self.renderer);
        let chapter_id = chapter_id.to_string();
        let now = Utc::now();
        let record = self
            .store
            .atomic_update(
                learner_id,
                course_id,
                Box::new(move |mut record: ProgressRecord| {
                    Box::pin(async move {
                        // idempotent: re-completing only refreshes the access time
                        record.chapter_status.insert(
                            chapter_id,
                            ChapterStatus {
                                completed: true,
                                last_access_time: now,
                            },
                        );
                        aggregate::recompute(&snapshot, &mut record);
                        if let Some(cert) = cert::maybe_issue(
                            &snapshot,
                            &mut record,
                            &learner_name,
                            renderer.as_ref(),
                            now,
                        )
                        .await
                        {
                            tracing::info!(
                                learner=%record.learner_id,
                                course=%record.course_id,
                                certificate=%cert.certificate_id,
                                "certificate issued"
                            );
                        }
                        Ok(record)
                    })
                }),
            )
            .await?;

        Ok(ChapterProgressRes {
            completion_percentage: record.completion_percentage,
            is_completed: record.is_completed,
            certificate: record.certificate,
        })
    }

    pub async fn submit_quiz(
        &self,
        learner_id: &str,
        course_id: &str,
        quiz_id: &str,
        answers: &[SubmittedAnswer],
    ) -> Result<QuizSubmitRes, EngineError> {
        let snapshot = self.catalog.snapshot(course_id).await?;
        let quiz = snapshot
            .quiz(quiz_id)
            .ok_or_else(|| EngineError::not_found("quiz", quiz_id))?;

        // score outside the lock; a malformed submission never touches the store
        let outcome = scoring::score_quiz(quiz, answers)?;
        let learner_name = self.identity.display_name(learner_id).await?;

        let renderer = Arc::clone(&self.renderer);
        let quiz_id = quiz_id.to_string();
        let now = Utc::now();
        let score = outcome.score;
        let passed = outcome.passed;
        let record = self
            .store
            .atomic_update(
                learner_id,
                course_id,
                Box::new(move |mut record: ProgressRecord| {
                    Box::pin(async move {
                        let status =
                            record
                                .quiz_status
                                .entry(quiz_id)
                                .or_insert_with(|| QuizStatus {
                                    last_score: 0,
                                    passed: false,
                                    ever_passed: false,
                                    attempts: 0,
                                    last_attempt_time: now,
                                });
                        status.last_score = score;
                        status.passed = passed;
                        status.ever_passed = status.ever_passed || passed;
                        status.attempts += 1;
                        status.last_attempt_time = now;
                        aggregate::recompute(&snapshot, &mut record);
                        if let Some(cert) = cert::maybe_issue(
                            &snapshot,
                            &mut record,
                            &learner_name,
                            renderer.as_ref(),
                            now,
                        )
                        .await
                        {
                            tracing::info!(
                                learner=%record.learner_id,
                                course=%record.course_id,
                                certificate=%cert.certificate_id,
                                "certificate issued"
                            );
                        }
                        Ok(record)
                    })
                }),
            )
            .await?;

        Ok(QuizSubmitRes {
            score: outcome.score,
            passed: outcome.passed,
            correct_count: outcome.correct_count,
            total_questions: outcome.total_questions,
            per_question_feedback: outcome.per_question,
            completion_percentage: record.completion_percentage,
            is_completed: record.is_completed,
            certificate: record.certificate,
        })
    }

    // read-only view for the dashboard; unknown courses are still a 404,
    // an unseen (learner, course) pair reports the lazy default shape
    pub async fn progress(
        &self,
        learner_id: &str,
        course_id: &str,
    ) -> Result<ProgressRecord, EngineError> {
        let snapshot = self.catalog.snapshot(course_id).await?;
        match self.store.get(learner_id, course_id).await? {
            Some(record) => Ok(record),
            None => {
                let mut record = ProgressRecord::new(learner_id, course_id);
                aggregate::recompute(&snapshot, &mut record);
                Ok(record)
            }
        }
    }
}
